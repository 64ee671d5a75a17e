//! Smooth a recorded capture.

use std::io::{Read, Write};
use std::path::PathBuf;

use glide_common::config::AppConfig;
use glide_processing_core::{smooth_samples, AlphaPolicy};
use glide_sample_model::{parse_samples, serialize_samples};

use crate::SmoothingArgs;

pub fn run(
    mut config: AppConfig,
    smoothing: SmoothingArgs,
    input: PathBuf,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    smoothing.apply(&mut config.sampler);
    config.sampler.validate()?;
    let policy = AlphaPolicy::from_config(&config.sampler)?;

    let content = if input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&input)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?
    };

    let raw = parse_samples(&content)?;
    let smoothed = smooth_samples(&raw, policy);
    let jsonl = serialize_samples(&smoothed)?;

    match output {
        Some(path) => {
            std::fs::write(&path, jsonl)?;
            eprintln!("Smoothed {} samples into {}", smoothed.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(jsonl.as_bytes())?;
            stdout.flush()?;
        }
    }

    tracing::debug!(samples = smoothed.len(), ?policy, "Replay complete");
    Ok(())
}
