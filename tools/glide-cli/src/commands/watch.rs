//! Stream smoothed pointer samples.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use glide_common::clock::SystemClock;
use glide_common::config::AppConfig;
use glide_input_tracker::backends::detect_best_source;
use glide_input_tracker::{PositionSource, SampleLoop};

use crate::SmoothingArgs;

pub async fn run(
    mut config: AppConfig,
    smoothing: SmoothingArgs,
    duration_secs: Option<f64>,
) -> anyhow::Result<()> {
    smoothing.apply(&mut config.sampler);
    config.validate()?;

    let source = detect_best_source(&config.source);
    let clock = SystemClock::detect();
    tracing::info!(
        source = %source.name(),
        clock = ?clock.capability(),
        interval_ms = config.sampler.interval_ms,
        "Watching pointer"
    );

    let sampler = SampleLoop::from_config(source, Box::new(clock), &config.sampler)?;

    let errors = Arc::new(AtomicU64::new(0));
    let error_count = Arc::clone(&errors);
    sampler.on_error(move |_| {
        error_count.fetch_add(1, Ordering::Relaxed);
    })?;

    let published = Arc::new(AtomicU64::new(0));
    let published_count = Arc::clone(&published);
    let subscription = sampler.subscribe(move |sample| {
        let line = match sample.to_jsonl_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode sample");
                return;
            }
        };
        let mut stdout = std::io::stdout().lock();
        if writeln!(stdout, "{line}").and_then(|_| stdout.flush()).is_ok() {
            published_count.fetch_add(1, Ordering::Relaxed);
        }
    })?;

    eprintln!("Streaming samples. Press Ctrl+C to stop...");

    match duration_secs {
        Some(secs) => {
            let limit = Duration::try_from_secs_f64(secs.max(0.0))?;
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = tokio::time::sleep(limit) => {}
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    sampler.unsubscribe(subscription);
    let ticks = sampler.ticks();
    sampler.dispose();

    eprintln!();
    eprintln!(
        "Stopped after {ticks} ticks: {} samples published, {} failed",
        published.load(Ordering::Relaxed),
        errors.load(Ordering::Relaxed)
    );

    Ok(())
}
