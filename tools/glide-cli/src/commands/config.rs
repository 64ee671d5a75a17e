//! Print or initialize the configuration file.

use std::path::PathBuf;

use glide_common::config::AppConfig;

pub fn run(config: AppConfig, path: PathBuf, init: bool, force: bool) -> anyhow::Result<()> {
    if init {
        if path.exists() && !force {
            anyhow::bail!(
                "Config already exists at {} (use --force to overwrite)",
                path.display()
            );
        }
        AppConfig::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
