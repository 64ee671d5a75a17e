//! Glide CLI: command-line interface for pointer smoothing.
//!
//! Usage:
//!   glide watch [OPTIONS]      Stream smoothed pointer samples as JSONL
//!   glide replay <FILE>        Smooth a recorded JSONL capture
//!   glide check                Show the selected clock and position source
//!   glide config [--init]      Print or create the configuration file

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use glide_common::config::{AdaptiveAlphaConfig, AppConfig, SamplerConfig};

mod commands;

#[derive(Parser)]
#[command(
    name = "glide",
    about = "Adaptive EMA smoothing for jittery pointer streams",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (defaults to $XDG_CONFIG_HOME/glide/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for the sampler section of the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct SmoothingArgs {
    /// Fixed smoothing factor in (0, 1]
    #[arg(long)]
    alpha: Option<f64>,

    /// Milliseconds between samples
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Movement (pixels) above which the jump factor applies
    #[arg(long, requires = "jump_alpha")]
    threshold: Option<f64>,

    /// Factor for movements above the threshold
    #[arg(long, requires = "threshold")]
    jump_alpha: Option<f64>,

    /// Factor for movements at or below the threshold (defaults to --alpha)
    #[arg(long, requires = "threshold")]
    jitter_alpha: Option<f64>,
}

impl SmoothingArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply(&self, sampler: &mut SamplerConfig) {
        if let Some(alpha) = self.alpha {
            sampler.alpha = alpha;
        }
        if let Some(interval_ms) = self.interval_ms {
            sampler.interval_ms = interval_ms;
        }
        if let (Some(threshold_px), Some(jump_alpha)) = (self.threshold, self.jump_alpha) {
            sampler.adaptive = Some(AdaptiveAlphaConfig {
                threshold_px,
                jitter_alpha: self.jitter_alpha.unwrap_or(sampler.alpha),
                jump_alpha,
            });
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stream smoothed pointer samples to stdout as JSONL
    Watch {
        /// Stop after this many seconds (runs until Ctrl+C otherwise)
        #[arg(long)]
        duration_secs: Option<f64>,

        #[command(flatten)]
        smoothing: SmoothingArgs,
    },

    /// Smooth a recorded JSONL capture ("-" reads stdin)
    Replay {
        /// Path to the raw capture
        input: PathBuf,

        /// Write the smoothed stream here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        smoothing: SmoothingArgs,
    },

    /// Check clock and position source capabilities
    Check,

    /// Print the effective configuration
    Config {
        /// Write a default configuration file if none exists
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file when used with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(glide_common::config::config_file_path);
    let mut config = AppConfig::load_from(&config_path);

    // Initialize logging
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    glide_common::logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::Watch {
            duration_secs,
            smoothing,
        } => commands::watch::run(config, smoothing, duration_secs).await,
        Commands::Replay {
            input,
            output,
            smoothing,
        } => commands::replay::run(config, smoothing, input, output),
        Commands::Check => commands::check::run(&config),
        Commands::Config { init, force } => commands::config::run(config, config_path, init, force),
    }
}
