//! Logging and tracing initialization.
//!
//! Logs go to stderr so `glide watch` can keep stdout for the JSONL sample
//! stream. The producer thread is named, so thread names are always shown.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{GlideError, GlideResult};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if the
/// configured level is not a valid filter or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> GlideResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_thread_names(true);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(layer.json().flatten_event(true)).try_init()
    } else {
        registry
            .with(layer.with_target(true).with_file(false).with_line_number(false))
            .try_init()
    };
    installed.map_err(|e| GlideError::Other(anyhow::anyhow!("Failed to install logger: {e}")))
}

/// Parse a level or directive list such as `"debug"` or `"glide=trace,warn"`.
pub fn level_filter(directives: &str) -> GlideResult<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| GlideError::config(format!("Invalid log level '{directives}': {e}")))
}
