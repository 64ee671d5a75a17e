//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{GlideError, GlideResult};

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Sampling loop settings.
    pub sampler: SamplerConfig,

    /// Position source settings.
    pub source: SourceConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Sampling loop parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Sleep between ticks in milliseconds.
    pub interval_ms: u64,

    /// Fixed smoothing factor in (0, 1]. Larger is more responsive.
    pub alpha: f64,

    /// Distance-driven alpha selection. When absent, `alpha` is used every tick.
    pub adaptive: Option<AdaptiveAlphaConfig>,
}

/// Threshold-based alpha selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveAlphaConfig {
    /// Jumps strictly larger than this (pixels) count as deliberate motion.
    pub threshold_px: f64,

    /// Alpha for movements at or below the threshold.
    pub jitter_alpha: f64,

    /// Alpha for movements above the threshold.
    pub jump_alpha: f64,
}

/// Settings for relative-motion position sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Width of the area the integrated pointer is clamped to (pixels).
    pub desktop_width: u32,

    /// Height of the area the integrated pointer is clamped to (pixels).
    pub desktop_height: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "glide=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 30,
            alpha: 0.1,
            adaptive: None,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            desktop_width: 1920,
            desktop_height: 1080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl SamplerConfig {
    /// Check ranges before the values reach the sampling loop.
    pub fn validate(&self) -> GlideResult<()> {
        if self.interval_ms == 0 {
            return Err(GlideError::config("sampler.interval_ms must be positive"));
        }
        check_unit_interval("sampler.alpha", self.alpha)?;

        if let Some(adaptive) = &self.adaptive {
            if !adaptive.threshold_px.is_finite() || adaptive.threshold_px < 0.0 {
                return Err(GlideError::config(format!(
                    "sampler.adaptive.threshold_px must be a non-negative number, got {}",
                    adaptive.threshold_px
                )));
            }
            check_unit_interval("sampler.adaptive.jitter_alpha", adaptive.jitter_alpha)?;
            check_unit_interval("sampler.adaptive.jump_alpha", adaptive.jump_alpha)?;
        }
        Ok(())
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.interval_ms)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                    Ok(config) => match config.validate() {
                        Ok(()) => return config,
                        Err(e) => {
                            tracing::warn!("Ignoring invalid config at {:?}: {}", config_path, e);
                        }
                    },
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    pub fn validate(&self) -> GlideResult<()> {
        self.sampler.validate()?;
        if self.source.desktop_width == 0 || self.source.desktop_height == 0 {
            return Err(GlideError::config("source desktop size must be non-zero"));
        }
        Ok(())
    }
}

fn check_unit_interval(name: &str, value: f64) -> GlideResult<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(GlideError::config(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("glide").join("config.json")
}
