//! Distance-driven smoothing factor selection.
//!
//! The sampler measures how far each raw sample lies from the previous
//! filtered position. A policy maps that distance to the alpha used for the
//! tick: large jumps should follow quickly, small jitter should be smoothed
//! harder.

use serde::{Deserialize, Serialize};

use glide_common::config::SamplerConfig;
use glide_common::error::{GlideError, GlideResult};

use crate::ema::Alpha;

/// Maps a per-tick movement distance (pixels) to a smoothing factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", try_from = "RawAlphaPolicy")]
pub enum AlphaPolicy {
    /// Same factor every tick; the distance is ignored.
    Fixed { alpha: Alpha },

    /// `jump` when the distance is strictly above `threshold_px`, else `jitter`.
    Threshold {
        threshold_px: f64,
        jitter: Alpha,
        jump: Alpha,
    },
}

/// Unchecked wire form; deserialization goes through the validating constructors.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawAlphaPolicy {
    Fixed {
        alpha: f64,
    },
    Threshold {
        threshold_px: f64,
        jitter: f64,
        jump: f64,
    },
}

impl TryFrom<RawAlphaPolicy> for AlphaPolicy {
    type Error = GlideError;

    fn try_from(raw: RawAlphaPolicy) -> GlideResult<Self> {
        match raw {
            RawAlphaPolicy::Fixed { alpha } => Self::fixed(alpha),
            RawAlphaPolicy::Threshold {
                threshold_px,
                jitter,
                jump,
            } => Self::threshold(threshold_px, jitter, jump),
        }
    }
}

impl Default for AlphaPolicy {
    fn default() -> Self {
        Self::Fixed {
            alpha: Alpha::DEFAULT,
        }
    }
}

impl AlphaPolicy {
    pub fn fixed(alpha: f64) -> GlideResult<Self> {
        Ok(Self::Fixed {
            alpha: Alpha::new(alpha)?,
        })
    }

    pub fn threshold(threshold_px: f64, jitter: f64, jump: f64) -> GlideResult<Self> {
        if !threshold_px.is_finite() || threshold_px < 0.0 {
            return Err(GlideError::contract_violation(format!(
                "alpha threshold must be a non-negative distance, got {threshold_px}"
            )));
        }
        Ok(Self::Threshold {
            threshold_px,
            jitter: Alpha::new(jitter)?,
            jump: Alpha::new(jump)?,
        })
    }

    /// Build the policy described by a sampler configuration.
    pub fn from_config(config: &SamplerConfig) -> GlideResult<Self> {
        match &config.adaptive {
            Some(adaptive) => Self::threshold(
                adaptive.threshold_px,
                adaptive.jitter_alpha,
                adaptive.jump_alpha,
            ),
            None => Self::fixed(config.alpha),
        }
    }

    /// Factor to use for a tick whose raw sample moved `distance_px`.
    pub fn alpha_for(&self, distance_px: f64) -> Alpha {
        match *self {
            Self::Fixed { alpha } => alpha,
            Self::Threshold {
                threshold_px,
                jitter,
                jump,
            } => {
                if distance_px > threshold_px {
                    jump
                } else {
                    jitter
                }
            }
        }
    }
}
