//! Single-axis exponential moving average.

use serde::{Deserialize, Serialize};

use glide_common::error::{GlideError, GlideResult};

/// A smoothing factor in `(0, 1]`.
///
/// Larger values follow the input more closely; smaller values smooth harder
/// and lag more. `1.0` disables smoothing.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Alpha(f64);

impl Alpha {
    /// Pass-through: every output equals its input.
    pub const ONE: Alpha = Alpha(1.0);

    /// Factor the sampler ships with.
    pub const DEFAULT: Alpha = Alpha(0.1);

    /// Validate a raw factor. Anything outside `(0, 1]`, NaN included, is rejected.
    pub fn new(value: f64) -> GlideResult<Self> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(GlideError::contract_violation(format!(
                "smoothing factor must be in (0, 1], got {value}"
            )))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Alpha {
    type Error = GlideError;

    fn try_from(value: f64) -> GlideResult<Self> {
        Self::new(value)
    }
}

impl From<Alpha> for f64 {
    fn from(alpha: Alpha) -> f64 {
        alpha.0
    }
}

/// Recursive EMA over one axis.
///
/// The first value seeds the state and is returned unchanged, so there is no
/// startup transient toward zero. Every later output blends the new input
/// with the previous *output*.
#[derive(Debug, Clone, Default)]
pub struct SmoothingFilter {
    last_value: Option<f64>,
}

impl SmoothingFilter {
    pub fn new() -> Self {
        Self { last_value: None }
    }

    /// Feed one value and return the smoothed output.
    pub fn filter(&mut self, value: f64, alpha: Alpha) -> f64 {
        let next = match self.last_value {
            None => value,
            Some(last) => alpha.get() * value + (1.0 - alpha.get()) * last,
        };
        self.last_value = Some(next);
        next
    }

    /// Most recent output, if any value has been filtered yet.
    pub fn last_value(&self) -> Option<f64> {
        self.last_value
    }

    /// Forget history; the next call re-seeds.
    pub fn reset(&mut self) {
        self.last_value = None;
    }
}
