//! Two-axis cursor smoothing.
//!
//! Composes one [`SmoothingFilter`] per axis with an [`AlphaPolicy`]. Each
//! update measures the distance from the raw sample to the previous
//! *filtered* position, asks the policy for a factor, and feeds both axes
//! with that factor.

use glide_sample_model::{Sample, TimestampedSample};

use crate::alpha_policy::AlphaPolicy;
use crate::ema::{Alpha, SmoothingFilter};

/// Result of smoothing one raw sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPoint {
    pub x: f64,
    pub y: f64,
    /// Distance from the raw sample to the previous filtered position.
    pub distance_px: f64,
    /// Factor the policy chose for this update.
    pub alpha: Alpha,
}

impl SmoothedPoint {
    /// Pixel position as published to subscribers.
    pub fn to_sample(&self) -> Sample {
        Sample::from_filtered(self.x, self.y)
    }
}

/// Stateful 2D EMA smoother.
#[derive(Debug, Clone, Default)]
pub struct PointSmoother {
    x: SmoothingFilter,
    y: SmoothingFilter,
    policy: AlphaPolicy,
    last_position: Option<(f64, f64)>,
}

impl PointSmoother {
    /// Create a smoother with the given policy.
    pub fn new(policy: AlphaPolicy) -> Self {
        Self {
            x: SmoothingFilter::new(),
            y: SmoothingFilter::new(),
            policy,
            last_position: None,
        }
    }

    /// Smooth one raw sample.
    pub fn update(&mut self, raw: Sample) -> SmoothedPoint {
        let (raw_x, raw_y) = raw.as_f64();
        let distance_px = self
            .last_position
            .map(|(lx, ly)| distance(raw_x, raw_y, lx, ly))
            .unwrap_or(0.0);

        let alpha = self.policy.alpha_for(distance_px);
        let x = self.x.filter(raw_x, alpha);
        let y = self.y.filter(raw_y, alpha);
        self.last_position = Some((x, y));

        SmoothedPoint {
            x,
            y,
            distance_px,
            alpha,
        }
    }

    /// Last filtered position, if any sample has been smoothed.
    pub fn last_position(&self) -> Option<(f64, f64)> {
        self.last_position
    }

    pub fn policy(&self) -> AlphaPolicy {
        self.policy
    }

    /// Swap the policy; filter history is kept.
    pub fn set_policy(&mut self, policy: AlphaPolicy) {
        self.policy = policy;
    }

    /// Forget history on both axes.
    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.last_position = None;
    }
}

/// Smooth a recorded stream, keeping each sample's timestamp.
pub fn smooth_samples(raw: &[TimestampedSample], policy: AlphaPolicy) -> Vec<TimestampedSample> {
    let mut smoother = PointSmoother::new(policy);
    let smoothed: Vec<TimestampedSample> = raw
        .iter()
        .map(|s| TimestampedSample::new(smoother.update(s.value).to_sample(), s.timestamp))
        .collect();
    tracing::debug!(samples = smoothed.len(), ?policy, "Smoothed sample stream");
    smoothed
}

fn distance(x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    (x0 - x1).hypot(y0 - y1)
}
