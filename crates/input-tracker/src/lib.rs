//! Glide Input Tracker
//!
//! Polls a pointer position source on a dedicated thread, smooths every
//! sample with a two-axis EMA, and publishes timestamped points to
//! subscribers. Sampling runs only while at least one subscriber is
//! registered.
//!
//! Position sources are pluggable:
//!
//! - **Mice device:** `/dev/input/mice` relative motion (Linux, requires privileges)
//! - **Scripted:** fixed positions and failures (tests, replays)

pub mod backends;
pub mod sampler;

use glide_common::error::GlideResult;
use glide_sample_model::Sample;

pub use sampler::{LoopState, SampleLoop, SubscriptionId, DEFAULT_INTERVAL};

/// Trait for pointer position sources.
pub trait PositionSource: Send {
    /// Read the current pointer position.
    fn current_position(&mut self) -> GlideResult<Sample>;

    /// Source name for logging.
    fn name(&self) -> &str;

    /// Check if the source is usable on this system.
    fn is_available(&self) -> bool;
}
