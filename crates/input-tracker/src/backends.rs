//! Position source implementations.
//!
//! Each source provides a different way to read the current pointer
//! position. Platform sources live in per-OS submodules; the scripted
//! source works everywhere and backs tests and replays.

use glide_common::error::{GlideError, GlideResult};
use glide_sample_model::Sample;

use crate::PositionSource;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod non_linux;

#[cfg(target_os = "linux")]
pub use linux::{detect_best_source, MiceDeviceSource};
#[cfg(not(target_os = "linux"))]
pub use non_linux::detect_best_source;

/// Name reported by the fallback source that never moves.
pub const STATIONARY_SOURCE: &str = "stationary";

/// One step of a scripted position stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Report this position.
    Position(Sample),
    /// Fail the read with an acquisition error carrying this message.
    Fail(String),
}

/// Replays a fixed list of positions and failures.
///
/// Once the script is exhausted the last reported position is held, so a
/// sampling loop can keep running on it.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    steps: Vec<ScriptStep>,
    index: usize,
    last: Sample,
    name: &'static str,
}

impl ScriptedSource {
    /// Create a scripted source from explicit steps.
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            index: 0,
            last: Sample::default(),
            name: "scripted",
        }
    }

    /// Create a source that reports the given positions in order.
    pub fn from_positions(positions: impl IntoIterator<Item = Sample>) -> Self {
        Self::new(positions.into_iter().map(ScriptStep::Position).collect())
    }

    /// Create a source that never moves.
    pub fn stationary(position: Sample) -> Self {
        Self {
            name: STATIONARY_SOURCE,
            ..Self::from_positions([position])
        }
    }

    /// Number of reads served so far, failures included.
    pub fn reads(&self) -> usize {
        self.index
    }
}

impl PositionSource for ScriptedSource {
    fn current_position(&mut self) -> GlideResult<Sample> {
        let step = self.steps.get(self.index).cloned();
        self.index += 1;
        match step {
            Some(ScriptStep::Position(sample)) => {
                self.last = sample;
                Ok(sample)
            }
            Some(ScriptStep::Fail(message)) => Err(GlideError::acquisition(message)),
            None => Ok(self.last),
        }
    }

    fn name(&self) -> &str {
        self.name
    }

    fn is_available(&self) -> bool {
        true
    }
}
