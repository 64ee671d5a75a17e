//! Non-Linux position source selection.

use glide_common::config::SourceConfig;
use glide_sample_model::Sample;

use super::ScriptedSource;
use crate::PositionSource;

pub fn detect_best_source(config: &SourceConfig) -> Box<dyn PositionSource> {
    tracing::warn!(
        "Pointer position sources for this platform are not implemented yet; using stationary source"
    );
    Box::new(ScriptedSource::stationary(Sample::new(
        (config.desktop_width / 2) as i32,
        (config.desktop_height / 2) as i32,
    )))
}
