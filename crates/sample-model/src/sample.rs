//! Pointer sample types for the Glide stream.
//!
//! Coordinates are absolute pixels in the desktop space of whatever
//! position source produced them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pointer position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Sample {
    pub x: i32,
    pub y: i32,
}

impl Sample {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert a filtered floating-point position to pixels.
    ///
    /// Truncates toward zero and saturates at the `i32` range.
    pub fn from_filtered(x: f64, y: f64) -> Self {
        Self {
            x: x as i32,
            y: y as i32,
        }
    }

    /// Position as floating-point coordinates.
    pub fn as_f64(&self) -> (f64, f64) {
        (self.x as f64, self.y as f64)
    }
}

/// A sample stamped with the UTC instant of the tick that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampedSample {
    #[serde(flatten)]
    pub value: Sample,

    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
}

impl TimestampedSample {
    pub fn new(value: Sample, timestamp: DateTime<Utc>) -> Self {
        Self { value, timestamp }
    }

    /// Serialize as a single JSONL line (without the trailing newline).
    pub fn to_jsonl_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Parse samples from JSONL content (one JSON object per line).
///
/// Blank lines and `#` comment lines are skipped.
pub fn parse_samples(jsonl: &str) -> Result<Vec<TimestampedSample>, serde_json::Error> {
    jsonl
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}

/// Serialize samples to JSONL format.
pub fn serialize_samples(samples: &[TimestampedSample]) -> Result<String, serde_json::Error> {
    let mut output = String::new();
    for sample in samples {
        output.push_str(&sample.to_jsonl_line()?);
        output.push('\n');
    }
    Ok(output)
}
