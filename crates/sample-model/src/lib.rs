//! Glide Sample Model
//!
//! Defines the data contracts that flow through the smoothing pipeline:
//! - **Sample:** one integer pointer position in pixels
//! - **TimestampedSample:** a filtered position stamped with the UTC instant
//!   of the tick that produced it
//!
//! Samples are exchanged as JSONL, one object per line.

pub mod sample;

pub use sample::*;
