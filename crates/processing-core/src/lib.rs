//! Glide Processing Core
//!
//! Turns raw pointer samples into smoothed ones:
//! - **EMA:** single-axis exponential moving average with a validated factor
//! - **Alpha policy:** maps per-tick movement distance to a smoothing factor
//! - **Cursor smoothing:** two filters plus a policy, applied to 2D samples
//!
//! This crate is pure computation: no I/O, no threads, no clocks.

pub mod alpha_policy;
pub mod cursor_smooth;
pub mod ema;

pub use alpha_policy::AlphaPolicy;
pub use cursor_smooth::{smooth_samples, PointSmoother, SmoothedPoint};
pub use ema::{Alpha, SmoothingFilter};
