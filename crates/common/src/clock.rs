//! Clock capabilities for timestamping samples.
//!
//! Every published sample carries a UTC instant taken at the start of its
//! tick. Two capabilities exist:
//! - **Precise:** a wall-clock anchor advanced by a monotonic [`Instant`],
//!   so timestamps never go backwards and keep sub-microsecond resolution.
//! - **Coarse:** the system wall clock truncated to milliseconds.
//!
//! [`SystemClock::detect`] probes the platform once and picks the best one.
//! Falling back to the coarse clock is not an error.

use std::time::Instant;

use chrono::{DateTime, SubsecRound, Utc};

use crate::error::{GlideError, GlideResult};

/// Source of UTC timestamps for the sampling loop.
pub trait Clock: Send {
    /// Current UTC instant at the best resolution this clock offers.
    fn now_utc(&self) -> GlideResult<DateTime<Utc>>;

    /// Clock name for logging.
    fn name(&self) -> &str;
}

/// Which clock capability was selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCapability {
    Precise,
    Coarse,
}

/// Wall-clock anchor plus the monotonic instant it was taken at.
#[derive(Debug, Clone)]
pub struct AnchoredClock {
    epoch: Instant,
    epoch_wall: DateTime<Utc>,
}

impl AnchoredClock {
    /// Create a clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: Utc::now(),
        }
    }

    fn now(&self) -> GlideResult<DateTime<Utc>> {
        let elapsed = chrono::Duration::from_std(self.epoch.elapsed())
            .map_err(|e| GlideError::acquisition(format!("Clock elapsed out of range: {e}")))?;
        self.epoch_wall
            .checked_add_signed(elapsed)
            .ok_or_else(|| GlideError::acquisition("Clock overflowed while advancing anchor"))
    }
}

/// The platform clock, in whichever capability the probe selected.
#[derive(Debug, Clone)]
pub enum SystemClock {
    Precise(AnchoredClock),
    Coarse,
}

impl SystemClock {
    /// Probe the platform and pick the precise clock when it is usable.
    pub fn detect() -> Self {
        if precise_clock_supported() {
            Self::precise()
        } else {
            tracing::debug!("High-resolution clock unavailable, using coarse wall clock");
            Self::coarse()
        }
    }

    pub fn precise() -> Self {
        Self::Precise(AnchoredClock::start())
    }

    pub fn coarse() -> Self {
        Self::Coarse
    }

    pub fn capability(&self) -> ClockCapability {
        match self {
            Self::Precise(_) => ClockCapability::Precise,
            Self::Coarse => ClockCapability::Coarse,
        }
    }
}

impl Clock for SystemClock {
    fn now_utc(&self) -> GlideResult<DateTime<Utc>> {
        match self {
            Self::Precise(anchor) => anchor.now(),
            Self::Coarse => Ok(Utc::now().trunc_subsecs(3)),
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Precise(_) => "precise",
            Self::Coarse => "coarse",
        }
    }
}

#[cfg(unix)]
fn precise_clock_supported() -> bool {
    /// Resolution the monotonic clock must offer to count as high-resolution.
    const PRECISE_RESOLUTION_NS: i64 = 1_000;

    let mut res = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // SAFETY: `res` is a valid, writable timespec for the duration of the call.
    let rc = unsafe { libc::clock_getres(libc::CLOCK_MONOTONIC, &mut res) };
    rc == 0 && res.tv_sec == 0 && (res.tv_nsec as i64) <= PRECISE_RESOLUTION_NS
}

#[cfg(not(unix))]
fn precise_clock_supported() -> bool {
    // Instant is backed by QueryPerformanceCounter / mach_absolute_time.
    true
}
