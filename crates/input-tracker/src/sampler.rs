//! Subscriber-driven sampling loop.
//!
//! A [`SampleLoop`] owns a position source, a clock and a [`PointSmoother`].
//! While at least one subscriber is registered, a dedicated thread ticks at
//! a fixed interval: timestamp, read the raw position, smooth it, and hand
//! the result to every subscriber in registration order.
//!
//! One mutex guards the tick body together with the subscriber set, so a
//! subscriber is never called after [`SampleLoop::unsubscribe`] returns and
//! ticks never overlap. The cost is that callbacks run on the producer
//! thread with the lock held: a slow callback slows sampling, and callbacks
//! must not call back into the same loop.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use glide_common::clock::{Clock, SystemClock};
use glide_common::config::SamplerConfig;
use glide_common::error::{GlideError, GlideResult};
use glide_processing_core::{AlphaPolicy, PointSmoother};
use glide_sample_model::TimestampedSample;

use crate::PositionSource;

/// Sleep between ticks unless configured otherwise (~33 Hz).
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(30);

type SampleCallback = Box<dyn FnMut(&TimestampedSample) + Send>;
type ErrorCallback = Box<dyn FnMut(&GlideError) + Send>;

/// Handle returned by [`SampleLoop::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Whether the producer thread is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// No subscribers, no producer thread.
    Idle,
    /// Producer thread ticking.
    Polling,
}

/// Polls a position source and publishes smoothed, timestamped samples.
pub struct SampleLoop {
    shared: Arc<Shared>,
}

struct Shared {
    inner: Mutex<Inner>,
    interval: Duration,
    ticks: AtomicU64,
    worker_starts: AtomicU64,
    live_workers: AtomicUsize,
}

struct Inner {
    source: Box<dyn PositionSource>,
    clock: Box<dyn Clock>,
    smoother: PointSmoother,
    subscribers: Vec<(SubscriptionId, SampleCallback)>,
    error_observers: Vec<ErrorCallback>,
    next_id: u64,
    worker: Option<Worker>,
    /// Threads asked to stop that may still be finishing their last tick.
    retired: Vec<JoinHandle<()>>,
    disposed: bool,
}

struct Worker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl SampleLoop {
    /// Create a loop with an explicit policy and tick interval.
    pub fn new(
        source: Box<dyn PositionSource>,
        clock: Box<dyn Clock>,
        policy: AlphaPolicy,
        interval: Duration,
    ) -> GlideResult<Self> {
        if interval.is_zero() {
            return Err(GlideError::contract_violation(
                "sample loop interval must be non-zero",
            ));
        }
        Ok(Self::build(source, clock, policy, interval))
    }

    /// Create a loop from sampler configuration.
    pub fn from_config(
        source: Box<dyn PositionSource>,
        clock: Box<dyn Clock>,
        config: &SamplerConfig,
    ) -> GlideResult<Self> {
        config.validate()?;
        let policy = AlphaPolicy::from_config(config)?;
        Self::new(source, clock, policy, config.interval())
    }

    /// Create a loop with the detected system clock, fixed alpha 0.1 and a 30 ms interval.
    pub fn with_defaults(source: Box<dyn PositionSource>) -> Self {
        Self::build(
            source,
            Box::new(SystemClock::detect()),
            AlphaPolicy::default(),
            DEFAULT_INTERVAL,
        )
    }

    fn build(
        source: Box<dyn PositionSource>,
        clock: Box<dyn Clock>,
        policy: AlphaPolicy,
        interval: Duration,
    ) -> Self {
        tracing::debug!(
            source = %source.name(),
            clock = %clock.name(),
            interval_ms = interval.as_millis() as u64,
            ?policy,
            "Sample loop created"
        );
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    source,
                    clock,
                    smoother: PointSmoother::new(policy),
                    subscribers: Vec::new(),
                    error_observers: Vec::new(),
                    next_id: 0,
                    worker: None,
                    retired: Vec::new(),
                    disposed: false,
                }),
                interval,
                ticks: AtomicU64::new(0),
                worker_starts: AtomicU64::new(0),
                live_workers: AtomicUsize::new(0),
            }),
        }
    }

    /// Register a consumer of smoothed samples.
    ///
    /// The first subscriber starts the producer thread.
    pub fn subscribe<F>(&self, callback: F) -> GlideResult<SubscriptionId>
    where
        F: FnMut(&TimestampedSample) + Send + 'static,
    {
        let mut inner = self.shared.lock();
        if inner.disposed {
            return Err(GlideError::contract_violation(
                "subscribe called on a disposed sample loop",
            ));
        }

        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscribers.push((id, Box::new(callback)));

        if inner.subscribers.len() == 1 {
            if let Err(e) = self.start_worker(&mut inner) {
                inner.subscribers.pop();
                return Err(e);
            }
        }

        tracing::debug!(
            subscription = id.0,
            subscribers = inner.subscribers.len(),
            "Subscriber added"
        );
        Ok(id)
    }

    /// Remove a consumer. Returns `false` if the handle is unknown.
    ///
    /// Removing the last subscriber asks the producer thread to stop; it
    /// exits before its next tick.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.shared.lock();
        let Some(pos) = inner.subscribers.iter().position(|(sid, _)| *sid == id) else {
            return false;
        };
        inner.subscribers.remove(pos);

        if inner.subscribers.is_empty() {
            inner.stop_worker();
        }

        tracing::debug!(
            subscription = id.0,
            subscribers = inner.subscribers.len(),
            "Subscriber removed"
        );
        true
    }

    /// Register an observer for ticks that fail to acquire a sample.
    ///
    /// Observers run on the producer thread, under the same lock as subscribers.
    pub fn on_error<F>(&self, callback: F) -> GlideResult<()>
    where
        F: FnMut(&GlideError) + Send + 'static,
    {
        let mut inner = self.shared.lock();
        if inner.disposed {
            return Err(GlideError::contract_violation(
                "on_error called on a disposed sample loop",
            ));
        }
        inner.error_observers.push(Box::new(callback));
        Ok(())
    }

    /// Replace the alpha policy. Takes effect from the next tick; filter history is kept.
    pub fn set_policy(&self, policy: AlphaPolicy) {
        self.shared.lock().smoother.set_policy(policy);
    }

    pub fn policy(&self) -> AlphaPolicy {
        self.shared.lock().smoother.policy()
    }

    /// Stop sampling, drop all callbacks and wait for the producer thread.
    ///
    /// Idempotent. Later `subscribe`/`on_error` calls are rejected.
    pub fn dispose(&self) {
        let handles = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                return;
            }
            inner.disposed = true;
            inner.stop_worker();
            inner.subscribers.clear();
            inner.error_observers.clear();
            std::mem::take(&mut inner.retired)
        };

        let current = std::thread::current().id();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::warn!("Sampler thread panicked before shutdown");
            }
        }
        tracing::debug!("Sample loop disposed");
    }

    pub fn state(&self) -> LoopState {
        if self.shared.lock().worker.is_some() {
            LoopState::Polling
        } else {
            LoopState::Idle
        }
    }

    pub fn is_polling(&self) -> bool {
        self.state() == LoopState::Polling
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// Ticks completed so far, failed ones included.
    pub fn ticks(&self) -> u64 {
        self.shared.ticks.load(Ordering::SeqCst)
    }

    /// How many producer threads have been started over the loop's lifetime.
    pub fn worker_starts(&self) -> u64 {
        self.shared.worker_starts.load(Ordering::SeqCst)
    }

    /// Producer threads that have not exited yet, including stopping ones.
    pub fn live_workers(&self) -> usize {
        self.shared.live_workers.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    fn start_worker(&self, inner: &mut Inner) -> GlideResult<()> {
        inner.retired.retain(|handle| !handle.is_finished());

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let shared = Arc::clone(&self.shared);

        self.shared.live_workers.fetch_add(1, Ordering::SeqCst);
        let spawned = std::thread::Builder::new()
            .name("glide-sampler".to_string())
            .spawn(move || run(shared, thread_stop));

        match spawned {
            Ok(handle) => {
                inner.worker = Some(Worker { stop, handle });
                self.shared.worker_starts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.shared.live_workers.fetch_sub(1, Ordering::SeqCst);
                tracing::error!(error = %e, "Failed to spawn sampler thread");
                Err(GlideError::Io(e))
            }
        }
    }
}

impl Drop for SampleLoop {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Callbacks run under catch_unwind, so poisoning only means a panic
        // escaped elsewhere; the state itself stays consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop.store(true, Ordering::SeqCst);
            self.retired.push(worker.handle);
            tracing::debug!("Sampler stop requested");
        }
    }

    fn tick(&mut self) {
        // A panicking source or clock is a failed tick, not a dead producer.
        let acquired = catch_unwind(AssertUnwindSafe(|| self.acquire()))
            .unwrap_or_else(|payload| {
                Err(GlideError::acquisition(format!(
                    "sample acquisition panicked: {}",
                    panic_message(payload.as_ref())
                )))
            });
        match acquired {
            Ok(sample) => self.publish(&sample),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    source = %self.source.name(),
                    "Sample acquisition failed"
                );
                self.report(&err);
            }
        }
    }

    fn acquire(&mut self) -> GlideResult<TimestampedSample> {
        let timestamp = self.clock.now_utc()?;
        let raw = self.source.current_position()?;
        let point = self.smoother.update(raw);

        tracing::trace!(
            raw_x = raw.x,
            raw_y = raw.y,
            x = point.x,
            y = point.y,
            distance_px = point.distance_px,
            alpha = point.alpha.get(),
            "Sample smoothed"
        );

        Ok(TimestampedSample::new(point.to_sample(), timestamp))
    }

    fn publish(&mut self, sample: &TimestampedSample) {
        let mut panicked = Vec::new();
        for (id, callback) in self.subscribers.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| callback(sample))).is_err() {
                panicked.push(*id);
            }
        }

        for id in panicked {
            tracing::error!(subscription = id.0, "Subscriber panicked");
            self.report(&GlideError::Other(anyhow::anyhow!(
                "subscriber {} panicked while handling a sample",
                id.0
            )));
        }
    }

    fn report(&mut self, err: &GlideError) {
        for observer in self.error_observers.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| observer(err))).is_err() {
                tracing::error!(error = %err, "Error observer panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Producer thread body.
fn run(shared: Arc<Shared>, stop: Arc<AtomicBool>) {
    let _live = LiveWorker(&shared.live_workers);
    tracing::info!(
        interval_ms = shared.interval.as_millis() as u64,
        "Sampler started"
    );

    let mut ticks = 0u64;
    while !stop.load(Ordering::SeqCst) {
        {
            let mut inner = shared.lock();
            // Stop may have been requested while this thread waited for the lock.
            if stop.load(Ordering::SeqCst) {
                break;
            }
            inner.tick();
            shared.ticks.fetch_add(1, Ordering::SeqCst);
        }
        ticks += 1;
        std::thread::sleep(shared.interval);
    }

    tracing::info!(ticks, "Sampler stopped");
}

/// Decrements the live-worker count when the producer thread exits.
struct LiveWorker<'a>(&'a AtomicUsize);

impl Drop for LiveWorker<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ScriptedSource;
    use glide_sample_model::Sample;

    fn idle_loop() -> SampleLoop {
        SampleLoop::new(
            Box::new(ScriptedSource::stationary(Sample::new(1, 1))),
            Box::new(SystemClock::precise()),
            AlphaPolicy::default(),
            Duration::from_millis(5),
        )
        .unwrap()
    }

    #[test]
    fn test_new_loop_is_idle() {
        let sampler = idle_loop();
        assert_eq!(sampler.state(), LoopState::Idle);
        assert_eq!(sampler.subscriber_count(), 0);
        assert_eq!(sampler.worker_starts(), 0);
        assert_eq!(sampler.live_workers(), 0);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = SampleLoop::new(
            Box::new(ScriptedSource::stationary(Sample::default())),
            Box::new(SystemClock::coarse()),
            AlphaPolicy::default(),
            Duration::ZERO,
        );
        assert!(result.err().unwrap().is_contract_violation());
    }

    #[test]
    fn test_from_config_rejects_invalid_alpha() {
        let config = SamplerConfig {
            alpha: 1.5,
            ..Default::default()
        };
        let result = SampleLoop::from_config(
            Box::new(ScriptedSource::stationary(Sample::default())),
            Box::new(SystemClock::coarse()),
            &config,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_handle_is_ignored() {
        let sampler = idle_loop();
        assert!(!sampler.unsubscribe(SubscriptionId(42)));
    }

    #[test]
    fn test_double_unsubscribe_returns_false() {
        let sampler = idle_loop();
        let id = sampler.subscribe(|_| {}).unwrap();
        assert!(sampler.unsubscribe(id));
        assert!(!sampler.unsubscribe(id));
        assert_eq!(sampler.state(), LoopState::Idle);
    }

    #[test]
    fn test_disposed_loop_rejects_registration() {
        let sampler = idle_loop();
        sampler.dispose();
        sampler.dispose();
        assert!(sampler.is_disposed());

        let err = sampler.subscribe(|_| {}).unwrap_err();
        assert!(err.is_contract_violation());
        assert!(sampler.on_error(|_| {}).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_set_policy_is_visible() {
        let sampler = idle_loop();
        let policy = AlphaPolicy::threshold(5.0, 0.2, 0.9).unwrap();
        sampler.set_policy(policy);
        assert_eq!(sampler.policy(), policy);
    }
}
