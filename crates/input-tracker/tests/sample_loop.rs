use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeZone, Utc};
use glide_common::clock::{Clock, SystemClock};
use glide_common::error::{GlideError, GlideResult};
use glide_input_tracker::backends::{ScriptStep, ScriptedSource};
use glide_common::config::{AdaptiveAlphaConfig, SamplerConfig};
use glide_input_tracker::{LoopState, PositionSource, SampleLoop, SubscriptionId, DEFAULT_INTERVAL};
use glide_processing_core::AlphaPolicy;
use glide_sample_model::{Sample, TimestampedSample};

const FAST: Duration = Duration::from_millis(2);
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Advances 30 ms per reading, starting at a fixed instant.
struct StepClock {
    next_ms: AtomicI64,
}

impl StepClock {
    fn new() -> Self {
        Self {
            next_ms: AtomicI64::new(1_700_000_000_000),
        }
    }
}

impl Clock for StepClock {
    fn now_utc(&self) -> GlideResult<DateTime<Utc>> {
        let ms = self.next_ms.fetch_add(30, Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| GlideError::acquisition("step clock out of range"))
    }

    fn name(&self) -> &str {
        "step"
    }
}

struct BrokenClock;

impl Clock for BrokenClock {
    fn now_utc(&self) -> GlideResult<DateTime<Utc>> {
        Err(GlideError::acquisition("clock unavailable"))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Reports a fixed position but panics on one chosen read.
struct FaultyDriver {
    reads: usize,
    panic_on: usize,
}

impl PositionSource for FaultyDriver {
    fn current_position(&mut self) -> GlideResult<Sample> {
        self.reads += 1;
        if self.reads == self.panic_on {
            panic!("driver bug");
        }
        Ok(Sample::new(self.reads as i32, 0))
    }

    fn name(&self) -> &str {
        "faulty"
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn build_loop(source: ScriptedSource, alpha: f64, interval: Duration) -> SampleLoop {
    SampleLoop::new(
        Box::new(source),
        Box::new(StepClock::new()),
        AlphaPolicy::fixed(alpha).unwrap(),
        interval,
    )
    .unwrap()
}

fn positions(points: &[(i32, i32)]) -> ScriptedSource {
    ScriptedSource::from_positions(points.iter().map(|&(x, y)| Sample::new(x, y)))
}

fn channel_subscriber(sampler: &SampleLoop) -> (SubscriptionId, Receiver<TimestampedSample>) {
    let (tx, rx) = mpsc::channel();
    let id = sampler
        .subscribe(move |sample| {
            let _ = tx.send(*sample);
        })
        .unwrap();
    (id, rx)
}

fn take(rx: &Receiver<TimestampedSample>, n: usize) -> Vec<TimestampedSample> {
    (0..n)
        .map(|_| rx.recv_timeout(RECV_TIMEOUT).expect("sample should arrive"))
        .collect()
}

fn wait_until(deadline: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}

#[test]
fn ema_step_response_is_published() {
    init_tracing();
    let sampler = build_loop(positions(&[(0, 0), (10, 0), (10, 0), (10, 0)]), 0.5, FAST);
    let (id, rx) = channel_subscriber(&sampler);

    let samples = take(&rx, 4);
    sampler.unsubscribe(id);

    let xs: Vec<i32> = samples.iter().map(|s| s.value.x).collect();
    // Filtered 0, 5, 7.5, 8.75 truncated to pixels.
    assert_eq!(xs, vec![0, 5, 7, 8]);
    assert!(samples.iter().all(|s| s.value.y == 0));

    for pair in samples.windows(2) {
        assert_eq!(pair[1].timestamp - pair[0].timestamp, chrono::Duration::milliseconds(30));
    }
}

#[test]
fn two_subscribers_share_one_producer() {
    init_tracing();
    let sampler = build_loop(positions(&[(5, 5)]), 0.1, DEFAULT_INTERVAL);

    let (first, rx_first) = channel_subscriber(&sampler);
    let (second, rx_second) = channel_subscriber(&sampler);
    assert_eq!(sampler.worker_starts(), 1);
    assert_eq!(sampler.live_workers(), 1);
    assert_eq!(sampler.state(), LoopState::Polling);

    take(&rx_first, 1);
    take(&rx_second, 1);

    assert!(sampler.unsubscribe(first));
    assert!(sampler.is_polling());
    let ticks = sampler.ticks();
    take(&rx_second, 2);
    assert!(sampler.ticks() > ticks);

    assert!(sampler.unsubscribe(second));
    assert_eq!(sampler.state(), LoopState::Idle);
    assert!(
        wait_until(Duration::from_millis(250), || sampler.live_workers() == 0),
        "producer thread should exit within a tick"
    );
    assert_eq!(sampler.worker_starts(), 1);

    let ticks = sampler.ticks();
    std::thread::sleep(DEFAULT_INTERVAL * 3);
    assert_eq!(sampler.ticks(), ticks);
}

#[test]
fn failed_tick_is_reported_and_skipped() {
    init_tracing();
    let source = ScriptedSource::new(vec![
        ScriptStep::Position(Sample::new(1, 1)),
        ScriptStep::Position(Sample::new(2, 2)),
        ScriptStep::Position(Sample::new(3, 3)),
        ScriptStep::Position(Sample::new(4, 4)),
        ScriptStep::Fail("cursor read failed".to_string()),
        ScriptStep::Position(Sample::new(6, 6)),
        ScriptStep::Position(Sample::new(7, 7)),
    ]);
    let sampler = build_loop(source, 1.0, FAST);

    let errors: Arc<Mutex<Vec<(bool, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    sampler
        .on_error(move |err| {
            sink.lock()
                .unwrap()
                .push((err.is_acquisition(), err.to_string()));
        })
        .unwrap();

    let (id, rx) = channel_subscriber(&sampler);
    let samples = take(&rx, 6);
    sampler.unsubscribe(id);

    let values: Vec<Sample> = samples.iter().map(|s| s.value).collect();
    assert_eq!(
        values,
        vec![
            Sample::new(1, 1),
            Sample::new(2, 2),
            Sample::new(3, 3),
            Sample::new(4, 4),
            Sample::new(6, 6),
            Sample::new(7, 7),
        ]
    );

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].0);
    assert!(errors[0].1.contains("cursor read failed"));
}

#[test]
fn panicking_source_is_reported_and_sampling_continues() {
    init_tracing();
    let sampler = SampleLoop::new(
        Box::new(FaultyDriver {
            reads: 0,
            panic_on: 3,
        }),
        Box::new(StepClock::new()),
        AlphaPolicy::fixed(1.0).unwrap(),
        FAST,
    )
    .unwrap();

    let errors: Arc<Mutex<Vec<(bool, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&errors);
    sampler
        .on_error(move |err| {
            sink.lock()
                .unwrap()
                .push((err.is_acquisition(), err.to_string()));
        })
        .unwrap();

    let (id, rx) = channel_subscriber(&sampler);
    let samples = take(&rx, 4);

    let xs: Vec<i32> = samples.iter().map(|s| s.value.x).collect();
    assert_eq!(xs, vec![1, 2, 4, 5]);
    assert_eq!(sampler.live_workers(), 1);
    assert!(sampler.is_polling());

    sampler.unsubscribe(id);
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].0);
    assert!(errors[0].1.contains("driver bug"));
}

#[test]
fn threshold_policy_from_config_follows_jumps() {
    init_tracing();
    let config = SamplerConfig {
        interval_ms: 2,
        alpha: 0.1,
        adaptive: Some(AdaptiveAlphaConfig {
            threshold_px: 20.0,
            jitter_alpha: 0.1,
            jump_alpha: 1.0,
        }),
    };
    let sampler = SampleLoop::from_config(
        Box::new(positions(&[(0, 0), (3, 0), (100, 0), (101, 0)])),
        Box::new(StepClock::new()),
        &config,
    )
    .unwrap();

    let (id, rx) = channel_subscriber(&sampler);
    let samples = take(&rx, 4);
    sampler.unsubscribe(id);

    // 3 px of jitter is damped to 0.3, the 99.7 px jump is followed at once,
    // then 1 px of jitter moves the filter by 0.1.
    let xs: Vec<i32> = samples.iter().map(|s| s.value.x).collect();
    assert_eq!(xs, vec![0, 0, 100, 100]);
}

#[test]
fn policy_change_while_polling_applies_to_later_ticks() {
    init_tracing();
    let sampler = build_loop(positions(&[(0, 0), (1_000, 0)]), 0.01, FAST);
    let (id, rx) = channel_subscriber(&sampler);

    let first = take(&rx, 2);
    assert_eq!(first[1].value.x, 10);

    sampler.set_policy(AlphaPolicy::fixed(1.0).unwrap());
    let caught_up = (0..50)
        .map(|_| rx.recv_timeout(RECV_TIMEOUT).expect("sample should arrive"))
        .any(|s| s.value.x == 1_000);
    sampler.unsubscribe(id);

    assert!(caught_up, "alpha 1.0 should land exactly on the raw position");
}

#[test]
fn subscribe_then_unsubscribe_returns_to_idle() {
    init_tracing();
    let sampler = build_loop(positions(&[(0, 0)]), 0.1, FAST);

    let id = sampler.subscribe(|_| {}).unwrap();
    assert_eq!(sampler.subscriber_count(), 1);
    assert!(sampler.unsubscribe(id));
    assert_eq!(sampler.subscriber_count(), 0);
    assert_eq!(sampler.state(), LoopState::Idle);
    assert!(wait_until(Duration::from_millis(250), || sampler.live_workers() == 0));
}

#[test]
fn resubscribing_restarts_without_resetting_filters() {
    init_tracing();
    let sampler = build_loop(positions(&[(0, 0), (1000, 0)]), 0.1, FAST);

    let (id, rx) = channel_subscriber(&sampler);
    let first = take(&rx, 2);
    assert_eq!(first[0].value.x, 0);
    assert_eq!(first[1].value.x, 100);
    sampler.unsubscribe(id);
    assert!(wait_until(Duration::from_millis(250), || sampler.live_workers() == 0));

    let (id, rx) = channel_subscriber(&sampler);
    assert_eq!(sampler.worker_starts(), 2);
    let resumed = take(&rx, 1)[0];
    sampler.unsubscribe(id);

    // A re-seeded filter would jump straight to the raw 1000.
    assert!(resumed.value.x > 100 && resumed.value.x < 1000, "x={}", resumed.value.x);
}

#[test]
fn unsubscribed_callback_is_never_invoked_again() {
    init_tracing();
    let sampler = build_loop(positions(&[(3, 3)]), 0.1, FAST);

    let (_keep, rx) = channel_subscriber(&sampler);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let id = sampler
        .subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    take(&rx, 3);
    assert!(sampler.unsubscribe(id));
    let seen = calls.load(Ordering::SeqCst);
    assert!(seen > 0);

    take(&rx, 5);
    assert_eq!(calls.load(Ordering::SeqCst), seen);
}

#[test]
fn callbacks_run_in_registration_order() {
    init_tracing();
    let sampler = build_loop(positions(&[(1, 2)]), 0.1, FAST);
    let order = Arc::new(Mutex::new(Vec::new()));

    let ids: Vec<SubscriptionId> = (0..3)
        .map(|n| {
            let order = Arc::clone(&order);
            sampler
                .subscribe(move |_| order.lock().unwrap().push(n))
                .unwrap()
        })
        .collect();

    assert!(wait_until(Duration::from_secs(5), || order.lock().unwrap().len() >= 6));
    for id in ids {
        sampler.unsubscribe(id);
    }

    let order = order.lock().unwrap();
    for chunk in order.chunks_exact(3) {
        assert_eq!(chunk, &[0, 1, 2]);
    }
}

#[test]
fn clock_failures_reach_error_observers() {
    init_tracing();
    let sampler = SampleLoop::new(
        Box::new(positions(&[(1, 1)])),
        Box::new(BrokenClock),
        AlphaPolicy::default(),
        FAST,
    )
    .unwrap();

    let errors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&errors);
    sampler
        .on_error(move |err| {
            assert!(err.is_acquisition());
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let (id, rx) = channel_subscriber(&sampler);
    assert!(wait_until(Duration::from_secs(5), || errors.load(Ordering::SeqCst) >= 3));
    sampler.unsubscribe(id);
    assert!(rx.try_recv().is_err());
}

#[test]
fn panicking_subscriber_does_not_stop_sampling() {
    init_tracing();
    let sampler = build_loop(positions(&[(8, 8)]), 0.1, FAST);

    let errors = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&errors);
    sampler
        .on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let bad = sampler.subscribe(|_| panic!("subscriber bug")).unwrap();
    let (good, rx) = channel_subscriber(&sampler);

    take(&rx, 3);
    assert!(errors.load(Ordering::SeqCst) >= 2);
    assert!(sampler.unsubscribe(bad));
    assert!(sampler.unsubscribe(good));
}

#[test]
fn precise_clock_timestamps_never_decrease() {
    init_tracing();
    let sampler = SampleLoop::new(
        Box::new(positions(&[(0, 0), (4, 4), (8, 8)])),
        Box::new(SystemClock::precise()),
        AlphaPolicy::default(),
        FAST,
    )
    .unwrap();

    let (id, rx) = channel_subscriber(&sampler);
    let samples = take(&rx, 10);
    sampler.unsubscribe(id);

    for pair in samples.windows(2) {
        assert!(pair[1].timestamp >= pair[0].timestamp);
    }
}

#[test]
fn concurrent_subscription_churn_settles_idle() {
    init_tracing();
    let sampler = Arc::new(build_loop(positions(&[(2, 2)]), 0.1, FAST));

    let threads: Vec<_> = (0..4)
        .map(|_| {
            let sampler = Arc::clone(&sampler);
            std::thread::spawn(move || {
                for _ in 0..25 {
                    let id = sampler.subscribe(|_| {}).unwrap();
                    std::thread::sleep(Duration::from_micros(200));
                    assert!(sampler.unsubscribe(id));
                }
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    assert_eq!(sampler.subscriber_count(), 0);
    assert_eq!(sampler.state(), LoopState::Idle);
    assert!(wait_until(Duration::from_secs(1), || sampler.live_workers() == 0));
}

#[test]
fn dispose_joins_producer_and_rejects_new_subscribers() {
    init_tracing();
    let sampler = build_loop(positions(&[(1, 1)]), 0.1, DEFAULT_INTERVAL);
    let (_id, rx) = channel_subscriber(&sampler);
    take(&rx, 1);

    sampler.dispose();
    assert_eq!(sampler.live_workers(), 0);
    assert_eq!(sampler.subscriber_count(), 0);
    assert!(sampler
        .subscribe(|_| {})
        .unwrap_err()
        .is_contract_violation());
}

#[test]
fn dropping_a_polling_loop_stops_it() {
    init_tracing();
    let sampler = build_loop(positions(&[(1, 1)]), 0.1, FAST);
    let (_id, rx) = channel_subscriber(&sampler);
    take(&rx, 1);
    drop(sampler);

    // Sender lives in the dropped subscriber, so the channel disconnects.
    assert!(wait_until(Duration::from_secs(1), || matches!(
        rx.try_recv(),
        Err(mpsc::TryRecvError::Disconnected)
    )));
}
