//! Check system capabilities.

use glide_common::clock::{Clock, ClockCapability, SystemClock};
use glide_common::config::AppConfig;
use glide_input_tracker::backends::{detect_best_source, STATIONARY_SOURCE};
use glide_input_tracker::PositionSource;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Glide System Check");
    println!("{}", "=".repeat(50));

    // Clock
    let clock = SystemClock::detect();
    match clock.capability() {
        ClockCapability::Precise => println!("[OK] Clock: high-resolution"),
        ClockCapability::Coarse => println!("[WARN] Clock: coarse (millisecond) fallback"),
    }
    println!("     Now: {}", clock.now_utc()?.to_rfc3339());

    // Position source
    let mut source = detect_best_source(&config.source);
    if source.name() == STATIONARY_SOURCE {
        println!("[WARN] Position source: none available, stationary fallback");
    } else {
        println!("[OK] Position source: {}", source.name());
    }
    match source.current_position() {
        Ok(sample) => println!("     Position: ({}, {})", sample.x, sample.y),
        Err(e) => println!("[FAIL] Reading position: {e}"),
    }

    // Sampler settings
    println!();
    match config.validate() {
        Ok(()) => println!(
            "[OK] Sampler: every {} ms, {}",
            config.sampler.interval_ms,
            describe_policy(config)
        ),
        Err(e) => println!("[FAIL] Configuration: {e}"),
    }

    Ok(())
}

fn describe_policy(config: &AppConfig) -> String {
    match &config.sampler.adaptive {
        Some(adaptive) => format!(
            "alpha {} below {} px, {} above",
            adaptive.jitter_alpha, adaptive.threshold_px, adaptive.jump_alpha
        ),
        None => format!("fixed alpha {}", config.sampler.alpha),
    }
}
