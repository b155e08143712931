//! Demonstration of the trailing-dose engine.
//!
//! This example shows how to:
//! 1. Start an engine for an output PV
//! 2. Subscribe to its updates
//! 3. Feed it a synthetic dose-rate profile from a producer thread
//! 4. Shut down cleanly and build a snapshot
//!
//! Run with: cargo run --example replay_demo

use std::thread;
use trailing_dose::{Config, DoseSample, Engine, SnapshotBuilder};

fn main() {
    println!("Trailing Dose - Replay Demo");
    println!("===========================");
    println!();

    let config = Config::default();
    let engine = Engine::start("DEMO:DOSE4H", &config).expect("Failed to start engine");
    let updates = engine.value().subscribe();
    let metadata = engine.value().metadata().clone();

    // Eight hours of readings every 10 minutes, with a two-hour elevated
    // period in the middle
    let mut callback = engine.producer().callback();
    let producer = thread::spawn(move || {
        for step in 0..=48 {
            let t = step as f64 * 600.0;
            let rate = if (18..30).contains(&step) { 0.6 } else { 0.05 };
            callback(DoseSample::new(t, rate));
        }
    });
    producer.join().expect("producer panicked");

    let value = engine.value().clone();
    let stats = engine.stats().clone();
    let accumulator = engine.shutdown().expect("worker panicked");

    for update in updates.try_iter().filter(|u| u.sequence % 6 == 0) {
        println!(
            "[{:>2}] {:>12} {:?}",
            update.sequence,
            metadata.format_value(update.value),
            update.alarm.status
        );
    }

    println!();
    let snapshot = SnapshotBuilder::new().build(&value, accumulator.window(), Some(stats.stats()));
    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).expect("Failed to serialize snapshot")
    );
    println!();
    println!("{}", stats.summary());
}
