//! Integration tests for the dose engine running on its worker thread

use std::io::Cursor;
use std::thread;
use std::time::Duration;
use trailing_dose::core::trapezoid;
use trailing_dose::{Config, DoseSample, Engine, LineSource, SampleSource};

const HOUR: f64 = 3600.0;

fn start_engine() -> Engine {
    Engine::start("TEST:DOSE4H", &Config::default()).expect("Failed to start engine")
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_trapezoid_one_hour() {
    let a = DoseSample::new(0.0, 2.0);
    let b = DoseSample::new(HOUR, 4.0);
    assert_eq!(trapezoid(&a, &b), 3.0);
}

#[test]
fn test_first_sample_only_seeds() {
    let engine = start_engine();
    let value = engine.value().clone();
    let stats = engine.stats().clone();

    engine.producer().enqueue(DoseSample::new(100.0, 42.0));
    let acc = engine.shutdown().expect("worker panicked");

    assert_eq!(value.get_current(), 0.0);
    assert_eq!(value.sequence(), 0);
    assert_eq!(acc.window().len(), 1);
    assert_eq!(stats.stats().samples_seeded, 1);
}

#[test]
fn test_out_of_order_sample_dropped() {
    let engine = start_engine();
    let value = engine.value().clone();
    let stats = engine.stats().clone();

    for (t, v) in [(10.0, 1.0), (5.0, 100.0), (20.0, 3.0)] {
        engine.producer().enqueue(DoseSample::new(t, v));
    }
    let acc = engine.shutdown().expect("worker panicked");

    let expected = (1.0 + 3.0) * (10.0 / HOUR) * 0.5;
    assert!(approx_eq(value.get_current(), expected));
    assert_eq!(value.sequence(), 1);
    assert_eq!(acc.window().len(), 2);
    assert_eq!(stats.stats().samples_stale, 1);
}

#[test]
fn test_window_eviction_over_six_hours() {
    let engine = start_engine();
    let value = engine.value().clone();

    // Rate at hour k is k + 1
    for hour in 0..=6 {
        engine
            .producer()
            .enqueue(DoseSample::new(hour as f64 * HOUR, hour as f64 + 1.0));
    }
    let acc = engine.shutdown().expect("worker panicked");

    // Hour 0 is evicted; hour 1 stays as the left anchor
    assert_eq!(acc.window().first().unwrap().timestamp, HOUR);
    assert_eq!(acc.window().len(), 6);
    let expected: f64 = (1..6).map(|k| (k as f64 + 1.0 + k as f64 + 2.0) * 0.5).sum();
    assert_eq!(expected, 22.5);
    assert!(approx_eq(value.get_current(), expected));
}

#[test]
fn test_window_length_stabilizes() {
    let engine = start_engine();
    let value = engine.value().clone();
    let stats = engine.stats().clone();

    for hour in 0..48 {
        engine.producer().enqueue(DoseSample::new(hour as f64 * HOUR, 1.0));
    }
    let acc = engine.shutdown().expect("worker panicked");

    assert_eq!(acc.window().len(), 6);
    assert!(approx_eq(value.get_current(), 5.0));
    assert_eq!(stats.stats().trapezoids_evicted, 48 - 6);
}

#[test]
fn test_duplicate_delivery_is_noop() {
    let engine = start_engine();
    let value = engine.value().clone();
    let stats = engine.stats().clone();

    engine.producer().enqueue(DoseSample::new(0.0, 0.5));
    engine.producer().enqueue(DoseSample::new(600.0, 0.7));
    engine.producer().enqueue(DoseSample::new(600.0, 0.7));
    let acc = engine.shutdown().expect("worker panicked");

    assert!(approx_eq(value.get_current(), (0.5 + 0.7) * (600.0 / HOUR) * 0.5));
    assert_eq!(value.sequence(), 1);
    assert_eq!(acc.window().len(), 2);
    assert_eq!(stats.stats().samples_stale, 1);
}

#[test]
fn test_nan_timestamp_does_not_seed_window() {
    let engine = start_engine();
    let value = engine.value().clone();
    let stats = engine.stats().clone();

    engine.producer().enqueue(DoseSample::new(f64::NAN, 1.0));
    engine.producer().enqueue(DoseSample::new(10.0, 1.0));
    engine.producer().enqueue(DoseSample::new(20.0, 1.0));
    let acc = engine.shutdown().expect("worker panicked");

    assert!(value.get_current().is_finite());
    assert!(approx_eq(value.get_current(), 10.0 / HOUR));
    assert_eq!(acc.window().first().unwrap().timestamp, 10.0);
    assert_eq!(acc.window().len(), 2);
    assert_eq!(stats.stats().samples_rejected, 1);
    assert_eq!(stats.stats().samples_seeded, 1);
}

#[test]
fn test_concurrent_producers_no_loss() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 500;

    let engine = start_engine();
    let stats = engine.stats().clone();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let mut callback = engine.producer().callback();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    callback(DoseSample::new((i * PRODUCERS + p) as f64, 1.0));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    engine.shutdown().expect("worker panicked");

    let snap = stats.stats();
    assert_eq!(snap.samples_dequeued as usize, PRODUCERS * PER_PRODUCER);
    assert_eq!(
        snap.samples_seeded + snap.samples_stale + snap.samples_rejected + snap.samples_integrated,
        snap.samples_dequeued
    );
}

#[test]
fn test_subscribers_see_ordered_updates() {
    let engine = start_engine();
    let updates = engine.value().subscribe();

    let mut source = LineSource::new(Cursor::new(
        "0 1\n1800 1\n3600 1\n5400 1\n7200 1\n".to_string(),
    ));
    engine.attach(&mut source, "TEST:RATE").unwrap();
    assert_eq!(source.wait(), 5);
    assert!(!source.is_running());
    engine.shutdown().expect("worker panicked");

    let received: Vec<_> = updates.try_iter().collect();
    assert_eq!(received.len(), 4);
    for (i, update) in received.iter().enumerate() {
        assert_eq!(update.sequence, i as u64 + 1);
        assert!(approx_eq(update.value, 0.5 * (i as f64 + 1.0)));
    }
}

#[test]
fn test_reader_sees_value_while_worker_runs() {
    let engine = start_engine();
    let value = engine.value().clone();
    let updates = value.subscribe();

    engine.producer().enqueue(DoseSample::new(0.0, 1.0));
    engine.producer().enqueue(DoseSample::new(HOUR, 1.0));

    let update = updates
        .recv_timeout(Duration::from_secs(5))
        .expect("no update published");
    assert_eq!(update.value, 1.0);
    assert_eq!(value.get_current(), 1.0);
    assert!(!engine.is_finished());

    engine.shutdown().expect("worker panicked");
}
