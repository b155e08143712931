//! Trapezoidal integration over the sample window.
//!
//! Time is converted from seconds to hours, so a rate in units/hour
//! integrates to units.

use crate::core::window::WindowBuffer;
use crate::source::DoseSample;

/// Seconds per hour.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Area under the rate curve between two consecutive samples.
///
/// `b` must be strictly later than `a`.
pub fn trapezoid(a: &DoseSample, b: &DoseSample) -> f64 {
    debug_assert!(b.timestamp > a.timestamp, "trapezoid samples out of order");
    let hours = (b.timestamp - a.timestamp) / SECONDS_PER_HOUR;
    (b.value + a.value) * hours * 0.5
}

/// Add the trapezoid formed by the two newest samples.
///
/// # Panics
///
/// Panics if the window holds fewer than two samples. The seed branch of the
/// worker guarantees this never happens.
pub fn accumulate(window: &WindowBuffer, total: &mut RunningIntegral) {
    assert!(
        window.len() >= 2,
        "integrator invoked with {} sample(s) in window",
        window.len()
    );
    let (prev, newest) = window.newest_pair();
    total.add(trapezoid(prev, newest));
}

/// Subtract trapezoids that fell out of the window and trim the buffer.
///
/// Eviction happens while the newest sample is more than the window span
/// past the second-oldest sample, so one anchor sample older than the span is
/// always retained. Returns the number of trapezoids removed.
pub fn evict(window: &mut WindowBuffer, total: &mut RunningIntegral) -> usize {
    let mut evicted = 0;
    while window.exceeds_span() {
        let (oldest, next) = window.oldest_pair();
        total.sub(trapezoid(oldest, next));
        window.pop_oldest();
        evicted += 1;
    }
    evicted
}

/// Running total kept with Neumaier compensated summation.
///
/// A trailing integral is built from an unbounded series of additions and
/// matching subtractions; plain `f64` accumulation lets rounding error pile
/// up over days of operation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningIntegral {
    sum: f64,
    compensation: f64,
}

impl RunningIntegral {
    pub fn new(seed: f64) -> Self {
        Self {
            sum: seed,
            compensation: 0.0,
        }
    }

    pub fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn sub(&mut self, x: f64) {
        self.add(-x);
    }

    /// Current total including the compensation term.
    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(t: f64, v: f64) -> DoseSample {
        DoseSample::new(t, v)
    }

    #[test]
    fn test_trapezoid_one_hour() {
        assert_eq!(trapezoid(&s(0.0, 2.0), &s(3600.0, 4.0)), 3.0);
    }

    #[test]
    fn test_trapezoid_signed_rates() {
        // Negative readings (detector offset) integrate with their sign
        let area = trapezoid(&s(0.0, -1.0), &s(1800.0, 1.0));
        assert_eq!(area, 0.0);
        let area = trapezoid(&s(100.0, -0.2), &s(1900.0, -0.2));
        assert!((area + 0.1).abs() < 1e-12);
    }

    #[test]
    #[should_panic(expected = "integrator invoked with 1 sample")]
    fn test_accumulate_single_sample_panics() {
        let mut window = WindowBuffer::new(14_400.0);
        window.accept(s(0.0, 1.0));
        let mut total = RunningIntegral::default();
        accumulate(&window, &mut total);
    }

    #[test]
    fn test_evict_keeps_left_anchor() {
        let mut window = WindowBuffer::new(14_400.0);
        let mut total = RunningIntegral::default();
        for hour in 0..=5 {
            window.accept(s(hour as f64 * 3600.0, 1.0));
            if window.len() >= 2 {
                accumulate(&window, &mut total);
            }
        }
        assert_eq!(window.len(), 6);
        let evicted = evict(&mut window, &mut total);

        // Second element at 1h, newest at 5h: span 4h is not > 4h
        assert_eq!(evicted, 0);
        window.accept(s(6.0 * 3600.0, 1.0));
        accumulate(&window, &mut total);
        let evicted = evict(&mut window, &mut total);
        assert_eq!(evicted, 1);
        assert_eq!(window.first().unwrap().timestamp, 3600.0);
        assert!((total.value() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_running_integral_does_not_drift() {
        let mut total = RunningIntegral::new(0.0);
        let step = 0.1_f64 * 1e-3;
        for _ in 0..1_000_000 {
            total.add(step);
            total.add(1e6);
            total.sub(1e6);
        }
        for _ in 0..1_000_000 {
            total.sub(step);
        }
        assert!(total.value().abs() < 1e-12, "drifted to {}", total.value());
    }
}
