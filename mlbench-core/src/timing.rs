//! Simulated delays and timing helpers.
//!
//! The scalability and fault-tolerance experiments do not exercise real
//! infrastructure; they wait for a multiple of a configurable time unit.
//! Tests configure a zero unit so the experiments finish immediately.
#![expect(
    clippy::float_arithmetic,
    reason = "delays and averages are computed in floating-point seconds"
)]

use std::{
    thread,
    time::{Duration, Instant},
};

/// Waits for multiples of a base time unit.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use mlbench_core::SimulatedDelay;
///
/// let delay = SimulatedDelay::new(Duration::from_millis(100));
/// assert_eq!(delay.scaled(0.5), Duration::from_millis(50));
/// assert_eq!(delay.scaled(-1.0), Duration::ZERO);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedDelay {
    unit: Duration,
}

impl Default for SimulatedDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl SimulatedDelay {
    /// Creates a delay whose factor `1.0` lasts `unit`.
    #[must_use]
    pub const fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// Returns the base time unit.
    #[must_use]
    pub const fn unit(&self) -> Duration {
        self.unit
    }

    /// Returns `unit * factor`. Non-positive or non-finite factors yield
    /// zero; results too large for a [`Duration`] saturate.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Duration {
        if !factor.is_finite() || factor <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.unit.as_secs_f64() * factor).unwrap_or(Duration::MAX)
    }

    /// Sleeps for `unit * factor` and returns the requested duration.
    pub fn wait(&self, factor: f64) -> Duration {
        let duration = self.scaled(factor);
        if !duration.is_zero() {
            thread::sleep(duration);
        }
        duration
    }
}

/// Arithmetic mean of `values`, or `None` when empty.
///
/// # Examples
/// ```
/// use mlbench_core::mean;
///
/// assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
/// assert_eq!(mean(&[]), None);
/// ```
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "parameter lists are tiny")]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Runs `work` and returns its value with the elapsed wall-clock seconds.
pub(crate) fn timed<T>(work: impl FnOnce() -> T) -> (T, f64) {
    let started = Instant::now();
    let value = work();
    (value, started.elapsed().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::half(0.5, Duration::from_millis(5))]
    #[case::zero(0.0, Duration::ZERO)]
    #[case::nan(f64::NAN, Duration::ZERO)]
    #[case::huge(f64::MAX, Duration::MAX)]
    fn scales_unit(#[case] factor: f64, #[case] expected: Duration) {
        let delay = SimulatedDelay::new(Duration::from_millis(10));
        assert_eq!(delay.scaled(factor), expected);
    }

    #[rstest]
    fn zero_unit_never_sleeps() {
        let delay = SimulatedDelay::new(Duration::ZERO);
        let ((), seconds) = timed(|| {
            delay.wait(1_000.0);
        });
        assert!(seconds < 1.0);
    }

    #[rstest]
    fn wait_blocks_for_requested_time() {
        let delay = SimulatedDelay::new(Duration::from_millis(20));
        let (waited, seconds) = timed(|| delay.wait(1.0));
        assert_eq!(waited, Duration::from_millis(20));
        assert!(seconds >= 0.02, "elapsed {seconds}");
    }

    #[rstest]
    fn mean_of_values() {
        assert_eq!(mean(&[4.0]), Some(4.0));
        assert_eq!(mean(&[]), None);
        let average = mean(&[0.5, 0.6, 0.8, 1.0, 1.2]).expect("non-empty");
        assert!((average - 0.82).abs() < 1e-12);
    }
}
