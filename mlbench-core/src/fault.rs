//! Probabilistic failure injection for dispatched tasks.
//!
//! The failure probability is an explicit parameter rather than a literal so
//! tests can force either branch. An injected failure is returned as an
//! error from the task body, which lets [`crate::TaskRuntime`] apply its
//! retry policy before the caller sees the outcome.

use std::fmt;

use rand::{Rng, SeedableRng, rngs::SmallRng};
use thiserror::Error;

use crate::{BenchError, Result, TaskContext, TaskError};

/// Error returned by a task attempt chosen to fail.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[error("Simulated failure")]
pub struct InjectedFault;

/// Decides, per task attempt, whether the attempt fails.
///
/// Draws are a pure function of the seed, task index and attempt number, so
/// a given configuration always fails the same attempts.
///
/// # Examples
/// ```
/// use mlbench_core::{FaultInjector, TaskContext};
///
/// let always = FaultInjector::new(1.0, 0).expect("valid probability");
/// assert!(always.should_fail(TaskContext { task: 0, attempt: 1 }));
/// let never = FaultInjector::new(0.0, 0).expect("valid probability");
/// assert!(!never.should_fail(TaskContext { task: 0, attempt: 1 }));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultInjector {
    probability: f64,
    seed: u64,
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self {
            probability: 0.5,
            seed: 0,
        }
    }
}

impl FaultInjector {
    /// Creates an injector that fails attempts with `probability`.
    ///
    /// # Errors
    /// Returns [`BenchError::InvalidParameter`] unless `probability` is a
    /// finite value in `[0, 1]`.
    pub fn new(probability: f64, seed: u64) -> Result<Self> {
        if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
            return Err(BenchError::invalid_parameter(
                "failure_probability",
                probability,
            ));
        }
        Ok(Self { probability, seed })
    }

    /// Returns the configured failure probability.
    #[must_use]
    pub const fn probability(&self) -> f64 {
        self.probability
    }

    /// Returns `true` when the attempt described by `context` must fail.
    #[must_use]
    pub fn should_fail(&self, context: TaskContext) -> bool {
        if self.probability <= 0.0 {
            return false;
        }
        if self.probability >= 1.0 {
            return true;
        }
        let mut rng = SmallRng::seed_from_u64(self.attempt_seed(context));
        rng.gen_bool(self.probability)
    }

    /// Fails the attempt with [`InjectedFault`] when the draw says so.
    ///
    /// # Errors
    /// Returns [`InjectedFault`] for attempts selected to fail.
    pub fn check(&self, context: TaskContext) -> core::result::Result<(), InjectedFault> {
        if self.should_fail(context) {
            Err(InjectedFault)
        } else {
            Ok(())
        }
    }

    fn attempt_seed(&self, context: TaskContext) -> u64 {
        let task = u64::try_from(context.task).unwrap_or(u64::MAX);
        self.seed
            ^ task.wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ u64::from(context.attempt).rotate_left(32)
    }
}

/// Final state of a fault-injected task after its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Some attempt succeeded.
    Recovered,
    /// Every attempt failed.
    Failed,
}

impl RecoveryOutcome {
    /// Message printed for the outcome.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Recovered => "Recovered successfully!",
            Self::Failed => "Simulated failure",
        }
    }

    /// Classifies a task outcome. Panics are not a recovery outcome and are
    /// handed back unchanged.
    ///
    /// # Errors
    /// Returns the [`TaskError`] when the task panicked.
    pub fn from_task<T>(
        outcome: &core::result::Result<T, TaskError>,
    ) -> core::result::Result<Self, TaskError> {
        match outcome {
            Ok(_) => Ok(Self::Recovered),
            Err(TaskError::Exhausted { .. }) => Ok(Self::Failed),
            Err(other) => Err(other.clone()),
        }
    }
}

impl fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
