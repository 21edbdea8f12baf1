//! Simulated recovery time as failures accumulate.
//!
//! Simulated backends wait half a time unit per failure. The task-parallel
//! backend runs one task through the fault injector instead: each failed
//! attempt waits half a time unit and returns an error, so the runtime's
//! retry policy decides whether the task recovers.
#![expect(
    clippy::float_arithmetic,
    reason = "simulated delays are fractions of the time unit"
)]

use tracing::{debug, info, instrument};

use super::{ExperimentContext, require_values};
use crate::{RecoveryOutcome, Result, mean, timing::timed};

/// Fraction of the time unit spent per failure.
const RECOVERY_FACTOR: f64 = 0.5;

/// Measurement for one failure count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultSample {
    /// Simulated or observed failures.
    pub failures: u32,
    /// Wall-clock recovery time.
    pub seconds: f64,
}

/// Outcome of the fault-injected task run by the task-parallel backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryReport {
    /// Whether any attempt succeeded.
    pub outcome: RecoveryOutcome,
    /// Attempts consumed by the task.
    pub attempts: u32,
    /// Wall-clock time from dispatch to join.
    pub seconds: f64,
}

impl RecoveryReport {
    /// Message describing the outcome.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        self.outcome.message()
    }

    /// Failed attempts observed before the task settled.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        match self.outcome {
            RecoveryOutcome::Recovered => self.attempts.saturating_sub(1),
            RecoveryOutcome::Failed => self.attempts,
        }
    }
}

/// Result of [`fault_tolerance_and_recovery`].
#[derive(Debug, Clone, PartialEq)]
pub struct FaultToleranceOutcome {
    /// One sample per failure count, or a single observed sample for the
    /// task-parallel backend.
    pub samples: Vec<FaultSample>,
    /// Present only for the task-parallel backend.
    pub recovery: Option<RecoveryReport>,
    /// Mean of the sample timings.
    pub average_seconds: f64,
}

/// Measures recovery from failures.
///
/// Simulated backends wait `failures * RECOVERY_FACTOR` time units for each
/// entry of `failure_counts`. The task-parallel backend instead runs a single
/// fault-injected task under the retry policy; its failure count is the
/// number of failed attempts, and `failure_counts` is only checked for being
/// non-empty.
///
/// # Errors
/// Returns [`crate::BenchError::EmptyParameterList`] for an empty list,
/// [`crate::BenchError::RuntimeMissing`] when the task-parallel backend has
/// no runtime, and [`crate::BenchError::Task`] when the task panicked.
#[instrument(
    name = "experiment.fault_tolerance",
    err,
    skip(context),
    fields(backend = %context.backend, retries = context.retry.max_retries()),
)]
pub fn fault_tolerance_and_recovery(
    context: &ExperimentContext<'_>,
    failure_counts: &[u32],
) -> Result<FaultToleranceOutcome> {
    require_values("failure_counts", failure_counts)?;
    if context.backend.uses_task_runtime() {
        debug!(
            ignored = ?failure_counts,
            "failure counts are not used by the task runtime"
        );
        let recovery = recover_task(context)?;
        return Ok(FaultToleranceOutcome {
            samples: vec![FaultSample {
                failures: recovery.failures(),
                seconds: recovery.seconds,
            }],
            average_seconds: recovery.seconds,
            recovery: Some(recovery),
        });
    }

    let samples: Vec<FaultSample> = failure_counts
        .iter()
        .map(|&failures| {
            let (_, seconds) =
                timed(|| context.delay.wait(f64::from(failures) * RECOVERY_FACTOR));
            info!(failures, seconds, "fault tolerance sample");
            FaultSample { failures, seconds }
        })
        .collect();
    let timings: Vec<f64> = samples.iter().map(|sample| sample.seconds).collect();
    Ok(FaultToleranceOutcome {
        average_seconds: mean(&timings).unwrap_or_default(),
        samples,
        recovery: None,
    })
}

fn recover_task(context: &ExperimentContext<'_>) -> Result<RecoveryReport> {
    let runtime = context.runtime()?;
    let faults = context.faults;
    let delay = context.delay;
    let (report, seconds) = timed(|| {
        runtime.run_one(context.retry, |attempt| {
            faults.check(attempt).inspect_err(|_| {
                delay.wait(RECOVERY_FACTOR);
            })
        })
    });
    let outcome = RecoveryOutcome::from_task(&report.outcome)?;
    info!(
        outcome = outcome.message(),
        attempts = report.attempts,
        seconds,
        "fault-injected task settled"
    );
    Ok(RecoveryReport {
        outcome,
        attempts: report.attempts,
        seconds,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mlbench_test_support::tracing::capture;
    use rstest::rstest;

    use super::*;
    use crate::{
        Backend, BenchError, FaultInjector, RetryPolicy, SimulatedDelay, TaskRuntime,
        experiments::fixtures::instant,
    };

    fn task_context(
        runtime: &TaskRuntime,
        probability: f64,
        retries: u32,
    ) -> ExperimentContext<'_> {
        ExperimentContext {
            runtime: Some(runtime),
            retry: RetryPolicy::new(retries),
            faults: FaultInjector::new(probability, 11).expect("valid probability"),
            ..instant(Backend::TaskParallel)
        }
    }

    #[rstest]
    fn simulated_backend_waits_per_failure() {
        let context = ExperimentContext {
            delay: SimulatedDelay::new(Duration::from_millis(20)),
            ..instant(Backend::Eager)
        };
        let outcome =
            fault_tolerance_and_recovery(&context, &[0, 2]).expect("experiment succeeds");
        assert!(outcome.recovery.is_none());
        assert_eq!(outcome.samples.len(), 2);
        assert!(outcome.samples[1].seconds >= 0.02);
        assert!(outcome.samples[1].seconds > outcome.samples[0].seconds);
    }

    #[rstest]
    fn certain_failure_exhausts_retries() {
        let runtime = TaskRuntime::new(1).expect("pool starts");
        let outcome = fault_tolerance_and_recovery(&task_context(&runtime, 1.0, 2), &[0])
            .expect("exhaustion is an outcome, not an error");
        let recovery = outcome.recovery.expect("task-parallel reports recovery");
        assert_eq!(recovery.outcome, RecoveryOutcome::Failed);
        assert_eq!(recovery.message(), "Simulated failure");
        assert_eq!(recovery.attempts, 3);
        assert_eq!(recovery.failures(), 3);
        assert_eq!(runtime.attempts_executed(), 3);
    }

    #[rstest]
    fn zero_probability_recovers_first_time() {
        let runtime = TaskRuntime::new(1).expect("pool starts");
        let outcome = fault_tolerance_and_recovery(&task_context(&runtime, 0.0, 2), &[0])
            .expect("experiment succeeds");
        let recovery = outcome.recovery.expect("task-parallel reports recovery");
        assert_eq!(recovery.message(), "Recovered successfully!");
        assert_eq!(recovery.attempts, 1);
        assert_eq!(outcome.samples, vec![FaultSample { failures: 0, seconds: recovery.seconds }]);
    }

    #[rstest]
    #[case::no_retries(0)]
    #[case::some_retries(3)]
    fn coin_flip_settles_with_known_message(#[case] retries: u32) {
        let runtime = TaskRuntime::new(1).expect("pool starts");
        let outcome = fault_tolerance_and_recovery(&task_context(&runtime, 0.5, retries), &[1])
            .expect("experiment succeeds");
        let recovery = outcome.recovery.expect("task-parallel reports recovery");
        assert!(["Recovered successfully!", "Simulated failure"].contains(&recovery.message()));
        assert!(recovery.attempts <= retries + 1);
        assert!(outcome.average_seconds >= 0.0);
    }

    #[rstest]
    fn task_parallel_reports_ignored_failure_counts() {
        let runtime = TaskRuntime::new(1).expect("pool starts");
        let context = task_context(&runtime, 0.0, 0);
        let (result, layer) =
            capture(|| fault_tolerance_and_recovery(&context, &[0, 1, 2, 3]));
        let outcome = result.expect("experiment succeeds");
        assert_eq!(outcome.samples.len(), 1);
        let events = layer.events_with_message("failure counts are not used by the task runtime");
        let event = events.first().expect("ignored list is logged");
        assert_eq!(event.field("ignored"), Some("[0, 1, 2, 3]"));
    }

    #[rstest]
    fn task_parallel_needs_runtime() {
        let err = fault_tolerance_and_recovery(&instant(Backend::TaskParallel), &[1])
            .expect_err("runtime is required");
        assert_eq!(err.code(), crate::BenchErrorCode::RuntimeMissing);
    }

    #[rstest]
    fn rejects_empty_failure_counts() {
        let err = fault_tolerance_and_recovery(&instant(Backend::Eager), &[])
            .expect_err("list must not be empty");
        assert!(matches!(err, BenchError::EmptyParameterList { .. }));
    }
}
