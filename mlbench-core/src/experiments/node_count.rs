//! Simulated time as the number of workers grows.
#![expect(
    clippy::float_arithmetic,
    reason = "simulated delays are fractions of the time unit"
)]

use std::convert::Infallible;

use tracing::{info, instrument};

use super::{ExperimentContext, require_values};
use crate::{BenchError, Result, RetryPolicy, TaskReport, mean, timing::timed};

/// Measurement for one worker count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeCountSample {
    /// Simulated or dispatched worker count.
    pub workers: usize,
    /// Wall-clock time of the step.
    pub seconds: f64,
}

/// Result of [`scalability_with_node_count`].
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCountOutcome {
    /// One sample per worker count, in input order.
    pub samples: Vec<NodeCountSample>,
    /// Mean of the sample timings.
    pub average_seconds: f64,
}

/// Waits `time_unit / workers` for each worker count. The task-parallel
/// backend instead dispatches `workers` tasks that each wait that long and
/// joins them.
///
/// # Errors
/// Returns [`BenchError::EmptyParameterList`] for an empty list,
/// [`BenchError::InvalidParameter`] for a zero worker count, and task
/// failures from the runtime.
#[instrument(
    name = "experiment.node_count",
    err,
    skip(context),
    fields(backend = %context.backend),
)]
pub fn scalability_with_node_count(
    context: &ExperimentContext<'_>,
    worker_counts: &[usize],
) -> Result<NodeCountOutcome> {
    require_values("worker_counts", worker_counts)?;
    let mut samples = Vec::with_capacity(worker_counts.len());
    for &workers in worker_counts {
        if workers == 0 {
            return Err(BenchError::invalid_parameter("worker_counts", workers));
        }
        let factor = 1.0 / f64::from(u32::try_from(workers).unwrap_or(u32::MAX));
        let (step, seconds) = timed(|| run_step(context, workers, factor));
        step?;
        info!(workers, seconds, "node count sample");
        samples.push(NodeCountSample { workers, seconds });
    }
    let timings: Vec<f64> = samples.iter().map(|sample| sample.seconds).collect();
    Ok(NodeCountOutcome {
        average_seconds: mean(&timings).unwrap_or_default(),
        samples,
    })
}

fn run_step(context: &ExperimentContext<'_>, workers: usize, factor: f64) -> Result<()> {
    if !context.backend.uses_task_runtime() {
        context.delay.wait(factor);
        return Ok(());
    }
    let delay = context.delay;
    let reports = context.runtime()?.run_all(workers, RetryPolicy::none(), |_| {
        delay.wait(factor);
        Ok::<_, Infallible>(())
    });
    reports.into_iter().try_for_each(TaskReport::into_result)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::{Backend, SimulatedDelay, TaskRuntime, experiments::fixtures::instant};

    #[rstest]
    fn simulated_backends_sample_every_count() {
        let outcome = scalability_with_node_count(&instant(Backend::Eager), &[1, 2, 4, 8])
            .expect("experiment succeeds");
        let workers: Vec<usize> = outcome.samples.iter().map(|s| s.workers).collect();
        assert_eq!(workers, vec![1, 2, 4, 8]);
        assert!(outcome.average_seconds >= 0.0);
    }

    #[rstest]
    fn more_workers_wait_less() {
        let context = ExperimentContext {
            delay: SimulatedDelay::new(Duration::from_millis(40)),
            ..instant(Backend::Partitioned)
        };
        let outcome =
            scalability_with_node_count(&context, &[1, 4]).expect("experiment succeeds");
        assert!(outcome.samples[0].seconds >= 0.04);
        assert!(outcome.samples[0].seconds > outcome.samples[1].seconds);
    }

    #[rstest]
    fn task_parallel_dispatches_one_task_per_worker() {
        let runtime = TaskRuntime::new(4).expect("pool starts");
        let context = ExperimentContext {
            runtime: Some(&runtime),
            ..instant(Backend::TaskParallel)
        };
        scalability_with_node_count(&context, &[1, 2, 4]).expect("experiment succeeds");
        assert_eq!(runtime.attempts_executed(), 7);
    }

    #[rstest]
    fn rejects_empty_list() {
        let err = scalability_with_node_count(&instant(Backend::Eager), &[])
            .expect_err("list must not be empty");
        assert_eq!(
            err,
            BenchError::EmptyParameterList {
                parameter: "worker_counts"
            }
        );
    }

    #[rstest]
    fn rejects_zero_workers() {
        let err = scalability_with_node_count(&instant(Backend::Eager), &[2, 0])
            .expect_err("zero workers is invalid");
        assert!(matches!(
            err,
            BenchError::InvalidParameter {
                parameter: "worker_counts",
                ..
            }
        ));
    }
}
