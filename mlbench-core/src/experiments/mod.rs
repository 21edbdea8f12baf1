//! The five benchmark experiments.
//!
//! Each experiment is a free function taking an [`ExperimentContext`] and
//! its parameter list, returning a typed outcome that carries the value the
//! suite records. Experiments never touch a shared accumulator.

mod communication;
mod data_size;
mod ease_of_use;
mod fault_tolerance;
mod node_count;

use std::convert::Infallible;

pub use self::{
    communication::{
        CommunicationBuckets, CommunicationOutcome, CommunicationSample, SyncMode,
        bucket_timings, communication_overhead, sync_mode,
    },
    data_size::{DataSizeOutcome, DataSizeSample, scalability_with_data_size},
    ease_of_use::{DEFAULT_EASE_SCORES, ease_of_use_and_setup},
    fault_tolerance::{
        FaultSample, FaultToleranceOutcome, RecoveryReport, fault_tolerance_and_recovery,
    },
    node_count::{NodeCountOutcome, NodeCountSample, scalability_with_node_count},
};
use crate::{
    Backend, BenchError, DatasetView, FaultInjector, Result, RetryPolicy, SimulatedDelay,
    SoftmaxClassifier, TaskRuntime, TrainConfig, TrainingReport,
};

/// Settings shared by every experiment of one suite run.
#[derive(Debug, Clone, Copy)]
pub struct ExperimentContext<'a> {
    /// Backend under test.
    pub backend: Backend,
    /// Hyper-parameters for training-based experiments.
    pub train: TrainConfig,
    /// Time unit for simulated experiments.
    pub delay: SimulatedDelay,
    /// Runtime used by [`Backend::TaskParallel`].
    pub runtime: Option<&'a TaskRuntime>,
    /// Retry policy applied to fault-injected tasks.
    pub retry: RetryPolicy,
    /// Failure source for fault-injected tasks.
    pub faults: FaultInjector,
    /// Seed for batch shuffling.
    pub seed: u64,
}

impl<'a> ExperimentContext<'a> {
    /// Creates a context without a task runtime.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            train: TrainConfig::default(),
            delay: SimulatedDelay::default(),
            runtime: None,
            retry: RetryPolicy::default(),
            faults: FaultInjector::default(),
            seed: 0,
        }
    }

    /// Returns the task runtime, failing when the backend needs one and none
    /// was supplied.
    ///
    /// # Errors
    /// Returns [`BenchError::RuntimeMissing`] when no runtime is attached.
    pub fn runtime(&self) -> Result<&'a TaskRuntime> {
        self.runtime.ok_or(BenchError::RuntimeMissing {
            backend: self.backend.label(),
        })
    }

    /// Trains a new classifier on `view`. The task-parallel backend runs the
    /// training as a task on the runtime.
    ///
    /// # Errors
    /// Propagates training errors, a missing runtime, and task failures.
    pub fn train_fresh(
        &self,
        view: DatasetView<'_>,
        config: &TrainConfig,
    ) -> Result<(SoftmaxClassifier, TrainingReport)> {
        if !self.backend.uses_task_runtime() {
            return train_locally(view, config, self.backend, self.seed);
        }
        let runtime = self.runtime()?;
        let backend = self.backend;
        let seed = self.seed;
        runtime
            .run_one(RetryPolicy::none(), |_| {
                Ok::<_, Infallible>(train_locally(view, config, backend, seed))
            })
            .into_result()?
    }
}

fn train_locally(
    view: DatasetView<'_>,
    config: &TrainConfig,
    backend: Backend,
    seed: u64,
) -> Result<(SoftmaxClassifier, TrainingReport)> {
    let mut model = SoftmaxClassifier::new(view.dimensions(), view.class_count())?;
    let report = model.fit(view, config, backend, seed)?;
    Ok((model, report))
}

fn require_values<T>(parameter: &'static str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(BenchError::EmptyParameterList { parameter });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::time::Duration;

    use rstest::fixture;

    use super::ExperimentContext;
    use crate::{Backend, Dataset, SimulatedDelay, TrainConfig};

    /// Two well-separated clusters in two dimensions.
    #[fixture]
    pub(crate) fn clusters() -> Dataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for row in 0_u8..60 {
            let offset = f32::from(row % 5) * 0.05;
            let label = row % 2;
            if label == 0 {
                features.extend([1.0 + offset, 0.0]);
            } else {
                features.extend([0.0, 1.0 + offset]);
            }
            labels.push(label);
        }
        Dataset::from_parts("clusters", features, labels, 2, 2).expect("valid clusters")
    }

    /// Context with a zero time unit so simulated experiments are instant.
    pub(crate) fn instant(backend: Backend) -> ExperimentContext<'static> {
        ExperimentContext {
            train: TrainConfig {
                epochs: 3,
                batch_size: 8,
                learning_rate: 0.5,
            },
            delay: SimulatedDelay::new(Duration::ZERO),
            ..ExperimentContext::new(backend)
        }
    }
}
