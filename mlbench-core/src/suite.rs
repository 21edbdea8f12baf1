//! Builder and driver for a full benchmark run.
//!
//! [`SuiteBuilder`] validates every parameter list up front so a
//! [`BenchmarkSuite`] can run the five experiments without re-checking them.
//! Each call to [`BenchmarkSuite::run`] starts from an empty
//! [`BenchmarkResults`], so running a suite twice never sees stale values.

use std::time::Duration;

use tracing::{info, instrument};

use crate::{
    Backend, BenchError, BenchmarkResults, Dataset, ExperimentKind, FaultInjector, Result,
    RetryPolicy, SimulatedDelay, TaskRuntime, TrainConfig,
    experiments::{
        self, CommunicationOutcome, DEFAULT_EASE_SCORES, DataSizeOutcome, ExperimentContext,
        FaultToleranceOutcome, NodeCountOutcome,
    },
};

/// Default row thresholds for the data-size experiment.
pub const DEFAULT_DATA_SIZES: [usize; 3] = [1_000, 5_000, 10_000];
/// Default worker counts for the node-count experiment.
pub const DEFAULT_WORKER_COUNTS: [usize; 4] = [1, 2, 4, 8];
/// Default failure counts for the fault-tolerance experiment.
pub const DEFAULT_FAILURE_COUNTS: [u32; 4] = [0, 1, 2, 3];
/// Default batch sizes for the communication experiment.
pub const DEFAULT_BATCH_SIZES: [usize; 4] = [32, 64, 128, 256];

/// Configures and constructs [`BenchmarkSuite`] instances.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use mlbench_core::{Backend, SuiteBuilder};
///
/// let suite = SuiteBuilder::new()
///     .with_backend(Backend::Partitioned)
///     .with_time_unit(Duration::ZERO)
///     .build()
///     .expect("configuration is valid");
/// assert_eq!(suite.backend(), Backend::Partitioned);
/// ```
#[derive(Debug, Clone)]
pub struct SuiteBuilder {
    backend: Backend,
    data_sizes: Vec<usize>,
    worker_counts: Vec<usize>,
    failure_counts: Vec<u32>,
    batch_sizes: Vec<usize>,
    ease_scores: Vec<f64>,
    train: TrainConfig,
    time_unit: Duration,
    failure_probability: f64,
    max_retries: u32,
    seed: u64,
}

impl Default for SuiteBuilder {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_sizes: DEFAULT_DATA_SIZES.to_vec(),
            worker_counts: DEFAULT_WORKER_COUNTS.to_vec(),
            failure_counts: DEFAULT_FAILURE_COUNTS.to_vec(),
            batch_sizes: DEFAULT_BATCH_SIZES.to_vec(),
            ease_scores: DEFAULT_EASE_SCORES.to_vec(),
            train: TrainConfig::default(),
            time_unit: Duration::from_secs(1),
            failure_probability: 0.5,
            max_retries: 0,
            seed: 0,
        }
    }
}

impl SuiteBuilder {
    /// Creates a builder populated with the default parameter lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the backend under test.
    #[must_use]
    pub const fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Overrides the data-size thresholds.
    #[must_use]
    pub fn with_data_sizes(mut self, sizes: impl Into<Vec<usize>>) -> Self {
        self.data_sizes = sizes.into();
        self
    }

    /// Overrides the simulated worker counts.
    #[must_use]
    pub fn with_worker_counts(mut self, counts: impl Into<Vec<usize>>) -> Self {
        self.worker_counts = counts.into();
        self
    }

    /// Overrides the simulated failure counts.
    #[must_use]
    pub fn with_failure_counts(mut self, counts: impl Into<Vec<u32>>) -> Self {
        self.failure_counts = counts.into();
        self
    }

    /// Overrides the communication batch sizes.
    #[must_use]
    pub fn with_batch_sizes(mut self, sizes: impl Into<Vec<usize>>) -> Self {
        self.batch_sizes = sizes.into();
        self
    }

    /// Overrides the ease-of-use scores.
    #[must_use]
    pub fn with_ease_scores(mut self, scores: impl Into<Vec<f64>>) -> Self {
        self.ease_scores = scores.into();
        self
    }

    /// Sets the number of training epochs.
    #[must_use]
    pub const fn with_epochs(mut self, epochs: usize) -> Self {
        self.train.epochs = epochs;
        self
    }

    /// Sets the training learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.train.learning_rate = learning_rate;
        self
    }

    /// Sets the training batch size used by the data-size experiment.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.train.batch_size = batch_size;
        self
    }

    /// Sets the time unit of simulated experiments.
    #[must_use]
    pub const fn with_time_unit(mut self, unit: Duration) -> Self {
        self.time_unit = unit;
        self
    }

    /// Sets the probability that a fault-injected attempt fails.
    #[must_use]
    pub const fn with_failure_probability(mut self, probability: f64) -> Self {
        self.failure_probability = probability;
        self
    }

    /// Sets how often a failing task is re-executed.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Seeds batch shuffling and fault injection.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the configured backend.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Returns the configured training parameters.
    #[must_use]
    pub const fn train_config(&self) -> TrainConfig {
        self.train
    }

    /// Validates the configuration and constructs a [`BenchmarkSuite`]. The
    /// task-parallel backend also starts a runtime sized to the largest
    /// worker count.
    ///
    /// # Errors
    /// Returns [`BenchError::EmptyParameterList`] for an empty list,
    /// [`BenchError::InvalidParameter`] for zero sizes or counts, invalid
    /// training parameters, or a failure probability outside `[0, 1]`, and
    /// [`BenchError::RuntimeBuild`] when the runtime cannot start.
    #[instrument(name = "suite.build", err, skip(self), fields(backend = %self.backend))]
    pub fn build(self) -> Result<BenchmarkSuite> {
        require_positive("data_sizes", &self.data_sizes)?;
        require_positive("worker_counts", &self.worker_counts)?;
        require_positive("batch_sizes", &self.batch_sizes)?;
        if self.failure_counts.is_empty() {
            return Err(BenchError::EmptyParameterList {
                parameter: "failure_counts",
            });
        }
        if self.ease_scores.is_empty() {
            return Err(BenchError::EmptyParameterList {
                parameter: "ease_scores",
            });
        }
        self.train.validate()?;
        let faults = FaultInjector::new(self.failure_probability, self.seed)?;

        let runtime = if self.backend.uses_task_runtime() {
            let workers = self.worker_counts.iter().copied().max().unwrap_or(1);
            Some(TaskRuntime::new(workers)?)
        } else {
            None
        };

        Ok(BenchmarkSuite {
            backend: self.backend,
            data_sizes: self.data_sizes,
            worker_counts: self.worker_counts,
            failure_counts: self.failure_counts,
            batch_sizes: self.batch_sizes,
            ease_scores: self.ease_scores,
            train: self.train,
            delay: SimulatedDelay::new(self.time_unit),
            retry: RetryPolicy::new(self.max_retries),
            faults,
            seed: self.seed,
            runtime,
        })
    }
}

fn require_positive(parameter: &'static str, values: &[usize]) -> Result<()> {
    if values.is_empty() {
        return Err(BenchError::EmptyParameterList { parameter });
    }
    if values.contains(&0) {
        return Err(BenchError::invalid_parameter(parameter, 0));
    }
    Ok(())
}

/// Typed outcome of every experiment in a run.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteDetails {
    /// Data-size samples.
    pub data_size: DataSizeOutcome,
    /// Node-count samples.
    pub node_count: NodeCountOutcome,
    /// Fault-tolerance samples and, for the task-parallel backend, the
    /// recovery outcome.
    pub fault_tolerance: FaultToleranceOutcome,
    /// Communication samples and buckets.
    pub communication: CommunicationOutcome,
    /// Averaged ease-of-use score.
    pub ease_of_use: f64,
}

/// Everything produced by [`BenchmarkSuite::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteReport {
    /// Backend the suite ran with.
    pub backend: Backend,
    /// One recorded value per experiment.
    pub results: BenchmarkResults,
    /// Per-experiment samples behind the recorded values.
    pub details: SuiteDetails,
}

impl SuiteReport {
    /// Message of the fault-injected task, when the backend ran one.
    #[must_use]
    pub fn recovery_message(&self) -> Option<&'static str> {
        self.details
            .fault_tolerance
            .recovery
            .as_ref()
            .map(experiments::RecoveryReport::message)
    }
}

/// Validated benchmark configuration ready to run.
#[derive(Debug)]
pub struct BenchmarkSuite {
    backend: Backend,
    data_sizes: Vec<usize>,
    worker_counts: Vec<usize>,
    failure_counts: Vec<u32>,
    batch_sizes: Vec<usize>,
    ease_scores: Vec<f64>,
    train: TrainConfig,
    delay: SimulatedDelay,
    retry: RetryPolicy,
    faults: FaultInjector,
    seed: u64,
    runtime: Option<TaskRuntime>,
}

impl BenchmarkSuite {
    /// Returns the backend under test.
    #[must_use]
    pub const fn backend(&self) -> Backend {
        self.backend
    }

    /// Returns the task runtime when the backend uses one.
    #[must_use]
    pub const fn runtime(&self) -> Option<&TaskRuntime> {
        self.runtime.as_ref()
    }

    /// Runs the five experiments in order against `dataset`.
    ///
    /// # Errors
    /// Propagates the first experiment failure; nothing is recorded for the
    /// experiments that did not run.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use mlbench_core::{Backend, Dataset, ExperimentKind, SuiteBuilder};
    ///
    /// let dataset = Dataset::from_parts("toy", vec![1.0, 0.0, 0.0, 1.0], vec![0, 1], 2, 2)
    ///     .expect("valid toy data");
    /// let suite = SuiteBuilder::new()
    ///     .with_backend(Backend::Eager)
    ///     .with_time_unit(Duration::ZERO)
    ///     .build()
    ///     .expect("configuration is valid");
    /// let report = suite.run(&dataset).expect("suite runs");
    /// assert!(report.results.is_complete());
    /// let ease = report.results.get(ExperimentKind::EaseOfUse).expect("recorded");
    /// assert!((ease - 0.82).abs() < 1e-12);
    /// ```
    #[instrument(
        name = "suite.run",
        err,
        skip(self, dataset),
        fields(backend = %self.backend, dataset = %dataset.name(), rows = dataset.len()),
    )]
    pub fn run(&self, dataset: &Dataset) -> Result<SuiteReport> {
        let context = ExperimentContext {
            backend: self.backend,
            train: self.train,
            delay: self.delay,
            runtime: self.runtime.as_ref(),
            retry: self.retry,
            faults: self.faults,
            seed: self.seed,
        };
        let mut results = BenchmarkResults::new();

        let data_size =
            experiments::scalability_with_data_size(&context, dataset, &self.data_sizes)?;
        results.record(ExperimentKind::DataSize, data_size.average_seconds)?;

        let node_count = experiments::scalability_with_node_count(&context, &self.worker_counts)?;
        results.record(ExperimentKind::NodeCount, node_count.average_seconds)?;

        let fault_tolerance =
            experiments::fault_tolerance_and_recovery(&context, &self.failure_counts)?;
        results.record(ExperimentKind::FaultTolerance, fault_tolerance.average_seconds)?;

        let communication =
            experiments::communication_overhead(&context, dataset, &self.batch_sizes)?;
        results.record(
            ExperimentKind::CommunicationOverhead,
            communication.average_seconds,
        )?;

        let ease_of_use = experiments::ease_of_use_and_setup(&self.ease_scores)?;
        results.record(ExperimentKind::EaseOfUse, ease_of_use)?;

        info!(recorded = results.len(), "benchmark suite completed");
        Ok(SuiteReport {
            backend: self.backend,
            results,
            details: SuiteDetails {
                data_size,
                node_count,
                fault_tolerance,
                communication,
                ease_of_use,
            },
        })
    }

    /// Stops the task runtime, if any.
    pub fn shutdown(self) {
        if let Some(runtime) = self.runtime {
            runtime.shutdown();
        }
    }
}
