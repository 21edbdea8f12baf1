//! Core library for the mlbench training benchmark.
//!
//! Holds the in-memory [`Dataset`], a linear [`SoftmaxClassifier`], the
//! retry-capable [`TaskRuntime`], and the five benchmark experiments that a
//! [`BenchmarkSuite`] runs in a fixed order. Results are accumulated in a
//! [`BenchmarkResults`] value owned by the caller rather than in shared
//! state.

mod backend;
mod dataset;
mod error;
pub mod experiments;
mod fault;
mod model;
mod results;
mod runtime;
mod suite;
mod timing;

pub use crate::{
    backend::Backend,
    dataset::{Dataset, DatasetView, MAX_CLASSES, MIN_CLASSES},
    error::{BenchError, BenchErrorCode, Result, TaskErrorCode},
    fault::{FaultInjector, InjectedFault, RecoveryOutcome},
    model::{SoftmaxClassifier, TrainConfig, TrainingReport},
    results::{BenchmarkResults, ExperimentKind},
    runtime::{RetryPolicy, TaskContext, TaskError, TaskReport, TaskRuntime},
    suite::{
        BenchmarkSuite, DEFAULT_BATCH_SIZES, DEFAULT_DATA_SIZES, DEFAULT_FAILURE_COUNTS,
        DEFAULT_WORKER_COUNTS, SuiteBuilder, SuiteDetails, SuiteReport,
    },
    timing::{SimulatedDelay, mean},
};
