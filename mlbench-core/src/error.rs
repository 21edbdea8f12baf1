//! Error types for the mlbench core library.
//!
//! Defines the error enum exposed by the public API, its stable error codes,
//! and a convenient result alias.

use std::{fmt, sync::Arc};

use thiserror::Error;

use crate::runtime::TaskError;

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// Error type produced while building datasets, training, or running the
/// benchmark suite.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum BenchError {
    /// The dataset contained no rows.
    #[error("dataset `{dataset}` contains no rows")]
    EmptyDataset {
        /// Name of the empty dataset.
        dataset: Arc<str>,
    },
    /// Feature vectors must have a positive dimension.
    #[error("dataset `{dataset}` must have a positive feature dimension")]
    ZeroDimension {
        /// Name of the offending dataset.
        dataset: Arc<str>,
    },
    /// The flat feature buffer did not match `rows * dimensions`.
    #[error("feature buffer has length {actual} but {expected} values were expected")]
    FeatureLengthMismatch {
        /// Number of values implied by the label count and dimension.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
    /// A label pointed outside the configured class range.
    #[error("label {label} at row {row} is outside the {classes} configured classes")]
    LabelOutOfRange {
        /// Row carrying the invalid label.
        row: usize,
        /// Label value found in the row.
        label: u8,
        /// Number of classes configured for the dataset.
        classes: usize,
    },
    /// Fewer than two classes, or more than a `u8` label can address.
    #[error("class count must be between 2 and 256 (got {got})")]
    InvalidClassCount {
        /// Class count supplied by the caller.
        got: usize,
    },
    /// Model and data disagree on the feature dimension.
    #[error("model expects {model} features but the data has {data}")]
    DimensionMismatch {
        /// Dimension configured on the model.
        model: usize,
        /// Dimension of the supplied data.
        data: usize,
    },
    /// The data carries more classes than the model can predict.
    #[error("model predicts {model} classes but the data has {data}")]
    ClassMismatch {
        /// Class count configured on the model.
        model: usize,
        /// Class count of the supplied data.
        data: usize,
    },
    /// A configuration parameter was rejected.
    #[error("invalid value `{value}` for `{parameter}`")]
    InvalidParameter {
        /// Name of the rejected parameter.
        parameter: &'static str,
        /// Rendered value that was rejected.
        value: Arc<str>,
    },
    /// A parameter list that drives an experiment was empty.
    #[error("parameter list `{parameter}` must not be empty")]
    EmptyParameterList {
        /// Name of the empty list.
        parameter: &'static str,
    },
    /// The requested backend name is not known.
    #[error("unknown backend `{name}`; expected one of eager, partitioned, task-parallel, autograd")]
    UnknownBackend {
        /// Name supplied by the caller.
        name: Arc<str>,
    },
    /// A measurement was negative or not finite.
    #[error("measurement {value} for `{experiment}` must be a finite non-negative number")]
    InvalidMeasurement {
        /// Key of the experiment that produced the value.
        experiment: &'static str,
        /// Rendered measurement.
        value: Arc<str>,
    },
    /// The task runtime thread pool could not be created.
    #[error("failed to start task runtime: {message}")]
    RuntimeBuild {
        /// Error reported by the thread-pool builder.
        message: Arc<str>,
    },
    /// The backend requires a task runtime but none was configured.
    #[error("backend `{backend}` requires a task runtime")]
    RuntimeMissing {
        /// Label of the backend that needed the runtime.
        backend: &'static str,
    },
    /// A dispatched task did not complete.
    #[error(transparent)]
    Task {
        /// Failure reported by the runtime.
        #[from]
        source: TaskError,
    },
}

define_error_codes! {
    /// Stable codes describing [`BenchError`] variants.
    enum BenchErrorCode for BenchError {
        /// The dataset contained no rows.
        EmptyDataset => EmptyDataset { .. } => "MLBENCH_EMPTY_DATASET",
        /// Feature vectors must have a positive dimension.
        ZeroDimension => ZeroDimension { .. } => "MLBENCH_ZERO_DIMENSION",
        /// The flat feature buffer did not match `rows * dimensions`.
        FeatureLengthMismatch => FeatureLengthMismatch { .. } => "MLBENCH_FEATURE_LENGTH_MISMATCH",
        /// A label pointed outside the configured class range.
        LabelOutOfRange => LabelOutOfRange { .. } => "MLBENCH_LABEL_OUT_OF_RANGE",
        /// The class count was below two or too large.
        InvalidClassCount => InvalidClassCount { .. } => "MLBENCH_INVALID_CLASS_COUNT",
        /// Model and data disagree on the feature dimension.
        DimensionMismatch => DimensionMismatch { .. } => "MLBENCH_DIMENSION_MISMATCH",
        /// The data carries more classes than the model can predict.
        ClassMismatch => ClassMismatch { .. } => "MLBENCH_CLASS_MISMATCH",
        /// A configuration parameter was rejected.
        InvalidParameter => InvalidParameter { .. } => "MLBENCH_INVALID_PARAMETER",
        /// A parameter list was empty.
        EmptyParameterList => EmptyParameterList { .. } => "MLBENCH_EMPTY_PARAMETER_LIST",
        /// The requested backend name is not known.
        UnknownBackend => UnknownBackend { .. } => "MLBENCH_UNKNOWN_BACKEND",
        /// A measurement was negative or not finite.
        InvalidMeasurement => InvalidMeasurement { .. } => "MLBENCH_INVALID_MEASUREMENT",
        /// The task runtime could not be created.
        RuntimeBuild => RuntimeBuild { .. } => "MLBENCH_RUNTIME_BUILD",
        /// The backend required a task runtime that was not configured.
        RuntimeMissing => RuntimeMissing { .. } => "MLBENCH_RUNTIME_MISSING",
        /// A dispatched task did not complete.
        TaskFailure => Task { .. } => "MLBENCH_TASK_FAILURE",
    }
}

define_error_codes! {
    /// Stable codes describing [`TaskError`] variants.
    enum TaskErrorCode for TaskError {
        /// Every attempt allowed by the retry policy failed.
        Exhausted => Exhausted { .. } => "TASK_RETRIES_EXHAUSTED",
        /// The task panicked and was not retried.
        Panicked => Panicked { .. } => "TASK_PANICKED",
    }
}

impl BenchError {
    /// Retrieve the inner [`TaskErrorCode`] when the error originated in a
    /// dispatched task.
    #[must_use]
    pub const fn task_code(&self) -> Option<TaskErrorCode> {
        match self {
            Self::Task { source } => Some(source.code()),
            _ => None,
        }
    }

    pub(crate) fn invalid_parameter(parameter: &'static str, value: impl fmt::Display) -> Self {
        Self::InvalidParameter {
            parameter,
            value: Arc::from(value.to_string()),
        }
    }
}

/// Convenient alias for results returned by the core API.
pub type Result<T> = core::result::Result<T, BenchError>;
