//! Errors raised while fetching, parsing or generating datasets.

use std::{fmt, io, path::PathBuf};

use mlbench_core::BenchError;
use thiserror::Error;

/// Errors that may occur while preparing a dataset.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// Reading or writing cached files failed.
    #[error("I/O failure while handling cached dataset files: {0}")]
    Io(#[from] io::Error),
    /// A download failed.
    #[error("dataset download failed for `{url}`: {message}")]
    Download {
        /// URL that failed.
        url: String,
        /// Failure reported by the HTTP client.
        message: String,
    },
    /// A cached or downloaded IDX file was malformed.
    #[error("invalid IDX file `{path}`: {message}")]
    InvalidIdxFile {
        /// File that failed validation.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },
    /// Image and label files disagree on the number of records.
    #[error("image file holds {images} records but label file holds {labels}")]
    CountMismatch {
        /// Records in the image file.
        images: usize,
        /// Records in the label file.
        labels: usize,
    },
    /// The files parsed but do not have the expected shape.
    #[error("expected {expected_rows}x{expected_dimensions} images, got {rows}x{dimensions}")]
    UnexpectedShape {
        /// Rows expected for the split.
        expected_rows: usize,
        /// Features expected per row.
        expected_dimensions: usize,
        /// Rows found.
        rows: usize,
        /// Features found per row.
        dimensions: usize,
    },
    /// A generator parameter was rejected.
    #[error("invalid value `{value}` for `{parameter}`")]
    InvalidParameter {
        /// Parameter name.
        parameter: &'static str,
        /// Rendered value.
        value: String,
    },
    /// A size computation overflowed `usize`.
    #[error("dataset size overflows usize")]
    Overflow,
    /// The parsed data was rejected by the core dataset validation.
    #[error(transparent)]
    Dataset(#[from] BenchError),
}

/// Stable codes describing [`DatasetError`] variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum DatasetErrorCode {
    /// Cached file I/O failed.
    Io,
    /// A download failed.
    Download,
    /// An IDX file was malformed.
    InvalidIdxFile,
    /// Image and label counts differ.
    CountMismatch,
    /// The dataset shape was unexpected.
    UnexpectedShape,
    /// A generator parameter was rejected.
    InvalidParameter,
    /// A size computation overflowed.
    Overflow,
    /// Core validation rejected the data.
    Dataset,
}

impl DatasetErrorCode {
    /// Return the stable machine-readable representation of this error code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "DATASET_IO",
            Self::Download => "DATASET_DOWNLOAD",
            Self::InvalidIdxFile => "DATASET_INVALID_IDX_FILE",
            Self::CountMismatch => "DATASET_COUNT_MISMATCH",
            Self::UnexpectedShape => "DATASET_UNEXPECTED_SHAPE",
            Self::InvalidParameter => "DATASET_INVALID_PARAMETER",
            Self::Overflow => "DATASET_OVERFLOW",
            Self::Dataset => "DATASET_REJECTED",
        }
    }
}

impl fmt::Display for DatasetErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DatasetError {
    /// Retrieve the stable [`DatasetErrorCode`] for this error.
    #[must_use]
    pub const fn code(&self) -> DatasetErrorCode {
        match self {
            Self::Io(_) => DatasetErrorCode::Io,
            Self::Download { .. } => DatasetErrorCode::Download,
            Self::InvalidIdxFile { .. } => DatasetErrorCode::InvalidIdxFile,
            Self::CountMismatch { .. } => DatasetErrorCode::CountMismatch,
            Self::UnexpectedShape { .. } => DatasetErrorCode::UnexpectedShape,
            Self::InvalidParameter { .. } => DatasetErrorCode::InvalidParameter,
            Self::Overflow => DatasetErrorCode::Overflow,
            Self::Dataset(_) => DatasetErrorCode::Dataset,
        }
    }

    pub(crate) fn invalid_parameter(parameter: &'static str, value: impl fmt::Display) -> Self {
        Self::InvalidParameter {
            parameter,
            value: value.to_string(),
        }
    }
}
