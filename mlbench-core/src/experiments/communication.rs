//! Training time across communication batch sizes.
//!
//! Batch sizes are bucketed by parity: even sizes count as synchronous
//! exchanges and odd sizes as asynchronous ones. The bucket that receives
//! nothing is padded with zeros to the other bucket's length.

use std::fmt;

use tracing::{debug, info, instrument};

use super::{ExperimentContext, require_values};
use crate::{Dataset, Result, TrainConfig, mean, timing::timed};

/// Communication style attributed to a batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Even batch sizes.
    Synchronous,
    /// Odd batch sizes.
    Asynchronous,
}

impl SyncMode {
    /// Lowercase label used in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Synchronous => "synchronous",
            Self::Asynchronous => "asynchronous",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies `batch_size` by parity.
///
/// # Examples
/// ```
/// use mlbench_core::experiments::{SyncMode, sync_mode};
///
/// assert_eq!(sync_mode(64), SyncMode::Synchronous);
/// assert_eq!(sync_mode(33), SyncMode::Asynchronous);
/// ```
#[must_use]
pub const fn sync_mode(batch_size: usize) -> SyncMode {
    if batch_size & 1 == 0 {
        SyncMode::Synchronous
    } else {
        SyncMode::Asynchronous
    }
}

/// Measurement for one batch size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommunicationSample {
    /// Rows per gradient step.
    pub batch_size: usize,
    /// Bucket the batch size falls into.
    pub mode: SyncMode,
    /// Wall-clock time of one training epoch.
    pub seconds: f64,
}

/// Timings split by [`SyncMode`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommunicationBuckets {
    /// Timings of even batch sizes.
    pub synchronous: Vec<f64>,
    /// Timings of odd batch sizes.
    pub asynchronous: Vec<f64>,
}

impl CommunicationBuckets {
    /// Value recorded for the experiment: the mean synchronous timing.
    #[must_use]
    pub fn recorded_seconds(&self) -> f64 {
        mean(&self.synchronous).unwrap_or_default()
    }
}

/// Routes every sample into its bucket, then pads an empty bucket with
/// zeros so both buckets have the same length.
///
/// # Examples
/// ```
/// use mlbench_core::experiments::{CommunicationSample, bucket_timings, sync_mode};
///
/// let samples: Vec<_> = [32, 64]
///     .into_iter()
///     .map(|batch_size| CommunicationSample {
///         batch_size,
///         mode: sync_mode(batch_size),
///         seconds: 1.0,
///     })
///     .collect();
/// let buckets = bucket_timings(&samples);
/// assert_eq!(buckets.synchronous, vec![1.0, 1.0]);
/// assert_eq!(buckets.asynchronous, vec![0.0, 0.0]);
/// ```
#[must_use]
pub fn bucket_timings(samples: &[CommunicationSample]) -> CommunicationBuckets {
    let mut buckets = CommunicationBuckets::default();
    for sample in samples {
        match sample.mode {
            SyncMode::Synchronous => buckets.synchronous.push(sample.seconds),
            SyncMode::Asynchronous => buckets.asynchronous.push(sample.seconds),
        }
    }
    if buckets.asynchronous.is_empty() {
        buckets.asynchronous = vec![0.0; buckets.synchronous.len()];
    } else if buckets.synchronous.is_empty() {
        buckets.synchronous = vec![0.0; buckets.asynchronous.len()];
    }
    buckets
}

/// Result of [`communication_overhead`].
#[derive(Debug, Clone, PartialEq)]
pub struct CommunicationOutcome {
    /// One sample per batch size, in input order.
    pub samples: Vec<CommunicationSample>,
    /// Timings bucketed by parity.
    pub buckets: CommunicationBuckets,
    /// Value recorded for the experiment.
    pub average_seconds: f64,
}

/// Trains one epoch at each batch size and buckets the timings.
///
/// # Errors
/// Returns [`crate::BenchError::EmptyParameterList`] for an empty list,
/// [`crate::BenchError::InvalidParameter`] for a zero batch size, and
/// propagates training failures.
#[instrument(
    name = "experiment.communication_overhead",
    err,
    skip(context, dataset),
    fields(backend = %context.backend, rows = dataset.len()),
)]
pub fn communication_overhead(
    context: &ExperimentContext<'_>,
    dataset: &Dataset,
    batch_sizes: &[usize],
) -> Result<CommunicationOutcome> {
    require_values("batch_sizes", batch_sizes)?;
    let mut samples = Vec::with_capacity(batch_sizes.len());
    for &batch_size in batch_sizes {
        let config = TrainConfig {
            epochs: 1,
            batch_size,
            ..context.train
        };
        let (trained, seconds) = timed(|| context.train_fresh(dataset.view(), &config));
        trained?;
        let mode = sync_mode(batch_size);
        debug!(batch_size, mode = %mode, seconds, "communication sample");
        samples.push(CommunicationSample {
            batch_size,
            mode,
            seconds,
        });
    }
    let buckets = bucket_timings(&samples);
    let average_seconds = buckets.recorded_seconds();
    info!(
        synchronous = buckets.synchronous.len(),
        average_seconds, "communication overhead measured"
    );
    Ok(CommunicationOutcome {
        samples,
        buckets,
        average_seconds,
    })
}
