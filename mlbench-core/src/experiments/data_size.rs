//! Training time as the number of rows grows.

use tracing::{info, instrument};

use super::{ExperimentContext, require_values};
use crate::{Dataset, Result, mean, timing::timed};

/// Measurement for one row threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataSizeSample {
    /// Requested row count.
    pub threshold: usize,
    /// Rows actually trained on; thresholds past the dataset are clamped.
    pub rows: usize,
    /// Wall-clock training time.
    pub seconds: f64,
    /// Training-set accuracy of the fitted classifier.
    pub accuracy: f64,
}

/// Result of [`scalability_with_data_size`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataSizeOutcome {
    /// One sample per threshold, in input order.
    pub samples: Vec<DataSizeSample>,
    /// Mean of the sample timings.
    pub average_seconds: f64,
}

/// Trains a fresh classifier on the first `threshold` rows for every
/// threshold and averages the training times.
///
/// # Errors
/// Returns [`crate::BenchError::EmptyParameterList`] for an empty threshold
/// list and propagates training failures.
#[instrument(
    name = "experiment.data_size",
    err,
    skip(context, dataset),
    fields(backend = %context.backend, rows = dataset.len()),
)]
pub fn scalability_with_data_size(
    context: &ExperimentContext<'_>,
    dataset: &Dataset,
    thresholds: &[usize],
) -> Result<DataSizeOutcome> {
    require_values("data_sizes", thresholds)?;
    let mut samples = Vec::with_capacity(thresholds.len());
    for &threshold in thresholds {
        let view = dataset.head(threshold);
        let (trained, seconds) = timed(|| context.train_fresh(view, &context.train));
        let (model, _) = trained?;
        let sample = DataSizeSample {
            threshold,
            rows: view.len(),
            seconds,
            accuracy: model.accuracy(view),
        };
        info!(
            threshold,
            rows = sample.rows,
            seconds,
            accuracy = sample.accuracy,
            "data size sample"
        );
        samples.push(sample);
    }
    let timings: Vec<f64> = samples.iter().map(|sample| sample.seconds).collect();
    Ok(DataSizeOutcome {
        average_seconds: mean(&timings).unwrap_or_default(),
        samples,
    })
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{Backend, BenchError, experiments::fixtures::{clusters, instant}};

    #[rstest]
    #[case::eager(Backend::Eager)]
    #[case::partitioned(Backend::Partitioned)]
    #[case::autograd(Backend::Autograd)]
    fn samples_every_threshold(clusters: Dataset, #[case] backend: Backend) {
        let context = instant(backend);
        let outcome = scalability_with_data_size(&context, &clusters, &[10, 40, 1_000])
            .expect("experiment succeeds");
        let rows: Vec<usize> = outcome.samples.iter().map(|s| s.rows).collect();
        assert_eq!(rows, vec![10, 40, 60]);
        assert!(outcome.average_seconds >= 0.0);
        assert!(outcome.samples.iter().all(|s| (0.0..=1.0).contains(&s.accuracy)));
    }

    #[rstest]
    fn rejects_empty_thresholds(clusters: Dataset) {
        let err = scalability_with_data_size(&instant(Backend::Eager), &clusters, &[])
            .expect_err("thresholds are required");
        assert_eq!(
            err,
            BenchError::EmptyParameterList {
                parameter: "data_sizes"
            }
        );
    }

    #[rstest]
    fn zero_threshold_is_an_empty_training_set(clusters: Dataset) {
        let err = scalability_with_data_size(&instant(Backend::Eager), &clusters, &[0])
            .expect_err("no rows to train on");
        assert!(matches!(err, BenchError::EmptyDataset { .. }));
    }
}
