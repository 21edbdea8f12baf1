//! In-memory labelled feature matrix.
//!
//! A [`Dataset`] owns a row-major `f32` feature buffer and a label vector
//! aligned by row. Both are validated once at construction and never mutated
//! afterwards; experiments borrow prefixes of it through [`DatasetView`].

use std::sync::Arc;

use crate::{BenchError, Result};

/// Fewest classes a classifier can be trained on.
pub const MIN_CLASSES: usize = 2;

/// Largest class count addressable by a `u8` label.
pub const MAX_CLASSES: usize = 256;

/// Labelled feature matrix used for training.
///
/// # Examples
/// ```
/// use mlbench_core::Dataset;
///
/// let dataset = Dataset::from_parts("tiny", vec![0.0, 1.0, 1.0, 0.0], vec![0, 1], 2, 2)
///     .expect("parts are consistent");
/// assert_eq!(dataset.len(), 2);
/// assert_eq!(dataset.dimensions(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    name: Arc<str>,
    features: Vec<f32>,
    labels: Vec<u8>,
    dimensions: usize,
    classes: usize,
}

impl Dataset {
    /// Builds a dataset from a flat row-major feature buffer and its labels.
    ///
    /// # Errors
    /// Returns [`BenchError::EmptyDataset`] when `labels` is empty,
    /// [`BenchError::ZeroDimension`] when `dimensions` is zero,
    /// [`BenchError::InvalidClassCount`] when `classes` is below
    /// [`MIN_CLASSES`] or above [`MAX_CLASSES`],
    /// [`BenchError::FeatureLengthMismatch`] when the buffer
    /// is not `labels.len() * dimensions` long, and
    /// [`BenchError::LabelOutOfRange`] when a label is not below `classes`.
    pub fn from_parts(
        name: impl Into<String>,
        features: Vec<f32>,
        labels: Vec<u8>,
        dimensions: usize,
        classes: usize,
    ) -> Result<Self> {
        let name: Arc<str> = Arc::from(name.into());
        if labels.is_empty() {
            return Err(BenchError::EmptyDataset { dataset: name });
        }
        if dimensions == 0 {
            return Err(BenchError::ZeroDimension { dataset: name });
        }
        if !(MIN_CLASSES..=MAX_CLASSES).contains(&classes) {
            return Err(BenchError::InvalidClassCount { got: classes });
        }
        let expected = labels
            .len()
            .checked_mul(dimensions)
            .ok_or_else(|| BenchError::invalid_parameter("dimensions", dimensions))?;
        if features.len() != expected {
            return Err(BenchError::FeatureLengthMismatch {
                expected,
                actual: features.len(),
            });
        }
        if let Some((row, &label)) = labels
            .iter()
            .enumerate()
            .find(|(_, label)| usize::from(**label) >= classes)
        {
            return Err(BenchError::LabelOutOfRange {
                row,
                label,
                classes,
            });
        }

        Ok(Self {
            name,
            features,
            labels,
            dimensions,
            classes,
        })
    }

    /// Returns the dataset name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when the dataset has no rows. Construction rejects
    /// empty datasets, so this only exists for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the number of features per row.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns the number of label classes.
    #[must_use]
    pub const fn class_count(&self) -> usize {
        self.classes
    }

    /// Returns the flat row-major feature buffer.
    #[must_use]
    pub fn features(&self) -> &[f32] {
        &self.features
    }

    /// Returns the label vector.
    #[must_use]
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    /// Borrows the whole dataset.
    #[must_use]
    pub fn view(&self) -> DatasetView<'_> {
        self.head(self.len())
    }

    /// Borrows the first `limit` rows. Limits past the end are clamped.
    ///
    /// # Examples
    /// ```
    /// use mlbench_core::Dataset;
    ///
    /// let dataset = Dataset::from_parts("tiny", vec![0.0; 6], vec![0, 1, 0], 2, 2)
    ///     .expect("parts are consistent");
    /// assert_eq!(dataset.head(2).len(), 2);
    /// assert_eq!(dataset.head(10).len(), 3);
    /// ```
    #[must_use]
    pub fn head(&self, limit: usize) -> DatasetView<'_> {
        let rows = limit.min(self.len());
        let end = rows.saturating_mul(self.dimensions);
        DatasetView {
            features: self.features.get(..end).unwrap_or_default(),
            labels: self.labels.get(..rows).unwrap_or_default(),
            dimensions: self.dimensions,
            classes: self.classes,
        }
    }
}

/// Borrowed, row-aligned slice of a [`Dataset`].
#[derive(Clone, Copy, Debug)]
pub struct DatasetView<'a> {
    features: &'a [f32],
    labels: &'a [u8],
    dimensions: usize,
    classes: usize,
}

impl<'a> DatasetView<'a> {
    /// Returns the number of rows in the view.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when the view has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Returns the number of features per row.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns the class count of the underlying dataset.
    #[must_use]
    pub const fn class_count(&self) -> usize {
        self.classes
    }

    /// Returns the flat feature buffer covered by the view.
    #[must_use]
    pub const fn features(&self) -> &'a [f32] {
        self.features
    }

    /// Returns the labels covered by the view.
    #[must_use]
    pub const fn labels(&self) -> &'a [u8] {
        self.labels
    }

    /// Iterates `(features, label)` pairs in row order.
    pub fn rows(&self) -> impl Iterator<Item = (&'a [f32], u8)> + 'a {
        self.features
            .chunks_exact(self.dimensions)
            .zip(self.labels.iter().copied())
    }

    /// Splits the view into consecutive batches of at most `batch_size`
    /// rows. A zero batch size is treated as one.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = DatasetView<'a>> + 'a {
        let rows = batch_size.max(1);
        let dimensions = self.dimensions;
        let classes = self.classes;
        self.features
            .chunks(rows.saturating_mul(dimensions))
            .zip(self.labels.chunks(rows))
            .map(move |(features, labels)| DatasetView {
                features,
                labels,
                dimensions,
                classes,
            })
    }

    pub(crate) const fn from_raw(
        features: &'a [f32],
        labels: &'a [u8],
        dimensions: usize,
        classes: usize,
    ) -> Self {
        Self {
            features,
            labels,
            dimensions,
            classes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn grid(rows: usize, dimensions: usize) -> Dataset {
        let features = (0..rows * dimensions).map(|value| value as f32).collect();
        let labels = (0..rows).map(|row| u8::try_from(row % 3).expect("fits")).collect();
        Dataset::from_parts("grid", features, labels, dimensions, 3).expect("valid grid")
    }

    #[rstest]
    fn rejects_empty_labels() {
        let err = Dataset::from_parts("empty", Vec::new(), Vec::new(), 4, 2)
            .expect_err("empty data must fail");
        assert!(matches!(err, BenchError::EmptyDataset { .. }));
    }

    #[rstest]
    fn rejects_zero_dimension() {
        let err = Dataset::from_parts("flat", Vec::new(), vec![0], 0, 2)
            .expect_err("zero dimension must fail");
        assert!(matches!(err, BenchError::ZeroDimension { .. }));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::single(1)]
    #[case::too_many(257)]
    fn rejects_invalid_class_count(#[case] classes: usize) {
        let err = Dataset::from_parts("bad", vec![0.0], vec![0], 1, classes)
            .expect_err("class count must be validated");
        assert_eq!(err, BenchError::InvalidClassCount { got: classes });
    }

    #[rstest]
    fn single_class_message_states_the_lower_bound() {
        let err = Dataset::from_parts("one", vec![0.0, 1.0], vec![0, 0], 1, 1)
            .expect_err("one class is not trainable");
        assert_eq!(
            err.to_string(),
            "class count must be between 2 and 256 (got 1)"
        );
    }

    #[rstest]
    fn rejects_misaligned_features() {
        let err = Dataset::from_parts("short", vec![0.0; 5], vec![0, 1], 3, 2)
            .expect_err("feature length must match");
        assert_eq!(
            err,
            BenchError::FeatureLengthMismatch {
                expected: 6,
                actual: 5
            }
        );
    }

    #[rstest]
    fn rejects_label_outside_classes() {
        let err = Dataset::from_parts("labels", vec![0.0; 3], vec![0, 1, 2], 1, 2)
            .expect_err("label 2 is out of range for two classes");
        assert_eq!(
            err,
            BenchError::LabelOutOfRange {
                row: 2,
                label: 2,
                classes: 2
            }
        );
    }

    #[rstest]
    #[case::within(4, 4)]
    #[case::clamped(50, 10)]
    #[case::zero(0, 0)]
    fn head_clamps_to_dataset(#[case] limit: usize, #[case] expected: usize) {
        let dataset = grid(10, 3);
        let view = dataset.head(limit);
        assert_eq!(view.len(), expected);
        assert_eq!(view.features().len(), expected * 3);
    }

    #[rstest]
    fn rows_are_aligned_with_labels() {
        let dataset = grid(4, 2);
        let rows: Vec<_> = dataset.view().rows().collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], (&[2.0_f32, 3.0][..], 1));
        assert_eq!(rows[3], (&[6.0_f32, 7.0][..], 0));
    }

    #[rstest]
    #[case::even(10, 5, vec![5, 5])]
    #[case::ragged(10, 4, vec![4, 4, 2])]
    #[case::single(3, 8, vec![3])]
    #[case::zero_batch(2, 0, vec![1, 1])]
    fn batches_cover_every_row(
        #[case] rows: usize,
        #[case] batch_size: usize,
        #[case] expected: Vec<usize>,
    ) {
        let dataset = grid(rows, 2);
        let sizes: Vec<usize> = dataset.view().batches(batch_size).map(|b| b.len()).collect();
        assert_eq!(sizes, expected);
    }
}
