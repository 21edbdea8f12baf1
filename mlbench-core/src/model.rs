//! Linear softmax classifier trained with mini-batch gradient descent.
#![expect(
    clippy::float_arithmetic,
    reason = "softmax regression is floating-point arithmetic throughout"
)]

use std::time::{Duration, Instant};

use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    Backend, BenchError, DatasetView, MIN_CLASSES, Result,
    backend::GradientMode,
};

/// Guards `ln(0)` when a predicted probability underflows.
const PROBABILITY_FLOOR: f32 = 1e-7;

/// Hyper-parameters for [`SoftmaxClassifier::fit`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainConfig {
    /// Number of passes over the data.
    pub epochs: usize,
    /// Rows per gradient step.
    pub batch_size: usize,
    /// Step size applied to the averaged gradient.
    pub learning_rate: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 2,
            batch_size: 32,
            learning_rate: 0.1,
        }
    }
}

impl TrainConfig {
    /// Checks that every field is usable.
    ///
    /// # Errors
    /// Returns [`BenchError::InvalidParameter`] when `epochs` or `batch_size`
    /// is zero, or the learning rate is not finite and positive.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(BenchError::invalid_parameter("epochs", self.epochs));
        }
        if self.batch_size == 0 {
            return Err(BenchError::invalid_parameter("batch_size", self.batch_size));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(BenchError::invalid_parameter(
                "learning_rate",
                self.learning_rate,
            ));
        }
        Ok(())
    }
}

/// Summary of a [`SoftmaxClassifier::fit`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingReport {
    /// Epochs completed.
    pub epochs: usize,
    /// Gradient steps taken across all epochs.
    pub batches: usize,
    /// Mean cross-entropy over the last epoch.
    pub final_loss: f32,
    /// Wall-clock time spent in `fit`.
    pub elapsed: Duration,
}

/// Multinomial logistic regression over dense `f32` features.
///
/// # Examples
/// ```
/// use mlbench_core::{Backend, Dataset, SoftmaxClassifier, TrainConfig};
///
/// let dataset = Dataset::from_parts(
///     "toy",
///     vec![1.0, 0.0, 0.0, 1.0, 1.0, 0.1, 0.1, 1.0],
///     vec![0, 1, 0, 1],
///     2,
///     2,
/// )
/// .expect("valid toy data");
/// let mut model = SoftmaxClassifier::new(2, 2).expect("valid shape");
/// let config = TrainConfig { epochs: 50, batch_size: 2, learning_rate: 0.5 };
/// model.fit(dataset.view(), &config, Backend::Eager, 7).expect("training succeeds");
/// assert_eq!(model.accuracy(dataset.view()), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SoftmaxClassifier {
    dimensions: usize,
    classes: usize,
    /// Class-major weights: row `k` holds the weights of class `k`.
    weights: Vec<f32>,
    bias: Vec<f32>,
}

impl SoftmaxClassifier {
    /// Creates a zero-initialised classifier.
    ///
    /// # Errors
    /// Returns [`BenchError::InvalidParameter`] for a zero dimension and
    /// [`BenchError::InvalidClassCount`] for fewer than two classes.
    pub fn new(dimensions: usize, classes: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(BenchError::invalid_parameter("dimensions", dimensions));
        }
        if classes < MIN_CLASSES {
            return Err(BenchError::InvalidClassCount { got: classes });
        }
        let weight_len = dimensions
            .checked_mul(classes)
            .ok_or_else(|| BenchError::invalid_parameter("dimensions", dimensions))?;
        Ok(Self {
            dimensions,
            classes,
            weights: vec![0.0; weight_len],
            bias: vec![0.0; classes],
        })
    }

    /// Returns the expected number of features per row.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Returns the number of classes the model predicts.
    #[must_use]
    pub const fn classes(&self) -> usize {
        self.classes
    }

    /// Computes class probabilities for one row.
    #[must_use]
    pub fn probabilities(&self, row: &[f32]) -> Vec<f32> {
        let mut scores: Vec<f32> = self
            .weights
            .chunks_exact(self.dimensions)
            .zip(&self.bias)
            .map(|(weights, bias)| dot(weights, row) + bias)
            .collect();
        softmax_in_place(&mut scores);
        scores
    }

    /// Returns the most probable class for one row.
    #[must_use]
    pub fn predict(&self, row: &[f32]) -> usize {
        self.probabilities(row)
            .iter()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (class, &p)| {
                if p > best.1 { (class, p) } else { best }
            })
            .0
    }

    /// Fraction of rows in `view` whose label is predicted correctly.
    /// An empty view scores zero.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "row counts are far below 2^52"
    )]
    pub fn accuracy(&self, view: DatasetView<'_>) -> f64 {
        if view.is_empty() {
            return 0.0;
        }
        let correct = view
            .rows()
            .filter(|(row, label)| self.predict(row) == usize::from(*label))
            .count();
        correct as f64 / view.len() as f64
    }

    /// Trains the classifier in place.
    ///
    /// `seed` drives the batch shuffling of [`Backend::Autograd`]; other
    /// backends visit batches in row order.
    ///
    /// # Errors
    /// Returns [`BenchError::InvalidParameter`] for an invalid `config`,
    /// [`BenchError::DimensionMismatch`] or [`BenchError::ClassMismatch`] when
    /// the view does not fit the model, and [`BenchError::EmptyDataset`] for
    /// an empty view.
    #[instrument(
        name = "model.fit",
        err,
        skip(self, view, config),
        fields(rows = view.len(), epochs = config.epochs, batch_size = config.batch_size),
    )]
    pub fn fit(
        &mut self,
        view: DatasetView<'_>,
        config: &TrainConfig,
        backend: Backend,
        seed: u64,
    ) -> Result<TrainingReport> {
        config.validate()?;
        if view.dimensions() != self.dimensions {
            return Err(BenchError::DimensionMismatch {
                model: self.dimensions,
                data: view.dimensions(),
            });
        }
        if view.class_count() > self.classes {
            return Err(BenchError::ClassMismatch {
                model: self.classes,
                data: view.class_count(),
            });
        }
        if view.is_empty() {
            return Err(BenchError::EmptyDataset {
                dataset: "view".into(),
            });
        }

        let started = Instant::now();
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut steps = 0_usize;
        let mut final_loss = 0.0_f32;

        for epoch in 0..config.epochs {
            let mut batches: Vec<DatasetView<'_>> = view.batches(config.batch_size).collect();
            if backend.shuffles_batches() {
                batches.shuffle(&mut rng);
            }

            let mut epoch_loss = 0.0_f32;
            let mut epoch_rows = 0_usize;
            for batch in batches {
                let gradient = self.gradient(batch, backend.gradient_mode());
                epoch_loss += gradient.loss;
                epoch_rows += gradient.rows;
                self.apply(&gradient, config.learning_rate);
                steps += 1;
            }
            final_loss = mean_loss(epoch_loss, epoch_rows);
            debug!(epoch, loss = final_loss, "epoch completed");
        }

        Ok(TrainingReport {
            epochs: config.epochs,
            batches: steps,
            final_loss,
            elapsed: started.elapsed(),
        })
    }

    fn gradient(&self, batch: DatasetView<'_>, mode: GradientMode) -> Gradient {
        match mode {
            GradientMode::Sequential => self.partial_gradient(batch),
            GradientMode::Partitioned => {
                let rows_per_partition = batch
                    .len()
                    .div_ceil(rayon::current_num_threads().max(1))
                    .max(1);
                let dimensions = self.dimensions;
                let classes = batch.class_count();
                batch
                    .features()
                    .par_chunks(rows_per_partition.saturating_mul(dimensions))
                    .zip(batch.labels().par_chunks(rows_per_partition))
                    .map(|(features, labels)| {
                        self.partial_gradient(DatasetView::from_raw(
                            features, labels, dimensions, classes,
                        ))
                    })
                    .reduce(|| Gradient::zeros(self.weights.len(), self.classes), Gradient::merge)
            }
        }
    }

    fn partial_gradient(&self, batch: DatasetView<'_>) -> Gradient {
        let mut gradient = Gradient::zeros(self.weights.len(), self.classes);
        for (row, label) in batch.rows() {
            let probabilities = self.probabilities(row);
            let target = usize::from(label);
            let picked = probabilities.get(target).copied().unwrap_or(0.0);
            gradient.loss -= picked.max(PROBABILITY_FLOOR).ln();
            gradient.rows += 1;

            let class_rows = gradient.weights.chunks_exact_mut(self.dimensions);
            for (class, ((weights, bias), p)) in class_rows
                .zip(gradient.bias.iter_mut())
                .zip(probabilities)
                .enumerate()
            {
                let delta = if class == target { p - 1.0 } else { p };
                *bias += delta;
                for (weight, x) in weights.iter_mut().zip(row) {
                    *weight += delta * x;
                }
            }
        }
        gradient
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "batch sizes are far below 2^23"
    )]
    fn apply(&mut self, gradient: &Gradient, learning_rate: f32) {
        if gradient.rows == 0 {
            return;
        }
        let scale = learning_rate / gradient.rows as f32;
        for (weight, grad) in self.weights.iter_mut().zip(&gradient.weights) {
            *weight -= scale * grad;
        }
        for (bias, grad) in self.bias.iter_mut().zip(&gradient.bias) {
            *bias -= scale * grad;
        }
    }
}

/// Summed cross-entropy gradient over a set of rows.
#[derive(Debug, Clone, PartialEq)]
struct Gradient {
    weights: Vec<f32>,
    bias: Vec<f32>,
    loss: f32,
    rows: usize,
}

impl Gradient {
    fn zeros(weights: usize, classes: usize) -> Self {
        Self {
            weights: vec![0.0; weights],
            bias: vec![0.0; classes],
            loss: 0.0,
            rows: 0,
        }
    }

    fn merge(mut self, other: Self) -> Self {
        for (left, right) in self.weights.iter_mut().zip(&other.weights) {
            *left += right;
        }
        for (left, right) in self.bias.iter_mut().zip(&other.bias) {
            *left += right;
        }
        self.loss += other.loss;
        self.rows += other.rows;
        self
    }
}

fn dot(left: &[f32], right: &[f32]) -> f32 {
    left.iter().zip(right).map(|(a, b)| a * b).sum()
}

fn softmax_in_place(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut total = 0.0_f32;
    for score in scores.iter_mut() {
        *score = (*score - max).exp();
        total += *score;
    }
    if total > 0.0 {
        for score in scores.iter_mut() {
            *score /= total;
        }
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "row counts are far below 2^23"
)]
fn mean_loss(total: f32, rows: usize) -> f32 {
    if rows == 0 { 0.0 } else { total / rows as f32 }
}
