//! Deterministic synthetic classification data.
//!
//! Every class gets a random prototype in the unit hypercube; rows are the
//! prototype of their class plus uniform noise, clamped back into `[0, 1]`
//! so the values look like normalised pixel intensities.

use mlbench_core::{Dataset, MAX_CLASSES, MIN_CLASSES};
use rand::{Rng, SeedableRng, rngs::SmallRng};
use tracing::{debug, instrument};

use crate::DatasetError;

/// Shape and randomness of a synthetic dataset.
///
/// # Examples
/// ```
/// use mlbench_datasets::SyntheticConfig;
///
/// let config = SyntheticConfig { samples: 20, dimensions: 4, classes: 3, ..Default::default() };
/// let dataset = config.generate().expect("configuration is valid");
/// assert_eq!(dataset.len(), 20);
/// assert_eq!(dataset.features().len(), 80);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticConfig {
    /// Number of rows.
    pub samples: usize,
    /// Features per row.
    pub dimensions: usize,
    /// Number of classes; rows are assigned round-robin.
    pub classes: usize,
    /// Half-width of the uniform noise added to each feature.
    pub noise: f32,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            samples: 10_000,
            dimensions: 784,
            classes: 10,
            noise: 0.1,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    /// Generates the dataset described by the configuration.
    ///
    /// # Errors
    /// Returns [`DatasetError::InvalidParameter`] for zero samples or
    /// dimensions, fewer than two or more than 256 classes, or noise that is
    /// negative or not finite, and [`DatasetError::Overflow`] when the
    /// feature buffer would not fit in memory addressing.
    #[instrument(
        name = "datasets.synthetic",
        err,
        skip(self),
        fields(samples = self.samples, dimensions = self.dimensions, classes = self.classes),
    )]
    pub fn generate(&self) -> Result<Dataset, DatasetError> {
        self.validate()?;
        let total = self
            .samples
            .checked_mul(self.dimensions)
            .ok_or(DatasetError::Overflow)?;

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let prototypes: Vec<Vec<f32>> = (0..self.classes)
            .map(|_| {
                (0..self.dimensions)
                    .map(|_| rng.gen_range(0.0_f32..1.0))
                    .collect()
            })
            .collect();

        let mut features = Vec::with_capacity(total);
        let mut labels = Vec::with_capacity(self.samples);
        let classes = prototypes.iter().zip(0_u8..=u8::MAX);
        for (prototype, label) in classes.cycle().take(self.samples) {
            features.extend(prototype.iter().map(|centre| self.jitter(*centre, &mut rng)));
            labels.push(label);
        }
        debug!(rows = labels.len(), "synthetic dataset generated");

        Dataset::from_parts("synthetic", features, labels, self.dimensions, self.classes)
            .map_err(DatasetError::from)
    }

    fn validate(&self) -> Result<(), DatasetError> {
        if self.samples == 0 {
            return Err(DatasetError::invalid_parameter("samples", self.samples));
        }
        if self.dimensions == 0 {
            return Err(DatasetError::invalid_parameter("dimensions", self.dimensions));
        }
        if !(MIN_CLASSES..=MAX_CLASSES).contains(&self.classes) {
            return Err(DatasetError::invalid_parameter("classes", self.classes));
        }
        if !self.noise.is_finite() || self.noise < 0.0 {
            return Err(DatasetError::invalid_parameter("noise", self.noise));
        }
        Ok(())
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "noise is added to prototype coordinates"
    )]
    fn jitter(&self, centre: f32, rng: &mut SmallRng) -> f32 {
        if self.noise == 0.0 {
            return centre;
        }
        (centre + rng.gen_range(-self.noise..=self.noise)).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::DatasetErrorCode;

    fn small() -> SyntheticConfig {
        SyntheticConfig {
            samples: 30,
            dimensions: 5,
            classes: 3,
            noise: 0.05,
            seed: 9,
        }
    }

    #[rstest]
    fn rows_match_labels_and_dimensions() {
        let dataset = small().generate().expect("valid configuration");
        assert_eq!(dataset.len(), 30);
        assert_eq!(dataset.features().len(), 30 * 5);
        assert_eq!(dataset.class_count(), 3);
        assert_eq!(&dataset.labels()[..6], &[0_u8, 1, 2, 0, 1, 2]);
        assert!(dataset.features().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[rstest]
    fn same_seed_same_data() {
        let first = small().generate().expect("valid configuration");
        let second = small().generate().expect("valid configuration");
        assert_eq!(first, second);
        let other = SyntheticConfig { seed: 10, ..small() }
            .generate()
            .expect("valid configuration");
        assert_ne!(first.features(), other.features());
    }

    #[rstest]
    fn zero_noise_repeats_prototypes() {
        let dataset = SyntheticConfig { noise: 0.0, ..small() }
            .generate()
            .expect("valid configuration");
        let rows: Vec<&[f32]> = dataset.view().rows().map(|(row, _)| row).collect();
        assert_eq!(rows[0], rows[3]);
        assert_ne!(rows[0], rows[1]);
    }

    #[rstest]
    #[case::samples(SyntheticConfig { samples: 0, ..small() }, "samples")]
    #[case::dimensions(SyntheticConfig { dimensions: 0, ..small() }, "dimensions")]
    #[case::no_classes(SyntheticConfig { classes: 0, ..small() }, "classes")]
    #[case::single_class(SyntheticConfig { classes: 1, ..small() }, "classes")]
    #[case::many_classes(SyntheticConfig { classes: 257, ..small() }, "classes")]
    #[case::negative_noise(SyntheticConfig { noise: -0.1, ..small() }, "noise")]
    #[case::nan_noise(SyntheticConfig { noise: f32::NAN, ..small() }, "noise")]
    fn rejects_invalid_configuration(#[case] config: SyntheticConfig, #[case] expected: &str) {
        let err = config.generate().expect_err("configuration must be rejected");
        assert_eq!(err.code(), DatasetErrorCode::InvalidParameter);
        let DatasetError::InvalidParameter { parameter, .. } = err else {
            panic!("expected InvalidParameter");
        };
        assert_eq!(parameter, expected);
    }
}
