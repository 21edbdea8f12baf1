//! Averaged setup-effort score. Nothing is measured.

use tracing::{info, instrument};

use super::require_values;
use crate::{BenchError, Result, mean};

/// Scores averaged when no list is configured.
pub const DEFAULT_EASE_SCORES: [f64; 5] = [0.5, 0.6, 0.8, 1.0, 1.2];

/// Returns the mean of `scores`.
///
/// # Errors
/// Returns [`BenchError::EmptyParameterList`] for an empty list and
/// [`BenchError::InvalidParameter`] when a score is negative or not finite.
///
/// # Examples
/// ```
/// use mlbench_core::experiments::{DEFAULT_EASE_SCORES, ease_of_use_and_setup};
///
/// let score = ease_of_use_and_setup(&DEFAULT_EASE_SCORES).expect("scores are valid");
/// assert!((score - 0.82).abs() < 1e-12);
/// ```
#[instrument(name = "experiment.ease_of_use", err, skip(scores), fields(scores = scores.len()))]
pub fn ease_of_use_and_setup(scores: &[f64]) -> Result<f64> {
    require_values("ease_scores", scores)?;
    if let Some(bad) = scores
        .iter()
        .find(|score| !score.is_finite() || **score < 0.0)
    {
        return Err(BenchError::invalid_parameter("ease_scores", bad));
    }
    let average = mean(scores).unwrap_or_default();
    info!(average, "ease of use scored");
    Ok(average)
}
