//! Accumulator for per-experiment measurements.

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::{BenchError, Result};

/// The five experiments of the benchmark, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExperimentKind {
    /// Training time as the number of rows grows.
    DataSize,
    /// Simulated time as the number of workers grows.
    NodeCount,
    /// Simulated recovery time as failures accumulate.
    FaultTolerance,
    /// Training time across communication batch sizes.
    CommunicationOverhead,
    /// Averaged setup-effort score.
    EaseOfUse,
}

impl ExperimentKind {
    /// Every experiment in the order the suite runs them.
    pub const ALL: [Self; 5] = [
        Self::DataSize,
        Self::NodeCount,
        Self::FaultTolerance,
        Self::CommunicationOverhead,
        Self::EaseOfUse,
    ];

    /// Human-readable experiment name used in summaries and charts.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DataSize => "Scalability with Data Size",
            Self::NodeCount => "Scalability with Node Count",
            Self::FaultTolerance => "Fault Tolerance and Recovery",
            Self::CommunicationOverhead => "Communication Overhead",
            Self::EaseOfUse => "Ease of Use and Setup",
        }
    }

    /// Stable snake-case key used in structured logs.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::DataSize => "data_size",
            Self::NodeCount => "node_count",
            Self::FaultTolerance => "fault_tolerance",
            Self::CommunicationOverhead => "communication_overhead",
            Self::EaseOfUse => "ease_of_use",
        }
    }
}

impl fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per experiment. Recording the same experiment twice keeps the
/// latest value.
///
/// # Examples
/// ```
/// use mlbench_core::{BenchmarkResults, ExperimentKind};
///
/// let mut results = BenchmarkResults::new();
/// results.record(ExperimentKind::EaseOfUse, 0.82).expect("valid measurement");
/// results.record(ExperimentKind::EaseOfUse, 0.5).expect("valid measurement");
/// assert_eq!(results.get(ExperimentKind::EaseOfUse), Some(0.5));
/// assert_eq!(results.get(ExperimentKind::DataSize), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkResults {
    values: BTreeMap<ExperimentKind, f64>,
}

impl BenchmarkResults {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `seconds` for `kind`, replacing any earlier value.
    ///
    /// # Errors
    /// Returns [`BenchError::InvalidMeasurement`] when `seconds` is negative
    /// or not finite.
    pub fn record(&mut self, kind: ExperimentKind, seconds: f64) -> Result<()> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(BenchError::InvalidMeasurement {
                experiment: kind.key(),
                value: Arc::from(seconds.to_string()),
            });
        }
        self.values.insert(kind, seconds);
        Ok(())
    }

    /// Returns the value recorded for `kind`.
    #[must_use]
    pub fn get(&self, kind: ExperimentKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    /// Iterates every experiment in order with its value, if recorded.
    pub fn iter(&self) -> impl Iterator<Item = (ExperimentKind, Option<f64>)> + '_ {
        ExperimentKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
    }

    /// Iterates only the recorded experiments in order.
    pub fn recorded(&self) -> impl Iterator<Item = (ExperimentKind, f64)> + '_ {
        self.values.iter().map(|(kind, value)| (*kind, *value))
    }

    /// Number of recorded experiments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns `true` once every experiment has a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.values.len() == ExperimentKind::ALL.len()
    }
}
