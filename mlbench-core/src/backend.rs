//! Execution backends compared by the benchmark.

use std::{fmt, str::FromStr, sync::Arc};

use crate::BenchError;

/// Selects how training work is executed and how the node-count and
/// fault-tolerance experiments behave.
///
/// Every backend trains the same [`crate::SoftmaxClassifier`]; they differ in
/// how a mini-batch gradient is evaluated and whether work is dispatched to
/// the [`crate::TaskRuntime`].
///
/// # Examples
/// ```
/// use mlbench_core::Backend;
///
/// let backend: Backend = "task-parallel".parse().expect("known backend");
/// assert_eq!(backend, Backend::TaskParallel);
/// assert!(backend.uses_task_runtime());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Backend {
    /// Sequential mini-batch training in the order rows were loaded.
    #[default]
    Eager,
    /// Mini-batches are split into partitions whose gradients are computed in
    /// parallel and reduced.
    Partitioned,
    /// Work is dispatched as retry-capable tasks to the task runtime.
    TaskParallel,
    /// Sequential mini-batch training with batches shuffled every epoch.
    Autograd,
}

/// How a mini-batch gradient is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GradientMode {
    Sequential,
    Partitioned,
}

impl Backend {
    /// Every backend in presentation order.
    pub const ALL: [Self; 4] = [
        Self::Eager,
        Self::Partitioned,
        Self::TaskParallel,
        Self::Autograd,
    ];

    /// Returns the stable lowercase label of the backend.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Partitioned => "partitioned",
            Self::TaskParallel => "task-parallel",
            Self::Autograd => "autograd",
        }
    }

    /// Returns `true` when the backend dispatches work to a
    /// [`crate::TaskRuntime`].
    #[must_use]
    pub const fn uses_task_runtime(self) -> bool {
        matches!(self, Self::TaskParallel)
    }

    pub(crate) const fn gradient_mode(self) -> GradientMode {
        match self {
            Self::Partitioned => GradientMode::Partitioned,
            Self::Eager | Self::TaskParallel | Self::Autograd => GradientMode::Sequential,
        }
    }

    pub(crate) const fn shuffles_batches(self) -> bool {
        matches!(self, Self::Autograd)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Backend {
    type Err = BenchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalised = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|backend| backend.label() == normalised)
            .ok_or_else(|| BenchError::UnknownBackend {
                name: Arc::from(raw),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("eager", Backend::Eager)]
    #[case(" Partitioned ", Backend::Partitioned)]
    #[case("TASK-PARALLEL", Backend::TaskParallel)]
    #[case("autograd", Backend::Autograd)]
    fn parses_known_labels(#[case] raw: &str, #[case] expected: Backend) {
        assert_eq!(raw.parse::<Backend>().expect("label must parse"), expected);
    }

    #[rstest]
    fn rejects_unknown_label() {
        let err = "mapreduce"
            .parse::<Backend>()
            .expect_err("unknown backend must fail");
        assert!(matches!(err, BenchError::UnknownBackend { ref name } if &**name == "mapreduce"));
    }

    #[rstest]
    fn labels_round_trip_through_display() {
        for backend in Backend::ALL {
            assert_eq!(backend.to_string().parse::<Backend>().ok(), Some(backend));
        }
    }

    #[rstest]
    fn only_partitioned_reduces_in_parallel() {
        let partitioned: Vec<_> = Backend::ALL
            .into_iter()
            .filter(|backend| backend.gradient_mode() == GradientMode::Partitioned)
            .collect();
        assert_eq!(partitioned, vec![Backend::Partitioned]);
    }
}
