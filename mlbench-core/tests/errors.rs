//! Stable error codes exposed by the core crate.
#![expect(clippy::expect_used, reason = "tests require contextual panics")]

use std::sync::Arc;

use mlbench_core::{
    Backend, BenchError, BenchErrorCode, Dataset, RetryPolicy, TaskErrorCode, TaskRuntime,
};
use rstest::rstest;

#[rstest]
#[case::empty(BenchError::EmptyDataset { dataset: Arc::from("d") }, "MLBENCH_EMPTY_DATASET")]
#[case::unknown(BenchError::UnknownBackend { name: Arc::from("x") }, "MLBENCH_UNKNOWN_BACKEND")]
#[case::measurement(
    BenchError::InvalidMeasurement { experiment: "node_count", value: Arc::from("-1") },
    "MLBENCH_INVALID_MEASUREMENT"
)]
#[case::runtime(BenchError::RuntimeMissing { backend: "task-parallel" }, "MLBENCH_RUNTIME_MISSING")]
fn codes_are_stable(#[case] err: BenchError, #[case] expected: &str) {
    assert_eq!(err.code().as_str(), expected);
    assert_eq!(err.task_code(), None);
}

#[rstest]
fn dataset_errors_carry_codes() {
    let err = Dataset::from_parts("bad", vec![0.0; 3], vec![0, 1], 2, 2)
        .expect_err("misaligned buffer");
    assert_eq!(err.code(), BenchErrorCode::FeatureLengthMismatch);
    assert_eq!(
        err.to_string(),
        "feature buffer has length 3 but 4 values were expected"
    );
}

#[rstest]
fn unknown_backend_lists_alternatives() {
    let err = "spark".parse::<Backend>().expect_err("unknown backend");
    assert!(err.to_string().contains("task-parallel"));
}

#[rstest]
fn exhausted_task_maps_to_task_code() {
    let runtime = TaskRuntime::new(1).expect("pool starts");
    let err = runtime
        .run_one(RetryPolicy::new(1), |_| Err::<(), _>("nope"))
        .into_result()
        .expect_err("task never succeeds");
    assert_eq!(err.code(), BenchErrorCode::TaskFailure);
    assert_eq!(err.task_code(), Some(TaskErrorCode::Exhausted));
    assert_eq!(err.task_code().map(TaskErrorCode::as_str), Some("TASK_RETRIES_EXHAUSTED"));
}
