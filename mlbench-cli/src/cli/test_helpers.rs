//! Small helpers shared across CLI tests.
//!
//! Every run uses a tiny synthetic dataset and a zero time unit so the whole
//! suite finishes quickly.

use super::commands::run_command;
use super::{BackendArg, CliError, RunCommand, RunSource, SyntheticArgs};

fn tiny_source() -> RunSource {
    RunSource::Synthetic(SyntheticArgs {
        samples: 48,
        dimensions: 6,
        classes: 3,
        noise: 0.05,
    })
}

pub(super) fn quick_command(backend: BackendArg) -> RunCommand {
    RunCommand {
        backend,
        epochs: 1,
        learning_rate: 0.1,
        time_unit_ms: 0,
        failure_probability: 0.5,
        max_retries: 0,
        seed: 7,
        chart: None,
        source: tiny_source(),
    }
}

pub(super) fn run_command_expecting_error(cmd: RunCommand, panic_msg: &str) -> CliError {
    match run_command(cmd) {
        Ok(_) => panic!("{panic_msg}"),
        Err(err) => err,
    }
}
