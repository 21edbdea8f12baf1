//! CLI entry point for the mlbench training benchmark.
//!
//! Parses arguments, runs the benchmark suite against the selected dataset,
//! prints the summary to stdout and maps failures to a non-zero exit code.
//! Logging is installed first so every later step emits structured events.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use mlbench_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("benchmark run failed")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_summary(&summary, &mut writer).context("failed to render summary")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let (code, task_code) = err
            .downcast_ref::<CliError>()
            .map_or((None, None), |cli_error| match cli_error {
                CliError::Bench(bench) => (
                    Some(bench.code().as_str()),
                    bench.task_code().map(|code| code.as_str()),
                ),
                CliError::Dataset(dataset) => (Some(dataset.code().as_str()), None),
                CliError::Chart { .. } => (None, None),
            });

        error!(
            error = %err,
            code = code.map(field::display),
            task_code = task_code.map(field::display),
            "benchmark run failed"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
