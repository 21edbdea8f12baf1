//! Command-line interface for the mlbench training benchmark.
//!
//! A single `run` command loads MNIST or a synthetic dataset, runs the
//! benchmark suite with the selected backend, and optionally writes an SVG
//! chart of the recorded values.

mod chart;
mod commands;

pub use chart::{ChartBar, chart_bars, render_chart};
pub use commands::{
    BackendArg, Cli, CliError, Command, MnistArgs, RunCommand, RunSource, RunSummary, SplitArg,
    SyntheticArgs, render_summary, run_cli,
};

#[cfg(test)]
mod test_helpers;
