//! Command implementations and argument parsing for the mlbench CLI.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mlbench_core::{
    Backend, BenchError, Dataset, MAX_CLASSES, MIN_CLASSES, SuiteBuilder, SuiteReport,
};
use mlbench_datasets::{DatasetError, MnistConfig, MnistSplit, SyntheticConfig, load_mnist};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::chart::render_chart;

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "mlbench",
    about = "Benchmark softmax training across execution backends."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the five benchmark experiments.
    Run(RunCommand),
}

/// Options accepted by the `run` command.
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Backend under test.
    #[arg(long, value_enum, default_value_t = BackendArg::Eager)]
    pub backend: BackendArg,

    /// Training passes per fit.
    #[arg(long, default_value_t = 2)]
    pub epochs: usize,

    /// Gradient step size.
    #[arg(long = "learning-rate", default_value_t = 0.1)]
    pub learning_rate: f32,

    /// Length of one simulated time unit, in milliseconds.
    #[arg(long = "time-unit-ms", default_value_t = 1_000)]
    pub time_unit_ms: u64,

    /// Probability that a fault-injected task attempt fails.
    #[arg(long = "failure-probability", default_value_t = 0.5)]
    pub failure_probability: f64,

    /// Re-executions granted to a failing task.
    #[arg(long = "max-retries", default_value_t = 0)]
    pub max_retries: u32,

    /// Seed for batch shuffling and fault injection.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Write an SVG bar chart of the results to this path.
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Dataset to benchmark against.
    #[command(subcommand)]
    pub source: RunSource,
}

/// Backends selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Sequential mini-batch training.
    Eager,
    /// Gradients reduced over parallel partitions.
    Partitioned,
    /// Work dispatched to the retrying task runtime.
    TaskParallel,
    /// Sequential training over shuffled batches.
    Autograd,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Eager => Self::Eager,
            BackendArg::Partitioned => Self::Partitioned,
            BackendArg::TaskParallel => Self::TaskParallel,
            BackendArg::Autograd => Self::Autograd,
        }
    }
}

/// Datasets supported by the benchmark.
#[derive(Debug, Subcommand, Clone)]
pub enum RunSource {
    /// Download (or reuse a cached copy of) MNIST.
    Mnist(MnistArgs),
    /// Generate a synthetic classification dataset.
    Synthetic(SyntheticArgs),
}

/// MNIST arguments.
#[derive(Debug, Args, Clone)]
pub struct MnistArgs {
    /// Cache directory for the gzip IDX files.
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<PathBuf>,

    /// Base URL serving the IDX files.
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Split to load.
    #[arg(long, value_enum, default_value_t = SplitArg::Train)]
    pub split: SplitArg,
}

/// MNIST splits selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SplitArg {
    /// 60 000 training images.
    Train,
    /// 10 000 test images.
    Test,
}

impl From<SplitArg> for MnistSplit {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Train => Self::Train,
            SplitArg::Test => Self::Test,
        }
    }
}

/// Synthetic dataset arguments.
#[derive(Debug, Args, Clone)]
pub struct SyntheticArgs {
    /// Number of rows.
    #[arg(long, default_value_t = 10_000)]
    pub samples: usize,

    /// Features per row.
    #[arg(long, default_value_t = 784)]
    pub dimensions: usize,

    /// Number of classes, between 2 and 256.
    #[arg(long, default_value_t = 10, value_parser = parse_class_count)]
    pub classes: usize,

    /// Half-width of the uniform feature noise.
    #[arg(long, default_value_t = 0.1)]
    pub noise: f32,
}

fn parse_class_count(raw: &str) -> Result<usize, String> {
    let classes: usize = raw
        .parse()
        .map_err(|error| format!("`{raw}` is not a class count: {error}"))?;
    if (MIN_CLASSES..=MAX_CLASSES).contains(&classes) {
        Ok(classes)
    } else {
        Err(format!(
            "class count must be between {MIN_CLASSES} and {MAX_CLASSES}"
        ))
    }
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Loading or generating the dataset failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// Configuring or running the benchmark failed.
    #[error(transparent)]
    Bench(#[from] BenchError),
    /// The chart could not be written.
    #[error("failed to write chart `{path}`: {message}")]
    Chart {
        /// Requested output path.
        path: PathBuf,
        /// Drawing failure.
        message: String,
    },
}

/// Outcome of a `run` command.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Name of the dataset that was benchmarked.
    pub dataset: String,
    /// Rows in the dataset.
    pub rows: usize,
    /// Values and samples produced by the suite.
    pub report: SuiteReport,
    /// Chart written for the run, if one was requested.
    pub chart: Option<PathBuf>,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when loading the dataset, running the benchmark or
/// writing the chart fails.
///
/// # Examples
/// ```
/// use mlbench_cli::cli::{BackendArg, Cli, Command, RunCommand, RunSource, SyntheticArgs, run_cli};
///
/// let cli = Cli {
///     command: Command::Run(RunCommand {
///         backend: BackendArg::Eager,
///         epochs: 1,
///         learning_rate: 0.1,
///         time_unit_ms: 0,
///         failure_probability: 0.5,
///         max_retries: 0,
///         seed: 1,
///         chart: None,
///         source: RunSource::Synthetic(SyntheticArgs {
///             samples: 64,
///             dimensions: 8,
///             classes: 4,
///             noise: 0.1,
///         }),
///     }),
/// };
/// let summary = run_cli(cli).expect("benchmark runs");
/// assert!(summary.report.results.is_complete());
/// ```
#[instrument(name = "cli.run", err, skip(cli), fields(command = field::Empty))]
pub fn run_cli(cli: Cli) -> Result<RunSummary, CliError> {
    match cli.command {
        Command::Run(run) => {
            Span::current().record("command", field::display("run"));
            run_command(run)
        }
    }
}

#[instrument(
    name = "cli.execute",
    err,
    skip(command),
    fields(backend = field::Empty, source = field::Empty)
)]
pub(super) fn run_command(command: RunCommand) -> Result<RunSummary, CliError> {
    let backend = Backend::from(command.backend);
    let span = Span::current();
    span.record("backend", field::display(backend));

    let suite = SuiteBuilder::new()
        .with_backend(backend)
        .with_epochs(command.epochs)
        .with_learning_rate(command.learning_rate)
        .with_time_unit(Duration::from_millis(command.time_unit_ms))
        .with_failure_probability(command.failure_probability)
        .with_max_retries(command.max_retries)
        .with_seed(command.seed)
        .build()?;

    let loaded = match command.source {
        RunSource::Mnist(args) => {
            span.record("source", field::display("mnist"));
            load_mnist_source(args)
        }
        RunSource::Synthetic(args) => {
            span.record("source", field::display("synthetic"));
            generate_synthetic_source(&args, command.seed)
        }
    };
    let dataset = match loaded {
        Ok(dataset) => dataset,
        Err(error) => {
            suite.shutdown();
            return Err(error);
        }
    };

    let run = suite.run(&dataset);
    suite.shutdown();
    let report = run?;

    if let Some(path) = &command.chart {
        render_chart(&report.results, backend, path)?;
    }

    info!(
        dataset = dataset.name(),
        recorded = report.results.len(),
        "command completed"
    );
    Ok(RunSummary {
        dataset: dataset.name().to_owned(),
        rows: dataset.len(),
        report,
        chart: command.chart,
    })
}

pub(super) fn mnist_config(args: MnistArgs) -> MnistConfig {
    let defaults = MnistConfig::default();
    MnistConfig {
        cache_dir: args.cache_dir.unwrap_or(defaults.cache_dir),
        base_url: args.base_url.unwrap_or(defaults.base_url),
        split: args.split.into(),
    }
}

#[instrument(name = "cli.load_mnist", err, skip(args), fields(split = ?args.split))]
fn load_mnist_source(args: MnistArgs) -> Result<Dataset, CliError> {
    Ok(load_mnist(&mnist_config(args))?)
}

#[instrument(
    name = "cli.generate_synthetic",
    err,
    skip(args),
    fields(samples = args.samples, dimensions = args.dimensions)
)]
fn generate_synthetic_source(args: &SyntheticArgs, seed: u64) -> Result<Dataset, CliError> {
    let config = SyntheticConfig {
        samples: args.samples,
        dimensions: args.dimensions,
        classes: args.classes,
        noise: args.noise,
        seed,
    };
    Ok(config.generate()?)
}

/// Renders `summary` to `writer` as plain text.
///
/// The first line names the backend and dataset, followed by one line per
/// experiment and a few detail lines.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &RunSummary, mut writer: impl Write) -> io::Result<()> {
    let report = &summary.report;
    writeln!(
        writer,
        "Benchmark results for backend {} on {} ({} rows)",
        report.backend, summary.dataset, summary.rows
    )?;
    for (kind, value) in report.results.iter() {
        match value {
            Some(seconds) => writeln!(writer, "{}: {seconds:.4} s", kind.name())?,
            None => writeln!(writer, "{}: n/a", kind.name())?,
        }
    }

    let details = &report.details;
    if let Some(sample) = details.data_size.samples.last() {
        writeln!(
            writer,
            "Training accuracy on {} rows: {:.4}",
            sample.rows, sample.accuracy
        )?;
    }
    if let Some(recovery) = &details.fault_tolerance.recovery {
        writeln!(
            writer,
            "Fault-injected task: {} ({} attempt(s))",
            recovery.message(),
            recovery.attempts
        )?;
    }
    writeln!(
        writer,
        "Communication buckets: synchronous {:?}, asynchronous {:?}",
        details.communication.buckets.synchronous, details.communication.buckets.asynchronous
    )?;
    if let Some(path) = &summary.chart {
        writeln!(writer, "Chart written to {}", path.display())?;
    }
    Ok(())
}
