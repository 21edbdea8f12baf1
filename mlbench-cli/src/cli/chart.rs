//! SVG bar chart of recorded benchmark values.

use std::path::Path;

use mlbench_core::{Backend, BenchmarkResults};
use plotters::{coord::ranged1d::SegmentValue, drawing::DrawingAreaErrorKind, prelude::*};
use tracing::{info, instrument};

use super::CliError;

const CHART_SIZE: (u32, u32) = (1_200, 640);
const HEADROOM: f64 = 1.1;
const MIN_Y_LIMIT: f64 = 1.0;

/// One bar of the chart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBar {
    /// Experiment name shown under the bar.
    pub label: &'static str,
    /// Bar height.
    pub value: f64,
}

/// Bars for every recorded experiment, in execution order. Experiments
/// without a value get no bar.
///
/// # Examples
/// ```
/// use mlbench_cli::cli::chart_bars;
/// use mlbench_core::{BenchmarkResults, ExperimentKind};
///
/// let mut results = BenchmarkResults::new();
/// results.record(ExperimentKind::EaseOfUse, 0.82).expect("valid value");
/// let bars = chart_bars(&results);
/// assert_eq!(bars.len(), 1);
/// assert_eq!(bars[0].label, "Ease of Use and Setup");
/// ```
#[must_use]
pub fn chart_bars(results: &BenchmarkResults) -> Vec<ChartBar> {
    results
        .recorded()
        .map(|(kind, value)| ChartBar {
            label: kind.name(),
            value,
        })
        .collect()
}

#[expect(
    clippy::float_arithmetic,
    reason = "the axis leaves headroom above the tallest bar"
)]
fn y_limit(bars: &[ChartBar]) -> f64 {
    let tallest = bars.iter().map(|bar| bar.value).fold(0.0_f64, f64::max);
    (tallest * HEADROOM).max(MIN_Y_LIMIT)
}

/// Writes an SVG bar chart of `results` to `path`.
///
/// # Errors
/// Returns [`CliError::Chart`] when the chart cannot be drawn or written.
#[instrument(name = "cli.render_chart", err, skip(results), fields(path = %path.display()))]
pub fn render_chart(
    results: &BenchmarkResults,
    backend: Backend,
    path: &Path,
) -> Result<(), CliError> {
    let bars = chart_bars(results);
    draw(&bars, backend, path).map_err(|error| CliError::Chart {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;
    info!(bars = bars.len(), "chart written");
    Ok(())
}

fn draw(
    bars: &[ChartBar],
    backend: Backend,
    path: &Path,
) -> Result<(), DrawingAreaErrorKind<std::io::Error>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Benchmark results ({backend})"), ("sans-serif", 28))
        .margin(16)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d((0..bars.len()).into_segmented(), 0.0..y_limit(bars))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|segment| match segment {
            SegmentValue::CenterOf(index) => bars
                .get(*index)
                .map(|bar| bar.label.to_owned())
                .unwrap_or_default(),
            SegmentValue::Exact(_) | SegmentValue::Last => String::new(),
        })
        .y_desc("value")
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(index, bar)| {
        let mut rect = Rectangle::new(
            [
                (SegmentValue::Exact(index), 0.0),
                (SegmentValue::Exact(index + 1), bar.value),
            ],
            BLUE.mix(0.6).filled(),
        );
        rect.set_margin(0, 0, 12, 12);
        rect
    }))?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use mlbench_core::ExperimentKind;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn bars_follow_experiment_order_and_skip_missing() {
        let mut results = BenchmarkResults::new();
        results
            .record(ExperimentKind::CommunicationOverhead, 2.0)
            .expect("valid value");
        results.record(ExperimentKind::DataSize, 0.5).expect("valid value");
        let bars = chart_bars(&results);
        let labels: Vec<_> = bars.iter().map(|bar| bar.label).collect();
        assert_eq!(
            labels,
            vec!["Scalability with Data Size", "Communication Overhead"]
        );
    }

    #[rstest]
    #[case::empty(&[], 1.0)]
    #[case::small(&[0.2, 0.4], 1.0)]
    #[case::tall(&[4.0, 10.0], 11.0)]
    fn y_limit_leaves_headroom(#[case] values: &[f64], #[case] expected: f64) {
        let bars: Vec<_> = values
            .iter()
            .map(|&value| ChartBar { label: "x", value })
            .collect();
        assert!((y_limit(&bars) - expected).abs() < 1e-9);
    }
}
