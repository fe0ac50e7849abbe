use std::io::{self, Write};
use std::path::Path;

use super::charts::{bar_chart, table};
use crate::dashboard::{Dataset, DEFAULT_BINS, DEFAULT_PREVIEW_ROWS};

#[derive(Debug, Clone)]
pub struct DashboardOptions {
    pub preview_rows: usize,
    /// Histogram column; the first numeric column when unset.
    pub column: Option<String>,
    pub bins: usize,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
            column: None,
            bins: DEFAULT_BINS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardOutcome {
    Rendered,
    /// The dataset file was absent; only the warning was shown.
    DatasetMissing,
    /// The dataset could not be read; the error was shown.
    Failed,
}

pub fn render_dashboard(out: &mut dyn Write, path: &Path, options: &DashboardOptions) -> io::Result<DashboardOutcome> {
    writeln!(out, "Dataset Insights")?;

    let dataset = match Dataset::load(path) {
        Ok(Some(dataset)) => dataset,
        Ok(None) => {
            writeln!(out, "Warning: Dataset not found at {}", path.display())?;
            return Ok(DashboardOutcome::DatasetMissing);
        }
        Err(e) => {
            log::error!("{}", e);
            writeln!(out, "Error: {}", e)?;
            return Ok(DashboardOutcome::Failed);
        }
    };

    writeln!(out)?;
    table(out, dataset.headers(), dataset.preview(options.preview_rows))?;
    writeln!(out, "({} of {} rows)", dataset.preview(options.preview_rows).len(), dataset.len())?;

    render_histogram(out, &dataset, options)?;

    if let Some(distribution) = dataset.stage_distribution() {
        writeln!(out)?;
        writeln!(out, "Stage Distribution")?;
        bar_chart(out, &distribution)?;
    }

    Ok(DashboardOutcome::Rendered)
}

fn render_histogram(out: &mut dyn Write, dataset: &Dataset, options: &DashboardOptions) -> io::Result<()> {
    let numeric = dataset.numeric_columns();
    let column = match &options.column {
        Some(column) if numeric.contains(&column.as_str()) => column.as_str(),
        Some(column) => {
            writeln!(out)?;
            writeln!(out, "Warning: '{}' is not a numeric column (choose from: {})", column, numeric.join(", "))?;
            return Ok(());
        }
        None => match numeric.first() {
            Some(column) => *column,
            None => return Ok(()),
        },
    };

    let histogram = match dataset.histogram(column, options.bins) {
        Ok(histogram) => histogram,
        Err(e) => {
            writeln!(out, "Error: {}", e)?;
            return Ok(());
        }
    };

    writeln!(out)?;
    writeln!(out, "Histogram of {}", histogram.column)?;
    let bars: Vec<(String, usize)> = histogram
        .edges
        .windows(2)
        .zip(&histogram.counts)
        .map(|(edge, count)| (format!("{:.2} - {:.2}", edge[0], edge[1]), *count))
        .collect();
    bar_chart(out, &bars)
}
