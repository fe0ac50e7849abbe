//! Training dataset summaries: preview, numeric histograms and the stage distribution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_DATASET_FILE: &str = "data/liver_cirrhosis.csv";
pub const DEFAULT_PREVIEW_ROWS: usize = 50;
pub const DEFAULT_BINS: usize = 30;
/// Column whose value counts make up the class distribution.
pub const STAGE_COLUMN: &str = "Stage";

/// Cell texts read as missing values, besides the empty cell.
const MISSING_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "#N/A", "<NA>", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "None",
];

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || MISSING_MARKERS.contains(&cell)
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
}

/// The dataset as read from CSV: a header row and string cells.
///
/// Empty cells and the usual NA markers (`NA`, `N/A`, `NaN`, `null`, ...) are
/// missing values.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Equal-width bins over the non-missing values of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub column: String,
    /// `counts.len() + 1` bin edges, ascending.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Dataset {
    /// Reads the dataset.
    ///
    /// A missing file is not an error: a warning is logged and `None` returned.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Option<Self>, DatasetError> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("Dataset not found at {}", path.display());
            return Ok(None);
        }

        let csv_error = |source| DatasetError::Csv { path: path.to_path_buf(), source };
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(csv_error)?;

        let headers = reader.headers().map_err(csv_error)?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record.map_err(csv_error)?.iter().map(str::to_string).collect());
        }

        let dataset = Self { headers, rows };
        log::info!("Loaded dataset {} ({} rows, {} columns)", path.display(), dataset.len(), dataset.headers.len());
        Ok(Some(dataset))
    }

    /// Builds a dataset from in-memory rows; short rows are padded with missing cells.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first `n` rows.
    pub fn preview(&self, n: usize) -> &[Vec<String>] {
        &self.rows[..n.min(self.rows.len())]
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    fn cells(&self, index: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Columns whose every present cell parses as a number and that hold at
    /// least one finite value, in header order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.headers
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let mut finite = false;
                for cell in self.cells(*i).filter(|c| !is_missing(c)) {
                    match cell.parse::<f64>() {
                        Ok(value) => finite |= value.is_finite(),
                        Err(_) => return false,
                    }
                }
                finite
            })
            .map(|(_, h)| h.as_str())
            .collect()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Histogram of a numeric column with `bins` equal-width bins.
    ///
    /// Missing cells and non-finite values are dropped. The last bin includes
    /// its upper edge.
    pub fn histogram(&self, column: &str, bins: usize) -> Result<Histogram, DatasetError> {
        let index = self
            .column_index(column)
            .ok_or_else(|| DatasetError::UnknownColumn(column.to_string()))?;
        let mut values = Vec::new();
        for cell in self.cells(index).filter(|c| !is_missing(c)) {
            let value = cell
                .parse::<f64>()
                .map_err(|_| DatasetError::NotNumeric(column.to_string()))?;
            if value.is_finite() {
                values.push(value);
            }
        }

        let bins = bins.max(1);
        let mut counts = vec![0usize; bins];
        if values.is_empty() {
            return Ok(Histogram { column: column.to_string(), edges: vec![0.0; bins + 1], counts });
        }

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // A constant column gets a unit-wide range around its value.
        let (low, high) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
        let width = (high - low) / bins as f64;

        let mut edges: Vec<f64> = (0..bins).map(|i| low + width * i as f64).collect();
        edges.push(high);
        for value in values {
            let bin = (((value - low) / width) as usize).min(bins - 1);
            counts[bin] += 1;
        }

        Ok(Histogram { column: column.to_string(), edges, counts })
    }

    /// Value counts of the `Stage` column, most frequent first.
    ///
    /// Ties keep first-seen order; missing cells are skipped. `None` when
    /// the dataset has no `Stage` column.
    pub fn stage_distribution(&self) -> Option<Vec<(String, usize)>> {
        let index = self.column_index(STAGE_COLUMN)?;
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for cell in self.cells(index).filter(|c| !is_missing(c)) {
            match positions.get(cell) {
                Some(&pos) => counts[pos].1 += 1,
                None => {
                    positions.insert(cell, counts.len());
                    counts.push((cell.to_string(), 1));
                }
            }
        }
        // Stable sort keeps first-seen order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        Some(counts)
    }
}
