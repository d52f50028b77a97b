use crate::data::sample;
use crate::error::{AppError, Result};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// File picked up from the working directory when no path is configured
pub const DEFAULT_TRAINING_FILE: &str = "synthetic_ticket_data.csv";

/// Header row plus string cells; an empty cell is `None`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// Parse CSV with a header row; short rows are padded with missing cells
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(AppError::DataShape("CSV header is empty".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = (0..headers.len())
                .map(|i| record.get(i).filter(|v| !v.is_empty()).map(str::to_string))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Exact header lookup
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .and_then(|c| c.as_deref())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Where a training table came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum DataSource {
    File(PathBuf),
    Sample,
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Sample => f.write_str("bundled sample"),
        }
    }
}

/// Resolve training data relative to the working directory
pub fn resolve_training_data(
    explicit: Option<&Path>,
    allow_sample: bool,
) -> Result<(RawTable, DataSource)> {
    resolve_training_data_in(Path::new("."), explicit, allow_sample)
}

/// Resolve training data: explicit path, then the default file in `base`,
/// then the bundled sample when permitted.
pub fn resolve_training_data_in(
    base: &Path,
    explicit: Option<&Path>,
    allow_sample: bool,
) -> Result<(RawTable, DataSource)> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(AppError::DataShape(format!(
                "configured training data {} not found",
                path.display()
            )));
        }
        let table = RawTable::from_path(path)?;
        info!(path = %path.display(), rows = table.len(), "Loaded training data");
        return Ok((table, DataSource::File(path.to_path_buf())));
    }

    let default_path = base.join(DEFAULT_TRAINING_FILE);
    if default_path.is_file() {
        let table = RawTable::from_path(&default_path)?;
        info!(path = %default_path.display(), rows = table.len(), "Loaded training data");
        return Ok((table, DataSource::File(default_path)));
    }

    if allow_sample {
        warn!(
            rows = sample::SAMPLE_ROWS,
            "⚠️ No training data found; training on the bundled sample table. \
             Predictions from these models are for demonstration only"
        );
        return Ok((sample::sample_table(), DataSource::Sample));
    }

    Err(AppError::DataShape(format!(
        "no training data found: set classifier.training_data or provide {} \
         (the bundled sample requires allow_sample_data)",
        DEFAULT_TRAINING_FILE
    )))
}
