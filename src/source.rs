use crate::error::{ReconciliationError, Result};
use crate::schema::{Cell, RawTable};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;

/// Anything that can hand over the candidate tables of a workbook, in sheet order.
///
/// Implementations report transport failures as
/// [`ReconciliationError::SourceUnavailable`]. Retrying is up to the implementation.
pub trait TableSource {
    fn fetch_tables(&self) -> Result<Vec<RawTable>>;
}

impl TableSource for Vec<RawTable> {
    fn fetch_tables(&self) -> Result<Vec<RawTable>> {
        Ok(self.clone())
    }
}

/// A consistent, caller-owned copy of the source tables. The reconciliation core
/// only ever reads from a snapshot and never goes back to the source itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub tables: Vec<RawTable>,
}

impl SourceSnapshot {
    pub fn new(tables: Vec<RawTable>) -> Self {
        Self { tables }
    }

    /// Reads every table from `source` in one call before any computation starts.
    pub fn capture(source: &dyn TableSource) -> Result<Self> {
        let tables = source.fetch_tables()?;
        Ok(Self { tables })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Reads a CSV document (first record = headers) into a [`RawTable`]. Ragged rows are
/// accepted; all cells are kept as text.
pub fn read_csv_table<R: Read>(name: impl Into<String>, reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from).collect());
    }

    Ok(RawTable::new(name, headers, rows))
}

/// Local CSV files, one table per file, in the given order.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    paths: Vec<PathBuf>,
}

impl CsvFileSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl TableSource for CsvFileSource {
    fn fetch_tables(&self) -> Result<Vec<RawTable>> {
        self.paths
            .iter()
            .map(|path| {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                std::fs::File::open(path)
                    .map_err(ReconciliationError::from)
                    .and_then(|file| read_csv_table(name, file))
                    .map_err(|e| {
                        ReconciliationError::SourceUnavailable(format!(
                            "{}: {}",
                            path.display(),
                            e
                        ))
                    })
            })
            .collect()
    }
}
