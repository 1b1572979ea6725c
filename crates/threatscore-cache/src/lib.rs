//! threatscore-cache
//!
//! CSV file holding generated department samples between runs.
//!
//! Layout: a header row of department names, then one row per sample
//! position. Departments shorter than the longest one carry an explicit
//! empty cell (`ABSENT`) in the rows past their end, so ragged datasets
//! reload exactly instead of being truncated to the shortest column.

use csv::{ReaderBuilder, Writer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use threatscore_core::error::{Error, Result};
use threatscore_core::types::{DepartmentDataset, RiskSample};

/// Cell written where a department has no sample at that row.
pub const ABSENT: &str = "";

pub fn exists(path: &Path) -> bool {
    path.is_file()
}

/// Write `datasets` to `path`, replacing any previous cache atomically.
pub fn save(datasets: &[DepartmentDataset], path: &Path) -> Result<()> {
    if datasets.is_empty() {
        return Err(Error::EmptyDataset("no departments to cache".to_string()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = staging_path(path);
    let mut writer = Writer::from_path(&tmp).map_err(|e| csv_error(&tmp, e))?;
    writer
        .write_record(datasets.iter().map(|d| d.department.as_str()))
        .map_err(|e| csv_error(&tmp, e))?;

    let rows = datasets.iter().map(DepartmentDataset::len).max().unwrap_or(0);
    for row in 0..rows {
        let record: Vec<String> = datasets
            .iter()
            .map(|d| d.samples.get(row).map(|s| s.to_string()).unwrap_or_else(|| ABSENT.to_string()))
            .collect();
        writer.write_record(&record).map_err(|e| csv_error(&tmp, e))?;
    }
    writer.flush()?;
    drop(writer);
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), departments = datasets.len(), rows, "saved sample cache");
    Ok(())
}

/// Read datasets back from `path`.
///
/// A missing file is `Error::NotFound`; callers regenerate rather than treat it as empty.
pub fn load(path: &Path) -> Result<Vec<DepartmentDataset>> {
    if !exists(path) {
        return Err(Error::NotFound(path.display().to_string()));
    }
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path).map_err(|e| csv_error(path, e))?;
    let headers = reader.headers().map_err(|e| csv_error(path, e))?.clone();
    if headers.is_empty() {
        return Err(Error::CorruptCache(format!("{} has no department columns", path.display())));
    }

    let mut columns: Vec<Vec<RiskSample>> = vec![Vec::new(); headers.len()];
    let mut ended = vec![false; headers.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_error(path, e))?;
        for (col, cell) in record.iter().enumerate() {
            let cell = cell.trim();
            if cell == ABSENT {
                ended[col] = true;
                continue;
            }
            if ended[col] {
                return Err(Error::CorruptCache(format!(
                    "{}: column '{}' has a value at row {} after its end",
                    path.display(),
                    &headers[col],
                    row
                )));
            }
            let value: i64 = cell.parse().map_err(|_| {
                Error::CorruptCache(format!("{}: '{}' at row {} is not an integer", path.display(), cell, row))
            })?;
            columns[col].push(RiskSample::new(value)?);
        }
    }

    let datasets: Vec<DepartmentDataset> = headers
        .iter()
        .zip(columns)
        .map(|(name, samples)| DepartmentDataset::new(name, samples))
        .collect();
    debug!(path = %path.display(), departments = datasets.len(), "loaded sample cache");
    Ok(datasets)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn csv_error(path: &Path, e: csv::Error) -> Error {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return Error::Io(io);
        }
        return Error::CorruptCache(format!("{}: unreadable", path.display()));
    }
    Error::CorruptCache(format!("{}: {}", path.display(), e))
}
