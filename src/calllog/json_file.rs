use std::cmp::Reverse;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{CallLogError, CallLogProvider, CallLogRow};

/// Call log backed by a JSON export: an array of rows, normally newest first
/// as the platform query (`date DESC`) produces them. The latest row is picked
/// by `date`, so an unsorted export still yields the newest call.
///
/// The file is re-read on every call so an exporter can rewrite it between polls.
pub struct JsonFileCallLog {
    path: PathBuf,
}

impl JsonFileCallLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CallLogProvider for JsonFileCallLog {
    fn latest(&self) -> Result<Option<CallLogRow>, CallLogError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|err| {
            let detail = format!("{}: {err}", self.path.display());
            match err.kind() {
                ErrorKind::PermissionDenied => CallLogError::PermissionDenied(detail),
                _ => CallLogError::ReadFailure(detail),
            }
        })?;

        if contents.trim().is_empty() {
            return Ok(None);
        }

        // A half-written export is treated as transient; the next poll retries.
        let rows: Vec<CallLogRow> = serde_json::from_str(&contents).map_err(|err| {
            CallLogError::ReadFailure(format!("{}: invalid export: {err}", self.path.display()))
        })?;

        // Ties keep the earlier row. With no usable date anywhere the first row
        // is returned so validation reports what is wrong with it.
        let newest = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| row.occurred_at().map(|at| (index, at)))
            .max_by_key(|&(index, at)| (at, Reverse(index)))
            .map(|(index, _)| index)
            .unwrap_or(0);

        Ok(rows.into_iter().nth(newest))
    }
}
