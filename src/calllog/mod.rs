//! Call-log provider seam.
//!
//! The platform call log is an external collaborator. Providers hand out the
//! newest row unvalidated; conversion into a [`RawCallEntry`] happens here so
//! every provider rejects malformed rows the same way.
//!
//! [`RawCallEntry`]: crate::models::RawCallEntry

mod json_file;
mod memory;
mod row;

pub use json_file::JsonFileCallLog;
pub use memory::MemoryCallLog;
pub use row::CallLogRow;

use thiserror::Error;

/// Failure modes of a call-log read. None of them are fatal to the watcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallLogError {
    #[error("call log access denied: {0}")]
    PermissionDenied(String),

    #[error("call log read failed: {0}")]
    ReadFailure(String),

    #[error("malformed call-log entry: field `{field}` {reason}")]
    MalformedEntry { field: &'static str, reason: String },
}

/// Source of call-log rows.
///
/// `Ok(None)` means the log is readable but empty, which is distinct from a
/// denied or failed read.
pub trait CallLogProvider: Send + Sync {
    /// Return the single most recent row by occurrence time.
    fn latest(&self) -> Result<Option<CallLogRow>, CallLogError>;
}
