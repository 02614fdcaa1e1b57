//! Structured error types for schedscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    /// Neither grammar recognised the section header. Not fatal for a
    /// bug report as a whole; the trace is simply skipped.
    #[error("Unsupported trace section (header: {0:?})")]
    UnsupportedSection(String),

    #[error("The trace buffer is empty")]
    EmptyBuffer,

    /// A line failed to parse after a grammar was committed. Accounting
    /// for every later timestamp would be wrong, so the trace is dropped.
    #[error("Cannot parse trace line {line_no}: {line:?}")]
    Desync { line_no: usize, line: String },

    #[error("Invalid {field} value: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Line does not match the {0} layout")]
    Malformed(&'static str),

    #[error("No scheduler events found in trace")]
    NoSchedulerEvents,
}

impl DecodeError {
    /// Sections without usable data are reported as warnings by callers
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            DecodeError::UnsupportedSection(_) | DecodeError::EmptyBuffer | DecodeError::NoSchedulerEvents
        )
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {what}: {error}")]
    WriteFailed { what: &'static str, error: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
