//! Domain model for schedscope
//!
//! This module contains core domain types and errors that provide:
//! - Compile-time safety via newtype pattern
//! - One explicit enum for scheduler states instead of raw state characters
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{Duration, EventKind, Pid, ProcessState, Timestamp};

pub use errors::{DecodeError, ExportError};
