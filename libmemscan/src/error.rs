//! Error taxonomy for memory inspection operations.
//!
//! Every public entry point in this crate returns `Result<_, MemScanError>`.
//! Validation errors are raised synchronously before any syscall is issued;
//! I/O errors are raised only after the underlying platform call fails.

use thiserror::Error;

/// Closed set of failure modes a `Session` or its collaborators can report.
#[derive(Debug, Error)]
pub enum MemScanError {
    #[error("no process matches pid={pid:?} name={name:?} window_title={window_title:?}")]
    ProcessNotFound {
        pid: Option<u32>,
        name: Option<String>,
        window_title: Option<String>,
    },

    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("operation attempted on a closed session (pid={pid})")]
    ClosedSession { pid: u32 },

    #[error("unsupported or unknown logical type")]
    InvalidType,

    #[error("value cannot be represented in {length} byte(s): {reason}")]
    InvalidValue { length: u8, reason: String },

    #[error("invalid range: lo must not be greater than hi")]
    InvalidRange,

    #[error("failed to read {length} byte(s) at address {address:#018x}: {reason}")]
    ReadFailed {
        address: u64,
        length: usize,
        reason: String,
    },

    #[error("failed to write {length} byte(s) at address {address:#018x}: {reason}")]
    WriteFailed {
        address: u64,
        length: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, MemScanError>;
