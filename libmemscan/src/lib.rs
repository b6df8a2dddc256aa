//! Cross-platform, read/write/scan access to another process's memory —
//! the library half of a Cheat-Engine-style memory editor.
//!
//! Start with [`session::Session::open`], which resolves a PID, process
//! name, or (Windows) window title to a process handle and returns a
//! permission-gated [`session::Session`]. From there, [`session::Session::read`]/
//! [`session::Session::write`] operate on single addresses, and
//! [`session::Session::search_value`]/[`session::Session::search`] return a
//! lazily-evaluated [`scanner::ScanCursor`] over matching addresses.

// OS-specific modules
#[cfg(unix)]
pub(crate) mod linux;
#[cfg(windows)]
pub(crate) mod windows;

pub mod error;
pub mod kmp;
pub mod predicate;
pub mod process;
pub mod reader;
pub mod scanner;
pub mod session;
pub mod value;

pub use error::{MemScanError, Result};
pub use predicate::ScanPredicate;
pub use process::{MemoryProtection, MemoryRegion, MemoryState, MemoryType, SystemInfo};
pub use scanner::{ProgressInfo, ScanHit};
pub use session::{Comparator, Permission, ProcessSelector, Session};
pub use value::{LogicalType, NumericKey, Value};

/// Parse a hex string like `"DEADBEEF"` or `"4D 5A 90 00"` into bytes, for
/// byte-pattern scans specified on a CLI or in a config file.
pub fn parse_hex_pattern(s: &str) -> Result<Vec<u8>> {
    let filtered: String = s.chars().filter(|c| !c.is_whitespace()).collect();

    if filtered.len() % 2 != 0 {
        return Err(MemScanError::InvalidValue {
            length: 0,
            reason: "hex pattern length must be even".into(),
        });
    }

    let mut bytes = Vec::with_capacity(filtered.len() / 2);
    for i in (0..filtered.len()).step_by(2) {
        let byte_str = &filtered[i..i + 2];
        let b = u8::from_str_radix(byte_str, 16).map_err(|_| MemScanError::InvalidValue {
            length: 1,
            reason: format!("invalid hex byte '{byte_str}'"),
        })?;
        bytes.push(b);
    }
    Ok(bytes)
}
