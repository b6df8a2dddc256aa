//! Session Handle: the public entry point. Opens a target process, tracks
//! an Open/Closed state machine, and gates every operation by the
//! permission the caller requested at open time.

use crate::error::{MemScanError, Result};
use crate::process::{self, ProcessHandle, SystemInfo};
use crate::scanner::{ScanConfig, ScanCursor};
use crate::value::{self, LogicalType, Value};
use crate::predicate::ScanPredicate;

/// The single-value comparison relations `Session::search_value` accepts
/// (§6). Range relations (`Between`/`NotBetween`) go through
/// `Session::search_between` instead, since they take two endpoints rather
/// than one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

/// What a `Session` is allowed to do against the target process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    All,
}

impl Permission {
    fn can_read(self) -> bool {
        matches!(self, Permission::ReadOnly | Permission::ReadWrite | Permission::All)
    }

    fn can_write(self) -> bool {
        matches!(self, Permission::WriteOnly | Permission::ReadWrite | Permission::All)
    }
}

/// How the target process was identified when the session was opened.
#[derive(Debug, Clone)]
pub enum ProcessSelector {
    Pid(u32),
    Name(String),
    WindowTitle(String),
}

/// A handle to a target process's memory, gating reads/writes/scans by
/// permission and rejecting all operations once `close` has run.
pub struct Session {
    pid: u32,
    handle: Option<ProcessHandle>,
    sys: SystemInfo,
    permission: Permission,
}

impl Session {
    /// Resolve `selector` to a PID, open the process, and return a `Session`
    /// holding `permission`.
    pub fn open(selector: ProcessSelector, permission: Permission) -> Result<Self> {
        let pid = match &selector {
            ProcessSelector::Pid(pid) => *pid,
            ProcessSelector::Name(name) => {
                process::find_process_by_name(name)?.ok_or_else(|| MemScanError::ProcessNotFound {
                    pid: None,
                    name: Some(name.clone()),
                    window_title: None,
                })?
            }
            ProcessSelector::WindowTitle(title) => process::find_process_by_window_title(title)?
                .ok_or_else(|| MemScanError::ProcessNotFound {
                    pid: None,
                    name: None,
                    window_title: Some(title.clone()),
                })?,
        };

        let handle = process::open_process(pid)?;
        let sys = process::query_system_info();

        Ok(Self {
            pid,
            handle: Some(handle),
            sys,
            permission,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_none()
    }

    /// Release the process handle. Idempotent: closing an already-closed
    /// session is a no-op, not an error.
    pub fn close(&mut self) {
        self.handle = None;
    }

    fn handle(&self) -> Result<&ProcessHandle> {
        self.handle.as_ref().ok_or(MemScanError::ClosedSession { pid: self.pid })
    }

    fn require_read(&self) -> Result<&ProcessHandle> {
        let handle = self.handle()?;
        if !self.permission.can_read() {
            return Err(MemScanError::PermissionDenied {
                reason: format!("session for pid {} does not permit reads ({:?})", self.pid, self.permission),
            });
        }
        Ok(handle)
    }

    fn require_write(&self) -> Result<&ProcessHandle> {
        let handle = self.handle()?;
        if !self.permission.can_write() {
            return Err(MemScanError::PermissionDenied {
                reason: format!("session for pid {} does not permit writes ({:?})", self.pid, self.permission),
            });
        }
        Ok(handle)
    }

    /// Read a typed value at `addr`.
    pub fn read(&self, addr: usize, ty: LogicalType, length: u8) -> Result<Value> {
        let handle = self.require_read()?;
        let resolved = value::resolved_length(ty, length) as usize;
        let mut buf = vec![0u8; resolved];
        process::read_process_memory(handle, addr, &mut buf)?;
        value::decode(ty, &buf)
    }

    /// Read `len` raw bytes at `addr`, bypassing the type codec.
    pub fn read_raw(&self, addr: usize, len: usize) -> Result<Vec<u8>> {
        let handle = self.require_read()?;
        let mut buf = vec![0u8; len];
        process::read_process_memory(handle, addr, &mut buf)?;
        Ok(buf)
    }

    /// Write a typed value at `addr`.
    pub fn write(&self, addr: usize, ty: LogicalType, length: u8, value: &Value) -> Result<()> {
        let handle = self.require_write()?;
        let resolved = value::resolved_length(ty, length);
        let bytes = value::encode(ty, resolved, value)?;
        process::write_process_memory(handle, addr, &bytes)
    }

    /// Write raw bytes at `addr`, bypassing the type codec.
    pub fn write_raw(&self, addr: usize, bytes: &[u8]) -> Result<()> {
        let handle = self.require_write()?;
        process::write_process_memory(handle, addr, bytes)
    }

    /// Start a narrowing scan comparing every readable (or writable-only, if
    /// `writable_only` is set) address against a single value via
    /// `comparator` (§6 `search_value`). Equality/inequality go through the
    /// Substring Search; the rest through the Predicate Scanner. `chunk_cap`
    /// overrides the Scan Engine's default per-region read chunk size when
    /// set.
    pub fn search_value(
        &self,
        ty: LogicalType,
        length: u8,
        value: &Value,
        comparator: Comparator,
        progress: bool,
        writable_only: bool,
        chunk_cap: Option<usize>,
    ) -> Result<ScanCursor<'_>> {
        let handle = self.require_read()?;
        let resolved = value::resolved_length(ty, length);
        let predicate = match comparator {
            Comparator::Equal => ScanPredicate::Equal(value::encode(ty, resolved, value)?),
            Comparator::NotEqual => ScanPredicate::NotEqual(value::encode(ty, resolved, value)?),
            Comparator::Greater => ScanPredicate::Greater(value::numeric_key(
                ty,
                &value::encode(ty, resolved, value)?,
            )?),
            Comparator::Less => {
                ScanPredicate::Less(value::numeric_key(ty, &value::encode(ty, resolved, value)?)?)
            }
            Comparator::GreaterOrEqual => ScanPredicate::GreaterOrEqual(value::numeric_key(
                ty,
                &value::encode(ty, resolved, value)?,
            )?),
            Comparator::LessOrEqual => ScanPredicate::LessOrEqual(value::numeric_key(
                ty,
                &value::encode(ty, resolved, value)?,
            )?),
        };
        let mut config = ScanConfig::new(ty, resolved).writable_only(writable_only).progress(progress);
        if let Some(cap) = chunk_cap {
            config = config.chunk_cap(cap);
        }
        Ok(ScanCursor::new(handle, &self.sys, config, predicate))
    }

    /// Start a narrowing scan for every address whose current value lies
    /// within (or, if `not_between`, outside) `[lo, hi]` (§6 `search_between`).
    /// `chunk_cap` overrides the Scan Engine's default per-region read chunk
    /// size when set.
    pub fn search_between(
        &self,
        ty: LogicalType,
        length: u8,
        lo: &Value,
        hi: &Value,
        not_between: bool,
        progress: bool,
        writable_only: bool,
        chunk_cap: Option<usize>,
    ) -> Result<ScanCursor<'_>> {
        let handle = self.require_read()?;
        let resolved = value::resolved_length(ty, length);
        let lo_key = value::numeric_key(ty, &value::encode(ty, resolved, lo)?)?;
        let hi_key = value::numeric_key(ty, &value::encode(ty, resolved, hi)?)?;
        if lo_key.partial_cmp(&hi_key) == Some(std::cmp::Ordering::Greater) {
            return Err(MemScanError::InvalidRange);
        }
        let predicate = if not_between {
            ScanPredicate::NotBetween(lo_key, hi_key)
        } else {
            ScanPredicate::Between(lo_key, hi_key)
        };
        let mut config = ScanConfig::new(ty, resolved).writable_only(writable_only).progress(progress);
        if let Some(cap) = chunk_cap {
            config = config.chunk_cap(cap);
        }
        Ok(ScanCursor::new(handle, &self.sys, config, predicate))
    }

    /// Start a narrowing scan with an arbitrary, already-built predicate.
    /// Lower-level building block underneath `search_value`/`search_between`,
    /// exposed for callers that already hold a `ScanPredicate`.
    pub fn search(
        &self,
        ty: LogicalType,
        length: u8,
        predicate: ScanPredicate,
        writable_only: bool,
    ) -> Result<ScanCursor<'_>> {
        let handle = self.require_read()?;
        let resolved = value::resolved_length(ty, length);
        let config = ScanConfig::new(ty, resolved).writable_only(writable_only);
        Ok(ScanCursor::new(handle, &self.sys, config, predicate))
    }

    /// Re-read a known set of addresses and return their current values
    /// (§6 `search_by_addresses`): the "next scan" re-verification step of
    /// the first-scan/next-scan workflow. Addresses that can no longer be
    /// read (the target unmapped or exited) are silently dropped rather than
    /// failing the whole batch, matching the scanner's general tolerance of
    /// races with the target (§5).
    pub fn search_by_addresses(
        &self,
        addresses: &[usize],
        ty: LogicalType,
        length: u8,
    ) -> Result<Vec<(usize, Value)>> {
        let resolved = value::resolved_length(ty, length);
        let mut out = Vec::with_capacity(addresses.len());
        for &addr in addresses {
            match self.read(addr, ty, resolved) {
                Ok(value) => out.push((addr, value)),
                Err(MemScanError::ReadFailed { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_session_rejects_read() {
        let pid = std::process::id();
        let mut session = Session::open(ProcessSelector::Pid(pid), Permission::ReadWrite).unwrap();
        session.close();
        assert!(session.is_closed());
        let err = session.read(0x1000, LogicalType::Int, 4).unwrap_err();
        assert!(matches!(err, MemScanError::ClosedSession { .. }));
    }

    #[test]
    fn close_is_idempotent() {
        let pid = std::process::id();
        let mut session = Session::open(ProcessSelector::Pid(pid), Permission::ReadOnly).unwrap();
        session.close();
        session.close();
        assert!(session.is_closed());
    }

    #[test]
    fn read_only_session_rejects_write() {
        let pid = std::process::id();
        let session = Session::open(ProcessSelector::Pid(pid), Permission::ReadOnly).unwrap();
        let err = session
            .write(0x1000, LogicalType::Int, 4, &Value::Int(1))
            .unwrap_err();
        assert!(matches!(err, MemScanError::PermissionDenied { .. }));
    }

    #[test]
    fn write_only_session_rejects_read() {
        let pid = std::process::id();
        let session = Session::open(ProcessSelector::Pid(pid), Permission::WriteOnly).unwrap();
        let err = session.read(0x1000, LogicalType::Int, 4).unwrap_err();
        assert!(matches!(err, MemScanError::PermissionDenied { .. }));
    }

    #[test]
    fn read_write_roundtrip_on_own_stack_value() {
        let mut local: i32 = 42;
        let addr = &mut local as *mut i32 as usize;

        let pid = std::process::id();
        let session = Session::open(ProcessSelector::Pid(pid), Permission::All).unwrap();

        let before = session.read(addr, LogicalType::Int, 4).unwrap();
        assert_eq!(before, Value::Int(42));

        session
            .write(addr, LogicalType::Int, 4, &Value::Int(777))
            .unwrap();
        assert_eq!(local, 777);

        let after = session.read(addr, LogicalType::Int, 4).unwrap();
        assert_eq!(after, Value::Int(777));
    }

    #[test]
    fn process_not_found_for_bogus_pid() {
        let err = Session::open(ProcessSelector::Pid(u32::MAX - 1), Permission::ReadOnly).unwrap_err();
        assert!(matches!(err, MemScanError::ProcessNotFound { .. }));
    }

    #[test]
    fn search_value_equal_finds_known_marker() {
        let marker: i32 = 0x1A2B_3C4D;
        let addr = std::hint::black_box(&marker) as *const i32 as usize;

        let pid = std::process::id();
        let session = Session::open(ProcessSelector::Pid(pid), Permission::ReadOnly).unwrap();
        let cursor = session
            .search_value(LogicalType::Int, 4, &Value::Int(marker as i64), Comparator::Equal, false, false, None)
            .unwrap();

        let found = cursor.take(2_000_000).filter_map(|r| r.ok()).any(|hit| hit.address == addr);
        assert!(found);
    }

    #[test]
    fn search_between_finds_value_in_range() {
        let value: i32 = 4242;
        let addr = std::hint::black_box(&value) as *const i32 as usize;

        let pid = std::process::id();
        let session = Session::open(ProcessSelector::Pid(pid), Permission::ReadOnly).unwrap();
        let cursor = session
            .search_between(LogicalType::Int, 4, &Value::Int(4000), &Value::Int(5000), false, false, false, None)
            .unwrap();

        let found = cursor.take(2_000_000).filter_map(|r| r.ok()).any(|hit| hit.address == addr);
        assert!(found);
    }

    #[test]
    fn search_between_rejects_inverted_range() {
        let pid = std::process::id();
        let session = Session::open(ProcessSelector::Pid(pid), Permission::ReadOnly).unwrap();
        let err = session
            .search_between(LogicalType::Int, 4, &Value::Int(100), &Value::Int(0), false, false, false, None)
            .unwrap_err();
        assert!(matches!(err, MemScanError::InvalidRange));
    }

    #[test]
    fn search_by_addresses_returns_current_values_unfiltered() {
        let mut a: i32 = 5;
        let mut b: i32 = 5;
        let addr_a = &mut a as *mut i32 as usize;
        let addr_b = &mut b as *mut i32 as usize;

        let session = Session::open(ProcessSelector::Pid(std::process::id()), Permission::All).unwrap();
        let pairs = session
            .search_by_addresses(&[addr_a, addr_b], LogicalType::Int, 4)
            .unwrap();
        assert_eq!(pairs, vec![(addr_a, Value::Int(5)), (addr_b, Value::Int(5))]);

        b = 999;
        std::hint::black_box(&b);
        let pairs = session
            .search_by_addresses(&[addr_a, addr_b], LogicalType::Int, 4)
            .unwrap();
        assert_eq!(pairs, vec![(addr_a, Value::Int(5)), (addr_b, Value::Int(999))]);
    }
}
