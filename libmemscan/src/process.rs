//! Cross-platform region descriptor and process handle dispatch.
//!
//! The concrete `ProcessHandle` alias and the free functions below route to
//! `linux::process` or `windows::process` depending on target OS; everything
//! in this module is platform-agnostic.

use crate::error::{MemScanError, Result};
use std::fmt::{self, Display, Formatter};

#[cfg(unix)]
use crate::linux;
#[cfg(windows)]
use crate::windows;

// ================== Cross-platform aliases ==================

#[cfg(windows)]
pub type ProcessHandle = windows::process::ProcessHandleWin;
#[cfg(unix)]
pub type ProcessHandle = linux::process::ProcessHandleUnix;

/// Open a process by its PID.
pub fn open_process(pid: u32) -> Result<ProcessHandle> {
    #[cfg(windows)]
    return windows::process::open_process(pid);
    #[cfg(unix)]
    return linux::process::open_process(pid);
}

/// Find a process by its executable name (case-insensitive, `.exe` suffix optional).
pub fn find_process_by_name(name: &str) -> Result<Option<u32>> {
    #[cfg(windows)]
    return windows::process::find_process_by_name(name);
    #[cfg(unix)]
    return linux::process::find_process_by_name(name);
}

/// Find a process by a visible top-level window title (best-effort, no-op on UNIX).
pub fn find_process_by_window_title(title: &str) -> Result<Option<u32>> {
    #[cfg(windows)]
    return windows::process::find_process_by_window_title(title);
    #[cfg(unix)]
    {
        let _ = title;
        Ok(None)
    }
}

/// System information about the target process environment.
pub fn query_system_info() -> SystemInfo {
    #[cfg(windows)]
    return windows::process::query_system_info();
    #[cfg(unix)]
    return linux::process::query_system_info();
}

/// Read raw bytes from `proc` at `addr`. Returns `ReadFailed` on any short or failed read.
pub fn read_process_memory(proc: &ProcessHandle, addr: usize, buf: &mut [u8]) -> Result<()> {
    #[cfg(windows)]
    let n = windows::process::read_process_memory(proc, addr, buf);
    #[cfg(unix)]
    let n = linux::process::read_process_memory(proc, addr, buf);

    if n == buf.len() {
        Ok(())
    } else {
        Err(MemScanError::ReadFailed {
            address: addr as u64,
            length: buf.len(),
            reason: format!("read {n} of {} requested bytes", buf.len()),
        })
    }
}

/// Scan-time read: copies whatever the kernel gives back instead of raising
/// on a short read (permission loss, an unmapped page inside the region, or
/// the target exiting mid-scan all truncate rather than fail). `buf` is
/// truncated to the bytes actually copied; the caller treats that prefix as
/// authoritative. Logged at debug level so short reads are visible without
/// aborting the scan.
pub(crate) fn read_process_memory_lenient(proc: &ProcessHandle, addr: usize, buf: &mut Vec<u8>) {
    let want = buf.len();
    #[cfg(windows)]
    let n = windows::process::read_process_memory(proc, addr, buf);
    #[cfg(unix)]
    let n = linux::process::read_process_memory(proc, addr, buf);

    if n < want {
        log::debug!("short read at {addr:#x}: got {n} of {want} bytes");
    }
    buf.truncate(n);
}

/// Write raw bytes into `proc` at `addr`. Returns `WriteFailed` on any short or failed write.
pub fn write_process_memory(proc: &ProcessHandle, addr: usize, buf: &[u8]) -> Result<()> {
    #[cfg(windows)]
    let n = windows::process::write_process_memory(proc, addr, buf);
    #[cfg(unix)]
    let n = linux::process::write_process_memory(proc, addr, buf);

    if n == buf.len() {
        Ok(())
    } else {
        Err(MemScanError::WriteFailed {
            address: addr as u64,
            length: buf.len(),
            reason: format!("wrote {n} of {} requested bytes", buf.len()),
        })
    }
}

// ================= Cross-platform structures ==================

/// System information about the target process environment.
#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub min_app_addr: usize,
    pub max_app_addr: usize,
    pub granularity: usize,
    pub page_size: usize,
}

/// Cross-platform memory protection flags.
/// Agnostic representation of:
/// - Windows PAGE_* constants, see https://learn.microsoft.com/en-us/windows/win32/Memory/memory-protection-constants
/// - Linux PROT_* / `/proc/<pid>/maps` perms, see https://man7.org/linux/man-pages/man5/proc.5.html
#[derive(Debug, Clone)]
pub struct MemoryProtection {
    pub no_access: bool,
    pub read: bool,
    pub write: bool,
    pub execute: bool,
    pub copy_on_write: bool,
    pub guarded: bool,
    pub no_cache: bool,
}

impl Display for MemoryProtection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.no_access {
            flags.push("NOACCESS");
        }
        if self.no_cache {
            flags.push("NOCACHE");
        }
        if self.read {
            flags.push("READ");
        }
        if self.write && !self.copy_on_write {
            flags.push("WRITE");
        }
        if self.write && self.copy_on_write {
            flags.push("WRITECOPY");
        }
        if self.execute {
            flags.push("EXECUTE");
        }
        if self.guarded {
            flags.push("GUARDED");
        }
        write!(f, "{}", flags.join("_"))
    }
}

/// Cross-platform memory state flags.
#[derive(Debug, Clone)]
pub struct MemoryState {
    pub committed: bool,
    pub free: bool,
    pub reserved: bool,
}

impl Display for MemoryState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut states = Vec::new();
        if self.committed {
            states.push("COMMITTED");
        }
        if self.free {
            states.push("FREE");
        }
        if self.reserved {
            states.push("RESERVED");
        }
        write!(f, "{}", states.join("|"))
    }
}

/// Cross-platform memory type flags.
#[derive(Debug, Clone)]
pub enum MemoryType {
    Unknown = 0b0,
    Private = 0b1,
    Mapped = 0b10,
    Image = 0b100,
}

impl Display for MemoryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let type_str = match self {
            MemoryType::Private => "PRIVATE",
            MemoryType::Mapped => "MAPPED",
            MemoryType::Image => "IMAGE",
            MemoryType::Unknown => "UNKNOWN",
        };
        write!(f, "{}", type_str)
    }
}

/// A single committed memory region in the target process's address space.
#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub base_address: usize,
    pub size: usize,
    pub protect: MemoryProtection,
    pub state: MemoryState,
    pub type_: MemoryType,
    pub image_file: Option<String>,
}

/// Iterates committed, readable memory regions of the process, optionally
/// restricted to regions that are also writable.
///
/// On UNIX this takes its own snapshot of `/proc/<pid>/maps` at construction
/// time; the pseudo-file is read once here and not held across scans, so two
/// iterators built moments apart can see a different map if the target
/// changed in between.
pub struct MemoryRegionIterator<'a> {
    proc: &'a ProcessHandle,
    cur_addr: usize,
    max_addr: usize,
    writable_only: bool,
    #[cfg(unix)]
    maps: Vec<MemoryRegion>,
}

impl<'a> MemoryRegionIterator<'a> {
    pub fn new(proc: &'a ProcessHandle, sys: &SystemInfo) -> Self {
        Self {
            proc,
            cur_addr: sys.min_app_addr,
            max_addr: sys.max_app_addr,
            writable_only: false,
            #[cfg(unix)]
            maps: linux::process::snapshot_maps(proc),
        }
    }

    pub fn writable_only(mut self, yes: bool) -> Self {
        self.writable_only = yes;
        self
    }

    fn next_raw(&mut self) -> Option<MemoryRegion> {
        #[cfg(windows)]
        return windows::process::memory_region_iterator_next(self.proc, &mut self.cur_addr);
        #[cfg(unix)]
        return linux::process::memory_region_iterator_next(&self.maps, &mut self.cur_addr);
    }
}

impl<'a> Iterator for MemoryRegionIterator<'a> {
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cur_addr < self.max_addr {
            match self.next_raw() {
                Some(region) if !self.writable_only || region.protect.write => {
                    return Some(region);
                }
                Some(_) => continue,
                None => continue,
            }
        }
        None
    }
}

/// Whether a region is eligible for scanning: committed, not free/reserved,
/// not guarded, and readable (§4.2 — "the `r` bit in perms means readable"
/// on UNIX, "`Protect & READABLE_MASK` != 0" on Windows; both are carried in
/// `prot.read`).
pub fn is_region_interesting(prot: &MemoryProtection, state: &MemoryState) -> bool {
    state.committed && !state.free && !state.reserved && !prot.no_access && !prot.guarded && prot.read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protection_display_lists_active_flags() {
        let prot = MemoryProtection {
            no_access: false,
            read: true,
            write: true,
            execute: false,
            copy_on_write: false,
            guarded: false,
            no_cache: false,
        };
        assert_eq!(prot.to_string(), "READ_WRITE");
    }

    #[test]
    fn interesting_excludes_guarded_and_reserved() {
        let prot_ok = MemoryProtection {
            no_access: false,
            read: true,
            write: true,
            execute: false,
            copy_on_write: false,
            guarded: false,
            no_cache: false,
        };
        let state_ok = MemoryState {
            committed: true,
            free: false,
            reserved: false,
        };
        assert!(is_region_interesting(&prot_ok, &state_ok));

        let mut prot_guarded = prot_ok.clone();
        prot_guarded.guarded = true;
        assert!(!is_region_interesting(&prot_guarded, &state_ok));

        let mut state_reserved = state_ok.clone();
        state_reserved.reserved = true;
        assert!(!is_region_interesting(&prot_ok, &state_reserved));

        let mut prot_unreadable = prot_ok.clone();
        prot_unreadable.read = false;
        assert!(!is_region_interesting(&prot_unreadable, &state_ok));
    }
}
