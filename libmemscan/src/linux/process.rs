#![cfg(unix)]
use crate::error::{MemScanError, Result};
use crate::process::{
    MemoryProtection, MemoryRegion, MemoryState, MemoryType, ProcessHandle, SystemInfo,
    is_region_interesting,
};
use libc::{_SC_PAGESIZE, c_void, iovec, pid_t, sysconf};
use std::{
    fs::{File, read_link},
    io::{BufRead, BufReader},
    path::Path,
};

// ================== Linux/UNIX-specific process types ==================

#[derive(Debug)]
pub struct ProcessHandleUnix {
    pid: pid_t,
}

unsafe impl Send for ProcessHandleUnix {}
unsafe impl Sync for ProcessHandleUnix {}

impl ProcessHandleUnix {
    pub fn raw(&self) -> pid_t {
        self.pid
    }
}

// ================== Linux/UNIX-specific helpers ==================

fn parse_proc_maps(pid: pid_t) -> Result<Vec<MemoryRegion>> {
    let maps_path = format!("/proc/{pid}/maps");
    let file = File::open(&maps_path).map_err(|e| {
        log::debug!("failed to open {maps_path}: {e}");
        MemScanError::ProcessNotFound {
            pid: Some(pid as u32),
            name: None,
            window_title: None,
        }
    })?;
    let reader = BufReader::new(file);

    let exe_path = read_link(format!("/proc/{pid}/exe"))
        .ok()
        .and_then(|p| p.to_str().map(|s| s.to_string()));

    let mut entries: Vec<MemoryRegion> = Vec::new();
    for line_res in reader.lines() {
        let line = line_res.map_err(|e| MemScanError::ReadFailed {
            address: 0,
            length: 0,
            reason: format!("failed to read {maps_path}: {e}"),
        })?;
        // `start-end perms offset dev:inode pathname`
        let mut parts = line.splitn(6, ' ').filter(|s| !s.is_empty());
        let addr = parts.next().unwrap_or("");
        let perms = parts.next().unwrap_or("");
        let _offset_hex = parts.next().unwrap_or("0");
        let _dev = parts.next().unwrap_or("");
        let _inode = parts.next().unwrap_or("0");
        let pathname_opt = parts.next().and_then(|p| {
            let p = p.trim();
            if p.is_empty() { None } else { Some(p.to_string()) }
        });

        let mut addr_it = addr.split('-');
        let start = usize::from_str_radix(addr_it.next().unwrap_or("0"), 16).unwrap_or(0);
        let end = usize::from_str_radix(addr_it.next().unwrap_or("0"), 16).unwrap_or(0);
        let size = end.saturating_sub(start);

        let protect = perms_to_protection(perms);
        let state = MemoryState {
            committed: true,
            free: false,
            reserved: false,
        };
        let image_file = pathname_opt.as_ref().and_then(|p| {
            if p.starts_with('[') { None } else { Some(p.clone()) }
        });
        let type_ = perms_to_type(perms, &image_file, &exe_path);

        entries.push(MemoryRegion {
            base_address: start,
            size,
            protect,
            state,
            type_,
            image_file,
        });
    }

    entries.sort_by_key(|e| e.base_address);
    Ok(entries)
}

fn perms_to_protection(perms: &str) -> MemoryProtection {
    let bytes = perms.as_bytes();
    let read = bytes.first().map(|&c| c == b'r').unwrap_or(false);
    let write = bytes.get(1).map(|&c| c == b'w').unwrap_or(false);
    let exec = bytes.get(2).map(|&c| c == b'x').unwrap_or(false);
    MemoryProtection {
        no_access: false,
        read,
        write,
        execute: exec,
        copy_on_write: false,
        guarded: false,
        no_cache: false,
    }
}

fn perms_to_type(perms: &str, pathname: &Option<String>, _exe_path: &Option<String>) -> MemoryType {
    let shared_flag = perms.as_bytes().get(3).map(|&c| c == b's').unwrap_or(false);
    if let Some(path) = pathname {
        if Path::new(path).is_file() {
            return MemoryType::Image;
        }
    }
    if shared_flag { MemoryType::Mapped } else { MemoryType::Private }
}

// ================== Linux-specific process functions ==================

pub(crate) fn open_process(pid: u32) -> Result<ProcessHandle> {
    let pid_i = pid as pid_t;
    if !Path::new(&format!("/proc/{pid_i}")).exists() {
        return Err(MemScanError::ProcessNotFound {
            pid: Some(pid),
            name: None,
            window_title: None,
        });
    }
    Ok(ProcessHandleUnix { pid: pid_i })
}

/// Take a fresh snapshot of the process's memory map for one enumeration.
/// `/proc/<pid>/maps` is read in full here and not held past this call --
/// the iterator built from it reflects this one instant, not the handle's
/// whole lifetime.
pub(crate) fn snapshot_maps(proc: &ProcessHandleUnix) -> Vec<MemoryRegion> {
    parse_proc_maps(proc.pid).unwrap_or_default()
}

/// Find the PID of the first process whose executable name matches `name`
/// (case-insensitive, `.exe` suffix ignored for cross-platform parity).
pub(crate) fn find_process_by_name(name: &str) -> Result<Option<u32>> {
    use std::fs;

    let target_raw = name.to_ascii_lowercase();
    let target = target_raw.trim_end_matches(".exe");

    let proc_dir = Path::new("/proc");
    for entry in fs::read_dir(proc_dir).map_err(|e| MemScanError::ReadFailed {
        address: 0,
        length: 0,
        reason: format!("failed to enumerate /proc: {e}"),
    })? {
        let Ok(entry) = entry else { continue };
        let fname = entry.file_name();
        let fname_str = fname.to_string_lossy();
        if !fname_str.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let Ok(pid) = fname_str.parse::<u32>() else { continue };

        if let Ok(comm) = fs::read_to_string(entry.path().join("comm")) {
            if comm.trim().to_ascii_lowercase() == target {
                return Ok(Some(pid));
            }
        }
        if let Ok(link) = read_link(entry.path().join("exe")) {
            if let Some(base) = link.file_name().and_then(|s| s.to_str()) {
                let base_lc = base.to_ascii_lowercase();
                if base_lc.trim_end_matches(".exe") == target {
                    return Ok(Some(pid));
                }
            }
        }
    }
    Ok(None)
}

pub(crate) fn query_system_info() -> SystemInfo {
    let page_size = unsafe { sysconf(_SC_PAGESIZE) as usize };
    SystemInfo {
        min_app_addr: 0,
        max_app_addr: usize::MAX,
        granularity: page_size,
        page_size,
    }
}

pub(crate) fn memory_region_iterator_next(
    maps: &[MemoryRegion],
    cur_addr: &mut usize,
) -> Option<MemoryRegion> {
    let idx = match maps.binary_search_by_key(cur_addr, |m| m.base_address) {
        Ok(i) => i,
        Err(i) => i,
    };
    if idx >= maps.len() {
        *cur_addr = usize::MAX;
        return None;
    }
    let m = &maps[idx];
    *cur_addr = m.base_address.saturating_add(m.size);

    if is_region_interesting(&m.protect, &m.state) {
        Some(m.clone())
    } else {
        None
    }
}

/// Cross-process read via a single vectored `process_vm_readv` call: one
/// local iovec backed by `buf`, one remote iovec at `addr`.
pub(crate) fn read_process_memory(proc: &ProcessHandleUnix, addr: usize, buf: &mut [u8]) -> usize {
    let local = iovec {
        iov_base: buf.as_mut_ptr() as *mut c_void,
        iov_len: buf.len(),
    };
    let remote = iovec {
        iov_base: addr as *mut c_void,
        iov_len: buf.len(),
    };
    let n = unsafe { libc::process_vm_readv(proc.raw(), &local, 1, &remote, 1, 0) };
    if n < 0 { 0 } else { n as usize }
}

pub(crate) fn write_process_memory(proc: &ProcessHandleUnix, addr: usize, buf: &[u8]) -> usize {
    let local = iovec {
        iov_base: buf.as_ptr() as *mut c_void,
        iov_len: buf.len(),
    };
    let remote = iovec {
        iov_base: addr as *mut c_void,
        iov_len: buf.len(),
    };
    let n = unsafe { libc::process_vm_writev(proc.raw(), &local, 1, &remote, 1, 0) };
    if n < 0 { 0 } else { n as usize }
}
