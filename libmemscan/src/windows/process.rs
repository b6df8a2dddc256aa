use crate::error::{MemScanError, Result};
use crate::process::{
    MemoryProtection, MemoryRegion, MemoryState, MemoryType, ProcessHandle, SystemInfo,
    is_region_interesting,
};
use std::mem::{MaybeUninit, size_of};
use winapi::{
    shared::{
        basetsd::SIZE_T,
        minwindef::{DWORD, FALSE, LPCVOID, LPVOID},
        windef::HWND,
    },
    um::{
        handleapi::CloseHandle,
        memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory},
        processthreadsapi::OpenProcess,
        sysinfoapi::{GetNativeSystemInfo, SYSTEM_INFO},
        tlhelp32::{
            CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW,
            TH32CS_SNAPPROCESS,
        },
        winnt::{
            HANDLE, MEM_COMMIT, MEM_FREE, MEM_IMAGE, MEM_MAPPED, MEM_PRIVATE, MEM_RESERVE,
            MEMORY_BASIC_INFORMATION, PAGE_EXECUTE, PAGE_EXECUTE_READ, PAGE_EXECUTE_READWRITE,
            PAGE_EXECUTE_WRITECOPY, PAGE_GUARD, PAGE_NOACCESS, PAGE_NOCACHE, PAGE_READONLY,
            PAGE_READWRITE, PAGE_WRITECOPY, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION,
            PROCESS_VM_READ, PROCESS_VM_WRITE,
        },
        winuser::{FindWindowW, GetWindowThreadProcessId},
    },
};

// ================== Windows-specific process types ==================

#[derive(Debug)]
pub struct ProcessHandleWin(pub HANDLE);

unsafe impl Send for ProcessHandleWin {}
unsafe impl Sync for ProcessHandleWin {}

impl ProcessHandleWin {
    pub fn raw(&self) -> HANDLE {
        self.0
    }
}

impl Drop for ProcessHandleWin {
    fn drop(&mut self) {
        unsafe {
            if !self.0.is_null() {
                CloseHandle(self.0);
            }
        }
    }
}

impl From<u32> for MemoryProtection {
    fn from(protect: u32) -> Self {
        MemoryProtection {
            no_access: protect & PAGE_NOACCESS != 0,
            read: protect
                & (PAGE_READONLY
                    | PAGE_READWRITE
                    | PAGE_WRITECOPY
                    | PAGE_EXECUTE_READ
                    | PAGE_EXECUTE_READWRITE
                    | PAGE_EXECUTE_WRITECOPY)
                != 0,
            write: protect
                & (PAGE_READWRITE | PAGE_WRITECOPY | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY)
                != 0,
            execute: protect
                & (PAGE_EXECUTE | PAGE_EXECUTE_READ | PAGE_EXECUTE_READWRITE | PAGE_EXECUTE_WRITECOPY)
                != 0,
            copy_on_write: protect & (PAGE_WRITECOPY | PAGE_EXECUTE_WRITECOPY) != 0,
            guarded: protect & PAGE_GUARD != 0,
            no_cache: protect & PAGE_NOCACHE != 0,
        }
    }
}

impl From<u32> for MemoryState {
    fn from(state: u32) -> Self {
        MemoryState {
            committed: state & MEM_COMMIT != 0,
            free: state & MEM_FREE != 0,
            reserved: state & MEM_RESERVE != 0,
        }
    }
}

impl From<u32> for MemoryType {
    fn from(type_: u32) -> Self {
        match type_ {
            MEM_IMAGE => MemoryType::Image,
            MEM_MAPPED => MemoryType::Mapped,
            MEM_PRIVATE => MemoryType::Private,
            _ => MemoryType::Unknown,
        }
    }
}

// ================== Windows-specific process functions ==================

pub(crate) fn open_process(pid: u32) -> Result<ProcessHandle> {
    unsafe {
        let handle = OpenProcess(
            PROCESS_QUERY_INFORMATION | PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION,
            FALSE,
            pid,
        );
        if handle.is_null() {
            return Err(MemScanError::ProcessNotFound {
                pid: Some(pid),
                name: None,
                window_title: None,
            });
        }
        Ok(ProcessHandleWin(handle))
    }
}

/// Find the PID of the first process whose executable name matches `name`
/// (case-insensitive). Example names: `"notepad"` or `"notepad.exe"`.
pub(crate) fn find_process_by_name(name: &str) -> Result<Option<u32>> {
    let name = name.to_ascii_lowercase();

    unsafe {
        let snapshot = CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0);
        if snapshot == winapi::um::handleapi::INVALID_HANDLE_VALUE {
            return Err(MemScanError::ProcessNotFound {
                pid: None,
                name: Some(name),
                window_title: None,
            });
        }

        let mut entry: PROCESSENTRY32W = std::mem::zeroed();
        entry.dwSize = size_of::<PROCESSENTRY32W>() as u32;

        let mut found_pid: Option<u32> = None;

        if Process32FirstW(snapshot, &mut entry) == FALSE {
            CloseHandle(snapshot);
            return Ok(None);
        }

        loop {
            let exe_name = {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                String::from_utf16_lossy(&entry.szExeFile[..len]).to_ascii_lowercase()
            };

            if exe_name.starts_with(&name) {
                found_pid = Some(entry.th32ProcessID);
                break;
            }

            if Process32NextW(snapshot, &mut entry) == FALSE {
                break;
            }
        }

        CloseHandle(snapshot);
        Ok(found_pid)
    }
}

/// Find the PID owning the first top-level window whose title matches exactly.
pub(crate) fn find_process_by_window_title(title: &str) -> Result<Option<u32>> {
    let wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();
    unsafe {
        let hwnd: HWND = FindWindowW(std::ptr::null(), wide.as_ptr());
        if hwnd.is_null() {
            return Ok(None);
        }
        let mut pid: DWORD = 0;
        GetWindowThreadProcessId(hwnd, &mut pid);
        if pid == 0 { Ok(None) } else { Ok(Some(pid)) }
    }
}

pub(crate) fn query_system_info() -> SystemInfo {
    unsafe {
        let mut info = MaybeUninit::<SYSTEM_INFO>::uninit();
        GetNativeSystemInfo(info.as_mut_ptr());
        let info = info.assume_init();
        SystemInfo {
            min_app_addr: info.lpMinimumApplicationAddress as usize,
            max_app_addr: info.lpMaximumApplicationAddress as usize,
            granularity: info.dwAllocationGranularity as usize,
            page_size: info.dwPageSize as usize,
        }
    }
}

pub(crate) fn memory_region_iterator_next(
    proc: &ProcessHandleWin,
    cur_addr: &mut usize,
) -> Option<MemoryRegion> {
    let mut mbi = MaybeUninit::<MEMORY_BASIC_INFORMATION>::uninit();
    let res = unsafe {
        VirtualQueryEx(
            proc.raw(),
            *cur_addr as LPCVOID,
            mbi.as_mut_ptr(),
            size_of::<MEMORY_BASIC_INFORMATION>() as SIZE_T,
        )
    };

    if res == 0 {
        return None;
    }

    let mbi = unsafe { mbi.assume_init() };
    let region_base = mbi.BaseAddress as usize;
    let region_size = mbi.RegionSize as usize;

    let prot: MemoryProtection = mbi.Protect.into();
    let state: MemoryState = mbi.State.into();
    let type_: MemoryType = mbi.Type.into();

    *cur_addr = region_base.saturating_add(region_size);

    // §4.2: Windows readability also requires Type == MEM_PRIVATE; mapped
    // files and images are excluded even when committed and readable.
    if is_region_interesting(&prot, &state) && matches!(type_, MemoryType::Private) {
        Some(MemoryRegion {
            base_address: region_base,
            size: region_size,
            protect: prot,
            state,
            type_,
            image_file: None,
        })
    } else {
        None
    }
}

/// Read process memory into the provided buffer. Returns the number of bytes read (0 on failure).
pub(crate) fn read_process_memory(proc: &ProcessHandleWin, addr: usize, buf: &mut [u8]) -> usize {
    unsafe {
        let mut bytes_read: SIZE_T = 0;
        let res = ReadProcessMemory(
            proc.raw(),
            addr as LPCVOID,
            buf.as_mut_ptr() as LPVOID,
            buf.len() as SIZE_T,
            &mut bytes_read as *mut SIZE_T,
        );
        if res == 0 { 0 } else { bytes_read as usize }
    }
}

pub(crate) fn write_process_memory(proc: &ProcessHandleWin, addr: usize, buf: &[u8]) -> usize {
    unsafe {
        let mut bytes_written: SIZE_T = 0;
        let res = WriteProcessMemory(
            proc.raw(),
            addr as LPVOID,
            buf.as_ptr() as LPCVOID,
            buf.len() as SIZE_T,
            &mut bytes_written as *mut SIZE_T,
        );
        if res == 0 { 0 } else { bytes_written as usize }
    }
}
