//! Win32 backend: FindFirstFileExW / FindNextFileW / FindClose

use std::borrow::Cow;
use std::ffi::c_void;
use std::fs::OpenOptions;
use std::os::windows::fs::OpenOptionsExt;
use std::{iter, mem, ptr};

use windows_sys::Win32::Foundation::{
    GetLastError, ERROR_FILE_NOT_FOUND, ERROR_NO_MORE_FILES, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    FindClose, FindExInfoBasic, FindExSearchNameMatch, FindFirstFileExW, FindNextFileW,
    FIND_FIRST_EX_LARGE_FETCH, WIN32_FIND_DATAW,
};

use super::{FileShare, RawScanEntry};
use crate::error::{map_native_error, ScanError};
use crate::long_path::to_long_safe_path;
use crate::models::DirectoryAddress;

/// Owned find handle, closed exactly once on drop.
struct FindHandle(HANDLE);

// SAFETY: find handles are not bound to the thread that opened them.
unsafe impl Send for FindHandle {}

impl Drop for FindHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful FindFirstFileExW and is
        // closed only here.
        unsafe {
            FindClose(self.0);
        }
    }
}

pub(super) struct RawSession {
    handle: FindHandle,
    data: Box<WIN32_FIND_DATAW>,
    /// The first entry arrives with the open call and is not yet consumed.
    pending: bool,
    /// Directory being listed, reported on failure
    path: String,
}

pub(super) fn open(dir: &DirectoryAddress) -> Result<Option<RawSession>, ScanError> {
    let pattern = format!("{}*", dir.scan_path());
    let native = to_long_safe_path(&pattern);
    let wide: Vec<u16> = native.encode_utf16().chain(iter::once(0)).collect();

    // SAFETY: WIN32_FIND_DATAW is plain data; all-zero is a valid value.
    let mut data: Box<WIN32_FIND_DATAW> = Box::new(unsafe { mem::zeroed() });
    // SAFETY: `wide` is NUL-terminated and outlives the call; `data` is a
    // live, writable WIN32_FIND_DATAW as FindExInfoBasic requires.
    let handle = unsafe {
        FindFirstFileExW(
            wide.as_ptr(),
            FindExInfoBasic,
            &mut *data as *mut WIN32_FIND_DATAW as *mut c_void,
            FindExSearchNameMatch,
            ptr::null(),
            FIND_FIRST_EX_LARGE_FETCH,
        )
    };

    if handle == INVALID_HANDLE_VALUE {
        // No handle was produced, so there is nothing to close.
        // SAFETY: reads the calling thread's last-error value only.
        let code = unsafe { GetLastError() };
        return match code {
            ERROR_NO_MORE_FILES | ERROR_FILE_NOT_FOUND => Ok(None),
            other => map_native_error(other, dir.path()).map(|()| None),
        };
    }

    Ok(Some(RawSession {
        handle: FindHandle(handle),
        data,
        pending: true,
        path: dir.path().to_string(),
    }))
}

impl RawSession {
    pub(super) fn next_entry(&mut self) -> Option<Result<RawScanEntry, ScanError>> {
        if self.pending {
            self.pending = false;
        } else {
            // SAFETY: the handle is open until `self` drops and `data` is the
            // buffer it was opened with.
            let found = unsafe { FindNextFileW(self.handle.0, &mut *self.data) };
            if found == 0 {
                // SAFETY: reads the calling thread's last-error value only.
                let code = unsafe { GetLastError() };
                if code == ERROR_NO_MORE_FILES {
                    return None;
                }
                return map_native_error(code, &self.path).err().map(Err);
            }
        }
        Some(Ok(raw_entry(&self.data)))
    }
}

fn raw_entry(data: &WIN32_FIND_DATAW) -> RawScanEntry {
    let len = data
        .cFileName
        .iter()
        .position(|&c| c == 0)
        .unwrap_or(data.cFileName.len());
    RawScanEntry::from_native_words(
        data.dwFileAttributes,
        String::from_utf16_lossy(&data.cFileName[..len]),
        data.nFileSizeHigh,
        data.nFileSizeLow,
        data.ftLastWriteTime.dwHighDateTime,
        data.ftLastWriteTime.dwLowDateTime,
    )
}

pub(super) fn apply_share_mode(options: &mut OpenOptions, share: FileShare) {
    options.share_mode(share.0);
}

pub(super) fn native_file_path(path: &str) -> Cow<'_, str> {
    to_long_safe_path(path)
}
