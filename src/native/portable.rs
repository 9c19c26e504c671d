//! `read_dir` backend for non-Windows targets
//!
//! Attribute bits are synthesised from the file type so entries classify the
//! same way they would on Windows. Symbolic links stand in for reparse points.

use std::borrow::Cow;
use std::fs::{self, OpenOptions};
use std::io::ErrorKind;

use chrono::{DateTime, Utc};

use super::{FileShare, RawScanEntry};
use crate::error::ScanError;
use crate::models::{DirectoryAddress, FileAttributes};

pub(super) struct RawSession {
    entries: fs::ReadDir,
    path: String,
}

pub(super) fn open(dir: &DirectoryAddress) -> Result<Option<RawSession>, ScanError> {
    match fs::read_dir(dir.scan_path()) {
        Ok(entries) => Ok(Some(RawSession {
            entries,
            path: dir.path().to_string(),
        })),
        Err(err) => Err(ScanError::from_io(&err, dir.path())),
    }
}

impl RawSession {
    pub(super) fn next_entry(&mut self) -> Option<Result<RawScanEntry, ScanError>> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(ScanError::from_io(&err, &self.path))),
            };
            let name = entry.file_name().to_string_lossy().into_owned();

            // Does not follow symlinks.
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    log::trace!("{} vanished during scan of {}", name, self.path);
                    continue;
                }
                Err(err) => return Some(Err(ScanError::from_io(&err, &self.path))),
            };

            let file_type = metadata.file_type();
            let mut bits = if file_type.is_symlink() {
                FileAttributes::REPARSE_POINT
            } else if file_type.is_dir() {
                FileAttributes::DIRECTORY
            } else if file_type.is_file() {
                FileAttributes::ARCHIVE
            } else {
                FileAttributes::DEVICE
            };
            if metadata.permissions().readonly() {
                bits |= FileAttributes::READONLY;
            }
            if name.starts_with('.') {
                bits |= FileAttributes::HIDDEN;
            }

            let last_write = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();

            return Some(Ok(RawScanEntry {
                attributes: FileAttributes(bits),
                name,
                size: if file_type.is_file() { metadata.len() } else { 0 },
                last_write,
            }));
        }
    }
}

pub(super) fn apply_share_mode(_options: &mut OpenOptions, _share: FileShare) {}

pub(super) fn native_file_path(path: &str) -> Cow<'_, str> {
    Cow::Borrowed(path)
}
