//! Core data models: path addresses, file records and scan results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::error::ScanError;
use crate::long_path::to_long_safe_path;

/// Separator used when deriving child paths
pub const SEPARATOR: char = std::path::MAIN_SEPARATOR;

/// Whether `c` separates path components
pub fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Boundary-safe prefix test: `path` lies strictly below `ancestor`.
fn is_path_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() || path.len() <= ancestor.len() {
        return false;
    }
    match path.strip_prefix(ancestor) {
        Some(rest) => ancestor.ends_with(is_separator) || rest.starts_with(is_separator),
        None => false,
    }
}

/// Substring of `path` up to its last separator
fn parent_of(path: &str) -> &str {
    match path.rfind(is_separator) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Native file attribute bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileAttributes(pub u32);

impl FileAttributes {
    /// Read-only entry
    pub const READONLY: u32 = 0x0000_0001;
    /// Hidden entry
    pub const HIDDEN: u32 = 0x0000_0002;
    /// System entry
    pub const SYSTEM: u32 = 0x0000_0004;
    /// Directory entry
    pub const DIRECTORY: u32 = 0x0000_0010;
    /// Archive bit
    pub const ARCHIVE: u32 = 0x0000_0020;
    /// Device entry
    pub const DEVICE: u32 = 0x0000_0040;
    /// No other attributes set
    pub const NORMAL: u32 = 0x0000_0080;
    /// Junction, symbolic link or other redirecting entry
    pub const REPARSE_POINT: u32 = 0x0000_0400;

    /// Whether every bit in `mask` is set
    pub fn contains(self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    /// Directory bit set
    pub fn is_directory(self) -> bool {
        self.contains(Self::DIRECTORY)
    }

    /// Reparse-point bit set
    pub fn is_reparse_point(self) -> bool {
        self.contains(Self::REPARSE_POINT)
    }
}

/// Absolute path identifying a directory
///
/// Trailing separators are stripped at construction, so two addresses are
/// equal exactly when their normalized path strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DirectoryAddress {
    path: String,
}

impl DirectoryAddress {
    /// Create an address from a path string
    pub fn new(path: impl Into<String>) -> Self {
        let mut path = path.into();
        let trimmed = path.trim_end_matches(is_separator).len();
        // A bare root ("/" or "\") keeps one separator.
        if trimmed == 0 && !path.is_empty() {
            path.truncate(1);
        } else {
            path.truncate(trimmed);
        }
        Self { path }
    }

    /// Normalized path string
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the address names anything at all
    pub fn is_populated(&self) -> bool {
        !self.path.is_empty()
    }

    /// Address of the containing directory
    pub fn parent(&self) -> DirectoryAddress {
        DirectoryAddress::new(parent_of(&self.path))
    }

    /// Whether this address lies strictly below `other`
    pub fn is_descendant_of(&self, other: &DirectoryAddress) -> bool {
        is_path_descendant(&self.path, &other.path)
    }

    /// Path of the entry `name` inside this directory
    pub fn child_path(&self, name: &str) -> String {
        let mut out = String::with_capacity(self.path.len() + name.len() + 1);
        out.push_str(&self.path);
        if !self.path.ends_with(is_separator) {
            out.push(SEPARATOR);
        }
        out.push_str(name);
        out
    }

    /// Address of the subdirectory `name`
    pub fn child(&self, name: &str) -> DirectoryAddress {
        DirectoryAddress::new(self.child_path(name))
    }

    /// Separator-terminated form handed to the native scan
    pub fn scan_path(&self) -> String {
        let mut out = self.path.clone();
        if !out.ends_with(is_separator) {
            out.push(SEPARATOR);
        }
        out
    }
}

impl fmt::Display for DirectoryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for DirectoryAddress {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for DirectoryAddress {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// A discovered file with its metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FileRecord {
    /// Native attribute bits
    pub attributes: FileAttributes,
    /// Absolute path to the file
    path: String,
    /// Last write time
    pub last_modified: DateTime<Utc>,
    /// File size in bytes
    pub length: u64,
}

impl FileRecord {
    /// Create a record, rejecting an empty path
    pub fn new(
        attributes: FileAttributes,
        path: impl Into<String>,
        last_modified: DateTime<Utc>,
        length: u64,
    ) -> Result<Self, ScanError> {
        let path = path.into();
        if path.is_empty() {
            return Err(ScanError::invalid_argument("File path must not be empty"));
        }
        Ok(Self {
            attributes,
            path,
            last_modified,
            length,
        })
    }

    /// Absolute path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// File name without the directory part
    pub fn name(&self) -> &str {
        match self.path.rfind(is_separator) {
            Some(idx) => &self.path[idx + 1..],
            None => &self.path,
        }
    }

    /// Address of the containing directory
    pub fn parent(&self) -> DirectoryAddress {
        DirectoryAddress::new(parent_of(&self.path))
    }

    /// Path rewritten for native calls when it exceeds the length limit
    pub fn long_safe_path(&self) -> Cow<'_, str> {
        to_long_safe_path(&self.path)
    }

    /// Whether this file lies below `dir`
    pub fn is_descendant_of(&self, dir: &DirectoryAddress) -> bool {
        is_path_descendant(&self.path, dir.path())
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A classified directory entry routed to the walkers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Entry {
    /// Regular file
    File(FileRecord),
    /// Real (non-reparse) directory eligible for recursion
    Directory(DirectoryAddress),
}

impl Entry {
    /// The file record, if this is a file
    pub fn into_file(self) -> Option<FileRecord> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Directory(_) => None,
        }
    }

    /// The directory address, if this is a directory
    pub fn into_directory(self) -> Option<DirectoryAddress> {
        match self {
            Entry::File(_) => None,
            Entry::Directory(dir) => Some(dir),
        }
    }
}

/// Result of a scan operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanResult {
    /// Total number of files found
    pub total_files: u64,
    /// Total number of directories discovered
    pub total_dirs: u64,
    /// Files found (empty for directory enumeration)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileRecord>,
    /// Directories found (empty for file enumeration)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<DirectoryAddress>,
    /// Errors encountered during scanning
    #[serde(skip)]
    pub errors: Vec<ScanError>,
    /// Total scan duration in milliseconds
    pub duration_ms: u64,
}

impl ScanResult {
    /// Create a new empty scan result
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of errors
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Check if the scan completed without errors
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
