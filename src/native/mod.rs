//! Native directory scan session
//!
//! A [`ScanSession`] wraps one open directory listing (open-scan /
//! next-entry / close-scan) and yields classified [`Entry`] values. The
//! native handle is owned by the session and released when the listing is
//! exhausted, fails, or the session is dropped early.

use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::BufReader;

use crate::error::ScanError;
use crate::models::{DirectoryAddress, Entry, FileAttributes, FileRecord};

#[cfg(not(windows))]
mod portable;
#[cfg(windows)]
mod win32;

#[cfg(not(windows))]
use portable as backend;
#[cfg(windows)]
use win32 as backend;

/// 100ns intervals between 1601-01-01 and 1970-01-01
const FILETIME_UNIX_OFFSET: u64 = 116_444_736_000_000_000;
const FILETIME_TICKS_PER_SECOND: u64 = 10_000_000;

/// Combine split high/low 32-bit words into one 64-bit value
pub fn combine_words(high: u32, low: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

/// Convert a split FILETIME into a UTC instant.
///
/// Times before the Unix epoch clamp to the epoch.
pub fn filetime_to_utc(high: u32, low: u32) -> DateTime<Utc> {
    let ticks = combine_words(high, low);
    let Some(since_epoch) = ticks.checked_sub(FILETIME_UNIX_OFFSET) else {
        return DateTime::<Utc>::default();
    };
    let secs = (since_epoch / FILETIME_TICKS_PER_SECOND) as i64;
    let nanos = ((since_epoch % FILETIME_TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(secs, nanos).unwrap_or_default()
}

/// One entry as reported by the native next-entry call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawScanEntry {
    /// Native attribute bits
    pub attributes: FileAttributes,
    /// Entry name, without the directory part
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Last write time
    pub last_write: DateTime<Utc>,
}

impl RawScanEntry {
    /// Build an entry from the native split size and time words
    pub fn from_native_words(
        attributes: u32,
        name: String,
        size_high: u32,
        size_low: u32,
        time_high: u32,
        time_low: u32,
    ) -> Self {
        Self {
            attributes: FileAttributes(attributes),
            name,
            size: combine_words(size_high, size_low),
            last_write: filetime_to_utc(time_high, time_low),
        }
    }
}

/// How a raw entry is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryClass {
    /// Regular file, yielded as a [`FileRecord`]
    File,
    /// Real directory, eligible for recursion
    Directory,
    /// Self/parent references, reparse points and special entries
    Skip,
}

/// Classify a raw entry by name and attributes
pub fn classify(name: &str, attributes: FileAttributes) -> EntryClass {
    if name == "." || name == ".." {
        return EntryClass::Skip;
    }
    if attributes.is_reparse_point() || attributes.contains(FileAttributes::DEVICE) {
        return EntryClass::Skip;
    }
    if attributes.is_directory() {
        EntryClass::Directory
    } else {
        EntryClass::File
    }
}

/// An open listing of one directory
pub struct ScanSession {
    dir: DirectoryAddress,
    raw: Option<backend::RawSession>,
}

impl ScanSession {
    /// Open a listing of `dir`.
    ///
    /// A directory with nothing to list yields an empty session; any other
    /// native failure is mapped and returned.
    pub fn open(dir: &DirectoryAddress) -> Result<Self, ScanError> {
        if dir.path().trim().is_empty() {
            return Err(ScanError::invalid_argument("Directory path must not be empty"));
        }
        log::debug!("Opening scan session: {}", dir);
        let raw = backend::open(dir)?;
        Ok(Self {
            dir: dir.clone(),
            raw,
        })
    }

    /// Directory being listed
    pub fn directory(&self) -> &DirectoryAddress {
        &self.dir
    }

    /// Whether the native handle is still held
    pub fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    /// Drain the session, routing directories to `on_directory` and
    /// collecting files.
    pub fn collect_files(
        self,
        mut on_directory: impl FnMut(DirectoryAddress),
    ) -> Result<Vec<FileRecord>, ScanError> {
        let mut files = Vec::new();
        for entry in self {
            match entry? {
                Entry::File(file) => files.push(file),
                Entry::Directory(dir) => on_directory(dir),
            }
        }
        Ok(files)
    }

    fn route(&self, raw: RawScanEntry) -> Option<Result<Entry, ScanError>> {
        match classify(&raw.name, raw.attributes) {
            EntryClass::Skip => {
                log::trace!("Skipping {} in {}", raw.name, self.dir);
                None
            }
            EntryClass::Directory => Some(Ok(Entry::Directory(self.dir.child(&raw.name)))),
            EntryClass::File => Some(
                FileRecord::new(
                    raw.attributes,
                    self.dir.child_path(&raw.name),
                    raw.last_write,
                    raw.size,
                )
                .map(Entry::File),
            ),
        }
    }
}

impl Iterator for ScanSession {
    type Item = Result<Entry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.raw.as_mut()?.next_entry();
            match next {
                None => {
                    // Exhausted: release the handle now rather than at drop.
                    self.raw = None;
                    return None;
                }
                Some(Err(err)) => {
                    self.raw = None;
                    return Some(Err(err));
                }
                Some(Ok(raw)) => {
                    if let Some(entry) = self.route(raw) {
                        return Some(entry);
                    }
                }
            }
        }
    }
}

impl std::iter::FusedIterator for ScanSession {}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("dir", &self.dir)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Requested access for [`open_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    /// Read only
    Read,
    /// Write only
    Write,
    /// Read and write
    ReadWrite,
}

/// Sharing granted to other openers, as a native bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileShare(pub u32);

impl FileShare {
    /// Exclusive access
    pub const NONE: FileShare = FileShare(0);
    /// Others may read
    pub const READ: FileShare = FileShare(0x1);
    /// Others may write
    pub const WRITE: FileShare = FileShare(0x2);
    /// Others may delete or rename
    pub const DELETE: FileShare = FileShare(0x4);

    /// Combine two share masks
    pub fn with(self, other: FileShare) -> FileShare {
        FileShare(self.0 | other.0)
    }
}

/// What to do when the file does or does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    /// Create; fail if it exists
    CreateNew,
    /// Create or overwrite
    Create,
    /// Open; fail if missing
    Open,
    /// Open, creating if missing
    OpenOrCreate,
    /// Open and truncate; fail if missing
    Truncate,
    /// Open for appending, creating if missing
    Append,
}

/// Open `path` for content I/O, returning a caller-owned handle.
///
/// Failures are mapped into the scan taxonomy and never retried.
pub fn open_file(
    path: &str,
    access: FileAccess,
    share: FileShare,
    mode: CreationMode,
) -> Result<File, ScanError> {
    if path.trim().is_empty() {
        return Err(ScanError::invalid_argument("File path must not be empty"));
    }

    let mut options = OpenOptions::new();
    match access {
        FileAccess::Read => options.read(true),
        FileAccess::Write => options.write(true),
        FileAccess::ReadWrite => options.read(true).write(true),
    };
    match mode {
        CreationMode::CreateNew => options.create_new(true),
        CreationMode::Create => options.create(true).truncate(true),
        CreationMode::Open => &mut options,
        CreationMode::OpenOrCreate => options.create(true),
        CreationMode::Truncate => options.truncate(true),
        CreationMode::Append => options.append(true).create(true),
    };

    backend::apply_share_mode(&mut options, share);
    let native = backend::native_file_path(path);
    options
        .open(native.as_ref())
        .map_err(|err| ScanError::from_io(&err, path))
}

/// Open `path` for reading behind a buffer of `capacity` bytes
pub fn open_reader(
    path: &str,
    share: FileShare,
    capacity: usize,
) -> Result<BufReader<File>, ScanError> {
    let file = open_file(path, FileAccess::Read, share, CreationMode::Open)?;
    Ok(BufReader::with_capacity(capacity.max(1), file))
}

impl FileRecord {
    /// Open this file for content I/O
    pub fn open(
        &self,
        access: FileAccess,
        share: FileShare,
        mode: CreationMode,
    ) -> Result<File, ScanError> {
        open_file(self.path(), access, share, mode)
    }

    /// Open this file for buffered reading
    pub fn open_reader(
        &self,
        share: FileShare,
        capacity: usize,
    ) -> Result<BufReader<File>, ScanError> {
        open_reader(self.path(), share, capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanErrorKind;
    use std::io::{Read, Write};

    fn attrs(bits: u32) -> FileAttributes {
        FileAttributes(bits)
    }

    #[test]
    fn test_classify_dot_entries() {
        assert_eq!(classify(".", attrs(FileAttributes::DIRECTORY)), EntryClass::Skip);
        assert_eq!(classify("..", attrs(FileAttributes::DIRECTORY)), EntryClass::Skip);
        assert_eq!(classify("...", attrs(FileAttributes::ARCHIVE)), EntryClass::File);
    }

    #[test]
    fn test_classify_by_attributes() {
        assert_eq!(classify("sub", attrs(FileAttributes::DIRECTORY)), EntryClass::Directory);
        assert_eq!(classify("a.txt", attrs(FileAttributes::ARCHIVE)), EntryClass::File);
        assert_eq!(classify("a.txt", attrs(0)), EntryClass::File);
        assert_eq!(
            classify("link", attrs(FileAttributes::DIRECTORY | FileAttributes::REPARSE_POINT)),
            EntryClass::Skip
        );
        assert_eq!(classify("link.txt", attrs(FileAttributes::REPARSE_POINT)), EntryClass::Skip);
        assert_eq!(classify("fifo", attrs(FileAttributes::DEVICE)), EntryClass::Skip);
    }

    #[test]
    fn test_combine_words() {
        assert_eq!(combine_words(0, 42), 42);
        assert_eq!(combine_words(1, 0), 1 << 32);
        assert_eq!(combine_words(u32::MAX, u32::MAX), u64::MAX);
    }

    #[test]
    fn test_filetime_conversion() {
        let epoch = FILETIME_UNIX_OFFSET;
        let at_epoch = filetime_to_utc((epoch >> 32) as u32, epoch as u32);
        assert_eq!(at_epoch.timestamp(), 0);

        let later = epoch + 15 * FILETIME_TICKS_PER_SECOND + 5;
        let t = filetime_to_utc((later >> 32) as u32, later as u32);
        assert_eq!(t.timestamp(), 15);
        assert_eq!(t.timestamp_subsec_nanos(), 500);

        assert_eq!(filetime_to_utc(0, 0).timestamp(), 0);
    }

    #[test]
    fn test_raw_entry_from_words() {
        let raw = RawScanEntry::from_native_words(
            FileAttributes::ARCHIVE,
            "big.iso".to_string(),
            2,
            7,
            0,
            0,
        );
        assert_eq!(raw.size, (2u64 << 32) + 7);
        assert_eq!(raw.name, "big.iso");
    }

    #[test]
    fn test_session_lists_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("one.txt"), b"12345").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let root = DirectoryAddress::new(dir.path().to_string_lossy().to_string());
        let mut session = ScanSession::open(&root).unwrap();
        assert!(session.is_open());

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for entry in session.by_ref() {
            match entry.unwrap() {
                Entry::File(f) => files.push(f),
                Entry::Directory(d) => dirs.push(d),
            }
        }
        assert!(!session.is_open());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "one.txt");
        assert_eq!(files[0].length, 5);
        assert_eq!(dirs, vec![root.child("sub")]);
        assert!(session.next().is_none());
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = DirectoryAddress::new(dir.path().to_string_lossy().to_string());
        let mut dirs = 0;
        let files = ScanSession::open(&root)
            .unwrap()
            .collect_files(|_| dirs += 1)
            .unwrap();
        assert!(files.is_empty());
        assert_eq!(dirs, 0);
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let missing = DirectoryAddress::new(dir.path().join("nope").to_string_lossy().to_string());
        let err = ScanSession::open(&missing).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::NotFound);
        // Reported against the directory itself, not the listing pattern.
        assert_eq!(err.path.as_deref(), Some(missing.path()));
    }

    #[test]
    fn test_empty_path_rejected() {
        let err = ScanSession::open(&DirectoryAddress::new("   ")).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::InvalidArgument);
    }

    #[test]
    fn test_open_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin").to_string_lossy().to_string();

        let mut out = open_file(&path, FileAccess::Write, FileShare::NONE, CreationMode::CreateNew)
            .unwrap();
        out.write_all(b"payload").unwrap();
        drop(out);

        let err = open_file(&path, FileAccess::Write, FileShare::NONE, CreationMode::CreateNew)
            .unwrap_err();
        assert!(matches!(err.kind, ScanErrorKind::NativeIoFailure(_)));

        let share = FileShare::READ.with(FileShare::DELETE);
        assert_eq!(share, FileShare(0x5));
        let mut reader = open_reader(&path, share, 16).unwrap();
        let mut text = String::new();
        reader.read_to_string(&mut text).unwrap();
        assert_eq!(text, "payload");
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent").to_string_lossy().to_string();
        let err = open_file(&path, FileAccess::Read, FileShare::READ, CreationMode::Open)
            .unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::NotFound);

        let err = open_file(" ", FileAccess::Read, FileShare::READ, CreationMode::Open).unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::InvalidArgument);
    }
}
