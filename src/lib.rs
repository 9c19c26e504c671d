//! Fast file and directory enumeration over the native directory-scan interface
//!
//! This library walks a directory tree by driving the OS listing calls
//! directly, with three interchangeable strategies: a sequential depth-first
//! walker, a fan-out walker with one task per directory, and a bounded
//! worker pool draining a shared queue.

pub mod async_walk;
pub mod config;
pub mod error;
pub mod fan_out;
pub mod long_path;
pub mod models;
pub mod native;
pub mod pool;
pub mod scanner;
pub mod sequential;

#[cfg(test)]
pub(crate) mod test_support;

pub use async_walk::{walk_fan_out_async, walk_sequential_async};
pub use config::{ScanConfig, Strategy};
pub use error::{map_native_error, ScanError, ScanErrorKind};
pub use fan_out::{FanOutOutcome, FanOutWalker};
pub use long_path::{to_long_safe_path, to_regular_path};
pub use models::{DirectoryAddress, Entry, FileAttributes, FileRecord, ScanResult};
pub use native::{open_file, CreationMode, FileAccess, FileShare, ScanSession};
pub use pool::{PoolWalk, WorkerPool};
pub use scanner::{enumerate_directories, enumerate_files, scan, scan_directories};
pub use sequential::{SequentialWalker, Walk};
