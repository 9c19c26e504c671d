//! Scanner module - dispatches a configured run to the selected strategy

use std::time::Instant;

use crate::config::{ScanConfig, Strategy};
use crate::error::ScanError;
use crate::fan_out::FanOutWalker;
use crate::models::{DirectoryAddress, Entry, FileRecord, ScanResult};
use crate::pool::WorkerPool;
use crate::sequential::SequentialWalker;

/// Lazy sequence of discovered files
pub type FileStream = Box<dyn Iterator<Item = Result<FileRecord, ScanError>>>;

/// Lazy sequence of discovered directories
pub type DirectoryStream = Box<dyn Iterator<Item = Result<DirectoryAddress, ScanError>>>;

type EntryStream = Box<dyn Iterator<Item = Result<Entry, ScanError>>>;

fn worker_pool(config: &ScanConfig) -> WorkerPool {
    WorkerPool::new(config.effective_workers())
        .recursive(config.recursive)
        .channel_capacity(config.channel_capacity)
}

/// Enumerate the files below the configured root.
///
/// The sequential strategy ends the sequence at the first failure; the
/// fan-out and worker-pool strategies report each failed subtree and carry
/// on with the rest.
pub fn enumerate_files(config: &ScanConfig) -> Result<FileStream, ScanError> {
    let root = config.validate()?;
    log::info!("Enumerating files in {} ({})", root, config.strategy);

    let stream: FileStream = match config.strategy {
        Strategy::Sequential => Box::new(SequentialWalker::new(config.recursive).files(&root)),
        Strategy::FanOut => {
            let outcome = FanOutWalker::new(config.recursive).walk(&root);
            Box::new(
                outcome
                    .files
                    .into_iter()
                    .map(Ok)
                    .chain(outcome.errors.into_iter().map(Err)),
            )
        }
        Strategy::WorkerPool { .. } => Box::new(worker_pool(config).files(&root)?),
    };
    Ok(stream)
}

/// Enumerate the directories below the configured root
pub fn enumerate_directories(config: &ScanConfig) -> Result<DirectoryStream, ScanError> {
    let root = config.validate()?;
    log::info!("Enumerating directories in {} ({})", root, config.strategy);

    let stream: DirectoryStream = match config.strategy {
        Strategy::Sequential => {
            Box::new(SequentialWalker::new(config.recursive).directories(&root))
        }
        Strategy::FanOut => {
            let outcome = FanOutWalker::new(config.recursive).walk(&root);
            Box::new(
                outcome
                    .directories
                    .into_iter()
                    .map(Ok)
                    .chain(outcome.errors.into_iter().map(Err)),
            )
        }
        Strategy::WorkerPool { .. } => Box::new(worker_pool(config).directories(&root)?),
    };
    Ok(stream)
}

/// Every entry below `root`, continuing past failed subtrees
fn entries(config: &ScanConfig, root: &DirectoryAddress) -> Result<EntryStream, ScanError> {
    let stream: EntryStream = match config.strategy {
        Strategy::Sequential => Box::new(
            SequentialWalker::new(config.recursive)
                .walk(root)
                .keep_going(),
        ),
        Strategy::FanOut => {
            let outcome = FanOutWalker::new(config.recursive).walk(root);
            Box::new(
                outcome
                    .files
                    .into_iter()
                    .map(|f| Ok(Entry::File(f)))
                    .chain(outcome.directories.into_iter().map(|d| Ok(Entry::Directory(d))))
                    .chain(outcome.errors.into_iter().map(Err)),
            )
        }
        Strategy::WorkerPool { .. } => Box::new(worker_pool(config).walk(root)?),
    };
    Ok(stream)
}

/// Perform a full scan, collecting files
pub fn scan(config: &ScanConfig) -> ScanResult {
    scan_internal(config, true)
}

/// Perform a full scan, collecting directories
pub fn scan_directories(config: &ScanConfig) -> ScanResult {
    scan_internal(config, false)
}

fn scan_internal(config: &ScanConfig, keep_files: bool) -> ScanResult {
    let start = Instant::now();
    let mut result = ScanResult::new();

    let root = match config.validate() {
        Ok(root) => root,
        Err(e) => {
            result.errors.push(e);
            return result;
        }
    };

    log::info!(
        "Starting scan of {} ({}, recursive: {})",
        root,
        config.strategy,
        config.recursive
    );

    match entries(config, &root) {
        Ok(stream) => {
            for entry in stream {
                match entry {
                    Ok(Entry::File(file)) => {
                        result.total_files += 1;
                        if keep_files {
                            result.files.push(file);
                        }
                    }
                    Ok(Entry::Directory(dir)) => {
                        result.total_dirs += 1;
                        if !keep_files {
                            result.directories.push(dir);
                        }
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        result.errors.push(e);
                    }
                }
            }
        }
        Err(e) => {
            log::error!("Failed to start scan: {}", e);
            result.errors.push(e);
        }
    }

    result.duration_ms = start.elapsed().as_millis() as u64;
    log::info!(
        "Scan finished: {} files, {} directories, {} errors in {}ms",
        result.total_files,
        result.total_dirs,
        result.error_count(),
        result.duration_ms
    );
    result
}
