//! Async callback variants of the sequential and fan-out walkers
//!
//! Each directory is listed on the blocking pool and its scan handle is
//! released before any callback is awaited. Callbacks are then awaited in
//! native enumeration order, matching the synchronous callback points.

use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};

use crate::error::ScanError;
use crate::models::{DirectoryAddress, Entry, FileRecord};
use crate::native::ScanSession;

/// The operation was aborted.
const ERROR_OPERATION_ABORTED: u32 = 995;

/// One directory's entries, plus the failure that cut the listing short
struct Listing {
    entries: Vec<Entry>,
    error: Option<ScanError>,
}

fn drain(dir: &DirectoryAddress) -> Listing {
    let session = match ScanSession::open(dir) {
        Ok(session) => session,
        Err(err) => {
            return Listing {
                entries: Vec::new(),
                error: Some(err),
            }
        }
    };

    let mut entries = Vec::new();
    for entry in session {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                return Listing {
                    entries,
                    error: Some(err),
                }
            }
        }
    }
    Listing {
        entries,
        error: None,
    }
}

fn join_failure(err: JoinError, dir: &str) -> ScanError {
    if err.is_panic() {
        std::panic::resume_unwind(err.into_panic());
    }
    ScanError::native(ERROR_OPERATION_ABORTED, dir)
}

async fn list(dir: DirectoryAddress) -> Listing {
    let path = dir.path().to_string();
    match tokio::task::spawn_blocking(move || drain(&dir)).await {
        Ok(listing) => listing,
        Err(err) => Listing {
            entries: Vec::new(),
            error: Some(join_failure(err, &path)),
        },
    }
}

/// Depth-first walk awaiting `on_file` and `on_directory` for each entry.
///
/// Directories that fail to open are skipped; their errors are returned.
pub async fn walk_sequential_async<F, FFut, D, DFut>(
    root: &DirectoryAddress,
    recursive: bool,
    mut on_file: F,
    mut on_directory: D,
) -> Vec<ScanError>
where
    F: FnMut(FileRecord) -> FFut,
    FFut: Future<Output = ()>,
    D: FnMut(DirectoryAddress) -> DFut,
    DFut: Future<Output = ()>,
{
    let mut errors = Vec::new();
    let mut pending = vec![root.clone()];

    while let Some(dir) = pending.pop() {
        let listing = list(dir).await;
        let mut discovered = Vec::new();
        for entry in listing.entries {
            match entry {
                Entry::File(file) => on_file(file).await,
                Entry::Directory(sub) => {
                    if recursive {
                        discovered.push(sub.clone());
                    }
                    on_directory(sub).await;
                }
            }
        }
        if let Some(err) = listing.error {
            log::warn!("Skipping subtree: {}", err);
            errors.push(err);
        }
        pending.extend(discovered.into_iter().rev());
    }
    errors
}

async fn visit<F, FFut, D, DFut>(
    dir: DirectoryAddress,
    recursive: bool,
    on_file: Arc<F>,
    on_directory: Arc<D>,
) -> (Vec<DirectoryAddress>, Option<ScanError>)
where
    F: Fn(FileRecord) -> FFut,
    FFut: Future<Output = ()>,
    D: Fn(DirectoryAddress) -> DFut,
    DFut: Future<Output = ()>,
{
    let listing = list(dir).await;
    let mut subdirs = Vec::new();
    for entry in listing.entries {
        match entry {
            Entry::File(file) => on_file(file).await,
            Entry::Directory(sub) => {
                if recursive {
                    subdirs.push(sub.clone());
                }
                on_directory(sub).await;
            }
        }
    }
    (subdirs, listing.error)
}

/// Fan-out walk spawning one task per directory node.
///
/// Callbacks may run concurrently from different tasks. Failures are
/// isolated to their subtree and returned together.
pub async fn walk_fan_out_async<F, FFut, D, DFut>(
    root: &DirectoryAddress,
    recursive: bool,
    on_file: F,
    on_directory: D,
) -> Vec<ScanError>
where
    F: Fn(FileRecord) -> FFut + Send + Sync + 'static,
    FFut: Future<Output = ()> + Send + 'static,
    D: Fn(DirectoryAddress) -> DFut + Send + Sync + 'static,
    DFut: Future<Output = ()> + Send + 'static,
{
    let on_file = Arc::new(on_file);
    let on_directory = Arc::new(on_directory);
    let mut tasks = JoinSet::new();
    tasks.spawn(visit(
        root.clone(),
        recursive,
        Arc::clone(&on_file),
        Arc::clone(&on_directory),
    ));

    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (subdirs, error) = match joined {
            Ok(result) => result,
            Err(err) => (Vec::new(), Some(join_failure(err, root.path()))),
        };
        if let Some(err) = error {
            log::warn!("Subtree failed: {}", err);
            errors.push(err);
        }
        for sub in subdirs {
            tasks.spawn(visit(
                sub,
                recursive,
                Arc::clone(&on_file),
                Arc::clone(&on_directory),
            ));
        }
    }
    errors
}
