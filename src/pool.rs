//! Bounded worker-pool scheduler
//!
//! A fixed number of worker threads drain a shared FIFO of directories.
//! Admission is controlled by a counting gate that starts with one unit, so
//! the root is opened by exactly one worker; every subdirectory pushed onto
//! the queue mints one more unit, letting concurrency follow the branching
//! factor of the tree.
//!
//! The walk is complete at quiescence: no worker is mid-scan and nothing is
//! queued. Both facts live under one lock, so the check cannot race with a
//! worker that is about to enqueue more work. The worker that observes
//! quiescence sets the completion flag and releases one gate unit per
//! worker so that every blocked worker wakes up and exits.
//!
//! Files leave through a bounded channel; when the consumer falls behind,
//! producers block. Dropping the consumer does not stop the workers, which
//! keep draining the queue until the tree is exhausted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::error::ScanError;
use crate::models::{DirectoryAddress, Entry, FileRecord};
use crate::native::ScanSession;

/// Default number of workers
pub const DEFAULT_WORKER_COUNT: usize = 10;

/// Default capacity of the output channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

type Output = Result<Entry, ScanError>;

/// Thread-safe directory discovery callback
pub type PoolDirectoryCallback = Arc<dyn Fn(&DirectoryAddress) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counting semaphore
struct Gate {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Gate {
    fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut permits = lock(&self.permits);
        while *permits == 0 {
            permits = self
                .available
                .wait(permits)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= 1;
    }

    fn release(&self, count: usize) {
        let mut permits = lock(&self.permits);
        *permits += count;
        drop(permits);
        if count == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }
}

/// Which classified entries are sent to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emit {
    Files,
    Directories,
    All,
}

impl Emit {
    fn files(self) -> bool {
        self != Emit::Directories
    }

    fn directories(self) -> bool {
        self != Emit::Files
    }
}

struct QueueState {
    pending: VecDeque<DirectoryAddress>,
    /// Workers currently scanning a directory
    active: usize,
}

struct Shared {
    state: Mutex<QueueState>,
    gate: Gate,
    done: AtomicBool,
    workers: usize,
    recursive: bool,
    emit: Emit,
    on_directory: Option<PoolDirectoryCallback>,
}

/// Marks one directory scan as in flight; ending it runs the quiescence
/// check, including when the scan failed or panicked.
struct ActiveScan<'a> {
    shared: &'a Shared,
}

impl Drop for ActiveScan<'_> {
    fn drop(&mut self) {
        let mut state = lock(&self.shared.state);
        state.active -= 1;
        if state.active == 0 && state.pending.is_empty() {
            self.shared.done.store(true, Ordering::Release);
            drop(state);
            log::debug!("Worker pool quiescent, releasing {} workers", self.shared.workers);
            self.shared.gate.release(self.shared.workers);
        }
    }
}

/// Builder for a worker-pool traversal
#[derive(Clone)]
pub struct WorkerPool {
    workers: usize,
    channel_capacity: usize,
    recursive: bool,
    on_directory: Option<PoolDirectoryCallback>,
}

impl WorkerPool {
    /// Create a pool of `workers` threads (at least one)
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            recursive: true,
            on_directory: None,
        }
    }

    /// Enable or disable descending into subdirectories
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the output channel capacity (at least one)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Call `f` once for every real directory discovered; runs on the
    /// worker that found it
    pub fn on_directory(mut self, f: impl Fn(&DirectoryAddress) + Send + Sync + 'static) -> Self {
        self.on_directory = Some(Arc::new(f));
        self
    }

    /// Number of workers
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Start the workers on `root`, returning the consumer side
    pub fn walk(&self, root: &DirectoryAddress) -> Result<PoolWalk, ScanError> {
        self.start(root, Emit::All)
    }

    /// Start the workers on `root`, streaming only files
    pub fn files(
        &self,
        root: &DirectoryAddress,
    ) -> Result<impl Iterator<Item = Result<FileRecord, ScanError>>, ScanError> {
        let walk = self.start(root, Emit::Files)?;
        Ok(walk.filter_map(|entry| match entry {
            Ok(Entry::File(file)) => Some(Ok(file)),
            Ok(Entry::Directory(_)) => None,
            Err(err) => Some(Err(err)),
        }))
    }

    /// Start the workers on `root`, streaming only directories
    pub fn directories(
        &self,
        root: &DirectoryAddress,
    ) -> Result<impl Iterator<Item = Result<DirectoryAddress, ScanError>>, ScanError> {
        let walk = self.start(root, Emit::Directories)?;
        Ok(walk.filter_map(|entry| match entry {
            Ok(Entry::File(_)) => None,
            Ok(Entry::Directory(dir)) => Some(Ok(dir)),
            Err(err) => Some(Err(err)),
        }))
    }

    fn start(&self, root: &DirectoryAddress, emit: Emit) -> Result<PoolWalk, ScanError> {
        if root.path().trim().is_empty() {
            return Err(ScanError::invalid_argument("Root path must not be empty"));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                pending: VecDeque::from([root.clone()]),
                active: 0,
            }),
            gate: Gate::new(1),
            done: AtomicBool::new(false),
            workers: self.workers,
            recursive: self.recursive,
            emit,
            on_directory: self.on_directory.clone(),
        });
        let (sender, receiver) = bounded(self.channel_capacity);

        log::debug!("Starting {} scan workers on {}", self.workers, root);
        let mut handles = Vec::with_capacity(self.workers);
        for id in 0..self.workers {
            let shared = Arc::clone(&shared);
            let output = sender.clone();
            let handle = thread::Builder::new()
                .name(format!("scan-worker-{}", id))
                .spawn(move || run_worker(&shared, &output))?;
            handles.push(handle);
        }

        // The channel disconnects once the last worker exits.
        drop(sender);
        Ok(PoolWalk { receiver, handles })
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKER_COUNT)
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("channel_capacity", &self.channel_capacity)
            .field("recursive", &self.recursive)
            .field("on_directory", &self.on_directory.is_some())
            .finish()
    }
}

fn run_worker(shared: &Shared, output: &Sender<Output>) {
    loop {
        shared.gate.acquire();
        if shared.done.load(Ordering::Acquire) {
            break;
        }

        let dir = {
            let mut state = lock(&shared.state);
            match state.pending.pop_front() {
                Some(dir) => {
                    state.active += 1;
                    dir
                }
                None => continue,
            }
        };

        let _active = ActiveScan { shared };
        scan_directory(shared, &dir, output);
    }
}

fn scan_directory(shared: &Shared, dir: &DirectoryAddress, output: &Sender<Output>) {
    let session = match ScanSession::open(dir) {
        Ok(session) => session,
        Err(err) => {
            log::warn!("Subtree failed: {}", err);
            let _ = output.send(Err(err));
            return;
        }
    };

    for entry in session {
        match entry {
            Ok(Entry::Directory(sub)) => {
                if let Some(callback) = &shared.on_directory {
                    callback(&sub);
                }
                if shared.recursive {
                    lock(&shared.state).pending.push_back(sub.clone());
                    shared.gate.release(1);
                }
                if shared.emit.directories() {
                    let _ = output.send(Ok(Entry::Directory(sub)));
                }
            }
            Ok(Entry::File(file)) => {
                if shared.emit.files() {
                    let _ = output.send(Ok(Entry::File(file)));
                }
            }
            Err(err) => {
                log::warn!("Listing failed: {}", err);
                let _ = output.send(Err(err));
            }
        }
    }
}

/// Consumer side of a running pool walk
///
/// Iterating blocks until the next entry arrives and ends once every worker
/// has exited.
pub struct PoolWalk {
    receiver: Receiver<Output>,
    handles: Vec<JoinHandle<()>>,
}

impl PoolWalk {
    /// Drain the remaining output and wait for every worker to exit
    pub fn join(self) {
        let PoolWalk { receiver, handles } = self;
        for _ in receiver.iter() {}
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Scan worker panicked");
            }
        }
    }
}

impl Iterator for PoolWalk {
    type Item = Output;

    fn next(&mut self) -> Option<Self::Item> {
        self.receiver.recv().ok()
    }
}

impl std::fmt::Debug for PoolWalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolWalk")
            .field("buffered", &self.receiver.len())
            .field("workers", &self.handles.len())
            .finish()
    }
}
