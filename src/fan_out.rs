//! Fan-out parallel walker
//!
//! Every discovered subdirectory becomes its own task on the rayon pool, so
//! the number of tasks equals the number of directory nodes. Tasks share
//! nothing but the result sink, a lock-free channel.

use crossbeam_channel::{unbounded, Sender};

use crate::error::ScanError;
use crate::models::{DirectoryAddress, Entry, FileRecord};
use crate::native::ScanSession;

/// Thread-safe directory discovery callback
pub type SharedDirectoryCallback<'a> = Box<dyn Fn(&DirectoryAddress) + Send + Sync + 'a>;

/// Merged results of a fan-out walk, in no particular order
#[derive(Debug, Default)]
pub struct FanOutOutcome {
    /// Files from every subtree
    pub files: Vec<FileRecord>,
    /// Real directories discovered
    pub directories: Vec<DirectoryAddress>,
    /// One entry per failed directory or listing
    pub errors: Vec<ScanError>,
}

impl FanOutOutcome {
    /// Whether every subtree was scanned cleanly
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Builder for a fan-out traversal
pub struct FanOutWalker<'a> {
    recursive: bool,
    on_directory: Option<SharedDirectoryCallback<'a>>,
}

struct Context<'c> {
    recursive: bool,
    on_directory: Option<&'c (dyn Fn(&DirectoryAddress) + Send + Sync + 'c)>,
    sink: Sender<Result<Entry, ScanError>>,
}

impl<'a> FanOutWalker<'a> {
    /// Create a walker
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            on_directory: None,
        }
    }

    /// Call `f` once for every real directory discovered; may run on any
    /// worker thread
    pub fn on_directory(mut self, f: impl Fn(&DirectoryAddress) + Send + Sync + 'a) -> Self {
        self.on_directory = Some(Box::new(f));
        self
    }

    /// Walk `root`, blocking until every subtree task has finished
    pub fn walk(&self, root: &DirectoryAddress) -> FanOutOutcome {
        let (sink, results) = unbounded();
        let ctx = Context {
            recursive: self.recursive,
            on_directory: self.on_directory.as_deref(),
            sink,
        };

        rayon::scope(|scope| visit(scope, root.clone(), &ctx));
        drop(ctx);

        let mut outcome = FanOutOutcome::default();
        for result in results {
            match result {
                Ok(Entry::File(file)) => outcome.files.push(file),
                Ok(Entry::Directory(dir)) => outcome.directories.push(dir),
                Err(err) => outcome.errors.push(err),
            }
        }
        outcome
    }
}

impl std::fmt::Debug for FanOutWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutWalker")
            .field("recursive", &self.recursive)
            .field("on_directory", &self.on_directory.is_some())
            .finish()
    }
}

fn visit<'s, 'c: 's>(scope: &rayon::Scope<'s>, dir: DirectoryAddress, ctx: &'s Context<'c>) {
    let session = match ScanSession::open(&dir) {
        Ok(session) => session,
        Err(err) => {
            log::warn!("Subtree failed: {}", err);
            let _ = ctx.sink.send(Err(err));
            return;
        }
    };

    for entry in session {
        match entry {
            Ok(Entry::Directory(sub)) => {
                if let Some(callback) = ctx.on_directory {
                    callback(&sub);
                }
                if ctx.recursive {
                    let next = sub.clone();
                    scope.spawn(move |scope| visit(scope, next, ctx));
                }
                let _ = ctx.sink.send(Ok(Entry::Directory(sub)));
            }
            Err(err) => {
                log::warn!("Listing failed: {}", err);
                let _ = ctx.sink.send(Err(err));
            }
            file => {
                let _ = ctx.sink.send(file);
            }
        }
    }
}
