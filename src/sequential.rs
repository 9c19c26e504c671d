//! Sequential depth-first walker
//!
//! One scan session is open at a time. Subdirectories found in a directory
//! are walked, in discovery order, only after that directory is exhausted;
//! each subtree is finished before its next sibling starts.

use crate::error::ScanError;
use crate::models::{DirectoryAddress, Entry, FileRecord};
use crate::native::ScanSession;

/// Directory discovery callback
pub type DirectoryCallback<'a> = Box<dyn FnMut(&DirectoryAddress) + 'a>;

/// Builder for a sequential traversal
pub struct SequentialWalker<'a> {
    recursive: bool,
    on_directory: Option<DirectoryCallback<'a>>,
}

impl<'a> SequentialWalker<'a> {
    /// Create a walker
    pub fn new(recursive: bool) -> Self {
        Self {
            recursive,
            on_directory: None,
        }
    }

    /// Call `f` once for every real directory discovered
    pub fn on_directory(mut self, f: impl FnMut(&DirectoryAddress) + 'a) -> Self {
        self.on_directory = Some(Box::new(f));
        self
    }

    /// Lazy walk yielding every classified entry below `root`.
    ///
    /// The first error ends the walk.
    pub fn walk(self, root: &DirectoryAddress) -> Walk<'a> {
        Walk {
            recursive: self.recursive,
            on_directory: self.on_directory,
            pending: vec![root.clone()],
            discovered: Vec::new(),
            current: None,
            stop_on_error: true,
            finished: false,
        }
    }

    /// Lazy sequence of the files below `root`
    pub fn files(
        self,
        root: &DirectoryAddress,
    ) -> impl Iterator<Item = Result<FileRecord, ScanError>> + 'a {
        self.walk(root)
            .filter_map(|entry| entry.map(Entry::into_file).transpose())
    }

    /// Lazy sequence of the directories below `root`
    pub fn directories(
        self,
        root: &DirectoryAddress,
    ) -> impl Iterator<Item = Result<DirectoryAddress, ScanError>> + 'a {
        self.walk(root)
            .filter_map(|entry| entry.map(Entry::into_directory).transpose())
    }

    /// Callback form: hand every file to `on_file` and keep going past
    /// directories that fail to open. Returns the failures encountered.
    pub fn walk_with(
        self,
        root: &DirectoryAddress,
        mut on_file: impl FnMut(FileRecord),
    ) -> Vec<ScanError> {
        let walk = self.walk(root).keep_going();

        let mut errors = Vec::new();
        for entry in walk {
            match entry {
                Ok(Entry::File(file)) => on_file(file),
                Ok(Entry::Directory(_)) => {}
                Err(err) => {
                    log::warn!("Skipping subtree: {}", err);
                    errors.push(err);
                }
            }
        }
        errors
    }
}

impl std::fmt::Debug for SequentialWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialWalker")
            .field("recursive", &self.recursive)
            .field("on_directory", &self.on_directory.is_some())
            .finish()
    }
}

/// In-progress sequential traversal
pub struct Walk<'a> {
    recursive: bool,
    on_directory: Option<DirectoryCallback<'a>>,
    /// Directories still to open; the next one is on top.
    pending: Vec<DirectoryAddress>,
    /// Subdirectories of the directory currently being listed
    discovered: Vec<DirectoryAddress>,
    current: Option<ScanSession>,
    stop_on_error: bool,
    finished: bool,
}

impl Walk<'_> {
    /// Report failed directories and continue with the rest of the tree
    pub fn keep_going(mut self) -> Self {
        self.stop_on_error = false;
        self
    }

    fn fail(&mut self, err: ScanError) -> Option<Result<Entry, ScanError>> {
        self.current = None;
        if self.stop_on_error {
            self.finished = true;
            self.pending.clear();
            self.discovered.clear();
        } else {
            self.pending.extend(self.discovered.drain(..).rev());
        }
        Some(Err(err))
    }
}

impl Iterator for Walk<'_> {
    type Item = Result<Entry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if let Some(session) = self.current.as_mut() {
                match session.next() {
                    Some(Ok(Entry::Directory(dir))) => {
                        if let Some(callback) = self.on_directory.as_mut() {
                            callback(&dir);
                        }
                        if self.recursive {
                            self.discovered.push(dir.clone());
                        }
                        return Some(Ok(Entry::Directory(dir)));
                    }
                    Some(Ok(file)) => return Some(Ok(file)),
                    Some(Err(err)) => return self.fail(err),
                    None => {
                        self.current = None;
                        self.pending.extend(self.discovered.drain(..).rev());
                    }
                }
                continue;
            }

            let Some(dir) = self.pending.pop() else {
                self.finished = true;
                return None;
            };
            match ScanSession::open(&dir) {
                Ok(session) => self.current = Some(session),
                Err(err) => return self.fail(err),
            }
        }
    }
}

impl std::iter::FusedIterator for Walk<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanErrorKind;
    use crate::test_support::{path_set, small_tree, wide_tree};
    use std::fs;

    #[test]
    fn test_non_recursive_yields_root_files() {
        let (_dir, root) = small_tree();
        let mut dirs = Vec::new();
        let files: Vec<_> = SequentialWalker::new(false)
            .on_directory(|d| dirs.push(d.clone()))
            .files(&root)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(files.len(), 2);
        // Directories are still reported, just not entered.
        assert_eq!(dirs.len(), 2);
    }

    #[test]
    fn test_recursive_yields_all_files() {
        let (_dir, root) = small_tree();
        let mut dirs = Vec::new();
        let files: Vec<_> = SequentialWalker::new(true)
            .on_directory(|d| dirs.push(d.clone()))
            .files(&root)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(files.len(), 4);
        dirs.sort();
        assert_eq!(dirs, vec![root.child("sub1"), root.child("sub2")]);
        assert!(files.iter().all(|f| f.is_descendant_of(&root)));
    }

    #[test]
    fn test_depth_first_order() {
        let (_dir, root) = wide_tree(2, 2, 1);
        let files: Vec<_> = SequentialWalker::new(true)
            .files(&root)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(files.len(), 7);

        // Once a subtree is left it is never re-entered.
        let mut seen_top = Vec::new();
        for file in &files {
            let rel = &file.path()[root.path().len() + 1..];
            let top = rel.split(crate::models::is_separator).next().unwrap().to_string();
            if seen_top.last() != Some(&top) {
                assert!(!seen_top.contains(&top), "subtree {} revisited", top);
                seen_top.push(top);
            }
        }
    }

    #[test]
    fn test_directories_only() {
        let (_dir, root) = wide_tree(3, 2, 0);
        let dirs: Vec<_> = SequentialWalker::new(true)
            .directories(&root)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(dirs.len(), 3 + 9);
    }

    #[test]
    fn test_walk_is_lazy_per_call() {
        let (_dir, root) = small_tree();
        let first = SequentialWalker::new(true).files(&root).count();
        fs::write(std::path::Path::new(root.path()).join("late.txt"), b"").unwrap();
        let second = SequentialWalker::new(true).files(&root).count();
        assert_eq!(first + 1, second);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = crate::test_support::address(dir.path());
        let mut calls = 0;
        let files: Vec<_> = SequentialWalker::new(true)
            .on_directory(|_| calls += 1)
            .files(&root)
            .collect();
        assert!(files.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let root = DirectoryAddress::new(dir.path().join("missing").to_string_lossy().into_owned());
        let results: Vec<_> = SequentialWalker::new(true).files(&root).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap_err().kind, ScanErrorKind::NotFound);
    }

    #[test]
    fn test_callback_form_continues_past_failures() {
        let (dir, root) = small_tree();
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let errors = SequentialWalker::new(true)
            .on_directory(|d| {
                // Remove sub1 as soon as it is discovered.
                if d.path().ends_with("sub1") {
                    fs::remove_dir_all(dir.path().join("sub1")).unwrap();
                }
                dirs.push(d.clone());
            })
            .walk_with(&root, |f| files.push(f));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ScanErrorKind::NotFound);
        let names: Vec<_> = files.iter().map(|f| f.name().to_string()).collect();
        assert!(names.contains(&"d.txt".to_string()));
        assert!(!names.contains(&"c.txt".to_string()));
        assert_eq!(path_set(&files).len(), 3);
    }

    #[test]
    fn test_iterator_stops_at_first_failure() {
        let (dir, root) = small_tree();
        let removed = dir.path().join("sub1");
        let results: Vec<_> = SequentialWalker::new(true)
            .on_directory(|d| {
                if d.path().ends_with("sub1") {
                    fs::remove_dir_all(&removed).unwrap();
                }
            })
            .files(&root)
            .collect();
        let last = results.last().unwrap();
        assert!(last.is_err());
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }
}
