//! Fixture trees shared by the walker tests

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::models::{DirectoryAddress, FileRecord};

pub(crate) fn address(path: &Path) -> DirectoryAddress {
    DirectoryAddress::new(path.to_string_lossy().into_owned())
}

/// Root with two files and two subdirectories holding one file each
pub(crate) fn small_tree() -> (TempDir, DirectoryAddress) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("a.txt"), b"a").unwrap();
    fs::write(root.join("b.txt"), b"bb").unwrap();
    fs::create_dir(root.join("sub1")).unwrap();
    fs::create_dir(root.join("sub2")).unwrap();
    fs::write(root.join("sub1").join("c.txt"), b"ccc").unwrap();
    fs::write(root.join("sub2").join("d.txt"), b"dddd").unwrap();
    let root = address(root);
    (dir, root)
}

/// Tree `depth` levels deep with `width` subdirectories and `files`
/// files at every level
pub(crate) fn wide_tree(width: usize, depth: usize, files: usize) -> (TempDir, DirectoryAddress) {
    fn fill(path: &Path, width: usize, depth: usize, files: usize) {
        for f in 0..files {
            fs::write(path.join(format!("file{}.dat", f)), b"x").unwrap();
        }
        if depth == 0 {
            return;
        }
        for w in 0..width {
            let sub = path.join(format!("dir{}", w));
            fs::create_dir(&sub).unwrap();
            fill(&sub, width, depth - 1, files);
        }
    }

    let dir = tempfile::tempdir().unwrap();
    fill(dir.path(), width, depth, files);
    let root = address(dir.path());
    (dir, root)
}

pub(crate) fn path_set<'a>(files: impl IntoIterator<Item = &'a FileRecord>) -> BTreeSet<String> {
    files.into_iter().map(|f| f.path().to_string()).collect()
}
