use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use derive_more::Display;

use crate::sync::error::{IoResultExt, SyncError};

/// Kind of a walked entry. Symlinks are classified by what they point at;
/// anything that is not a directory walks and copies as a file.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    #[display("dir")]
    Directory,
    #[display("file")]
    File,
}

/// A single entry produced by [`TreeWalk`].
#[derive(Debug, Clone)]
pub struct WalkedEntry {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Path relative to the walk root.
    pub rel: PathBuf,
    pub kind: EntryKind,
}

/// Lazy top-down walk of a directory tree.
///
/// Each level yields its subdirectories before its files, in the natural
/// listing order of the filesystem, then descends depth-first. The root
/// itself is not yielded. A queued directory that vanished before it could
/// be listed is skipped silently, so a consumer may delete subtrees while
/// the walk is in flight. Symlinked directories are yielded but never
/// descended into.
pub struct TreeWalk {
    root: PathBuf,
    /// Entries of the current level, reversed so `pop` yields walk order.
    level: Vec<WalkedEntry>,
    /// Directories still to list, reversed for depth-first order.
    queue: Vec<PathBuf>,
    failed: bool,
}

impl TreeWalk {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            queue: vec![root.clone()],
            root,
            level: Vec::new(),
            failed: false,
        }
    }

    fn list_level(&mut self, dir: &Path) -> Result<(), SyncError> {
        let reader = match fs::read_dir(dir) {
            Ok(reader) => reader,
            // The consumer may have removed this subtree after it was
            // queued; pretend it never existed.
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(SyncError::from_io(dir, source)),
        };

        let mut subdirs = Vec::new();
        let mut files = Vec::new();
        let mut descend = Vec::new();

        for entry in reader {
            let entry = entry.with_path(dir)?;
            let path = entry.path();
            let rel = path
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| path.clone());
            let file_type = entry.file_type().with_path(&path)?;

            let is_dir = if file_type.is_symlink() {
                fs::metadata(&path).map(|meta| meta.is_dir()).unwrap_or(false)
            } else {
                file_type.is_dir()
            };

            if is_dir {
                if !file_type.is_symlink() {
                    descend.push(path.clone());
                }
                subdirs.push(WalkedEntry {
                    path,
                    rel,
                    kind: EntryKind::Directory,
                });
            } else {
                files.push(WalkedEntry {
                    path,
                    rel,
                    kind: EntryKind::File,
                });
            }
        }

        self.level.extend(files.into_iter().rev());
        self.level.extend(subdirs.into_iter().rev());
        self.queue.extend(descend.into_iter().rev());

        Ok(())
    }
}

impl Iterator for TreeWalk {
    type Item = Result<WalkedEntry, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(entry) = self.level.pop() {
                return Some(Ok(entry));
            }

            let dir = self.queue.pop()?;
            if let Err(error) = self.list_level(&dir) {
                self.failed = true;
                return Some(Err(error));
            }
        }
    }
}
