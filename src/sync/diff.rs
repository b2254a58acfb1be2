use std::fs;
use std::path::{Path, PathBuf};

use crate::sync::error::SyncError;
use crate::sync::walk::{EntryKind, TreeWalk};

/// An origin entry with no counterpart in the comparison tree.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// Absolute path of the entry in the origin tree.
    pub origin: PathBuf,
    /// Absolute path the counterpart would occupy in the comparison tree.
    pub counterpart: PathBuf,
    /// Kind of the origin entry.
    pub kind: EntryKind,
}

/// Lazily enumerates origin entries that are missing from the comparison
/// tree, in the origin's walk order.
///
/// A counterpart that exists with a different kind counts as missing, so a
/// path whose type flipped between the trees is reported for removal and
/// recreated with the origin's type within the same pass. The walk covers
/// the entire origin tree, including the inside of directories already
/// reported missing; whether their children still need copying is decided
/// by the consumer at apply time.
pub struct UniqueEntries {
    comparison: PathBuf,
    walk: TreeWalk,
}

impl UniqueEntries {
    pub fn new(origin: impl Into<PathBuf>, comparison: impl Into<PathBuf>) -> Self {
        Self {
            comparison: comparison.into(),
            walk: TreeWalk::new(origin),
        }
    }

    /// Kind of the entry at `path`, following symlinks; `None` when nothing
    /// exists there.
    fn kind_at(path: &Path) -> Option<EntryKind> {
        fs::metadata(path).ok().map(|meta| {
            if meta.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            }
        })
    }
}

impl Iterator for UniqueEntries {
    type Item = Result<DiffEntry, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walk.next()? {
                Ok(entry) => entry,
                Err(error) => return Some(Err(error)),
            };

            let counterpart = self.comparison.join(&entry.rel);
            if Self::kind_at(&counterpart) == Some(entry.kind) {
                continue;
            }

            return Some(Ok(DiffEntry {
                origin: entry.path,
                counterpart,
                kind: entry.kind,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn uniques(origin: &Path, comparison: &Path) -> Vec<(PathBuf, EntryKind)> {
        UniqueEntries::new(origin, comparison)
            .collect::<Result<Vec<_>, _>>()
            .expect("diff walk should not fail")
            .into_iter()
            .map(|entry| (entry.origin, entry.kind))
            .collect()
    }

    #[test]
    fn reports_entries_missing_from_the_comparison_tree() {
        let origin = TempDir::new().unwrap();
        let comparison = TempDir::new().unwrap();
        fs::create_dir(origin.path().join("sub")).unwrap();
        fs::write(origin.path().join("a.txt"), b"x").unwrap();
        fs::write(origin.path().join("sub/b.txt"), b"y").unwrap();

        let found = uniques(origin.path(), comparison.path());

        assert_eq!(
            found,
            vec![
                (origin.path().join("sub"), EntryKind::Directory),
                (origin.path().join("a.txt"), EntryKind::File),
                (origin.path().join("sub/b.txt"), EntryKind::File),
            ]
        );
    }

    #[test]
    fn counterpart_paths_live_under_the_comparison_root() {
        let origin = TempDir::new().unwrap();
        let comparison = TempDir::new().unwrap();
        fs::write(origin.path().join("a.txt"), b"x").unwrap();

        let entry = UniqueEntries::new(origin.path(), comparison.path())
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(entry.counterpart, comparison.path().join("a.txt"));
    }

    #[test]
    fn identical_trees_produce_nothing() {
        let origin = TempDir::new().unwrap();
        let comparison = TempDir::new().unwrap();
        for root in [origin.path(), comparison.path()] {
            fs::create_dir(root.join("sub")).unwrap();
            fs::write(root.join("sub/b.txt"), b"y").unwrap();
        }

        assert!(uniques(origin.path(), comparison.path()).is_empty());
    }

    #[test]
    fn a_type_flip_counts_as_missing() {
        let origin = TempDir::new().unwrap();
        let comparison = TempDir::new().unwrap();
        fs::write(origin.path().join("entry"), b"now a file").unwrap();
        fs::create_dir(comparison.path().join("entry")).unwrap();

        let found = uniques(origin.path(), comparison.path());
        assert_eq!(found, vec![(origin.path().join("entry"), EntryKind::File)]);
    }
}
