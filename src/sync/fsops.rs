use std::fs;
use std::io::Cursor;
use std::path::Path;

use compio::fs::File;
use compio::io::AsyncReadExt;

use crate::sync::error::{IoResultExt, SyncError, UnsupportedTypeSnafu};
use crate::sync::meta::copy_stat;

/// Chunk size for content comparison; bounds peak memory on large files.
const COMPARE_CHUNK: u64 = 64 * 1024;

/// Compare two regular files byte for byte.
///
/// Mismatched sizes short-circuit to `false`; equal sizes always fall
/// through to a full chunked content read, since a size-and-mtime
/// signature alone cannot detect every edit. Anything that is not a
/// regular file compares as not identical.
pub(crate) async fn files_identical(a: &Path, b: &Path) -> Result<bool, SyncError> {
    let meta_a = fs::metadata(a).with_path(a)?;
    let meta_b = fs::metadata(b).with_path(b)?;

    if !meta_a.is_file() || !meta_b.is_file() {
        return Ok(false);
    }
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }

    let mut reader_a = Cursor::new(File::open(a).await.with_path(a)?);
    let mut reader_b = Cursor::new(File::open(b).await.with_path(b)?);

    let mut remaining = meta_a.len();
    while remaining > 0 {
        let span = remaining.min(COMPARE_CHUNK) as usize;

        let res = reader_a.read_exact(Vec::with_capacity(span)).await;
        res.0.with_path(a)?;
        let chunk_a = res.1;

        let res = reader_b.read_exact(Vec::with_capacity(span)).await;
        res.0.with_path(b)?;
        let chunk_b = res.1;

        if chunk_a != chunk_b {
            return Ok(false);
        }
        remaining -= span as u64;
    }

    Ok(true)
}

/// Copy a regular file together with its permission bits and timestamps.
///
/// Non-regular sources (pipes, sockets, devices) are rejected with
/// [`SyncError::UnsupportedType`]; an existing target is overwritten.
pub(crate) fn copy_with_metadata(origin: &Path, target: &Path) -> Result<(), SyncError> {
    let meta = fs::metadata(origin).with_path(origin)?;
    if !meta.is_file() {
        return UnsupportedTypeSnafu { path: origin }.fail();
    }

    fs::copy(origin, target).with_path(target)?;
    copy_stat(origin, target)?;
    Ok(())
}

/// Recursively copy a directory tree; `target` must not exist yet.
///
/// The directory's own stat is applied after its children so a restrictive
/// origin mode cannot block the copy of its contents. A symlinked
/// subdirectory has its target copied once, and nothing below that copy
/// follows further directory links, so a link cycle cannot recurse. An
/// unsupported entry anywhere inside fails the whole copy.
pub(crate) fn copy_tree(origin: &Path, target: &Path) -> Result<(), SyncError> {
    copy_tree_inner(origin, target, true)
}

fn copy_tree_inner(origin: &Path, target: &Path, follow_links: bool) -> Result<(), SyncError> {
    fs::create_dir(target).with_path(target)?;

    for entry in fs::read_dir(origin).with_path(origin)? {
        let entry = entry.with_path(origin)?;
        let path = entry.path();
        let dest = target.join(entry.file_name());

        let meta = fs::symlink_metadata(&path).with_path(&path)?;
        let is_link = meta.file_type().is_symlink();
        let links_to_dir = is_link && fs::metadata(&path).map(|m| m.is_dir()).unwrap_or(false);

        if meta.is_dir() || (links_to_dir && follow_links) {
            copy_tree_inner(&path, &dest, follow_links && !is_link)?;
        } else {
            copy_with_metadata(&path, &dest)?;
        }
    }

    copy_stat(origin, target)
}

/// Remove a directory and all of its descendants.
pub(crate) fn remove_tree(path: &Path) -> Result<(), SyncError> {
    fs::remove_dir_all(path).with_path(path)
}

/// Remove a single file.
pub(crate) fn remove_file(path: &Path) -> Result<(), SyncError> {
    fs::remove_file(path).with_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::fs::Permissions;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[rstest]
    #[case(b"same bytes", b"same bytes", true)]
    #[case(b"aaaa", b"aaab", false)]
    #[case(b"short", b"a longer body", false)]
    #[case(b"", b"", true)]
    #[compio::test]
    async fn compares_file_contents(
        #[case] left: &[u8],
        #[case] right: &[u8],
        #[case] expected: bool,
    ) {
        let root = TempDir::new().unwrap();
        let a = root.path().join("a");
        let b = root.path().join("b");
        fs::write(&a, left).unwrap();
        fs::write(&b, right).unwrap();

        assert_eq!(files_identical(&a, &b).await.unwrap(), expected);
    }

    #[compio::test]
    async fn compares_large_files_chunk_by_chunk() {
        let root = TempDir::new().unwrap();
        let a = root.path().join("a");
        let b = root.path().join("b");
        // Several full chunks plus a partial one.
        let body: Vec<u8> = (0..COMPARE_CHUNK * 3 + 17).map(|i| (i % 251) as u8).collect();
        fs::write(&a, &body).unwrap();
        fs::write(&b, &body).unwrap();

        assert!(files_identical(&a, &b).await.unwrap());

        let mut edited = body.clone();
        let last = edited.len() - 1;
        edited[last] ^= 0xff;
        fs::write(&b, &edited).unwrap();

        assert!(!files_identical(&a, &b).await.unwrap());
    }

    #[compio::test]
    async fn a_directory_never_compares_identical() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("dir");
        let file = root.path().join("file");
        fs::create_dir(&dir).unwrap();
        fs::write(&file, b"x").unwrap();

        assert!(!files_identical(&dir, &file).await.unwrap());
    }

    #[test]
    fn copy_preserves_bytes_and_mode() {
        let root = TempDir::new().unwrap();
        let origin = root.path().join("origin.txt");
        let target = root.path().join("target.txt");
        fs::write(&origin, b"payload").unwrap();
        fs::set_permissions(&origin, Permissions::from_mode(0o640)).unwrap();

        copy_with_metadata(&origin, &target).unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"payload");
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn copy_rejects_a_named_pipe() {
        let root = TempDir::new().unwrap();
        let pipe = root.path().join("pipe");
        let target = root.path().join("target");
        nix::unistd::mkfifo(&pipe, nix::sys::stat::Mode::from_bits_truncate(0o644)).unwrap();

        let result = copy_with_metadata(&pipe, &target);
        assert!(matches!(result, Err(SyncError::UnsupportedType { .. })));
        assert!(!target.exists());
    }

    #[test]
    fn copy_tree_replicates_a_nested_tree() {
        let root = TempDir::new().unwrap();
        let origin = root.path().join("origin");
        let target = root.path().join("target");
        fs::create_dir_all(origin.join("sub/inner")).unwrap();
        fs::write(origin.join("top.txt"), b"t").unwrap();
        fs::write(origin.join("sub/inner/deep.txt"), b"d").unwrap();

        copy_tree(&origin, &target).unwrap();

        assert_eq!(fs::read(target.join("top.txt")).unwrap(), b"t");
        assert_eq!(fs::read(target.join("sub/inner/deep.txt")).unwrap(), b"d");
    }

    #[test]
    fn copy_tree_requires_a_fresh_target() {
        let root = TempDir::new().unwrap();
        let origin = root.path().join("origin");
        let target = root.path().join("target");
        fs::create_dir(&origin).unwrap();
        fs::create_dir(&target).unwrap();

        assert!(copy_tree(&origin, &target).is_err());
    }

    #[test]
    fn copy_tree_does_not_recurse_through_a_directory_link_cycle() {
        let root = TempDir::new().unwrap();
        let origin = root.path().join("origin");
        let target = root.path().join("target");
        fs::create_dir(&origin).unwrap();
        fs::write(origin.join("f.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(&origin, origin.join("loop")).unwrap();

        let result = copy_tree(&origin, &target);

        // The linked directory is copied once; the second hop is refused
        // as an uncopyable entry instead of recursing until an OS error.
        assert!(matches!(result, Err(SyncError::UnsupportedType { .. })));
        assert!(!target.join("loop/loop/loop").exists());
    }

    #[test]
    fn copy_tree_fails_on_an_inner_special_file() {
        let root = TempDir::new().unwrap();
        let origin = root.path().join("origin");
        let target = root.path().join("target");
        fs::create_dir(&origin).unwrap();
        nix::unistd::mkfifo(&origin.join("pipe"), nix::sys::stat::Mode::from_bits_truncate(0o644))
            .unwrap();

        let result = copy_tree(&origin, &target);
        assert!(matches!(result, Err(SyncError::UnsupportedType { .. })));
    }
}
