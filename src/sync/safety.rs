use std::path::{Component, Path, PathBuf};

use crate::sync::error::{PathSafetySnafu, SyncError};

/// Resolve `.` and `..` components lexically, without touching the
/// filesystem. A `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(components.last(), None | Some(Component::RootDir)) {
                    components.pop();
                }
            }
            other => components.push(other),
        }
    }

    components.iter().collect()
}

/// Confirm that an absolute `path` lies under `master` or `slave`.
///
/// Run before every destructive operation as a last-resort guard against
/// out-of-tree deletion; `..` segments are resolved lexically first so a
/// constructed escape cannot pass the prefix check. Returns the normalized
/// path that was verified.
pub(crate) fn verify_within(
    path: &Path,
    master: &Path,
    slave: &Path,
) -> Result<PathBuf, SyncError> {
    let normalized = normalize(path);

    if normalized.starts_with(master) || normalized.starts_with(slave) {
        Ok(normalized)
    } else {
        PathSafetySnafu { path: normalized }.fail()
    }
}
