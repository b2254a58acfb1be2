use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use filetime::FileTime;
use nix::unistd::{Gid, Uid, chown};
use tracing::info;

use crate::sync::error::{IoResultExt, SyncError};

/// The (mode, uid, gid) triple of an entry at a point in time.
///
/// Never cached; re-read every pass so it always reflects on-disk state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataSnapshot {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl MetadataSnapshot {
    pub fn read(path: &Path) -> Result<Self, SyncError> {
        let meta = fs::metadata(path).with_path(path)?;
        Ok(Self {
            mode: meta.mode(),
            uid: meta.uid(),
            gid: meta.gid(),
        })
    }
}

/// Reconcile mode, owner, and group of `target` against `origin`.
///
/// The three checks are independent; any subset may fire in one call, and
/// each change is logged on its own line.
pub(crate) fn sync_stats(origin: &Path, target: &Path) -> Result<(), SyncError> {
    let origin_stat = MetadataSnapshot::read(origin)?;
    let target_stat = MetadataSnapshot::read(target)?;

    if origin_stat.mode != target_stat.mode {
        copy_stat(origin, target)?;
        info!("changed stat: {}", target.display());
    }

    if origin_stat.uid != target_stat.uid {
        chown_path(target, Some(Uid::from_raw(origin_stat.uid)), None)?;
        info!("changed UID: {}", target.display());
    }

    if origin_stat.gid != target_stat.gid {
        chown_path(target, None, Some(Gid::from_raw(origin_stat.gid)))?;
        info!("changed GID: {}", target.display());
    }

    Ok(())
}

/// Apply the origin's full stat (permission bits and timestamps) to the
/// target.
pub(crate) fn copy_stat(origin: &Path, target: &Path) -> Result<(), SyncError> {
    let meta = fs::metadata(origin).with_path(origin)?;

    fs::set_permissions(target, meta.permissions()).with_path(target)?;

    let atime = FileTime::from_last_access_time(&meta);
    let mtime = FileTime::from_last_modification_time(&meta);
    filetime::set_file_times(target, atime, mtime).with_path(target)?;

    Ok(())
}

fn chown_path(target: &Path, uid: Option<Uid>, gid: Option<Gid>) -> Result<(), SyncError> {
    chown(target, uid, gid)
        .map_err(|errno| SyncError::from_io(target, std::io::Error::from_raw_os_error(errno as i32)))
}
