use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, error, info};

use crate::sync::diff::UniqueEntries;
use crate::sync::error::{IoResultExt, SyncError};
use crate::sync::walk::{EntryKind, TreeWalk};
use crate::sync::{fsops, meta, safety};

/// One-way mirror of a master tree onto a slave tree.
///
/// Each reconciliation pass runs remove, update, and distribute in that
/// fixed order; the ordering is a correctness requirement, since later
/// phases depend on the filesystem state the earlier ones leave behind.
/// A pass is idempotent: with no intervening filesystem change, a second
/// pass performs no operations.
pub struct Synchronizer {
    master: PathBuf,
    slave: PathBuf,
    interval: Duration,
    running: Arc<AtomicBool>,
    dispatch: Dispatch,
}

/// Cloneable handle that asks the mirror loop to stop.
///
/// Idempotent and safe to trigger from a signal task; the loop observes it
/// only between passes, so cancellation is never preemptive mid-pass.
#[derive(Debug, Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Synchronizer {
    /// Build a mirror over the given roots. Both are resolved to canonical
    /// absolute form here, exactly once, and must already exist; every
    /// event the mirror emits goes through `dispatch`.
    pub fn new(
        master: &Path,
        slave: &Path,
        interval: Duration,
        dispatch: Dispatch,
    ) -> Result<Self, SyncError> {
        Ok(Self {
            master: master.canonicalize().with_path(master)?,
            slave: slave.canonicalize().with_path(slave)?,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            dispatch,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Run reconciliation passes until a [`StopHandle`] is triggered.
    ///
    /// Blocks its task for the whole lifetime of the mirror. The flag is
    /// re-checked after each pass and its sleep, so an in-flight pass
    /// always completes before the loop winds down. A failed pass returns
    /// the error without the stop event.
    pub async fn run(&self) -> Result<(), SyncError> {
        async {
            self.running.store(true, Ordering::SeqCst);
            info!(
                "start mirroring {} ----> {}",
                self.master.display(),
                self.slave.display()
            );

            while self.running.load(Ordering::SeqCst) {
                self.reconcile().await?;
                compio::time::sleep(self.interval).await;
            }

            info!(
                "stop mirroring {} --X--> {}",
                self.master.display(),
                self.slave.display()
            );
            Ok(())
        }
        .with_subscriber(self.dispatch.clone())
        .await
    }

    /// One reconciliation pass: remove stale slave entries, reconcile the
    /// common ones, then copy over whatever only the master has.
    pub async fn reconcile(&self) -> Result<(), SyncError> {
        async {
            self.remove()?;
            self.update().await?;
            self.distribute()
        }
        .with_subscriber(self.dispatch.clone())
        .await
    }

    /// Delete every slave entry without a master counterpart of the same
    /// kind. Runs first so stale entries never reach the metadata
    /// comparison and a type-flipped path is recreated later in the pass.
    fn remove(&self) -> Result<(), SyncError> {
        for entry in UniqueEntries::new(&self.slave, &self.master) {
            let entry = entry?;
            let target = safety::verify_within(&entry.origin, &self.master, &self.slave)?;

            match entry.kind {
                EntryKind::Directory => fsops::remove_tree(&target)?,
                EntryKind::File => fsops::remove_file(&target)?,
            }
            info!("removed: {} {}", entry.kind, target.display());
        }

        Ok(())
    }

    /// Reconcile metadata, and content for files, of every entry present in
    /// both trees. Entries only the master has are picked up by the
    /// distribute phase instead.
    async fn update(&self) -> Result<(), SyncError> {
        for entry in TreeWalk::new(&self.slave) {
            let entry = entry?;
            let in_master = self.master.join(&entry.rel);
            if !in_master.exists() {
                continue;
            }

            meta::sync_stats(&in_master, &entry.path)?;

            if entry.kind == EntryKind::File
                && !fsops::files_identical(&in_master, &entry.path).await?
            {
                fsops::copy_with_metadata(&in_master, &entry.path)?;
                info!("updated: {}", entry.path.display());
            }
        }

        Ok(())
    }

    /// Copy every master entry the slave lacks. Runs last, after stale
    /// entries are gone, so everything copied here is genuinely new. An
    /// entry of an uncopyable type is logged and skipped; a destination
    /// already materialized by an earlier recursive copy in this pass is a
    /// no-op.
    fn distribute(&self) -> Result<(), SyncError> {
        for entry in UniqueEntries::new(&self.master, &self.slave) {
            let entry = entry?;

            if entry.counterpart.exists() {
                debug!("already present: {}", entry.counterpart.display());
                continue;
            }

            let copied = match entry.kind {
                EntryKind::Directory => fsops::copy_tree(&entry.origin, &entry.counterpart),
                EntryKind::File => fsops::copy_with_metadata(&entry.origin, &entry.counterpart),
            };

            match copied {
                Ok(()) => info!("copied: {} {}", entry.kind, entry.counterpart.display()),
                Err(SyncError::UnsupportedType { .. }) => {
                    error!("copy failed: {}", entry.counterpart.display());
                }
                Err(other) => return Err(other),
            }
        }

        Ok(())
    }
}
