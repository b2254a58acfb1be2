use std::io;
use std::path::{Path, PathBuf};

use snafu::Snafu;

/// Failure taxonomy of a reconciliation pass.
///
/// Only [`SyncError::UnsupportedType`] is ever recovered (the distribute
/// phase logs it and skips the entry); every other variant aborts the pass.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SyncError {
    #[snafu(display("path does not exist: {}", path.display()))]
    NotFound { path: PathBuf, source: io::Error },
    #[snafu(display("permission denied: {}", path.display()))]
    Permission { path: PathBuf, source: io::Error },
    #[snafu(display("cannot copy special file: {}", path.display()))]
    UnsupportedType { path: PathBuf },
    #[snafu(display("{} is outside both mirror roots", path.display()))]
    PathSafety { path: PathBuf },
    #[snafu(display("i/o failure on {}", path.display()))]
    Io { path: PathBuf, source: io::Error },
}

impl SyncError {
    /// Classify a raw I/O failure against the typed taxonomy.
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => SyncError::NotFound { path, source },
            io::ErrorKind::PermissionDenied => SyncError::Permission { path, source },
            _ => SyncError::Io { path, source },
        }
    }
}

pub(crate) trait IoResultExt<T> {
    /// Attach the path an I/O operation was acting on, classifying the
    /// error kind along the way.
    fn with_path(self, path: &Path) -> Result<T, SyncError>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: &Path) -> Result<T, SyncError> {
        self.map_err(|source| SyncError::from_io(path, source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_io_error_kinds() {
        let path = Path::new("/tmp/x");

        let not_found = SyncError::from_io(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(not_found, SyncError::NotFound { .. }));

        let denied = SyncError::from_io(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(denied, SyncError::Permission { .. }));

        let other = SyncError::from_io(path, io::Error::from(io::ErrorKind::WriteZero));
        assert!(matches!(other, SyncError::Io { .. }));
    }
}
