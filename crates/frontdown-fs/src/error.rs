//! Error taxonomy for filesystem-view operations.

use std::path::PathBuf;

/// Errors a [`crate::FilesystemView`] implementation can return.
///
/// These map directly onto the taxonomy in the backup engine's error design:
/// `AccessDenied`/`NotFound`/`Transient` from `list`, `CrossDevice`/`Unsupported`
/// from `hardlink`, and a catch-all `Io` for everything else.
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    /// The path does not exist.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    /// The caller lacks permission for this operation.
    #[error("access denied: {0}")]
    AccessDenied(PathBuf),

    /// A transient condition (network hiccup, retryable I/O). Callers may retry.
    #[error("transient error on {0}: {1}")]
    Transient(PathBuf, String),

    /// `hardlink` failed because source and destination are on different devices/volumes.
    #[error("cross-device hardlink: {0} -> {1}")]
    CrossDevice(PathBuf, PathBuf),

    /// This view does not support hardlinks at all.
    #[error("hardlinks unsupported by this filesystem view")]
    Unsupported,

    /// Any other I/O failure.
    #[error("I/O error on {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
}

/// Result alias used throughout `frontdown-fs`.
pub type Result<T> = std::result::Result<T, ViewError>;

impl ViewError {
    /// Wrap a raw [`std::io::Error`], classifying it by `kind()` where possible.
    pub fn from_io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::PermissionDenied => Self::AccessDenied(path),
            _ => Self::Io(path, err),
        }
    }
}
