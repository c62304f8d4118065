//! Filesystem-view abstraction for frontdown.
//!
//! This crate defines the [`FilesystemView`] trait, which abstracts read,
//! write, stat, hardlink and delete primitives over a tree. The backup
//! pipeline (scanner, diff, planner, executor) is written entirely against
//! this trait so the same code drives a local POSIX/Windows tree, an
//! in-memory tree built for tests ([`MockFilesystemView`]), or — as an
//! external collaborator, not implemented here — a remote tree reached over
//! FTP or Windows Portable Devices.
//!
//! # Design
//!
//! A single call site never switches on concrete kind; it consumes the
//! trait object. Implementations that cannot provide a modification time
//! for every entry must say so via [`FilesystemView::supports_mtime`], so
//! callers can refuse a comparator chain that starts with `moddate`.

mod entry;
mod error;
pub mod local;
pub mod mock;

pub use entry::{EntryKind, ListedEntry, Stat};
pub use error::{Result, ViewError};
pub use local::LocalFilesystemView;
pub use mock::MockFilesystemView;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Uniform read/write/stat/hardlink/delete primitives over a tree.
///
/// All paths accepted by trait methods are relative to the view's root and
/// use forward slashes; see `frontdown::path::RelPath` for the normalized
/// representation the engine passes in.
pub trait FilesystemView: Send {
    /// List the direct children of `dir_relpath`, in no particular order —
    /// callers (the scanner) are responsible for sorting.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::NotFound`] if the directory does not exist,
    /// [`ViewError::AccessDenied`] on a permission failure, or
    /// [`ViewError::Transient`] for a retryable remote hiccup.
    fn list(&self, dir_relpath: &Path) -> Result<Vec<ListedEntry>>;

    /// Open a file for reading.
    fn open_read(&self, relpath: &Path) -> Result<Box<dyn Read>>;

    /// Open a file for writing (create or truncate).
    ///
    /// Does **not** create parent directories; the caller (the executor)
    /// must have already emitted and applied the directory-creating actions
    /// that the action-ordering invariant guarantees precede this call.
    fn open_write(&self, relpath: &Path) -> Result<Box<dyn Write>>;

    /// Fetch metadata for a single path.
    fn stat(&self, relpath: &Path) -> Result<Stat>;

    /// Check whether a path exists.
    fn exists(&self, relpath: &Path) -> bool {
        self.stat(relpath).is_ok()
    }

    /// Create a single directory level. Parent directories must already exist.
    fn mkdir(&self, relpath: &Path) -> Result<()>;

    /// Create a hardlink at `new_relpath` pointing at the absolute path
    /// `target_abs`.
    ///
    /// # Errors
    ///
    /// [`ViewError::CrossDevice`] if `target_abs` is on a different
    /// device/volume, [`ViewError::Unsupported`] if this view never supports
    /// hardlinks (e.g. a remote view).
    fn hardlink(&self, target_abs: &Path, new_relpath: &Path) -> Result<()>;

    /// Remove a file or an empty directory.
    fn delete(&self, relpath: &Path, kind: EntryKind) -> Result<()>;

    /// Bytes of free space available on the device backing `root`.
    fn free_space(&self) -> Result<u64>;

    /// Resolve a relative path to the absolute path this view reads/writes.
    ///
    /// Used by the planner/executor to record `abs_source`/`abs_link_target`
    /// in actions and the action record.
    fn to_absolute(&self, relpath: &Path) -> PathBuf;

    /// Whether this view can supply a reliable `mtime` for every entry.
    ///
    /// Remote adapters that can't (e.g. some FTP servers) return `false`;
    /// configuration validation then refuses a `moddate`-first comparator
    /// chain against such a view.
    fn supports_mtime(&self) -> bool {
        true
    }

    /// Whether this view can create hardlinks at all.
    fn supports_hardlinks(&self) -> bool {
        true
    }

    /// A short identifier for logging (`"local"`, `"mock"`, …).
    fn name(&self) -> &'static str;
}
