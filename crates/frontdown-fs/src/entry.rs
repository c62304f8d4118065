//! Value types shared by every `FilesystemView` implementation.

use std::time::SystemTime;

/// The two kinds of entry a tree can contain.
///
/// No symlink variant: the spec's data model only distinguishes file and
/// directory entries (see `SPEC_FULL.md` §3); a remote view that exposes
/// symlinks is expected to resolve or skip them before they reach here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A directory.
    Directory,
}

/// One entry returned by [`crate::FilesystemView::list`].
#[derive(Debug, Clone)]
pub struct ListedEntry {
    /// Entry name (basename only, not a path).
    pub name: String,
    /// File or directory.
    pub kind: EntryKind,
    /// Size in bytes. Always `0` for directories.
    pub size: u64,
    /// Last modification time, if the view can provide one.
    ///
    /// Remote views MAY return `None` for every entry; the planner refuses a
    /// `moddate`-first comparator chain against a view that never provides one.
    pub mtime: Option<SystemTime>,
}

/// Metadata for a single path, as returned by [`crate::FilesystemView::stat`].
#[derive(Debug, Clone)]
pub struct Stat {
    /// File or directory.
    pub kind: EntryKind,
    /// Size in bytes. Always `0` for directories.
    pub size: u64,
    /// Last modification time, if available.
    pub mtime: Option<SystemTime>,
    /// Device and inode, when the underlying OS can provide them (used to
    /// confirm a hardlink landed on the expected inode in tests).
    pub dev_ino: Option<(u64, u64)>,
}
