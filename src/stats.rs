//! Statistics accumulator (`SPEC_FULL.md` §3, §9).
//!
//! Kept as a plain field of the Job rather than a process-wide singleton
//! (§9's "Statistics as ambient state" design note): the engine is
//! single-threaded, so a trait object is all the indirection the Executor
//! needs to report through.

use std::time::SystemTime;

/// Counters accumulated over the course of one backup job.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Bytes written by `copy` actions.
    pub bytes_copied: u64,
    /// Bytes attributed to `hardlink` actions (including fallback-to-copy,
    /// counted there as `bytes_copied` instead — see [`Statistics::record_copy`]).
    pub bytes_hardlinked: u64,
    /// Number of `copy` actions applied.
    pub files_copied: u64,
    /// Number of `hardlink` actions applied (excluding fallbacks).
    pub files_hardlinked: u64,
    /// Number of `delete` actions applied.
    pub files_deleted: u64,
    /// Number of directories created.
    pub dirs_created: u64,
    /// Scan errors accumulated across all sources.
    pub scan_errors: u64,
    /// Backup (action-apply) errors accumulated across all sources.
    pub backup_errors: u64,
    /// When the job started.
    pub start_time: Option<SystemTime>,
    /// When the job finished.
    pub end_time: Option<SystemTime>,
}

/// Interface the Executor reports through, so tests can inspect results
/// directly and nested/sequential jobs stay isolated from one another.
pub trait StatsSink {
    /// Record a completed `copy` action (also used for a hardlink that fell
    /// back to a copy).
    fn record_copy(&mut self, bytes: u64);
    /// Record a completed `hardlink` action.
    fn record_hardlink(&mut self, bytes: u64);
    /// Record a completed `delete` action.
    fn record_delete(&mut self);
    /// Record a directory created (`new_dir`/`empty_dir`).
    fn record_dir_created(&mut self);
    /// Record one scan error.
    fn record_scan_error(&mut self);
    /// Record one backup (action) error.
    fn record_backup_error(&mut self);
}

impl StatsSink for Statistics {
    fn record_copy(&mut self, bytes: u64) {
        self.bytes_copied += bytes;
        self.files_copied += 1;
    }

    fn record_hardlink(&mut self, bytes: u64) {
        self.bytes_hardlinked += bytes;
        self.files_hardlinked += 1;
    }

    fn record_delete(&mut self) {
        self.files_deleted += 1;
    }

    fn record_dir_created(&mut self) {
        self.dirs_created += 1;
    }

    fn record_scan_error(&mut self) {
        self.scan_errors += 1;
    }

    fn record_backup_error(&mut self) {
        self.backup_errors += 1;
    }
}
