//! Executor (`SPEC_FULL.md` §4.6, C6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use filetime::FileTime;
use frontdown_fs::{EntryKind, FilesystemView};

use crate::action::Action;
use crate::config::ErrorBudget;
use crate::progress::{action_weight, ProgressSink};
use crate::stats::StatsSink;

/// Outcome of applying one action list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Every action applied, or failures stayed within budget.
    Completed,
    /// `max_backup_errors` was exceeded; the executor stopped early.
    BudgetExceeded,
    /// The cancellation flag was observed between actions.
    Cancelled,
}

/// Applies a plan against a target [`FilesystemView`], honoring the error
/// budget and cooperative cancellation.
pub struct Executor<'a> {
    target: &'a dyn FilesystemView,
    max_backup_errors: ErrorBudget,
    cancel: Arc<AtomicBool>,
}

impl<'a> Executor<'a> {
    /// Build an executor targeting `target`, bounded by `max_backup_errors`
    /// and responsive to `cancel`.
    #[must_use]
    pub fn new(target: &'a dyn FilesystemView, max_backup_errors: ErrorBudget, cancel: Arc<AtomicBool>) -> Self {
        Self {
            target,
            max_backup_errors,
            cancel,
        }
    }

    /// Apply `actions` in order, reporting through `stats` and `progress`.
    ///
    /// Already-applied actions are never rolled back: per §4.6/§9, a
    /// budget-exceeded or cancelled run simply stops where it is and leaves
    /// the action record as the audit trail of what was attempted.
    pub fn apply(
        &self,
        actions: &[Action],
        stats: &mut dyn StatsSink,
        progress: &mut dyn ProgressSink,
    ) -> ExecOutcome {
        let total_units: u64 = actions.iter().map(action_weight).sum();
        progress.start(total_units);

        let mut backup_errors: u64 = 0;
        let mut outcome = ExecOutcome::Completed;

        for action in actions {
            if self.cancel.load(Ordering::SeqCst) {
                outcome = ExecOutcome::Cancelled;
                break;
            }
            if self.max_backup_errors.is_exceeded(backup_errors) {
                outcome = ExecOutcome::BudgetExceeded;
                break;
            }

            let weight = action_weight(action);
            if let Err(failure) = self.apply_one(action, stats) {
                tracing::error!(relpath = %action.relpath(), %failure, "action failed");
                backup_errors += 1;
                stats.record_backup_error();
            }
            progress.advance(weight);
        }

        progress.finish();

        if outcome == ExecOutcome::Completed && self.max_backup_errors.is_exceeded(backup_errors) {
            outcome = ExecOutcome::BudgetExceeded;
        }
        outcome
    }

    fn apply_one(&self, action: &Action, stats: &mut dyn StatsSink) -> Result<(), String> {
        match action {
            Action::NewDir { relpath } | Action::EmptyDir { relpath } => {
                self.target
                    .mkdir(&relpath.to_path_buf())
                    .map_err(|e| e.to_string())?;
                stats.record_dir_created();
                Ok(())
            }
            Action::ExistingDir { relpath } => {
                match self.target.stat(&relpath.to_path_buf()) {
                    Ok(s) if s.kind == EntryKind::Directory => Ok(()),
                    Ok(_) => {
                        tracing::warn!(relpath = %relpath, "existing_dir found a file, not a directory");
                        Ok(())
                    }
                    Err(frontdown_fs::ViewError::NotFound(_)) => {
                        self.target
                            .mkdir(&relpath.to_path_buf())
                            .map_err(|e| e.to_string())?;
                        stats.record_dir_created();
                        Ok(())
                    }
                    Err(e) => Err(e.to_string()),
                }
            }
            Action::Copy {
                relpath,
                abs_source,
                size,
                mtime,
            } => self.copy_from_path(relpath.to_path_buf().as_path(), abs_source, *size, *mtime, stats),
            Action::Hardlink {
                relpath,
                abs_link_target,
                size,
            } => self.hardlink_or_fallback(relpath, abs_link_target, *size, stats),
            Action::Delete { relpath, is_dir } => {
                let kind = if *is_dir {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                };
                self.target
                    .delete(&relpath.to_path_buf(), kind)
                    .map_err(|e| e.to_string())?;
                stats.record_delete();
                Ok(())
            }
        }
    }

    fn copy_from_path(
        &self,
        relpath: &std::path::Path,
        abs_source: &std::path::Path,
        expected_size: u64,
        mtime: Option<std::time::SystemTime>,
        stats: &mut dyn StatsSink,
    ) -> Result<(), String> {
        let mut reader = std::fs::File::open(abs_source).map_err(|e| e.to_string())?;
        {
            let mut writer = self.target.open_write(relpath).map_err(|e| e.to_string())?;
            std::io::copy(&mut reader, &mut writer).map_err(|e| e.to_string())?;
        }

        let actual_size = self
            .target
            .stat(relpath)
            .map(|s| s.size)
            .unwrap_or(u64::MAX);
        if actual_size != expected_size {
            let _ = self.target.delete(relpath, EntryKind::File);
            return Err(format!(
                "size mismatch copying {relpath:?}: expected {expected_size}, got {actual_size}"
            ));
        }

        if let Some(mtime) = mtime {
            let abs_target = self.target.to_absolute(relpath);
            if let Err(e) = filetime::set_file_mtime(&abs_target, FileTime::from_system_time(mtime)) {
                tracing::warn!(relpath = %relpath.display(), error = %e, "failed to preserve mtime");
            }
        }

        stats.record_copy(expected_size);
        Ok(())
    }

    fn hardlink_or_fallback(
        &self,
        relpath: &crate::path::RelPath,
        abs_link_target: &std::path::Path,
        size: u64,
        stats: &mut dyn StatsSink,
    ) -> Result<(), String> {
        match self.target.hardlink(abs_link_target, &relpath.to_path_buf()) {
            Ok(()) => {
                stats.record_hardlink(size);
                Ok(())
            }
            Err(frontdown_fs::ViewError::CrossDevice(..) | frontdown_fs::ViewError::Unsupported) => {
                tracing::warn!(relpath = %relpath, "hardlink unsupported, falling back to copy");
                self.copy_from_path(relpath.to_path_buf().as_path(), abs_link_target, size, None, stats)
            }
            Err(e) => Err(e.to_string()),
        }
    }
}
