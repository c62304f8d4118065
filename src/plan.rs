//! Action Planner (`SPEC_FULL.md` §4.4, C4).

use std::path::PathBuf;

use frontdown_fs::EntryKind;

use crate::action::Action;
use crate::compare::Verdict;
use crate::config::{BackupMode, DecisionPolicy};
use crate::diff::DiffEntry;
use crate::path::RelPath;

/// Resolved disposition for one diff row under a given mode, before it is
/// turned into zero or more `Action`s and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Copy,
    Hardlink,
    Ignore,
    Delete,
    NewDir,
    ExistingDir,
}

fn dispose(mode: BackupMode, row: &DiffEntry) -> Disposition {
    match (&row.source, &row.compare, row.verdict) {
        (Some(s), None, _) if s.kind == EntryKind::File => Disposition::Copy,
        (Some(s), None, _) if s.kind == EntryKind::Directory => Disposition::NewDir,
        (Some(s), Some(_), Some(Verdict::Same)) if s.kind == EntryKind::File => {
            if mode == BackupMode::Hardlink {
                Disposition::Hardlink
            } else {
                Disposition::Ignore
            }
        }
        (Some(_), Some(_), Some(Verdict::Different)) => Disposition::Copy,
        (Some(s), Some(_), None) if s.kind == EntryKind::Directory => Disposition::ExistingDir,
        (None, Some(c), _) if c.kind == EntryKind::File || c.kind == EntryKind::Directory => {
            if mode == BackupMode::Mirror {
                Disposition::Delete
            } else {
                Disposition::Ignore
            }
        }
        _ => Disposition::Ignore,
    }
}

/// Turn a classified diff stream into a totally ordered action list for one
/// source, per the mode matrix in §4.4.
///
/// `abs_source_of` and `abs_compare_of` resolve a relative path to the
/// absolute path the executor should read from (source tree) or hardlink
/// against (prior-backup tree).
pub fn plan_actions(
    mode: BackupMode,
    copy_empty_dirs: bool,
    rows: &[DiffEntry],
    abs_source_of: &dyn Fn(&RelPath) -> PathBuf,
    abs_compare_of: &dyn Fn(&RelPath) -> PathBuf,
) -> Vec<Action> {
    let mut creates = Vec::new();
    let mut deletes = Vec::new();

    for row in rows {
        match dispose(mode, row) {
            Disposition::Copy => {
                let s = row.source.as_ref().expect("copy implies a source entry");
                creates.push(Action::Copy {
                    relpath: row.relpath.clone(),
                    abs_source: abs_source_of(&row.relpath),
                    size: s.size,
                    mtime: s.mtime,
                });
            }
            Disposition::Hardlink => {
                let s = row.source.as_ref().expect("hardlink implies a source entry");
                creates.push(Action::Hardlink {
                    relpath: row.relpath.clone(),
                    abs_link_target: abs_compare_of(&row.relpath),
                    size: s.size,
                });
            }
            Disposition::NewDir => {
                let is_empty = row
                    .source
                    .as_ref()
                    .map(|e| e.is_empty_dir)
                    .unwrap_or(false);
                if is_empty {
                    if copy_empty_dirs {
                        creates.push(Action::EmptyDir {
                            relpath: row.relpath.clone(),
                        });
                    }
                } else {
                    creates.push(Action::NewDir {
                        relpath: row.relpath.clone(),
                    });
                }
            }
            Disposition::ExistingDir => {
                creates.push(Action::ExistingDir {
                    relpath: row.relpath.clone(),
                });
            }
            Disposition::Delete => {
                let is_dir = row
                    .compare
                    .as_ref()
                    .map(|e| e.kind == EntryKind::Directory)
                    .unwrap_or(false);
                deletes.push(Action::Delete {
                    relpath: row.relpath.clone(),
                    is_dir,
                });
            }
            Disposition::Ignore => {}
        }
    }

    // Invariant 1 & 2: directory creates and file creates/hardlinks before
    // any deletion; within `creates`, entries already arrive in scan order
    // (directories precede their contents) because the diff preserves §4.2's
    // pre-order. Invariant 3: deletions in reverse depth order so a
    // directory is empty by the time it's removed.
    deletes.sort_by(|a, b| b.relpath().depth().cmp(&a.relpath().depth()));

    creates.into_iter().chain(deletes).collect()
}

/// Decide what to do when the pre-apply free-space budget check fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    /// Continue the backup despite insufficient free space.
    Proceed,
    /// The job should abort before executing.
    Abort,
    /// The decision must be delegated to a decision callback.
    Prompt,
}

/// Compare `expected_bytes_copied` against `free_space_bytes` and translate
/// the configured policy into a decision.
#[must_use]
pub fn check_space_budget(
    expected_bytes_copied: u64,
    free_space_bytes: u64,
    policy: DecisionPolicy,
) -> BudgetDecision {
    if expected_bytes_copied <= free_space_bytes {
        return BudgetDecision::Proceed;
    }
    match policy {
        DecisionPolicy::Proceed => BudgetDecision::Proceed,
        DecisionPolicy::Abort => BudgetDecision::Abort,
        DecisionPolicy::Prompt => BudgetDecision::Prompt,
    }
}
