//! Backup Job orchestration (`SPEC_FULL.md` §4.7, C7).

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;

use frontdown_fs::{FilesystemView, LocalFilesystemView};

use crate::action::{Action, ActionRecord, SourceRecord};
use crate::compare::ComparatorChain;
use crate::config::{Config, DecisionPolicy, SourceConfig};
use crate::decision::{DecisionCallback, DecisionPoint};
use crate::diff::diff_trees;
use crate::error::FrontdownError;
use crate::exec::{ExecOutcome, Executor};
use crate::path::{CaseRule, RelPath};
use crate::plan::{check_space_budget, plan_actions, BudgetDecision};
use crate::progress::ProgressSink;
use crate::scan::{scan_tree, ExcludeSet};
use crate::stats::Statistics;

/// Outcome of running one [`Config`] end to end.
#[derive(Debug)]
pub struct JobResult {
    /// Whether the job is considered successful (§4.7's success rule).
    pub success: bool,
    /// Aggregated statistics across every source.
    pub stats: Statistics,
    /// The instance directory this run wrote to.
    pub instance_dir: PathBuf,
    /// Per-source action records, for callers that want to inspect or persist them.
    pub records: Vec<SourceRecord>,
}

/// Pick the backup instance directory name under `backup_root`, formatting
/// `version_name` with the current local time and disambiguating with
/// `_2`, `_3`, … against whatever is already listed there.
fn choose_instance_dir_name(backup_root: &dyn FilesystemView, version_name: &str) -> String {
    let base = chrono::Local::now().format(version_name).to_string();
    let existing: std::collections::HashSet<String> = backup_root
        .list(Path::new(""))
        .map(|entries| entries.into_iter().map(|e| e.name).collect())
        .unwrap_or_default();

    if !existing.contains(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if !existing.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Find the most recent prior backup instance directory, by lexicographic
/// order of name (the default `version_name` pattern sorts chronologically;
/// a custom pattern that doesn't is a configuration concern, not this
/// function's).
fn most_recent_instance(backup_root: &dyn FilesystemView, exclude: &str) -> Option<String> {
    let entries = backup_root.list(Path::new("")).ok()?;
    entries
        .into_iter()
        .filter(|e| e.kind == frontdown_fs::EntryKind::Directory && e.name != exclude)
        .map(|e| e.name)
        .max()
}

/// Run one source through scan → diff → plan → (optionally) record → execute.
#[allow(clippy::too_many_arguments)]
fn run_source(
    config: &Config,
    source: &SourceConfig,
    backup_root_abs: &Path,
    instance_dir: &str,
    compare_dir: Option<&str>,
    cancel: &Arc<AtomicBool>,
    progress: &mut dyn ProgressSink,
) -> Result<(SourceRecord, Statistics), FrontdownError> {
    let source_view = LocalFilesystemView::new(&source.dir);
    let target_root = backup_root_abs.join(instance_dir).join(&source.name);
    std::fs::create_dir_all(&target_root).map_err(|_| {
        tracing::error!(path = %target_root.display(), "failed to create instance directory");
        FrontdownError::Availability {
            what: "backup target",
            path: target_root.clone(),
        }
    })?;
    let target_view = LocalFilesystemView::new(&target_root);

    let compare_root_abs = compare_dir.map(|name| backup_root_abs.join(name).join(&source.name));
    let compare_view: Box<dyn FilesystemView> = match &compare_root_abs {
        Some(path) => Box::new(LocalFilesystemView::new(path)),
        None => Box::new(LocalFilesystemView::new(&target_root)),
    };

    config.validate_against_view_capability(source_view.supports_mtime() && compare_view.supports_mtime())?;

    let case_rule = CaseRule::platform_default();
    let excludes = ExcludeSet::compile(&source.exclude_paths, case_rule)
        .map_err(|e| FrontdownError::Configuration(format!("source {:?}: {e}", source.name)))?;

    let source_scan = scan_tree(&source_view, &excludes, case_rule, config.max_scanning_errors);
    let compare_scan = scan_tree(
        compare_view.as_ref(),
        &ExcludeSet::empty(),
        case_rule,
        config.max_scanning_errors,
    );

    let comparator = ComparatorChain::new(config.compare_method.clone());
    let compare_view_ref = compare_view.as_ref();
    let read_source = |relpath: &RelPath| -> std::io::Result<Box<dyn std::io::Read>> {
        source_view
            .open_read(&relpath.to_path_buf())
            .map_err(|e| std::io::Error::other(e.to_string()))
    };
    let read_compare = |relpath: &RelPath| -> std::io::Result<Box<dyn std::io::Read>> {
        compare_view_ref
            .open_read(&relpath.to_path_buf())
            .map_err(|e| std::io::Error::other(e.to_string()))
    };

    let diff_result = diff_trees(
        &source_scan.entries,
        &compare_scan.entries,
        case_rule,
        &comparator,
        &read_source,
        &read_compare,
    );

    let abs_source_of = |relpath: &RelPath| source_view.to_absolute(&relpath.to_path_buf());
    let abs_compare_of = |relpath: &RelPath| compare_view_ref.to_absolute(&relpath.to_path_buf());
    let actions = plan_actions(
        config.mode,
        config.copy_empty_dirs,
        &diff_result.rows,
        &abs_source_of,
        &abs_compare_of,
    );

    let mut stats = Statistics::default();
    stats.scan_errors =
        source_scan.scan_errors + compare_scan.scan_errors + diff_result.scan_errors;
    stats.start_time = Some(SystemTime::now());

    let expected_bytes: u64 = actions
        .iter()
        .map(|a| match a {
            Action::Copy { size, .. } => *size,
            _ => 0,
        })
        .sum();
    let free_space = target_view.free_space().unwrap_or(u64::MAX);
    match check_space_budget(expected_bytes, free_space, config.target_drive_full_action) {
        BudgetDecision::Abort => {
            return Err(FrontdownError::Availability {
                what: "backup target",
                path: target_root,
            })
        }
        BudgetDecision::Prompt => {
            let mut decision = crate::decision::CliPrompt;
            if !decision.ask(DecisionPoint::TargetDriveFull) {
                return Err(FrontdownError::Availability {
                    what: "backup target",
                    path: target_root,
                });
            }
        }
        BudgetDecision::Proceed => {}
    }

    if config.apply_actions {
        let executor = Executor::new(&target_view, config.max_backup_errors, Arc::clone(cancel));
        let outcome = executor.apply(&actions, &mut stats, progress);
        if outcome == ExecOutcome::Cancelled {
            stats.end_time = Some(SystemTime::now());
            return Err(FrontdownError::Cancelled);
        }
    }
    stats.end_time = Some(SystemTime::now());

    let record = SourceRecord {
        name: source.name.clone(),
        source_root: source.dir.clone(),
        compare_root: compare_root_abs,
        actions,
    };
    Ok((record, stats))
}

/// Run a complete backup job for `config`.
///
/// # Errors
///
/// Returns [`FrontdownError::Configuration`] if validation fails, or any
/// source's [`FrontdownError::Availability`]/[`FrontdownError::Cancelled`]
/// when that source's policy resolves to abort.
pub fn run_job(
    config: &Config,
    cancel: Arc<AtomicBool>,
    progress: &mut dyn ProgressSink,
) -> Result<JobResult, FrontdownError> {
    config.validate()?;

    std::fs::create_dir_all(&config.backup_root_dir).map_err(|_| FrontdownError::Availability {
        what: "backup target",
        path: config.backup_root_dir.clone(),
    })?;
    let backup_root_view = LocalFilesystemView::new(&config.backup_root_dir);

    let needs_compare = config.compare_with_last_backup || config.mode == crate::config::BackupMode::Hardlink;
    let instance_name = if config.versioned {
        choose_instance_dir_name(&backup_root_view, &config.version_name)
    } else {
        String::new()
    };
    let compare_name = if needs_compare {
        most_recent_instance(&backup_root_view, &instance_name)
    } else {
        None
    };

    let mut total_stats = Statistics::default();
    let mut records = Vec::new();
    let mut any_completed = false;

    for source in &config.sources {
        if !source.dir.exists() {
            tracing::warn!(source = %source.name, path = %source.dir.display(), "source unavailable");
            match config.source_unavailable_action {
                DecisionPolicy::Abort => {
                    return Err(FrontdownError::Availability {
                        what: "source",
                        path: source.dir.clone(),
                    })
                }
                DecisionPolicy::Prompt => {
                    let mut decision = crate::decision::CliPrompt;
                    if !decision.ask(DecisionPoint::SourceUnavailable) {
                        continue;
                    }
                }
                DecisionPolicy::Proceed => continue,
            }
        }

        let (record, stats) = run_source(
            config,
            source,
            &config.backup_root_dir,
            &instance_name,
            compare_name.as_deref(),
            &cancel,
            progress,
        )?;

        total_stats.bytes_copied += stats.bytes_copied;
        total_stats.bytes_hardlinked += stats.bytes_hardlinked;
        total_stats.files_copied += stats.files_copied;
        total_stats.files_hardlinked += stats.files_hardlinked;
        total_stats.files_deleted += stats.files_deleted;
        total_stats.dirs_created += stats.dirs_created;
        total_stats.scan_errors += stats.scan_errors;
        total_stats.backup_errors += stats.backup_errors;
        any_completed = true;

        if config.save_actionfile {
            let record_path = config
                .backup_root_dir
                .join(&instance_name)
                .join("actions.json");
            let action_record = ActionRecord {
                backup_root: config.backup_root_dir.clone(),
                instance_dir: PathBuf::from(&instance_name),
                mode: config.mode,
                created_at: stats.start_time,
                sources: vec![record.clone()],
            };
            action_record
                .save_atomically(&record_path)
                .map_err(|e| FrontdownError::ActionRecord {
                    path: record_path.clone(),
                    source: anyhow::Error::new(e),
                })?;
            if config.open_actionfile {
                tracing::info!(path = %record_path.display(), "action record written");
            }
        }

        records.push(record);
    }

    let success = any_completed
        && !config.max_scanning_errors.is_exceeded(total_stats.scan_errors)
        && !config.max_backup_errors.is_exceeded(total_stats.backup_errors);

    Ok(JobResult {
        success,
        stats: total_stats,
        instance_dir: PathBuf::from(instance_name),
        records,
    })
}
