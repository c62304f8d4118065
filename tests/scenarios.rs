//! End-to-end scenario tests over real temp directories, mirroring the
//! concrete scenarios enumerated in `SPEC_FULL.md` §8.

use std::fs;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use frontdown::config::{BackupMode, CompareMethod, Config, DecisionPolicy, ErrorBudget, SourceConfig};
use frontdown::job::run_job;
use frontdown::progress::NullProgressSink;

fn source_config(name: &str, dir: &std::path::Path, backup_root: &std::path::Path) -> Config {
    Config {
        sources: vec![SourceConfig {
            name: name.to_string(),
            dir: dir.to_path_buf(),
            exclude_paths: vec![],
        }],
        backup_root_dir: backup_root.to_path_buf(),
        mode: BackupMode::Save,
        versioned: false,
        version_name: "%Y-%m-%d_%H%M%S".to_string(),
        compare_with_last_backup: false,
        copy_empty_dirs: false,
        save_actionfile: true,
        open_actionfile: false,
        apply_actions: true,
        compare_method: vec![CompareMethod::Size],
        save_actionhtml: false,
        open_actionhtml: false,
        exclude_actionhtml_actions: vec![],
        max_scanning_errors: ErrorBudget::Unlimited,
        max_backup_errors: ErrorBudget::Unlimited,
        target_drive_full_action: DecisionPolicy::Proceed,
        source_unavailable_action: DecisionPolicy::Abort,
        log_level: "info".to_string(),
    }
}

#[test]
fn save_on_empty_target() {
    let source = tempfile::TempDir::new().unwrap();
    let backup_root = tempfile::TempDir::new().unwrap();
    fs::write(source.path().join("a.txt"), b"foo").unwrap();
    fs::create_dir(source.path().join("sub")).unwrap();
    fs::write(source.path().join("sub/b.txt"), b"bar").unwrap();

    let config = source_config("docs", source.path(), backup_root.path());
    let mut progress = NullProgressSink;
    let result = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();

    assert!(result.success);
    assert_eq!(result.stats.bytes_copied, 6);
    assert_eq!(fs::read(backup_root.path().join("docs/a.txt")).unwrap(), b"foo");
    assert_eq!(fs::read(backup_root.path().join("docs/sub/b.txt")).unwrap(), b"bar");
    assert!(backup_root.path().join("docs/actions.json").exists());
}

#[test]
fn mirror_deletes_stale_compare_only_entries() {
    let source = tempfile::TempDir::new().unwrap();
    let backup_root = tempfile::TempDir::new().unwrap();
    fs::write(source.path().join("a.txt"), b"foo").unwrap();

    // Pre-seed the (unversioned) target with a file the source no longer has.
    fs::create_dir_all(backup_root.path().join("docs")).unwrap();
    fs::write(backup_root.path().join("docs/a.txt"), b"foo").unwrap();
    fs::write(backup_root.path().join("docs/old.txt"), b"stale").unwrap();

    let mut config = source_config("docs", source.path(), backup_root.path());
    config.mode = BackupMode::Mirror;
    let mut progress = NullProgressSink;
    let result = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();

    assert!(result.success);
    assert_eq!(result.stats.files_deleted, 1);
    assert!(!backup_root.path().join("docs/old.txt").exists());
    assert!(backup_root.path().join("docs/a.txt").exists());
}

#[test]
fn exclude_subtree_is_never_copied() {
    let source = tempfile::TempDir::new().unwrap();
    let backup_root = tempfile::TempDir::new().unwrap();
    fs::create_dir(source.path().join("keep")).unwrap();
    fs::write(source.path().join("keep/x"), b"x").unwrap();
    fs::create_dir(source.path().join("skip")).unwrap();
    fs::write(source.path().join("skip/y"), b"y").unwrap();
    fs::create_dir(source.path().join("skip/sub")).unwrap();
    fs::write(source.path().join("skip/sub/z"), b"z").unwrap();

    let mut config = source_config("docs", source.path(), backup_root.path());
    config.sources[0].exclude_paths = vec!["skip/".to_string()];
    let mut progress = NullProgressSink;
    let result = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();

    assert!(result.success);
    assert!(backup_root.path().join("docs/keep/x").exists());
    assert!(!backup_root.path().join("docs/skip").exists());
}

#[test]
fn budget_exhaustion_stops_the_executor_and_reports_failure() {
    let source = tempfile::TempDir::new().unwrap();
    let backup_root = tempfile::TempDir::new().unwrap();
    fs::write(source.path().join("a.txt"), b"foo").unwrap();
    fs::write(source.path().join("b.txt"), b"bar").unwrap();

    let mut config = source_config("docs", source.path(), backup_root.path());
    config.max_backup_errors = ErrorBudget::Limited(0);
    // Force both copies to fail by making the target a read-only existing file
    // at the destination path's parent is hard to simulate portably; instead
    // remove read access to the source after the scan can't be done without
    // races, so we simulate via an unreadable source file (permission denied
    // on open_read during copy is a backup_error, counted the same way).
    #[cfg(unix)]
    let denied = {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(source.path().join("a.txt")).unwrap().permissions();
        perms.set_mode(0o000);
        fs::set_permissions(source.path().join("a.txt"), perms).unwrap();
        fs::File::open(source.path().join("a.txt")).is_err()
    };
    #[cfg(not(unix))]
    let denied = false;

    let mut progress = NullProgressSink;
    let result = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();

    if denied {
        assert!(!result.success);
        assert!(result.stats.backup_errors >= 1);
    }
}

#[test]
fn rerunning_an_unchanged_source_produces_no_further_copies() {
    let source = tempfile::TempDir::new().unwrap();
    let backup_root = tempfile::TempDir::new().unwrap();
    fs::write(source.path().join("a.txt"), b"foo").unwrap();

    let config = source_config("docs", source.path(), backup_root.path());
    let mut progress = NullProgressSink;
    run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();

    let second = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();
    assert_eq!(second.stats.bytes_copied, 0);
}

#[test]
fn missing_source_aborts_by_default() {
    let backup_root = tempfile::TempDir::new().unwrap();
    let config = source_config("docs", std::path::Path::new("/no/such/source"), backup_root.path());
    let mut progress = NullProgressSink;
    assert!(run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).is_err());
}
