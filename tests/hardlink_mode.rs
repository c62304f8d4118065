//! HARDLINK-mode scenarios (`SPEC_FULL.md` §8, scenarios 3 & 4).
//!
//! Inode-sharing assertions are POSIX-specific, so this whole file is unix-only.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::MetadataExt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use frontdown::config::{BackupMode, CompareMethod, Config, DecisionPolicy, ErrorBudget, SourceConfig};
use frontdown::job::run_job;
use frontdown::progress::NullProgressSink;

fn hardlink_config(dir: &std::path::Path, backup_root: &std::path::Path) -> Config {
    Config {
        sources: vec![SourceConfig {
            name: "docs".to_string(),
            dir: dir.to_path_buf(),
            exclude_paths: vec![],
        }],
        backup_root_dir: backup_root.to_path_buf(),
        mode: BackupMode::Hardlink,
        versioned: true,
        version_name: "instance".to_string(),
        compare_with_last_backup: true,
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
fn unchanged_files_share_an_inode_with_the_prior_backup() {
    let source = tempfile::TempDir::new().unwrap();
    let backup_root = tempfile::TempDir::new().unwrap();
    fs::write(source.path().join("a.txt"), b"alpha").unwrap();
    fs::write(source.path().join("b.txt"), b"beta").unwrap();

    let config = hardlink_config(source.path(), backup_root.path());
    let mut progress = NullProgressSink;

    let first = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();
    assert!(first.success);
    assert_eq!(first.stats.bytes_copied, 9);

    let second = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();
    assert!(second.success);
    assert_eq!(second.stats.bytes_copied, 0);
    assert_eq!(second.stats.bytes_hardlinked, 9);

    let first_a = backup_root.path().join("instance/docs/a.txt");
    let second_a = backup_root.path().join("instance_2/docs/a.txt");
    assert_eq!(
        fs::metadata(&first_a).unwrap().ino(),
        fs::metadata(&second_a).unwrap().ino()
    );
}

#[test]
fn modified_file_is_copied_while_unchanged_sibling_is_hardlinked() {
    let source = tempfile::TempDir::new().unwrap();
    let backup_root = tempfile::TempDir::new().unwrap();
    fs::write(source.path().join("a.txt"), b"version-one").unwrap();
    fs::write(source.path().join("b.txt"), b"stable").unwrap();

    let config = hardlink_config(source.path(), backup_root.path());
    let mut progress = NullProgressSink;
    run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();

    fs::write(source.path().join("a.txt"), b"version-two-longer").unwrap();
    let second = run_job(&config, Arc::new(AtomicBool::new(false)), &mut progress).unwrap();

    assert!(second.success);
    assert_eq!(second.stats.files_copied, 1);
    assert_eq!(second.stats.files_hardlinked, 1);
    assert_eq!(
        fs::read(backup_root.path().join("instance_2/docs/a.txt")).unwrap(),
        b"version-two-longer"
    );
}
