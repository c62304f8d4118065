//! Tree Scanner (`SPEC_FULL.md` §4.2, C2).

use std::time::SystemTime;

use frontdown_fs::{EntryKind, FilesystemView};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::config::ErrorBudget;
use crate::path::{CaseRule, RelPath};

/// One enumerated item in a tree, produced by the scanner and otherwise
/// immutable (`SPEC_FULL.md` §3).
#[derive(Debug, Clone)]
pub struct Entry {
    /// Path relative to the scanned root.
    pub relpath: RelPath,
    /// File or directory.
    pub kind: EntryKind,
    /// Size in bytes; always `0` for directories.
    pub size: u64,
    /// Last modification time, if the view could supply one.
    pub mtime: Option<SystemTime>,
    /// Set for a directory with no surviving entries after exclusion.
    pub is_empty_dir: bool,
}

/// The result of scanning one tree: an ordered sequence of entries plus the
/// count of subtrees skipped due to a listing failure.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Entries in canonical pre-order (directories before their contents,
    /// children sorted by name under the platform's case rule).
    pub entries: Vec<Entry>,
    /// Number of subtrees skipped because `list` failed.
    pub scan_errors: u64,
}

/// Compiles a source's raw exclude-pattern strings into a matcher.
///
/// A pattern ending in `/` only matches directories; any other pattern
/// matches files and directories alike (per §4.2's "excludes both" rule for
/// a relpath that is a file on one side and a directory on the other).
pub struct ExcludeSet {
    dir_only: GlobSet,
    any: GlobSet,
}

impl ExcludeSet {
    /// Compile a list of glob patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any pattern is not a valid glob.
    pub fn compile(patterns: &[String], case_rule: CaseRule) -> Result<Self, globset::Error> {
        let mut dir_only = GlobSetBuilder::new();
        let mut any = GlobSetBuilder::new();
        for pattern in patterns {
            let case_insensitive = matches!(case_rule, CaseRule::Insensitive);
            if let Some(stripped) = pattern.strip_suffix('/') {
                let glob = GlobBuilder::new(stripped)
                    .case_insensitive(case_insensitive)
                    .build()?;
                dir_only.add(glob);
            } else {
                let glob = GlobBuilder::new(pattern)
                    .case_insensitive(case_insensitive)
                    .build()?;
                any.add(glob);
            }
        }
        Ok(Self {
            dir_only: dir_only.build()?,
            any: any.build()?,
        })
    }

    /// An empty exclude set that matches nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dir_only: GlobSet::empty(),
            any: GlobSet::empty(),
        }
    }

    /// Whether `relpath` (of the given kind) should be excluded.
    #[must_use]
    pub fn matches(&self, relpath: &RelPath, kind: EntryKind) -> bool {
        let as_str = relpath.as_str();
        if self.any.is_match(&as_str) {
            return true;
        }
        matches!(kind, EntryKind::Directory) && self.dir_only.is_match(&as_str)
    }
}

/// Walk `view` starting at `root`, applying `excludes`, and return the
/// ordered scan result.
///
/// Stops early (before exceeding the configured budget) only in the sense
/// that it keeps counting `scan_errors`; callers compare the final count
/// against [`ErrorBudget::is_exceeded`] once the walk completes, matching the
/// "siblings continue" policy of §4.2.
pub fn scan_tree(
    view: &dyn FilesystemView,
    excludes: &ExcludeSet,
    case_rule: CaseRule,
    max_scanning_errors: ErrorBudget,
) -> ScanResult {
    let mut result = ScanResult::default();
    walk(
        view,
        excludes,
        case_rule,
        &RelPath::root(),
        &mut result,
        max_scanning_errors,
    );
    result
}

fn walk(
    view: &dyn FilesystemView,
    excludes: &ExcludeSet,
    case_rule: CaseRule,
    dir: &RelPath,
    result: &mut ScanResult,
    max_scanning_errors: ErrorBudget,
) {
    if max_scanning_errors.is_exceeded(result.scan_errors) {
        return;
    }

    let listed = match view.list(&dir.to_path_buf()) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!(path = %dir, %err, "failed to list directory, subtree skipped");
            result.scan_errors += 1;
            return;
        }
    };

    let mut children: Vec<_> = listed
        .into_iter()
        .map(|listed| (dir.join(&listed.name), listed))
        .filter(|(relpath, listed)| !excludes.matches(relpath, listed.kind))
        .collect();
    children.sort_by(|(a, _), (b, _)| case_rule.compare_paths(a, b));

    let surviving_count = children.len();
    for (relpath, listed) in children {
        match listed.kind {
            EntryKind::Directory => {
                let before = result.entries.len();
                result.entries.push(Entry {
                    relpath: relpath.clone(),
                    kind: EntryKind::Directory,
                    size: 0,
                    mtime: listed.mtime,
                    is_empty_dir: false,
                });
                let dir_index = before;
                walk(view, excludes, case_rule, &relpath, result, max_scanning_errors);
                let had_children = result.entries.len() > dir_index + 1;
                result.entries[dir_index].is_empty_dir = !had_children;
            }
            EntryKind::File => {
                result.entries.push(Entry {
                    relpath,
                    kind: EntryKind::File,
                    size: listed.size,
                    mtime: listed.mtime,
                    is_empty_dir: false,
                });
            }
        }
    }

    if surviving_count == 0 && !dir.as_str().is_empty() {
        if let Some(last) = result
            .entries
            .iter_mut()
            .rev()
            .find(|e| &e.relpath == dir)
        {
            last.is_empty_dir = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontdown_fs::MockFilesystemView;
    use std::time::UNIX_EPOCH;

    fn view_with_tree() -> MockFilesystemView {
        let view = MockFilesystemView::new();
        view.put_file("a.txt", b"foo".to_vec(), UNIX_EPOCH);
        view.put_dir("sub");
        view.put_file("sub/b.txt", b"bar".to_vec(), UNIX_EPOCH);
        view.put_dir("skip");
        view.put_file("skip/y", b"z".to_vec(), UNIX_EPOCH);
        view
    }

    #[test]
    fn scan_orders_directories_before_their_contents() {
        let view = view_with_tree();
        let excludes = ExcludeSet::empty();
        let result = scan_tree(&view, &excludes, CaseRule::Sensitive, ErrorBudget::Unlimited);
        let names: Vec<_> = result.entries.iter().map(|e| e.relpath.as_str()).collect();
        let sub_pos = names.iter().position(|n| n == "sub").unwrap();
        let sub_b_pos = names.iter().position(|n| n == "sub/b.txt").unwrap();
        assert!(sub_pos < sub_b_pos);
    }

    #[test]
    fn excluded_subtree_is_skipped_entirely() {
        let view = view_with_tree();
        let excludes = ExcludeSet::compile(&["skip/".to_string()], CaseRule::Sensitive).unwrap();
        let result = scan_tree(&view, &excludes, CaseRule::Sensitive, ErrorBudget::Unlimited);
        assert!(result.entries.iter().all(|e| !e.relpath.as_str().starts_with("skip")));
    }

    #[test]
    fn empty_directory_after_exclusion_is_marked() {
        let view = view_with_tree();
        let excludes = ExcludeSet::compile(&["skip/y".to_string()], CaseRule::Sensitive).unwrap();
        let result = scan_tree(&view, &excludes, CaseRule::Sensitive, ErrorBudget::Unlimited);
        let skip = result
            .entries
            .iter()
            .find(|e| e.relpath.as_str() == "skip")
            .unwrap();
        assert!(skip.is_empty_dir);
    }

    #[test]
    fn listing_failure_counts_a_scan_error_and_skips_the_subtree() {
        let view = view_with_tree();
        view.fail_listing("sub");
        let excludes = ExcludeSet::empty();
        let result = scan_tree(&view, &excludes, CaseRule::Sensitive, ErrorBudget::Unlimited);
        assert_eq!(result.scan_errors, 1);
        assert!(result
            .entries
            .iter()
            .all(|e| e.relpath.as_str() != "sub/b.txt"));
    }
}
