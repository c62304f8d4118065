//! Path Set Diff (`SPEC_FULL.md` §4.3, C3).

use frontdown_fs::EntryKind;

use crate::compare::{ComparatorChain, Verdict};
use crate::path::{CaseRule, RelPath};
use crate::scan::Entry;

/// One merged row of the diff: a path present on the source side, the
/// compare side, or both.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// The path both sides are keyed on.
    pub relpath: RelPath,
    /// The source-side entry, if present.
    pub source: Option<Entry>,
    /// The compare-side entry, if present.
    pub compare: Option<Entry>,
    /// Set when both sides are present and are the same kind; `None`
    /// otherwise (a type mismatch is never compared — see below).
    pub verdict: Option<Verdict>,
}

/// Result of a tree diff: the merged rows plus the number of comparisons
/// that could not complete because a read failed (counted as `scan_error`,
/// per §7).
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Merged rows in source/compare merge order.
    pub rows: Vec<DiffEntry>,
    /// Comparator read failures, each already reflected as `Verdict::Different`
    /// in the corresponding row.
    pub scan_errors: u64,
}

/// Merge two scan streams (already sorted by [`CaseRule::compare_paths`])
/// into [`DiffEntry`] rows, running the comparator chain only where both
/// sides agree on kind.
///
/// A path that is a file on one side and a directory on the other is split
/// into two independent rows — a source-only entry of its kind and a
/// compare-only entry of the other kind — per §4.3's type-mismatch rule.
pub fn diff_trees(
    source: &[Entry],
    compare: &[Entry],
    case_rule: CaseRule,
    comparator: &ComparatorChain,
    read_source: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn std::io::Read>>,
    read_compare: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn std::io::Read>>,
) -> DiffResult {
    let mut out = Vec::new();
    let mut scan_errors = 0u64;
    let mut i = 0;
    let mut j = 0;

    while i < source.len() || j < compare.len() {
        let ord = match (source.get(i), compare.get(j)) {
            (Some(s), Some(c)) => case_rule.compare_paths(&s.relpath, &c.relpath),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => unreachable!(),
        };

        match ord {
            std::cmp::Ordering::Less => {
                out.push(DiffEntry {
                    relpath: source[i].relpath.clone(),
                    source: Some(source[i].clone()),
                    compare: None,
                    verdict: None,
                });
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(DiffEntry {
                    relpath: compare[j].relpath.clone(),
                    source: None,
                    compare: Some(compare[j].clone()),
                    verdict: None,
                });
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                let s = &source[i];
                let c = &compare[j];
                if s.kind == c.kind {
                    let verdict = if s.kind == EntryKind::File {
                        let (verdict, read_failed) = comparator.compare(s, c, read_source, read_compare);
                        if read_failed {
                            scan_errors += 1;
                        }
                        Some(verdict)
                    } else {
                        None
                    };
                    out.push(DiffEntry {
                        relpath: s.relpath.clone(),
                        source: Some(s.clone()),
                        compare: Some(c.clone()),
                        verdict,
                    });
                } else {
                    out.push(DiffEntry {
                        relpath: s.relpath.clone(),
                        source: Some(s.clone()),
                        compare: None,
                        verdict: None,
                    });
                    out.push(DiffEntry {
                        relpath: c.relpath.clone(),
                        source: None,
                        compare: Some(c.clone()),
                        verdict: None,
                    });
                }
                i += 1;
                j += 1;
            }
        }
    }

    DiffResult {
        rows: out,
        scan_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareMethod;
    use std::time::UNIX_EPOCH;

    fn file(name: &str, size: u64) -> Entry {
        Entry {
            relpath: RelPath::parse(name).unwrap(),
            kind: EntryKind::File,
            size,
            mtime: Some(UNIX_EPOCH),
            is_empty_dir: false,
        }
    }

    fn dir(name: &str) -> Entry {
        Entry {
            relpath: RelPath::parse(name).unwrap(),
            kind: EntryKind::Directory,
            size: 0,
            mtime: None,
            is_empty_dir: false,
        }
    }

    fn no_read(_: &RelPath) -> std::io::Result<Box<dyn std::io::Read>> {
        Err(std::io::Error::from(std::io::ErrorKind::NotFound))
    }

    #[test]
    fn source_only_and_compare_only_are_separated() {
        let source = vec![file("a.txt", 3)];
        let compare = vec![file("old.txt", 1)];
        let comparator = ComparatorChain::new(vec![CompareMethod::Size]);
        let result = diff_trees(
            &source,
            &compare,
            CaseRule::Sensitive,
            &comparator,
            &no_read,
            &no_read,
        );
        let rows = result.rows;
        assert_eq!(rows.len(), 2);
        assert!(rows[0].source.is_some() && rows[0].compare.is_none());
        assert!(rows[1].source.is_none() && rows[1].compare.is_some());
    }

    #[test]
    fn type_mismatch_splits_into_two_rows() {
        let source = vec![dir("x")];
        let compare = vec![file("x", 5)];
        let comparator = ComparatorChain::new(vec![CompareMethod::Size]);
        let result = diff_trees(
            &source,
            &compare,
            CaseRule::Sensitive,
            &comparator,
            &no_read,
            &no_read,
        );
        let rows = result.rows;
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().any(|r| r.source.is_some() && r.compare.is_none()));
        assert!(rows.iter().any(|r| r.source.is_none() && r.compare.is_some()));
    }

    #[test]
    fn same_size_files_compare_equal() {
        let source = vec![file("a.txt", 3)];
        let compare = vec![file("a.txt", 3)];
        let comparator = ComparatorChain::new(vec![CompareMethod::Size]);
        let result = diff_trees(
            &source,
            &compare,
            CaseRule::Sensitive,
            &comparator,
            &no_read,
            &no_read,
        );
        assert_eq!(result.scan_errors, 0);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].verdict, Some(Verdict::Same));
    }

    #[test]
    fn an_unreadable_file_is_different_and_counted_as_a_scan_error() {
        let source = vec![file("a.txt", 3)];
        let compare = vec![file("a.txt", 3)];
        let comparator = ComparatorChain::new(vec![CompareMethod::Bytes]);
        let result = diff_trees(
            &source,
            &compare,
            CaseRule::Sensitive,
            &comparator,
            &no_read,
            &no_read,
        );
        assert_eq!(result.scan_errors, 1);
        assert_eq!(result.rows[0].verdict, Some(Verdict::Different));
    }
}
