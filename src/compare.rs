//! Comparator chain (`SPEC_FULL.md` §4.4).
//!
//! Two files are `same` iff every selected comparator agrees; the chain
//! short-circuits on the first disagreement so `bytes`/`hash` are only paid
//! for when cheaper checks already passed.

use std::io::Read;
use std::time::SystemTime;

use sha2::{Digest, Sha256};

use crate::config::CompareMethod;
use crate::path::RelPath;
use crate::scan::Entry;

/// Outcome of comparing a source and compare-side entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Every configured comparator agreed.
    Same,
    /// At least one comparator disagreed (or a read failed mid-comparison).
    Different,
}

/// FAT-era tolerance: two mtimes within this many seconds are treated as equal.
const MODDATE_TOLERANCE_SECS: u64 = 2;

/// An ordered, short-circuiting sequence of comparators.
#[derive(Debug, Clone)]
pub struct ComparatorChain {
    methods: Vec<CompareMethod>,
}

impl ComparatorChain {
    /// Build a chain from the configured comparator list.
    #[must_use]
    pub fn new(methods: Vec<CompareMethod>) -> Self {
        Self { methods }
    }

    /// Whether this chain starts with `moddate`.
    #[must_use]
    pub fn starts_with_moddate(&self) -> bool {
        matches!(self.methods.first(), Some(CompareMethod::Moddate))
    }

    /// Run the chain against two entries, reading bytes lazily only when the
    /// `bytes`/`hash` comparator is reached.
    ///
    /// Returns the verdict plus whether a read failed mid-comparison. Per
    /// §7, a read failure is treated as `different` *and* reported back to
    /// the caller so it can be counted as a `scan_error`.
    pub fn compare(
        &self,
        source: &Entry,
        compare: &Entry,
        read_source: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn Read>>,
        read_compare: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn Read>>,
    ) -> (Verdict, bool) {
        for method in &self.methods {
            let (same, read_failed) = match method {
                CompareMethod::Moddate => (moddate_same(source.mtime, compare.mtime), false),
                CompareMethod::Size => (source.size == compare.size, false),
                CompareMethod::Bytes => {
                    match bytes_same(&source.relpath, read_source, read_compare) {
                        Ok(same) => (same, false),
                        Err(_) => (false, true),
                    }
                }
                CompareMethod::Hash => {
                    match hash_same(&source.relpath, read_source, read_compare) {
                        Ok(same) => (same, false),
                        Err(_) => (false, true),
                    }
                }
            };
            if read_failed {
                return (Verdict::Different, true);
            }
            if !same {
                return (Verdict::Different, false);
            }
        }
        (Verdict::Same, false)
    }
}

fn moddate_same(a: Option<SystemTime>, b: Option<SystemTime>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let (earlier, later) = if a <= b { (a, b) } else { (b, a) };
            later
                .duration_since(earlier)
                .map(|d| d.as_secs() <= MODDATE_TOLERANCE_SECS)
                .unwrap_or(false)
        }
        // A side that can't supply an mtime can't be compared on moddate;
        // configuration validation is expected to have already refused a
        // moddate-first chain against such a view (§4.4), so reaching here
        // with a missing mtime is treated conservatively as "different".
        _ => false,
    }
}

fn bytes_same(
    relpath: &RelPath,
    read_source: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn Read>>,
    read_compare: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn Read>>,
) -> std::io::Result<bool> {
    let mut a = read_source(relpath)?;
    let mut b = read_compare(relpath)?;
    let mut buf_a = [0u8; 8192];
    let mut buf_b = [0u8; 8192];
    loop {
        let n_a = read_fill(&mut a, &mut buf_a)?;
        let n_b = read_fill(&mut b, &mut buf_b)?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

fn read_fill(r: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match r.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

fn hash_same(
    relpath: &RelPath,
    read_source: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn Read>>,
    read_compare: &dyn Fn(&RelPath) -> std::io::Result<Box<dyn Read>>,
) -> std::io::Result<bool> {
    let a = digest_of(read_source(relpath)?.as_mut())?;
    let b = digest_of(read_compare(relpath)?.as_mut())?;
    Ok(a == b)
}

fn digest_of(r: &mut dyn Read) -> std::io::Result<[u8; 32]> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 65536];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}
