//! In-memory filesystem view used by tests to exercise behavior a real
//! filesystem makes hard to trigger on demand: transient scan errors,
//! cross-device hardlink failures, and views that cannot supply `mtime`.

use crate::entry::{EntryKind, ListedEntry, Stat};
use crate::error::{Result, ViewError};
use crate::FilesystemView;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

#[derive(Debug, Clone)]
struct FileNode {
    data: Vec<u8>,
    mtime: SystemTime,
}

#[derive(Debug, Default)]
struct Inner {
    files: BTreeMap<PathBuf, FileNode>,
    dirs: BTreeSet<PathBuf>,
    fail_list: HashSet<PathBuf>,
    fail_hardlink_cross_device: HashSet<PathBuf>,
    supports_mtime: bool,
    supports_hardlinks: bool,
}

/// An in-memory tree implementing [`FilesystemView`].
///
/// Cloning shares the underlying tree (it's an `Arc<Mutex<..>>` handle), so
/// a test can build the tree through one handle and inspect it through
/// another after the code under test has run.
#[derive(Debug, Clone)]
pub struct MockFilesystemView {
    inner: Arc<Mutex<Inner>>,
}

impl Default for MockFilesystemView {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFilesystemView {
    /// An empty view with just the root directory.
    #[must_use]
    pub fn new() -> Self {
        let mut dirs = BTreeSet::new();
        dirs.insert(PathBuf::new());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                files: BTreeMap::new(),
                dirs,
                fail_list: HashSet::new(),
                fail_hardlink_cross_device: HashSet::new(),
                supports_mtime: true,
                supports_hardlinks: true,
            })),
        }
    }

    /// Insert a file with the given contents and modification time, creating
    /// any ancestor directories that don't exist yet.
    pub fn put_file(&self, relpath: impl AsRef<Path>, data: impl Into<Vec<u8>>, mtime: SystemTime) {
        let relpath = normalize(relpath.as_ref());
        let mut inner = self.inner.lock().expect("mock fs lock poisoned");
        ensure_ancestors(&mut inner.dirs, &relpath);
        inner.files.insert(
            relpath,
            FileNode {
                data: data.into(),
                mtime,
            },
        );
    }

    /// Insert an (possibly empty) directory, creating any ancestor
    /// directories that don't exist yet.
    pub fn put_dir(&self, relpath: impl AsRef<Path>) {
        let relpath = normalize(relpath.as_ref());
        let mut inner = self.inner.lock().expect("mock fs lock poisoned");
        inner.dirs.insert(relpath.clone());
        ensure_ancestors(&mut inner.dirs, &relpath);
    }

    /// Make `list()` on `relpath` fail with [`ViewError::Transient`] once
    /// configured, simulating a permission error or flaky remote link.
    pub fn fail_listing(&self, relpath: impl AsRef<Path>) {
        let relpath = normalize(relpath.as_ref());
        self.inner
            .lock()
            .expect("mock fs lock poisoned")
            .fail_list
            .insert(relpath);
    }

    /// Make `hardlink()` targeting `new_relpath` fail with
    /// [`ViewError::CrossDevice`], simulating a backup root on a different
    /// volume from the prior-backup source.
    pub fn fail_hardlink_cross_device(&self, new_relpath: impl AsRef<Path>) {
        let relpath = normalize(new_relpath.as_ref());
        self.inner
            .lock()
            .expect("mock fs lock poisoned")
            .fail_hardlink_cross_device
            .insert(relpath);
    }

    /// Configure whether this view claims to support `mtime` (§4.1/§9:
    /// some remote adapters can't provide one).
    pub fn set_supports_mtime(&self, supports: bool) {
        self.inner.lock().expect("mock fs lock poisoned").supports_mtime = supports;
    }

    /// Configure whether this view claims to support hardlinks at all.
    pub fn set_supports_hardlinks(&self, supports: bool) {
        self.inner.lock().expect("mock fs lock poisoned").supports_hardlinks = supports;
    }

    /// Read back the bytes stored at `relpath`, for assertions in tests.
    #[must_use]
    pub fn file_contents(&self, relpath: impl AsRef<Path>) -> Option<Vec<u8>> {
        let relpath = normalize(relpath.as_ref());
        self.inner
            .lock()
            .expect("mock fs lock poisoned")
            .files
            .get(&relpath)
            .map(|n| n.data.clone())
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

fn ensure_ancestors(dirs: &mut BTreeSet<PathBuf>, relpath: &Path) {
    let mut cur = PathBuf::new();
    for comp in relpath.components() {
        if dirs.contains(&cur) || cur.as_os_str().is_empty() {
            dirs.insert(cur.clone());
        }
        cur.push(comp);
    }
    dirs.insert(PathBuf::new());
}

struct MockWriter {
    path: PathBuf,
    buf: Vec<u8>,
    inner: Arc<Mutex<Inner>>,
}

impl Write for MockWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MockWriter {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().expect("mock fs lock poisoned");
        ensure_ancestors(&mut inner.dirs, &self.path);
        inner.files.insert(
            self.path.clone(),
            FileNode {
                data: std::mem::take(&mut self.buf),
                mtime: SystemTime::now(),
            },
        );
    }
}

impl FilesystemView for MockFilesystemView {
    fn list(&self, dir_relpath: &Path) -> Result<Vec<ListedEntry>> {
        let dir_relpath = normalize(dir_relpath);
        let inner = self.inner.lock().expect("mock fs lock poisoned");

        if inner.fail_list.contains(&dir_relpath) {
            return Err(ViewError::Transient(
                dir_relpath.clone(),
                "simulated listing failure".to_string(),
            ));
        }
        if !inner.dirs.contains(&dir_relpath) {
            return Err(ViewError::NotFound(dir_relpath));
        }

        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for path in inner.dirs.iter().chain(inner.files.keys()) {
            if path.parent() == Some(dir_relpath.as_path()) && !seen.contains(path) {
                seen.insert(path.clone());
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if let Some(file) = inner.files.get(path) {
                    out.push(ListedEntry {
                        name,
                        kind: EntryKind::File,
                        size: file.data.len() as u64,
                        mtime: inner.supports_mtime.then_some(file.mtime),
                    });
                } else {
                    out.push(ListedEntry {
                        name,
                        kind: EntryKind::Directory,
                        size: 0,
                        mtime: None,
                    });
                }
            }
        }
        Ok(out)
    }

    fn open_read(&self, relpath: &Path) -> Result<Box<dyn Read>> {
        let relpath = normalize(relpath);
        let inner = self.inner.lock().expect("mock fs lock poisoned");
        let file = inner
            .files
            .get(&relpath)
            .ok_or_else(|| ViewError::NotFound(relpath.clone()))?;
        Ok(Box::new(std::io::Cursor::new(file.data.clone())))
    }

    fn open_write(&self, relpath: &Path) -> Result<Box<dyn Write>> {
        Ok(Box::new(MockWriter {
            path: normalize(relpath),
            buf: Vec::new(),
            inner: Arc::clone(&self.inner),
        }))
    }

    fn stat(&self, relpath: &Path) -> Result<Stat> {
        let relpath = normalize(relpath);
        let inner = self.inner.lock().expect("mock fs lock poisoned");
        if let Some(file) = inner.files.get(&relpath) {
            return Ok(Stat {
                kind: EntryKind::File,
                size: file.data.len() as u64,
                mtime: inner.supports_mtime.then_some(file.mtime),
                dev_ino: None,
            });
        }
        if inner.dirs.contains(&relpath) {
            return Ok(Stat {
                kind: EntryKind::Directory,
                size: 0,
                mtime: None,
                dev_ino: None,
            });
        }
        Err(ViewError::NotFound(relpath))
    }

    fn mkdir(&self, relpath: &Path) -> Result<()> {
        let relpath = normalize(relpath);
        let mut inner = self.inner.lock().expect("mock fs lock poisoned");
        if inner.dirs.contains(&relpath) {
            return Err(ViewError::Io(
                relpath,
                std::io::Error::from(std::io::ErrorKind::AlreadyExists),
            ));
        }
        inner.dirs.insert(relpath);
        Ok(())
    }

    fn hardlink(&self, target_abs: &Path, new_relpath: &Path) -> Result<()> {
        let new_relpath = normalize(new_relpath);
        let mut inner = self.inner.lock().expect("mock fs lock poisoned");
        if !inner.supports_hardlinks {
            return Err(ViewError::Unsupported);
        }
        if inner.fail_hardlink_cross_device.contains(&new_relpath) {
            return Err(ViewError::CrossDevice(target_abs.to_path_buf(), new_relpath));
        }
        // The mock has no real "other view" to read target_abs from; tests
        // that exercise successful hardlinks pre-seed the destination tree
        // via put_file with the same content instead of relying on this path.
        let data = std::fs::read(target_abs)
            .map_err(|e| ViewError::from_io(target_abs.to_path_buf(), e))?;
        ensure_ancestors(&mut inner.dirs, &new_relpath);
        inner.files.insert(
            new_relpath,
            FileNode {
                data,
                mtime: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn delete(&self, relpath: &Path, kind: EntryKind) -> Result<()> {
        let relpath = normalize(relpath);
        let mut inner = self.inner.lock().expect("mock fs lock poisoned");
        match kind {
            EntryKind::File => {
                inner
                    .files
                    .remove(&relpath)
                    .ok_or_else(|| ViewError::NotFound(relpath.clone()))?;
            }
            EntryKind::Directory => {
                let has_children = inner
                    .dirs
                    .iter()
                    .chain(inner.files.keys())
                    .any(|p| p.parent() == Some(relpath.as_path()));
                if has_children {
                    return Err(ViewError::Io(
                        relpath,
                        std::io::Error::other("directory not empty"),
                    ));
                }
                inner
                    .dirs
                    .remove(&relpath)
                    .then_some(())
                    .ok_or_else(|| ViewError::NotFound(relpath.clone()))?;
            }
        }
        Ok(())
    }

    fn free_space(&self) -> Result<u64> {
        Ok(u64::MAX)
    }

    fn to_absolute(&self, relpath: &Path) -> PathBuf {
        Path::new("/mock").join(relpath)
    }

    fn supports_mtime(&self) -> bool {
        self.inner.lock().expect("mock fs lock poisoned").supports_mtime
    }

    fn supports_hardlinks(&self) -> bool {
        self.inner
            .lock()
            .expect("mock fs lock poisoned")
            .supports_hardlinks
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_root_returns_direct_children_only() {
        let fs = MockFilesystemView::new();
        fs.put_file("a.txt", b"x".to_vec(), SystemTime::now());
        fs.put_dir("sub");
        fs.put_file("sub/b.txt", b"yy".to_vec(), SystemTime::now());

        let mut root_entries = fs.list(Path::new("")).unwrap();
        root_entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(root_entries.len(), 2);
        assert_eq!(root_entries[0].name, "a.txt");
        assert_eq!(root_entries[1].name, "sub");

        let sub_entries = fs.list(Path::new("sub")).unwrap();
        assert_eq!(sub_entries.len(), 1);
        assert_eq!(sub_entries[0].name, "b.txt");
        assert_eq!(sub_entries[0].size, 2);
    }

    #[test]
    fn fail_listing_returns_transient_error() {
        let fs = MockFilesystemView::new();
        fs.put_dir("bad");
        fs.fail_listing("bad");
        let err = fs.list(Path::new("bad")).unwrap_err();
        assert!(matches!(err, ViewError::Transient(..)));
    }

    #[test]
    fn write_then_read_round_trips() {
        let fs = MockFilesystemView::new();
        {
            let mut w = fs.open_write(Path::new("out.txt")).unwrap();
            w.write_all(b"hello").unwrap();
        }
        let mut r = fs.open_read(Path::new("out.txt")).unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }

    #[test]
    fn supports_mtime_can_be_disabled() {
        let fs = MockFilesystemView::new();
        fs.set_supports_mtime(false);
        assert!(!fs.supports_mtime());
    }
}
