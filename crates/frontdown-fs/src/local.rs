//! Local POSIX/Windows filesystem view.

use crate::entry::{EntryKind, ListedEntry, Stat};
use crate::error::{Result, ViewError};
use crate::FilesystemView;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Windows paths at or beyond this length need the extended-length `\\?\`
/// prefix to avoid `MAX_PATH` truncation; see `SPEC_FULL.md` §4.1.
const WINDOWS_LONG_PATH_THRESHOLD: usize = 260;

/// A filesystem view rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalFilesystemView {
    root: PathBuf,
}

impl LocalFilesystemView {
    /// Create a view rooted at `root`. The root is not required to exist yet.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory this view is anchored at.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn join(&self, relpath: &Path) -> PathBuf {
        let abs = self.root.join(relpath);
        extend_long_path(&abs)
    }

    fn entry_kind_and_reparse(meta: &fs::Metadata) -> (EntryKind, bool) {
        if meta.file_type().is_symlink() {
            // A symlink/junction standing in for a directory is never
            // followed; it is surfaced as an empty directory by the scanner.
            (EntryKind::Directory, true)
        } else if meta.is_dir() {
            (EntryKind::Directory, false)
        } else {
            (EntryKind::File, false)
        }
    }
}

/// Rewrite a path to the Windows extended-length form when it is long enough
/// to risk `MAX_PATH` truncation. A no-op on every other platform and on
/// paths already short enough.
#[cfg(windows)]
fn extend_long_path(path: &Path) -> PathBuf {
    let as_str = path.to_string_lossy();
    if as_str.len() < WINDOWS_LONG_PATH_THRESHOLD || as_str.starts_with(r"\\?\") {
        path.to_path_buf()
    } else {
        PathBuf::from(format!(r"\\?\{as_str}"))
    }
}

#[cfg(not(windows))]
fn extend_long_path(path: &Path) -> PathBuf {
    let _ = WINDOWS_LONG_PATH_THRESHOLD;
    path.to_path_buf()
}

impl FilesystemView for LocalFilesystemView {
    fn list(&self, dir_relpath: &Path) -> Result<Vec<ListedEntry>> {
        let abs = self.join(dir_relpath);
        let read_dir = fs::read_dir(&abs).map_err(|e| ViewError::from_io(abs.clone(), e))?;

        let mut out = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| ViewError::from_io(abs.clone(), e))?;
            let meta = entry
                .metadata()
                .map_err(|e| ViewError::from_io(entry.path(), e))?;
            let (kind, is_reparse) = Self::entry_kind_and_reparse(&meta);
            if is_reparse {
                tracing::warn!(
                    path = %entry.path().display(),
                    "directory junction / symlink not followed, treated as empty directory"
                );
            }
            let size = if matches!(kind, EntryKind::File) {
                meta.len()
            } else {
                0
            };
            let mtime = meta.modified().ok();
            out.push(ListedEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind,
                size,
                mtime,
            });
        }
        Ok(out)
    }

    fn open_read(&self, relpath: &Path) -> Result<Box<dyn Read>> {
        let abs = self.join(relpath);
        let file = fs::File::open(&abs).map_err(|e| ViewError::from_io(abs, e))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, relpath: &Path) -> Result<Box<dyn Write>> {
        let abs = self.join(relpath);
        let file = fs::File::create(&abs).map_err(|e| ViewError::from_io(abs, e))?;
        Ok(Box::new(file))
    }

    fn stat(&self, relpath: &Path) -> Result<Stat> {
        let abs = self.join(relpath);
        let meta = fs::symlink_metadata(&abs).map_err(|e| ViewError::from_io(abs.clone(), e))?;
        let (kind, _) = Self::entry_kind_and_reparse(&meta);
        let size = if matches!(kind, EntryKind::File) {
            meta.len()
        } else {
            0
        };
        Ok(Stat {
            kind,
            size,
            mtime: meta.modified().ok(),
            dev_ino: dev_ino(&meta),
        })
    }

    fn mkdir(&self, relpath: &Path) -> Result<()> {
        let abs = self.join(relpath);
        fs::create_dir(&abs).map_err(|e| ViewError::from_io(abs, e))
    }

    fn hardlink(&self, target_abs: &Path, new_relpath: &Path) -> Result<()> {
        let new_abs = self.join(new_relpath);
        fs::hard_link(target_abs, &new_abs).map_err(|e| classify_hardlink_error(target_abs, &new_abs, e))
    }

    fn delete(&self, relpath: &Path, kind: EntryKind) -> Result<()> {
        let abs = self.join(relpath);
        match kind {
            EntryKind::File => fs::remove_file(&abs).map_err(|e| ViewError::from_io(abs, e)),
            EntryKind::Directory => fs::remove_dir(&abs).map_err(|e| ViewError::from_io(abs, e)),
        }
    }

    fn free_space(&self) -> Result<u64> {
        free_space_at(&self.root).map_err(|e| ViewError::from_io(self.root.clone(), e))
    }

    fn to_absolute(&self, relpath: &Path) -> PathBuf {
        self.root.join(relpath)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(unix)]
fn dev_ino(meta: &fs::Metadata) -> Option<(u64, u64)> {
    use std::os::unix::fs::MetadataExt;
    Some((meta.dev(), meta.ino()))
}

#[cfg(not(unix))]
fn dev_ino(_meta: &fs::Metadata) -> Option<(u64, u64)> {
    None
}

#[cfg(unix)]
fn classify_hardlink_error(target: &Path, new_path: &Path, err: std::io::Error) -> ViewError {
    if err.raw_os_error() == Some(libc::EXDEV) {
        ViewError::CrossDevice(target.to_path_buf(), new_path.to_path_buf())
    } else if err.kind() == std::io::ErrorKind::Unsupported {
        ViewError::Unsupported
    } else {
        ViewError::from_io(new_path.to_path_buf(), err)
    }
}

#[cfg(not(unix))]
fn classify_hardlink_error(target: &Path, new_path: &Path, err: std::io::Error) -> ViewError {
    // ERROR_NOT_SAME_DEVICE (17) on Windows.
    if err.raw_os_error() == Some(17) {
        ViewError::CrossDevice(target.to_path_buf(), new_path.to_path_buf())
    } else {
        ViewError::from_io(new_path.to_path_buf(), err)
    }
}

#[cfg(unix)]
fn free_space_at(path: &Path) -> std::io::Result<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: `c_path` is a valid NUL-terminated string and `stat` is a
    // properly sized, zeroed out-parameter for the call.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

#[cfg(not(unix))]
fn free_space_at(_path: &Path) -> std::io::Result<u64> {
    // Conservative stand-in until a Windows `GetDiskFreeSpaceExW` binding is wired up.
    Ok(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn list_sorts_nothing_itself_but_reports_all_entries() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), b"hi").unwrap();
        fs::create_dir(dir.path().join("a_dir")).unwrap();

        let view = LocalFilesystemView::new(dir.path());
        let mut entries = view.list(Path::new("")).unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a_dir");
        assert!(matches!(entries[0].kind, EntryKind::Directory));
        assert_eq!(entries[1].name, "b.txt");
        assert_eq!(entries[1].size, 2);
    }

    #[test]
    fn open_write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let view = LocalFilesystemView::new(dir.path());
        {
            let mut w = view.open_write(Path::new("file.txt")).unwrap();
            w.write_all(b"payload").unwrap();
        }
        let mut r = view.open_read(Path::new("file.txt")).unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"payload");
    }

    #[test]
    fn mkdir_and_stat_directory() {
        let dir = TempDir::new().unwrap();
        let view = LocalFilesystemView::new(dir.path());
        view.mkdir(Path::new("sub")).unwrap();
        let stat = view.stat(Path::new("sub")).unwrap();
        assert!(matches!(stat.kind, EntryKind::Directory));
    }

    #[test]
    fn hardlink_shares_inode() {
        let dir = TempDir::new().unwrap();
        let view = LocalFilesystemView::new(dir.path());
        fs::write(dir.path().join("orig.txt"), b"data").unwrap();

        view.hardlink(&dir.path().join("orig.txt"), Path::new("linked.txt"))
            .unwrap();

        let orig_stat = view.stat(Path::new("orig.txt")).unwrap();
        let linked_stat = view.stat(Path::new("linked.txt")).unwrap();
        assert_eq!(orig_stat.dev_ino, linked_stat.dev_ino);
    }

    #[test]
    fn delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let view = LocalFilesystemView::new(dir.path());
        fs::write(dir.path().join("gone.txt"), b"x").unwrap();
        view.delete(Path::new("gone.txt"), EntryKind::File).unwrap();
        assert!(!dir.path().join("gone.txt").exists());
    }

    #[test]
    fn free_space_is_nonzero_on_a_real_filesystem() {
        let dir = TempDir::new().unwrap();
        let view = LocalFilesystemView::new(dir.path());
        assert!(view.free_space().unwrap() > 0);
    }
}
