//! Action and Action Record (`SPEC_FULL.md` §3, §4.5, C5).

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::config::BackupMode;
use crate::path::RelPath;

/// A single step of a backup plan. Every action is idempotent against a
/// clean target tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Stream bytes from `abs_source` to `relpath`.
    Copy {
        /// Path relative to the backup instance.
        relpath: RelPath,
        /// Absolute path to read from.
        abs_source: PathBuf,
        /// Expected size, used to detect a truncated copy.
        size: u64,
        /// Source modification time, preserved on the copy.
        #[serde(with = "system_time_opt")]
        mtime: Option<SystemTime>,
    },
    /// Create a hardlink at `relpath` pointing at `abs_link_target`, a file
    /// in the prior backup.
    Hardlink {
        /// Path relative to the backup instance.
        relpath: RelPath,
        /// Absolute path of the prior-backup file this links to.
        abs_link_target: PathBuf,
        /// Size of the linked file, for statistics.
        size: u64,
    },
    /// Remove a file or empty directory.
    Delete {
        /// Path relative to the backup instance.
        relpath: RelPath,
        /// Whether this is a file or a directory.
        is_dir: bool,
    },
    /// Create a directory that does not exist yet anywhere in the compare tree.
    NewDir {
        /// Path relative to the backup instance.
        relpath: RelPath,
    },
    /// Confirm a directory that should already exist in the compare base.
    ExistingDir {
        /// Path relative to the backup instance.
        relpath: RelPath,
    },
    /// Materialize an empty source directory (`copy_empty_dirs=true`).
    EmptyDir {
        /// Path relative to the backup instance.
        relpath: RelPath,
    },
}

impl Action {
    /// The relative path this action operates on.
    #[must_use]
    pub fn relpath(&self) -> &RelPath {
        match self {
            Self::Copy { relpath, .. }
            | Self::Hardlink { relpath, .. }
            | Self::Delete { relpath, .. }
            | Self::NewDir { relpath }
            | Self::ExistingDir { relpath }
            | Self::EmptyDir { relpath } => relpath,
        }
    }

    /// Whether this action creates a directory level (used by the ordering
    /// invariant check in tests and by the planner when interleaving).
    #[must_use]
    pub fn is_directory_action(&self) -> bool {
        matches!(
            self,
            Self::NewDir { .. } | Self::ExistingDir { .. } | Self::EmptyDir { .. }
        )
    }

    /// Whether this action deletes something.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }
}

mod system_time_opt {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(v: &Option<SystemTime>, s: S) -> Result<S::Ok, S::Error> {
        let secs = v.map(|t| {
            t.duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs()
        });
        secs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SystemTime>, D::Error> {
        let secs: Option<u64> = Option::deserialize(d)?;
        Ok(secs.map(|s| UNIX_EPOCH + Duration::from_secs(s)))
    }
}

/// Per-source metadata carried alongside its actions in the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    /// The source's configured name.
    pub name: String,
    /// Absolute path of the source root at scan time.
    pub source_root: PathBuf,
    /// Absolute path of the compare root, if one was used.
    pub compare_root: Option<PathBuf>,
    /// The actions planned for this source, in application order.
    pub actions: Vec<Action>,
}

/// The durable, serializable form of a backup plan (§4.5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Parent directory of all backup instances.
    pub backup_root: PathBuf,
    /// This run's instance directory, relative to `backup_root`.
    pub instance_dir: PathBuf,
    /// The mode this plan was generated under.
    pub mode: BackupMode,
    /// When the scan that produced this plan started.
    #[serde(with = "system_time_opt")]
    pub created_at: Option<SystemTime>,
    /// One entry per configured source.
    pub sources: Vec<SourceRecord>,
}

impl ActionRecord {
    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (only possible for non-UTF-8
    /// paths on some platforms).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not match the schema.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Write the record to `path` atomically: write to a sibling temp file,
    /// then rename over the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or either filesystem operation fails.
    pub fn save_atomically(&self, path: &Path) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let tmp_path = path.with_extension("json.tmp");
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> ActionRecord {
        ActionRecord {
            backup_root: PathBuf::from("/backups"),
            instance_dir: PathBuf::from("2026-01-01_000000"),
            mode: BackupMode::Save,
            created_at: Some(SystemTime::UNIX_EPOCH),
            sources: vec![SourceRecord {
                name: "docs".to_string(),
                source_root: PathBuf::from("/home/user/docs"),
                compare_root: None,
                actions: vec![
                    Action::NewDir {
                        relpath: RelPath::parse("sub").unwrap(),
                    },
                    Action::Copy {
                        relpath: RelPath::parse("a.txt").unwrap(),
                        abs_source: PathBuf::from("/home/user/docs/a.txt"),
                        size: 3,
                        mtime: Some(SystemTime::UNIX_EPOCH),
                    },
                ],
            }],
        }
    }

    #[test]
    fn round_trips_through_json() {
        let record = sample_record();
        let json = record.to_json().unwrap();
        let parsed = ActionRecord::from_json(&json).unwrap();
        assert_eq!(parsed.sources.len(), 1);
        assert_eq!(parsed.sources[0].actions.len(), 2);
        assert_eq!(parsed.mode, record.mode);
    }

    #[test]
    fn save_atomically_produces_a_readable_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("actions.json");
        sample_record().save_atomically(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(ActionRecord::from_json(&text).is_ok());
        assert!(!dir.path().join("actions.json.tmp").exists());
    }
}
