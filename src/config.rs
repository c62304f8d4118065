//! Typed, validated configuration record (`SPEC_FULL.md` §6, A1).
//!
//! Deserialized from TOML (primary) or JSON via `serde`. Every level rejects
//! unknown keys: a typo in a config file is a configuration error, not a
//! silently ignored field.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FrontdownError;

/// Backup mode, selecting the Planner's action matrix (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    /// Copy new/changed files, never delete, never hardlink unchanged ones.
    Save,
    /// Like `Save`, but also deletes compare-only entries.
    Mirror,
    /// Like `Mirror`, but unchanged files become hardlinks to the prior backup.
    Hardlink,
}

impl Default for BackupMode {
    fn default() -> Self {
        Self::Save
    }
}

/// One comparator in the comparator chain (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMethod {
    /// Modification time, whole-second truncated, 2-second tolerance.
    Moddate,
    /// Byte length.
    Size,
    /// Full byte-for-byte stream comparison.
    Bytes,
    /// SHA-256 digest comparison.
    Hash,
}

/// Policy for a decision point routed through the decision callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionPolicy {
    /// Continue without asking.
    Proceed,
    /// Delegate to the decision callback.
    Prompt,
    /// Fail fast.
    Abort,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::Prompt
    }
}

/// One configured source tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Unique name within the job; becomes the backup subfolder name.
    pub name: String,
    /// Root directory to back up.
    pub dir: PathBuf,
    /// Glob exclusion patterns, relative to `dir`.
    #[serde(default, rename = "exclude-paths")]
    pub exclude_paths: Vec<String>,
}

/// A budget that can be disabled with `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBudget {
    /// No limit.
    Unlimited,
    /// At most this many errors are tolerated.
    Limited(u64),
}

impl ErrorBudget {
    /// Whether `count` errors exceeds this budget.
    #[must_use]
    pub fn is_exceeded(self, count: u64) -> bool {
        match self {
            Self::Unlimited => false,
            Self::Limited(max) => count > max,
        }
    }
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self::Unlimited
    }
}

impl Serialize for ErrorBudget {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unlimited => serializer.serialize_i64(-1),
            Self::Limited(n) => serializer.serialize_i64(i64::try_from(*n).unwrap_or(i64::MAX)),
        }
    }
}

impl<'de> Deserialize<'de> for ErrorBudget {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            Ok(Self::Unlimited)
        } else {
            Ok(Self::Limited(raw as u64))
        }
    }
}

/// The top-level configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Source trees to back up.
    pub sources: Vec<SourceConfig>,
    /// Parent directory of all backup instances.
    pub backup_root_dir: PathBuf,
    /// Planner matrix selection.
    #[serde(default)]
    pub mode: BackupMode,
    /// Whether each run gets its own timestamped subdirectory.
    #[serde(default)]
    pub versioned: bool,
    /// `chrono` strftime pattern for the instance directory name.
    #[serde(default = "default_version_name")]
    pub version_name: String,
    /// Use the latest prior instance as the compare side.
    #[serde(default)]
    pub compare_with_last_backup: bool,
    /// Whether empty source directories are materialized.
    #[serde(default)]
    pub copy_empty_dirs: bool,
    /// Persist the action record before executing.
    #[serde(default = "default_true")]
    pub save_actionfile: bool,
    /// Log the action record's path after it is written (non-interactive stub).
    #[serde(default)]
    pub open_actionfile: bool,
    /// Run the executor immediately after planning.
    #[serde(default = "default_true")]
    pub apply_actions: bool,
    /// Ordered comparator chain.
    #[serde(default = "default_compare_method")]
    pub compare_method: Vec<CompareMethod>,
    /// Render a human-readable action report (external collaborator; not built here).
    #[serde(default)]
    pub save_actionhtml: bool,
    /// Open the rendered report after writing it (external collaborator stub).
    #[serde(default)]
    pub open_actionhtml: bool,
    /// Action types to omit from the rendered report.
    #[serde(default)]
    pub exclude_actionhtml_actions: Vec<String>,
    /// Scan-error budget; `-1` disables it.
    #[serde(default)]
    pub max_scanning_errors: ErrorBudget,
    /// Backup-action-error budget; `-1` disables it.
    #[serde(default)]
    pub max_backup_errors: ErrorBudget,
    /// Policy when the backup target is low on space.
    #[serde(default)]
    pub target_drive_full_action: DecisionPolicy,
    /// Policy when a configured source is unreachable.
    #[serde(default)]
    pub source_unavailable_action: DecisionPolicy,
    /// `tracing_subscriber::EnvFilter` directive; overridden by `-v`/`-q`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_version_name() -> String {
    "%Y-%m-%d_%H%M%S".to_string()
}

fn default_true() -> bool {
    true
}

fn default_compare_method() -> Vec<CompareMethod> {
    vec![CompareMethod::Moddate, CompareMethod::Size]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Parse a configuration record from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`FrontdownError::Configuration`] if the document is malformed
    /// or fails [`Config::validate`].
    pub fn from_toml_str(s: &str) -> Result<Self, FrontdownError> {
        let config: Self =
            toml::from_str(s).map_err(|e| FrontdownError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration record from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`FrontdownError::Configuration`] if the document is malformed
    /// or fails [`Config::validate`].
    pub fn from_json_str(s: &str) -> Result<Self, FrontdownError> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| FrontdownError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration record from a file, dispatching on extension
    /// (`.json` → JSON, anything else → TOML).
    ///
    /// # Errors
    ///
    /// Returns [`FrontdownError::Configuration`] if the file cannot be read
    /// or fails to parse/validate.
    pub fn load(path: &std::path::Path) -> Result<Self, FrontdownError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FrontdownError::Configuration(format!("{}: {e}", path.display())))?;
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Enforce cross-field rules not expressible in the type alone.
    ///
    /// # Errors
    ///
    /// Returns [`FrontdownError::Configuration`] describing the first
    /// violated rule.
    pub fn validate(&self) -> Result<(), FrontdownError> {
        if self.sources.is_empty() {
            return Err(FrontdownError::Configuration(
                "at least one source is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.name.is_empty() {
                return Err(FrontdownError::Configuration(
                    "source name must not be empty".to_string(),
                ));
            }
            if !seen.insert(source.name.as_str()) {
                return Err(FrontdownError::Configuration(format!(
                    "duplicate source name {:?}",
                    source.name
                )));
            }
        }

        if self.mode == BackupMode::Hardlink {
            if !self.versioned {
                return Err(FrontdownError::Configuration(
                    "mode = hardlink requires versioned = true".to_string(),
                ));
            }
            if !self.compare_with_last_backup {
                return Err(FrontdownError::Configuration(
                    "mode = hardlink requires compare_with_last_backup = true".to_string(),
                ));
            }
        }

        if self.compare_method.is_empty() {
            return Err(FrontdownError::Configuration(
                "compare_method must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the configured comparator chain starts with `moddate`, forcing
    /// a requirement that the compare-side view support mtime.
    #[must_use]
    pub fn starts_with_moddate(&self) -> bool {
        matches!(self.compare_method.first(), Some(CompareMethod::Moddate))
    }

    /// Validate the comparator chain against a view's mtime capability.
    ///
    /// # Errors
    ///
    /// Returns [`FrontdownError::Configuration`] if the chain starts with
    /// `moddate` but `supports_mtime` is `false`.
    pub fn validate_against_view_capability(
        &self,
        supports_mtime: bool,
    ) -> Result<(), FrontdownError> {
        if self.starts_with_moddate() && !supports_mtime {
            return Err(FrontdownError::Configuration(
                "compare_method starts with moddate but the compare view cannot report mtime"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            backup_root_dir = "/backups"

            [[sources]]
            name = "docs"
            dir = "/home/user/docs"
        "#
    }

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config = Config::from_toml_str(minimal_toml()).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.mode, BackupMode::Save);
        assert!(!config.versioned);
        assert_eq!(config.compare_method, default_compare_method());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let toml = format!("{}\nbogus_field = true\n", minimal_toml());
        assert!(Config::from_toml_str(&toml).is_err());
    }

    #[test]
    fn duplicate_source_names_are_rejected() {
        let toml = r#"
            backup_root_dir = "/backups"

            [[sources]]
            name = "docs"
            dir = "/a"

            [[sources]]
            name = "docs"
            dir = "/b"
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn hardlink_mode_requires_versioned_and_compare_with_last_backup() {
        let toml = r#"
            backup_root_dir = "/backups"
            mode = "hardlink"

            [[sources]]
            name = "docs"
            dir = "/a"
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn error_budget_minus_one_disables_it() {
        assert_eq!(ErrorBudget::Unlimited.is_exceeded(1_000_000), false);
        assert!(ErrorBudget::Limited(1).is_exceeded(2));
        assert!(!ErrorBudget::Limited(2).is_exceeded(2));
    }

    #[test]
    fn moddate_chain_rejected_without_mtime_support() {
        let config = Config::from_toml_str(minimal_toml()).unwrap();
        assert!(config.starts_with_moddate());
        assert!(config.validate_against_view_capability(false).is_err());
        assert!(config.validate_against_view_capability(true).is_ok());
    }
}
