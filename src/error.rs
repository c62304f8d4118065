//! Error taxonomy for the backup engine (`SPEC_FULL.md` §7).

use std::path::PathBuf;

use frontdown_fs::ViewError;

/// Errors the engine can report. `main` maps these to the process exit codes
/// documented in `SPEC_FULL.md` §6 (0 success, 1 operational failure, 2
/// configuration error, 130 interrupted).
#[derive(Debug, thiserror::Error)]
pub enum FrontdownError {
    /// The configuration record failed validation before anything ran.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A configured source or the backup target was unavailable at job start,
    /// and the configured `*_unavailable_action` resolved to abort.
    #[error("{what} unavailable: {path}")]
    Availability {
        /// What was unavailable (`"source"` or `"backup target"`).
        what: &'static str,
        /// The path that could not be reached.
        path: PathBuf,
    },

    /// The tree scanner exceeded `max_scanning_errors`.
    #[error("scanning {root} failed: {source}")]
    ScanError {
        /// The tree root being scanned.
        root: PathBuf,
        /// The underlying view error.
        #[source]
        source: ViewError,
    },

    /// A comparator could not complete (e.g. a read failed mid-hash).
    #[error("comparing {path} failed: {source}")]
    ComparisonError {
        /// The path being compared.
        path: PathBuf,
        /// The underlying view error.
        #[source]
        source: ViewError,
    },

    /// The action executor exceeded `max_backup_errors`.
    #[error("applying actions failed after {failed} error(s), budget was {budget}")]
    BudgetExceeded {
        /// Number of actions that failed.
        failed: u64,
        /// The configured budget (never negative; -1 means unlimited and is
        /// represented separately).
        budget: u64,
    },

    /// A `HARDLINK`-mode backup ran against a filesystem view that cannot
    /// create hardlinks, and no fallback to a full copy was configured.
    #[error("hardlinks are not supported on {view}")]
    HardlinkUnsupported {
        /// The view's name (`FilesystemView::name`).
        view: &'static str,
    },

    /// The job was cancelled (Ctrl-C) before it finished.
    #[error("cancelled")]
    Cancelled,

    /// A failure reading or writing the action record itself.
    #[error("action record {path}: {source}")]
    ActionRecord {
        /// Path to the action record file.
        path: PathBuf,
        /// The underlying I/O or serialization error.
        #[source]
        source: anyhow::Error,
    },

    /// Any other filesystem-view failure that doesn't fit a more specific variant.
    #[error(transparent)]
    View(#[from] ViewError),
}

impl FrontdownError {
    /// The process exit code this error should produce, per `SPEC_FULL.md` §6.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 2,
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Convenience alias used throughout the engine.
pub type Result<T> = std::result::Result<T, FrontdownError>;
