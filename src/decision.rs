//! Decision callback (`SPEC_FULL.md` §4.7, §6).
//!
//! Routes `*_action` policy points that resolve to `prompt` through a single
//! trait, so the pipeline never talks to a terminal directly.

use std::io::{self, Write as _};

/// A point in the pipeline where a `prompt` policy needs a yes/no answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionPoint {
    /// The backup target is reporting insufficient free space.
    TargetDriveFull,
    /// A configured source is unreachable.
    SourceUnavailable,
}

/// Delegate of last resort for `prompt`-routed decisions.
pub trait DecisionCallback {
    /// Ask whether the job should proceed despite `point`. `true` proceeds,
    /// `false` aborts.
    fn ask(&mut self, point: DecisionPoint) -> bool;
}

/// A non-interactive [`DecisionCallback`] that always proceeds. Used when a
/// policy resolves to `proceed` directly, or in non-interactive/test runs
/// where `prompt` would otherwise hang.
#[derive(Debug, Default)]
pub struct AutoProceed;

impl DecisionCallback for AutoProceed {
    fn ask(&mut self, _point: DecisionPoint) -> bool {
        true
    }
}

/// A non-interactive [`DecisionCallback`] that always aborts.
#[derive(Debug, Default)]
pub struct AutoAbort;

impl DecisionCallback for AutoAbort {
    fn ask(&mut self, _point: DecisionPoint) -> bool {
        false
    }
}

/// A [`DecisionCallback`] that prompts on stdin/stdout, for the interactive CLI.
#[derive(Debug, Default)]
pub struct CliPrompt;

impl DecisionCallback for CliPrompt {
    fn ask(&mut self, point: DecisionPoint) -> bool {
        let question = match point {
            DecisionPoint::TargetDriveFull => "backup target is low on free space",
            DecisionPoint::SourceUnavailable => "a configured source is unavailable",
        };
        print!("{question}; proceed anyway? [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut line = String::new();
        if io::stdin().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}
