//! Progress reporting (`SPEC_FULL.md` §4.6).

use indicatif::{ProgressBar, ProgressStyle};

use crate::action::Action;

/// Empirical weight formula: roughly 1 ms fixed cost per file plus 10 ms per
/// megabyte, expressed in units of 100 KiB.
#[must_use]
pub fn action_weight(action: &Action) -> u64 {
    let size = match action {
        Action::Copy { size, .. } | Action::Hardlink { size, .. } => *size,
        Action::Delete { .. } | Action::NewDir { .. } | Action::ExistingDir { .. } | Action::EmptyDir { .. } => 0,
    };
    1 + size / 102_400
}

/// Interface the Executor reports progress through. A CLI implementation
/// backs this with `indicatif`; tests can use a no-op or counting impl.
pub trait ProgressSink {
    /// Called once with the total unit weight of the plan before execution starts.
    fn start(&mut self, total_units: u64);
    /// Called after each action completes, with its own weight.
    fn advance(&mut self, units: u64);
    /// Called once execution finishes (successfully or not).
    fn finish(&mut self);
}

/// A [`ProgressSink`] that reports nothing; used in tests and non-interactive runs.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn start(&mut self, _total_units: u64) {}
    fn advance(&mut self, _units: u64) {}
    fn finish(&mut self) {}
}

/// A [`ProgressSink`] backed by an `indicatif` progress bar, for the CLI.
pub struct CliProgressSink {
    bar: ProgressBar,
}

impl CliProgressSink {
    /// Build a new, not-yet-started progress sink.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl Default for CliProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for CliProgressSink {
    fn start(&mut self, total_units: u64) {
        self.bar.set_length(total_units);
    }

    fn advance(&mut self, units: u64) {
        self.bar.inc(units);
    }

    fn finish(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::RelPath;

    #[test]
    fn weight_formula_matches_one_plus_size_over_100kib() {
        let action = Action::Copy {
            relpath: RelPath::parse("a").unwrap(),
            abs_source: "/a".into(),
            size: 204_800,
            mtime: None,
        };
        assert_eq!(action_weight(&action), 1 + 2);
    }

    #[test]
    fn zero_byte_metadata_actions_weigh_one_unit() {
        let action = Action::NewDir {
            relpath: RelPath::parse("a").unwrap(),
        };
        assert_eq!(action_weight(&action), 1);
    }
}
