//! Command-line surface (`SPEC_FULL.md` §6, A2).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Versioned, hardlink-capable file-tree backup engine.
#[derive(Debug, Parser)]
#[command(name = "frontdown", version, about)]
pub struct Cli {
    /// Increase logging verbosity (repeatable: `-v` debug, `-vv` trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Plan the run but never execute it.
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands exposed by the CLI.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a full backup from a configuration file.
    Backup {
        /// Path to a TOML or JSON configuration file.
        config_path: PathBuf,
    },
    /// Execute a previously persisted action record.
    ApplyActions {
        /// Path to a backup instance directory containing `actions.json`.
        instance_dir: PathBuf,
    },
}

/// Process exit codes (`SPEC_FULL.md` §6).
pub mod exit_code {
    /// Success.
    pub const SUCCESS: i32 = 0;
    /// Partial failure: an error budget was exceeded.
    pub const PARTIAL_FAILURE: i32 = 1;
    /// Fatal: configuration invalid, or a source/target unavailable with `abort`.
    pub const FATAL: i32 = 2;
    /// Cancelled by the user (Ctrl-C).
    pub const CANCELLED: i32 = 130;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backup_subcommand() {
        let cli = Cli::parse_from(["frontdown", "backup", "config.toml"]);
        assert!(matches!(cli.command, Command::Backup { .. }));
    }

    #[test]
    fn parses_apply_actions_subcommand() {
        let cli = Cli::parse_from(["frontdown", "apply-actions", "/backups/2026-01-01"]);
        assert!(matches!(cli.command, Command::ApplyActions { .. }));
    }

    #[test]
    fn verbose_is_repeatable() {
        let cli = Cli::parse_from(["frontdown", "-vv", "backup", "config.toml"]);
        assert_eq!(cli.verbose, 2);
    }
}
