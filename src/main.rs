//! `frontdown` CLI entry point.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use frontdown::action::ActionRecord;
use frontdown::cli::{exit_code, Cli, Command};
use frontdown::config::Config;
use frontdown::error::FrontdownError;
use frontdown::exec::{ExecOutcome, Executor};
use frontdown::job::run_job;
use frontdown::logging::{self, Verbosity};
use frontdown::progress::CliProgressSink;
use frontdown::stats::Statistics;

fn main() {
    let cli = Cli::parse();
    let code = run(&cli);
    std::process::exit(code);
}

fn run(cli: &Cli) -> i32 {
    match &cli.command {
        Command::Backup { config_path } => run_backup(cli, config_path),
        Command::ApplyActions { instance_dir } => run_apply_actions(cli, instance_dir),
    }
}

fn run_backup(cli: &Cli, config_path: &std::path::Path) -> i32 {
    let mut config = match Config::load(config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return exit_code::FATAL;
        }
    };

    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet), &config.log_level);

    if cli.dry_run {
        config.apply_actions = false;
    }

    let cancel = install_cancellation_handler();
    let mut progress = CliProgressSink::new();

    match run_job(&config, cancel, &mut progress) {
        Ok(result) if result.success => {
            tracing::info!(
                bytes_copied = result.stats.bytes_copied,
                bytes_hardlinked = result.stats.bytes_hardlinked,
                files_copied = result.stats.files_copied,
                files_hardlinked = result.stats.files_hardlinked,
                files_deleted = result.stats.files_deleted,
                "backup completed"
            );
            exit_code::SUCCESS
        }
        Ok(_) => {
            tracing::error!("backup completed with unresolved errors");
            exit_code::PARTIAL_FAILURE
        }
        Err(FrontdownError::Cancelled) => {
            tracing::warn!("backup cancelled");
            exit_code::CANCELLED
        }
        Err(FrontdownError::Configuration(msg)) => {
            eprintln!("configuration error: {msg}");
            exit_code::FATAL
        }
        Err(e) => {
            eprintln!("backup failed: {e}");
            exit_code::FATAL
        }
    }
}

fn run_apply_actions(cli: &Cli, instance_dir: &std::path::Path) -> i32 {
    logging::init(Verbosity::from_flags(cli.verbose, cli.quiet), "info");

    let record_path = instance_dir.join("actions.json");
    let text = match std::fs::read_to_string(&record_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("cannot read {}: {e}", record_path.display());
            return exit_code::FATAL;
        }
    };
    let record = match ActionRecord::from_json(&text) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("malformed action record {}: {e}", record_path.display());
            return exit_code::FATAL;
        }
    };

    if cli.dry_run {
        for source in &record.sources {
            tracing::info!(source = %source.name, actions = source.actions.len(), "dry run: not executing");
        }
        return exit_code::SUCCESS;
    }

    let cancel = install_cancellation_handler();
    let mut progress = CliProgressSink::new();
    let mut overall_stats = Statistics::default();
    let mut any_budget_exceeded = false;

    for source in &record.sources {
        let target_root = instance_dir.join(&source.name);
        let target_view = frontdown_fs::LocalFilesystemView::new(&target_root);
        let executor = Executor::new(&target_view, frontdown::config::ErrorBudget::Unlimited, Arc::clone(&cancel));
        let outcome = executor.apply(&source.actions, &mut overall_stats, &mut progress);
        match outcome {
            ExecOutcome::Cancelled => return exit_code::CANCELLED,
            ExecOutcome::BudgetExceeded => any_budget_exceeded = true,
            ExecOutcome::Completed => {}
        }
    }

    if any_budget_exceeded {
        exit_code::PARTIAL_FAILURE
    } else {
        exit_code::SUCCESS
    }
}

/// Install a Ctrl-C handler that flips the cooperative cancellation flag the
/// pipeline checks between actions (`SPEC_FULL.md` §5) rather than unwinding.
fn install_cancellation_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    cancel
}
