//! Logging initialization (`SPEC_FULL.md` §7, A3).

use tracing_subscriber::EnvFilter;

/// Verbosity requested on the command line, which takes precedence over
/// `log_level` from the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// `-q`/`--quiet`: only warnings and errors.
    Quiet,
    /// Neither flag given: use the configuration's `log_level`.
    Default,
    /// One or more `-v`: `debug`.
    Verbose,
    /// Two or more `-v`: `trace`.
    VeryVerbose,
}

impl Verbosity {
    /// Derive verbosity from CLI flag counts.
    #[must_use]
    pub fn from_flags(verbose_count: u8, quiet: bool) -> Self {
        if quiet {
            Self::Quiet
        } else {
            match verbose_count {
                0 => Self::Default,
                1 => Self::Verbose,
                _ => Self::VeryVerbose,
            }
        }
    }

    fn directive(self, config_log_level: &str) -> String {
        match self {
            Self::Quiet => "warn".to_string(),
            Self::Default => config_log_level.to_string(),
            Self::Verbose => "debug".to_string(),
            Self::VeryVerbose => "trace".to_string(),
        }
    }
}

/// Initialize the global `tracing` subscriber. Call once, at process start.
pub fn init(verbosity: Verbosity, config_log_level: &str) {
    let directive = verbosity.directive(config_log_level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
