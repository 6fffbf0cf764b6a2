//! Structured logging initialisation.
//!
//! The terminal is busy with the prompt, so logging is off unless asked for.
//! With `--log-file` events go to that file; otherwise a filter other than
//! `off` sends them to stderr.

use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::EnvFilter;

use crate::error::{NtshError, Result};

/// Environment variable consulted for the log filter.
pub const LOG_FILTER_ENV: &str = "NTSH_LOG";

/// Filter used when none is given.
pub const DEFAULT_LOG_FILTER: &str = "off";

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Where and how much to log.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `ntsh=debug`.
    pub filter: Option<String>,
    /// Append log lines to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LogConfig {
    fn filter(&self) -> &str {
        self.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}

/// Install the global subscriber the first time this is called.
///
/// Later calls do nothing and return `Ok`.
pub fn initialise(config: &LogConfig) -> Result<()> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| ())
}

fn install_subscriber(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.filter()).map_err(|e| {
        NtshError::Telemetry(format!("invalid log filter '{}': {}", config.filter(), e))
    })?;

    let (writer, ansi) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    NtshError::Telemetry(format!("cannot open {}: {}", path.display(), e))
                })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        None if config.filter() == DEFAULT_LOG_FILTER => return Ok(()),
        None => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(writer)
        .with_ansi(ansi)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NtshError::Telemetry(e.to_string()))
}
