//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;

use crate::console::History;
use crate::endpoint::Endpoint;
use crate::framing::DEFAULT_READ_LIMIT;
use crate::telemetry::{LogConfig, LOG_FILTER_ENV};

/// Interactive tool for line-based TCP protocols.
#[derive(Debug, Parser)]
#[command(name = "ntsh", version, about)]
pub struct Cli {
    /// Remote endpoint
    #[arg(value_name = "HOST:PORT")]
    pub remote: Endpoint,

    /// Protocol used to highlight traffic
    #[arg(
        short,
        long,
        value_name = "PROTOCOL[:OPTION=VALUE...]",
        default_value = "plain"
    )]
    pub protocol: String,

    /// Bytes buffered without a newline before they are shown anyway
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_READ_LIMIT)]
    pub read_limit: usize,

    /// History file [default: <cache dir>/ntsh/history]
    #[arg(long, value_name = "PATH", conflicts_with = "no_history")]
    pub history_file: Option<PathBuf>,

    /// Do not load or save line history
    #[arg(long)]
    pub no_history: bool,

    /// Disable colours
    #[arg(long, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    pub no_color: bool,

    /// Log filter, e.g. `ntsh=debug`
    #[arg(long, value_name = "FILTER", env = LOG_FILTER_ENV)]
    pub log_filter: Option<String>,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Logging settings.
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            filter: self.log_filter.clone(),
            file: self.log_file.clone(),
        }
    }

    /// Open the history selected by the flags.
    pub fn history(&self) -> History {
        if self.no_history {
            return History::in_memory();
        }
        match self.history_file.clone().or_else(History::default_path) {
            Some(path) => History::open(&path),
            None => {
                tracing::warn!("no cache directory; history will not be saved");
                History::in_memory()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["ntsh", "localhost:7147"]).unwrap();
        assert_eq!(cli.remote, Endpoint::new("localhost", 7147));
        assert_eq!(cli.protocol, "plain");
        assert_eq!(cli.read_limit, DEFAULT_READ_LIMIT);
        assert!(!cli.no_history);
    }

    #[test]
    fn test_protocol_and_limits() {
        let cli = Cli::try_parse_from([
            "ntsh",
            "-p",
            "katcp:unescape",
            "--read-limit",
            "4096",
            "--no-history",
            "--log-file",
            "/tmp/ntsh.log",
            "::1:7147",
        ])
        .unwrap();

        assert_eq!(cli.protocol, "katcp:unescape");
        assert_eq!(cli.read_limit, 4096);
        assert_eq!(cli.remote.host, "::1");
        assert!(!cli.history().is_persistent());
        assert_eq!(cli.log_config().file, Some(PathBuf::from("/tmp/ntsh.log")));
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let err = Cli::try_parse_from(["ntsh", "localhost"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn test_history_flags_conflict() {
        assert!(Cli::try_parse_from(["ntsh", "h:1", "--no-history", "--history-file", "x"]).is_err());
    }
}
