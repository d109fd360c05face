//! CLI argument definitions for refscan-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// refscan package reference scanner daemon.
///
/// Periodically searches code hosting for project manifests and keeps an
/// in-memory index of which repositories reference which package versions.
#[derive(Parser, Debug)]
#[command(name = "refscan-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to refscan.toml configuration file.
    #[arg(short, long, default_value = "refscan.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Run a single scan cycle, print the data table as JSON and exit.
    ///
    /// Exits with a non-zero status if the cycle failed.
    #[arg(long)]
    pub once: bool,
}
