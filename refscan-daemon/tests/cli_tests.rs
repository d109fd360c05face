//! CLI argument parsing tests.

use std::path::PathBuf;

use clap::Parser;
use refscan_daemon::cli::DaemonCli;

#[test]
fn test_defaults() {
    // Given: No arguments
    let cli = DaemonCli::try_parse_from(["refscan-daemon"]).expect("should parse");

    // Then: Defaults apply
    assert_eq!(cli.config, PathBuf::from("refscan.toml"));
    assert!(cli.log_level.is_none());
    assert!(cli.log_format.is_none());
    assert!(!cli.validate);
    assert!(!cli.once);
}

#[test]
fn test_all_flags() {
    let cli = DaemonCli::try_parse_from([
        "refscan-daemon",
        "-c",
        "/etc/refscan/refscan.toml",
        "--log-level",
        "debug",
        "--log-format",
        "pretty",
        "--once",
    ])
    .expect("should parse");

    assert_eq!(cli.config, PathBuf::from("/etc/refscan/refscan.toml"));
    assert_eq!(cli.log_level.as_deref(), Some("debug"));
    assert_eq!(cli.log_format.as_deref(), Some("pretty"));
    assert!(cli.once);
    assert!(!cli.validate);
}

#[test]
fn test_long_config_flag_and_validate() {
    let cli = DaemonCli::try_parse_from(["refscan-daemon", "--config", "custom.toml", "--validate"])
        .expect("should parse");

    assert_eq!(cli.config, PathBuf::from("custom.toml"));
    assert!(cli.validate);
}

#[test]
fn test_unknown_flag_is_rejected() {
    let result = DaemonCli::try_parse_from(["refscan-daemon", "--pid-file", "/tmp/x.pid"]);
    assert!(result.is_err());
}
