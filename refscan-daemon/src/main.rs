//! refscan-daemon -- package reference scanner daemon.
//!
//! Loads `refscan.toml`, initializes logging, and either runs the scanner
//! until SIGTERM/SIGINT or, with `--once`, runs a single cycle and prints
//! the resulting data table as JSON on stdout.

use anyhow::Result;
use clap::Parser;

use refscan_core::config::RefscanConfig;
use refscan_daemon::cli::DaemonCli;
use refscan_daemon::logging::init_tracing;
use refscan_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드 (파일 + 환경변수), CLI 인자가 최우선
    let mut config = RefscanConfig::load(&cli.config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e))?;

    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "refscan-daemon starting"
    );

    let mut orchestrator = Orchestrator::build_from_config(config)?;

    if !cli.once {
        return orchestrator.run().await;
    }

    let result = orchestrator.scan_once().await;
    let snapshot = orchestrator.view().snapshot().await;
    orchestrator.shutdown().await;

    let table = serde_json::to_string_pretty(&snapshot.to_data_table())?;
    println!("{table}");
    tracing::info!(statistics = %snapshot.statistics(), "single scan finished");

    match result {
        Ok(summary) => {
            tracing::info!(
                cycle_id = %summary.cycle_id,
                items = summary.items_processed,
                references = summary.references_indexed,
                "scan cycle succeeded"
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("scan cycle failed: {}", e)),
    }
}
