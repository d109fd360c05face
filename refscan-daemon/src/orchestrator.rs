//! Scanner orchestration -- assembly, event logging, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `refscan-daemon`.
//! It loads configuration, builds the GitHub-backed reference scanner,
//! drains scan events into the log, and runs the scanner until a shutdown
//! signal arrives.

use std::future::Future;
use std::path::Path;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};

use refscan_core::config::RefscanConfig;
use refscan_core::pipeline::{HealthStatus, Pipeline};
use refscan_scanner::{
    CycleSummary, GitHubClient, ReferenceScanner, ReferenceScannerBuilder, ScanEvent, ScanView,
    ScannerConfig, ScannerError,
};

/// Scan event channel capacity.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The main daemon orchestrator.
///
/// Owns the reference scanner and the background event logger.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: RefscanConfig,
    /// The reference scanner (GitHub provider).
    scanner: ReferenceScanner<GitHubClient>,
    /// Shutdown broadcast sender (signals background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Scan event receiver, taken when the logger task is spawned.
    event_rx: Option<mpsc::Receiver<ScanEvent>>,
    /// Background tasks owned by the daemon.
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// 1. Load `refscan.toml` and apply environment variable overrides
    /// 2. Validate the configuration
    /// 3. Build the GitHub client and the reference scanner
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - The scanner cannot be built (e.g. missing API token)
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = RefscanConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    pub fn build_from_config(config: RefscanConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        tracing::info!("initializing reference scanner");
        let scanner_config = ScannerConfig::from_core(&config.scanner);
        scanner_config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid scanner config: {}", e))?;

        let client = GitHubClient::from_config(&scanner_config)
            .map_err(|e| anyhow::anyhow!("failed to create GitHub client: {}", e))?;

        let (scanner, event_rx) = ReferenceScannerBuilder::new()
            .config(scanner_config)
            .provider(client)
            .event_channel_capacity(EVENT_CHANNEL_CAPACITY)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build reference scanner: {}", e))?;

        let (shutdown_tx, _) = broadcast::channel(4);

        Ok(Self {
            config,
            scanner,
            shutdown_tx,
            event_rx,
            tasks: Vec::new(),
        })
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &RefscanConfig {
        &self.config
    }

    /// Read-only handle to the scan results.
    pub fn view(&self) -> ScanView {
        self.scanner.view()
    }

    /// Scanner health.
    pub async fn health(&self) -> HealthStatus {
        self.scanner.health_check().await
    }

    /// Run a single scan cycle in the foreground.
    ///
    /// The snapshot reflects the outcome (Idle or Error) either way.
    pub async fn scan_once(&mut self) -> Result<CycleSummary, ScannerError> {
        self.ensure_event_logger();
        self.scanner.scan_once().await
    }

    /// Start the scanner, wait for `shutdown` to complete, then stop.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.ensure_event_logger();

        self.scanner
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start reference scanner: {}", e))?;

        tracing::info!(
            organization = %self.config.scanner.organization,
            success_interval_secs = self.config.scanner.success_interval_secs,
            error_interval_secs = self.config.scanner.error_interval_secs,
            "refscan-daemon running"
        );

        shutdown.await;

        tracing::info!("shutting down");
        if let Err(e) = self.scanner.stop().await {
            tracing::error!(error = %e, "failed to stop reference scanner");
        }
        self.shutdown().await;

        tracing::info!("refscan-daemon shut down");
        Ok(())
    }

    /// Run until SIGTERM or SIGINT is received.
    pub async fn run(self) -> Result<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

        self.run_until(async move {
            let signal = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = signal, "shutdown signal received");
        })
        .await
    }

    /// Signal background tasks and wait for them to finish.
    pub async fn shutdown(&mut self) {
        // 수신자가 없으면 Err이지만 무시해도 됨
        let _ = self.shutdown_tx.send(());
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
    }

    fn ensure_event_logger(&mut self) {
        if let Some(event_rx) = self.event_rx.take() {
            let task = spawn_event_logger(event_rx, self.shutdown_tx.subscribe());
            self.tasks.push(task);
        }
    }
}

/// Spawn a background task that logs received ScanEvents.
///
/// Events still queued when shutdown is signalled are drained before exit.
fn spawn_event_logger(
    mut event_rx: mpsc::Receiver<ScanEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => log_event(&event),
                        None => {
                            tracing::debug!("event channel closed, exiting logger");
                            return;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    while let Ok(event) = event_rx.try_recv() {
                        log_event(&event);
                    }
                    tracing::debug!("event logger shutting down");
                    return;
                }
            }
        }
    })
}

fn log_event(event: &ScanEvent) {
    tracing::debug!(
        cycle_id = %event.cycle_id(),
        kind = event.kind(),
        terminal = event.is_terminal(),
        event = %event,
        "scan event"
    );
}
