//! 참조 스캐너 오케스트레이터 -- 주기적 검색, 수집, 색인
//!
//! [`ReferenceScanner`]는 core의 [`Pipeline`] trait을 구현하여
//! `refscan-daemon`에서 시작/정지/상태 점검 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! SearchProvider (page 1..=N) --> SearchItem --> ContentProvider --> manifest text
//!                                                                        |
//!                                                                  ManifestParser
//!                                                                        |
//!                                       RwLock<ReferenceGraph> <-- PackageReference
//!                                                 |
//!                                      ScanView::snapshot() --> ScanSnapshot
//!
//! 진행 상황: ScanEvent --> mpsc --> downstream
//! ```
//!
//! # 사이클 규칙
//!
//! - 백그라운드 태스크 하나가 사이클을 순차 실행합니다. 성공 후에는
//!   `success_interval`, 실패 후에는 `error_interval`만큼 기다립니다.
//! - 사이클 시작 시 그래프를 비우고 처음부터 다시 채웁니다.
//! - 원격 호출 에러는 사이클을 중단하지만 이미 색인된 항목은 그대로 읽을 수 있습니다.
//! - 쓰기 잠금은 삽입 한 번 동안만 유지되며 네트워크 대기 중에는 잡지 않습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use refscan_core::error::{PipelineError, RefscanError};
use refscan_core::metrics as m;
use refscan_core::pipeline::{HealthStatus, Pipeline};

use crate::config::ScannerConfig;
use crate::error::ScannerError;
use crate::event::ScanEvent;
use crate::graph::ReferenceGraph;
use crate::parser::ManifestParser;
use crate::provider::{
    ContentProvider, GitHubClient, SearchItem, SearchPage, SearchProvider, SearchQuery,
};
use crate::snapshot::{ScanSnapshot, ScanStatus, SnapshotEntry};
use crate::types::RepositoryDescriptor;

/// 이벤트 채널 기본 용량
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// 스캐너 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum ScannerState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 사이클 하나의 결과 요약
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleSummary {
    /// 사이클 ID (UUID v4)
    pub cycle_id: String,
    /// 검색 API가 보고한 전체 결과 수
    pub total_found: u64,
    /// 요청한 검색 페이지 수
    pub pages_fetched: u32,
    /// 처리한 검색 항목 수
    pub items_processed: u64,
    /// 저장소 정보가 잘못되어 건너뛴 항목 수
    pub items_skipped: u64,
    /// 그래프에 새로 추가된 `(참조, 저장소)` 쌍 수
    pub references_indexed: usize,
    /// 소요 시간
    pub duration: Duration,
}

/// 스캔 진행 상태 (그래프와 별도 잠금)
#[derive(Debug, Clone)]
struct ScanProgress {
    status: ScanStatus,
    last_updated: Option<SystemTime>,
    total_found: u64,
    cycles_completed: u64,
    cycles_failed: u64,
    next_scan_at: Option<SystemTime>,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self {
            status: ScanStatus::Idle,
            last_updated: None,
            total_found: 0,
            cycles_completed: 0,
            cycles_failed: 0,
            next_scan_at: None,
        }
    }
}

/// 스캔 태스크와 읽기 경로가 공유하는 상태
#[derive(Default)]
struct ScanShared {
    graph: RwLock<ReferenceGraph>,
    progress: RwLock<ScanProgress>,
}

/// 읽기 전용 핸들
///
/// 엔진에 접근하지 않고 스냅샷과 상태만 조회합니다. 복제 비용이 작아
/// 표시 계층에 자유롭게 나눠줄 수 있습니다.
#[derive(Clone)]
pub struct ScanView {
    shared: Arc<ScanShared>,
}

impl ScanView {
    /// 현재 그래프와 상태의 스냅샷을 만듭니다.
    ///
    /// 진행 중인 사이클이 끝나기를 기다리지 않습니다. 항목 목록은 그래프 읽기
    /// 잠금 한 번 안에서 복사되므로 그래프의 한 시점을 반영합니다.
    pub async fn snapshot(&self) -> ScanSnapshot {
        let progress = self.shared.progress.read().await.clone();
        let entries = {
            let graph = self.shared.graph.read().await;
            graph
                .entries()
                .into_iter()
                .map(|(reference, repository)| SnapshotEntry {
                    reference,
                    repository,
                })
                .collect()
        };

        ScanSnapshot {
            status: progress.status,
            last_updated: progress.last_updated,
            total_found: progress.total_found,
            entries,
            cycles_completed: progress.cycles_completed,
            cycles_failed: progress.cycles_failed,
            next_scan_at: progress.next_scan_at,
        }
    }

    /// 현재 엔진 상태
    pub async fn status(&self) -> ScanStatus {
        self.shared.progress.read().await.status.clone()
    }
}

/// 사이클 실행기 -- 백그라운드 태스크와 `scan_once`가 공유
struct CycleRunner<P> {
    config: ScannerConfig,
    provider: P,
    parser: ManifestParser,
    shared: Arc<ScanShared>,
    event_tx: mpsc::Sender<ScanEvent>,
    /// 한 번에 하나의 사이클만 실행
    cycle_lock: Mutex<()>,
    items_processed: AtomicU64,
}

/// 사이클 진행 중 누적되는 값
#[derive(Default)]
struct CycleTally {
    total_found: u64,
    pages_fetched: u32,
    items_processed: u64,
    items_skipped: u64,
    references_indexed: usize,
}

impl<P: SearchProvider + ContentProvider> CycleRunner<P> {
    /// 사이클 하나를 실행합니다.
    async fn run_cycle(&self) -> Result<CycleSummary, ScannerError> {
        let _cycle = self.cycle_lock.lock().await;

        let cycle_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        self.shared.graph.write().await.clear();
        {
            let mut progress = self.shared.progress.write().await;
            progress.status = ScanStatus::Scanning;
            progress.next_scan_at = None;
        }

        info!(cycle_id = %cycle_id, "scan cycle started");
        self.emit(ScanEvent::CycleStarted {
            cycle_id: cycle_id.clone(),
            started_at: SystemTime::now(),
        });

        let mut tally = CycleTally::default();
        let result = self.crawl(&cycle_id, &mut tally).await;
        let duration = started.elapsed();
        metrics::histogram!(m::SCANNER_CYCLE_DURATION_SECONDS).record(duration.as_secs_f64());

        let reference_count = self.shared.graph.read().await.reference_count();
        metrics::gauge!(m::SCANNER_REFERENCES_INDEXED).set(reference_count as f64);

        match result {
            Ok(()) => {
                {
                    let mut progress = self.shared.progress.write().await;
                    progress.status = ScanStatus::Idle;
                    progress.last_updated = Some(SystemTime::now());
                    progress.cycles_completed += 1;
                }
                metrics::counter!(m::SCANNER_CYCLES_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);

                info!(
                    cycle_id = %cycle_id,
                    total_found = tally.total_found,
                    pages = tally.pages_fetched,
                    items = tally.items_processed,
                    skipped = tally.items_skipped,
                    references = reference_count,
                    duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
                    "scan cycle completed"
                );
                self.emit(ScanEvent::CycleCompleted {
                    cycle_id: cycle_id.clone(),
                    total_found: tally.total_found,
                    items_processed: tally.items_processed,
                    references_indexed: tally.references_indexed,
                    duration,
                });

                Ok(CycleSummary {
                    cycle_id,
                    total_found: tally.total_found,
                    pages_fetched: tally.pages_fetched,
                    items_processed: tally.items_processed,
                    items_skipped: tally.items_skipped,
                    references_indexed: tally.references_indexed,
                    duration,
                })
            }
            Err(e) => {
                let message = e.to_string();
                {
                    let mut progress = self.shared.progress.write().await;
                    progress.status = ScanStatus::Error(message.clone());
                    progress.cycles_failed += 1;
                }
                metrics::counter!(m::SCANNER_CYCLES_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);

                warn!(
                    cycle_id = %cycle_id,
                    error = %message,
                    items = tally.items_processed,
                    "scan cycle failed"
                );
                self.emit(ScanEvent::CycleFailed {
                    cycle_id,
                    error: message,
                    items_processed: tally.items_processed,
                });

                Err(e)
            }
        }
    }

    /// 검색 페이지를 순서대로 가져와 처리합니다.
    async fn crawl(&self, cycle_id: &str, tally: &mut CycleTally) -> Result<(), ScannerError> {
        let query = SearchQuery {
            query: self.config.query.clone(),
            extension: self.config.extension.clone(),
            organization: self.config.organization.clone(),
            page: 1,
            per_page: self.config.page_size,
        };

        let first = self.provider.search(&query).await?;
        tally.total_found = first.total_count;
        self.shared.progress.write().await.total_found = first.total_count;

        let page_count = self.config.page_count(first.total_count).max(1);
        debug!(
            cycle_id = %cycle_id,
            total_count = first.total_count,
            page_count,
            "search results counted"
        );

        self.process_page(cycle_id, 1, page_count, first, tally).await?;

        for page in 2..=page_count {
            let result = self.provider.search(&query.with_page(page)).await?;
            self.process_page(cycle_id, page, page_count, result, tally)
                .await?;
        }

        Ok(())
    }

    async fn process_page(
        &self,
        cycle_id: &str,
        page: u32,
        page_count: u32,
        result: SearchPage,
        tally: &mut CycleTally,
    ) -> Result<(), ScannerError> {
        tally.pages_fetched += 1;
        info!(
            cycle_id = %cycle_id,
            page,
            page_count,
            items = result.items.len(),
            "search page received"
        );
        self.emit(ScanEvent::PageFetched {
            cycle_id: cycle_id.to_owned(),
            page,
            page_count,
            items: result.items.len(),
            total_count: result.total_count,
        });

        let delay = self.config.item_delay();
        for item in &result.items {
            self.process_item(cycle_id, item, tally).await?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        Ok(())
    }

    /// 검색 항목 하나를 처리합니다.
    ///
    /// 내용 조회 실패는 에러로 전파되고, 저장소 정보 오류는 항목만 건너뜁니다.
    async fn process_item(
        &self,
        cycle_id: &str,
        item: &SearchItem,
        tally: &mut CycleTally,
    ) -> Result<(), ScannerError> {
        let content = self
            .provider
            .get_content(item.repository.id, &item.path)
            .await?;

        let descriptor = RepositoryDescriptor::new(
            item.repository.full_name.clone(),
            &item.repository.html_url,
        );
        let repository = match descriptor {
            Ok(repository) => repository,
            Err(e) => {
                warn!(
                    repository = %item.repository.full_name,
                    path = %item.path,
                    error = %e,
                    "invalid repository, skipping item"
                );
                tally.items_skipped += 1;
                metrics::counter!(m::SCANNER_ITEMS_SKIPPED_TOTAL).increment(1);
                return Ok(());
            }
        };

        let references = self.parser.parse(&content);
        let found = references.len();
        let mut added = 0;
        for reference in references {
            let mut graph = self.shared.graph.write().await;
            if graph.insert(reference, repository.clone()) {
                added += 1;
            }
        }

        tally.items_processed += 1;
        tally.references_indexed += added;
        self.items_processed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::SCANNER_ITEMS_PROCESSED_TOTAL).increment(1);

        debug!(
            repository = %repository.name(),
            path = %item.path,
            found,
            added,
            "manifest indexed"
        );
        self.emit(ScanEvent::ItemProcessed {
            cycle_id: cycle_id.to_owned(),
            repository: repository.name().to_owned(),
            path: item.path.clone(),
            references: added,
        });

        Ok(())
    }

    /// 다음 사이클 예정 시각을 기록합니다.
    async fn schedule_next(&self, delay: Duration) {
        self.shared.progress.write().await.next_scan_at = SystemTime::now().checked_add(delay);
    }

    /// 취소된 사이클이 남긴 `Scanning` 상태를 되돌립니다.
    async fn reset_cancelled(&self) {
        let mut progress = self.shared.progress.write().await;
        if progress.status == ScanStatus::Scanning {
            progress.status = ScanStatus::Idle;
        }
        progress.next_scan_at = None;
    }

    fn emit(&self, event: ScanEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(kind = event.kind(), "scan event channel full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                debug!(kind = event.kind(), "scan event channel closed");
            }
        }
    }
}

/// 백그라운드 스캔 루프
///
/// 첫 사이클은 즉시 실행되며, 이후 결과에 따라 다음 대기 시간을 고릅니다.
async fn run_loop<P: SearchProvider + ContentProvider>(
    runner: Arc<CycleRunner<P>>,
    cancel: CancellationToken,
) {
    info!("scan loop started");

    loop {
        let outcome = tokio::select! {
            () = cancel.cancelled() => break,
            outcome = runner.run_cycle() => outcome,
        };

        let delay = match outcome {
            Ok(_) => runner.config.success_interval(),
            Err(_) => runner.config.error_interval(),
        };
        runner.schedule_next(delay).await;
        debug!(delay_secs = delay.as_secs(), "next scan cycle scheduled");

        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    runner.reset_cancelled().await;
    info!("scan loop stopped");
}

/// 패키지 참조 스캐너
///
/// 검색, 내용 조회, 파싱, 그래프 색인의 전체 흐름을 관리합니다.
/// core의 `Pipeline` trait을 구현하여 생명주기(start/stop/health_check)를 제공합니다.
pub struct ReferenceScanner<P = GitHubClient> {
    runner: Arc<CycleRunner<P>>,
    state: ScannerState,
    cancel: CancellationToken,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl<P: SearchProvider + ContentProvider> ReferenceScanner<P> {
    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ScannerState::Initialized => "initialized",
            ScannerState::Running => "running",
            ScannerState::Stopped => "stopped",
        }
    }

    /// 스캐너 설정
    pub fn config(&self) -> &ScannerConfig {
        &self.runner.config
    }

    /// 읽기 전용 핸들을 반환합니다.
    pub fn view(&self) -> ScanView {
        ScanView {
            shared: Arc::clone(&self.runner.shared),
        }
    }

    /// 현재 스냅샷 (`self.view().snapshot()`과 같음)
    pub async fn snapshot(&self) -> ScanSnapshot {
        self.view().snapshot().await
    }

    /// 시작 이후 처리된 검색 항목 수
    pub fn items_processed(&self) -> u64 {
        self.runner.items_processed.load(Ordering::Relaxed)
    }

    /// 사이클 하나를 즉시 실행합니다 (수동 트리거용).
    ///
    /// 백그라운드 사이클이 진행 중이면 끝날 때까지 기다린 뒤 실행합니다.
    /// 다음 예약 시각은 바꾸지 않습니다.
    pub async fn scan_once(&self) -> Result<CycleSummary, ScannerError> {
        self.runner.run_cycle().await
    }
}

impl<P: SearchProvider + ContentProvider> Pipeline for ReferenceScanner<P> {
    async fn start(&mut self) -> Result<(), RefscanError> {
        if self.state == ScannerState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        info!(
            query = %self.runner.config.query,
            organization = %self.runner.config.organization,
            "starting reference scanner"
        );

        self.cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(Arc::clone(&self.runner), self.cancel.clone()));
        self.tasks.push(task);

        self.state = ScannerState::Running;
        info!("reference scanner started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RefscanError> {
        if self.state != ScannerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping reference scanner");

        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "scan task ended abnormally");
            }
        }

        self.state = ScannerState::Stopped;
        info!("reference scanner stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ScannerState::Running => match self.view().status().await {
                ScanStatus::Error(message) => {
                    HealthStatus::Degraded(format!("last scan failed: {message}"))
                }
                ScanStatus::Idle | ScanStatus::Scanning => HealthStatus::Healthy,
            },
            ScannerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ScannerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 참조 스캐너 빌더
///
/// 스캐너를 구성하고 이벤트 채널을 생성합니다.
pub struct ReferenceScannerBuilder<P = GitHubClient> {
    config: ScannerConfig,
    provider: Option<P>,
    event_tx: Option<mpsc::Sender<ScanEvent>>,
    event_channel_capacity: usize,
}

impl ReferenceScannerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ScannerConfig::default(),
            provider: None,
            event_tx: None,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl Default for ReferenceScannerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ReferenceScannerBuilder<P> {
    /// 스캐너 설정을 지정합니다.
    pub fn config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// 검색/내용 제공자를 지정합니다.
    pub fn provider<Q>(self, provider: Q) -> ReferenceScannerBuilder<Q> {
        ReferenceScannerBuilder {
            config: self.config,
            provider: Some(provider),
            event_tx: self.event_tx,
            event_channel_capacity: self.event_channel_capacity,
        }
    }

    /// 외부 이벤트 전송 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn event_sender(mut self, tx: mpsc::Sender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 이벤트 채널 용량을 설정합니다 (외부 채널 미사용 시).
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}

impl<P: SearchProvider + ContentProvider> ReferenceScannerBuilder<P> {
    /// 스캐너를 빌드합니다.
    ///
    /// # Returns
    ///
    /// - `ReferenceScanner`: 스캐너 인스턴스
    /// - `Option<mpsc::Receiver<ScanEvent>>`: 이벤트 수신 채널
    ///   (외부 event_sender를 설정한 경우 None)
    ///
    /// # Errors
    ///
    /// 설정이 유효하지 않거나(토큰 누락 포함) 제공자가 지정되지 않으면 `ScannerError::Config`
    pub fn build(
        self,
    ) -> Result<(ReferenceScanner<P>, Option<mpsc::Receiver<ScanEvent>>), ScannerError> {
        self.config.validate()?;

        let provider = self.provider.ok_or_else(|| ScannerError::Config {
            field: "provider".to_owned(),
            reason: "a search/content provider is required".to_owned(),
        })?;

        if self.event_channel_capacity == 0 {
            return Err(ScannerError::Config {
                field: "event_channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        let (event_tx, event_rx) = if let Some(tx) = self.event_tx {
            (tx, None)
        } else {
            let (tx, rx) = mpsc::channel(self.event_channel_capacity);
            (tx, Some(rx))
        };

        let parser = ManifestParser::new(self.config.namespace_prefix.clone());

        let runner = CycleRunner {
            config: self.config,
            provider,
            parser,
            shared: Arc::new(ScanShared::default()),
            event_tx,
            cycle_lock: Mutex::new(()),
            items_processed: AtomicU64::new(0),
        };

        let scanner = ReferenceScanner {
            runner: Arc::new(runner),
            state: ScannerState::Initialized,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        };

        Ok((scanner, event_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, RepositoryInfo};

    const MANIFEST: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <PackageReference Include="Lykke.Foo" Version="1.2.3" />
    <PackageReference Include="Newtonsoft.Json" Version="13.0.1" />
  </ItemGroup>
</Project>"#;

    fn item(id: u64, repo: &str, path: &str) -> SearchItem {
        SearchItem {
            name: path.rsplit('/').next().unwrap_or(path).to_owned(),
            path: path.to_owned(),
            repository: RepositoryInfo {
                id,
                full_name: repo.to_owned(),
                html_url: format!("https://host/{repo}"),
            },
        }
    }

    fn config() -> ScannerConfig {
        ScannerConfig {
            api_token: "ghp_test".to_owned(),
            item_delay_ms: 0,
            ..ScannerConfig::default()
        }
    }

    fn build(
        provider: MockProvider,
    ) -> (ReferenceScanner<MockProvider>, mpsc::Receiver<ScanEvent>) {
        let (scanner, rx) = ReferenceScannerBuilder::new()
            .config(config())
            .provider(provider)
            .build()
            .unwrap();
        (scanner, rx.unwrap())
    }

    fn single_item_provider() -> MockProvider {
        MockProvider::new()
            .with_page(
                1,
                SearchPage {
                    total_count: 1,
                    incomplete_results: false,
                    items: vec![item(1, "org/repo1", "src/App.csproj")],
                },
            )
            .with_content(1, "src/App.csproj", MANIFEST)
    }

    #[test]
    fn builder_creates_scanner() {
        let (scanner, _rx) = build(MockProvider::new());
        assert_eq!(scanner.state_name(), "initialized");
        assert_eq!(scanner.items_processed(), 0);
    }

    #[test]
    fn builder_with_external_event_sender() {
        let (tx, _rx) = mpsc::channel(10);
        let (_scanner, rx) = ReferenceScannerBuilder::new()
            .config(config())
            .provider(MockProvider::new())
            .event_sender(tx)
            .build()
            .unwrap();
        assert!(rx.is_none());
    }

    #[test]
    fn builder_rejects_missing_token() {
        let result = ReferenceScannerBuilder::new()
            .config(ScannerConfig::default())
            .provider(MockProvider::new())
            .build();
        assert!(matches!(
            result,
            Err(ScannerError::Config { ref field, .. }) if field == "api_token"
        ));
    }

    #[test]
    fn builder_requires_provider() {
        let result = ReferenceScannerBuilder::new().config(config()).build();
        assert!(matches!(
            result,
            Err(ScannerError::Config { ref field, .. }) if field == "provider"
        ));
    }

    #[test]
    fn builder_rejects_zero_channel_capacity() {
        let result = ReferenceScannerBuilder::new()
            .config(config())
            .provider(MockProvider::new())
            .event_channel_capacity(0)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn scan_once_indexes_filtered_references() {
        let (scanner, _rx) = build(single_item_provider());

        let summary = scanner.scan_once().await.unwrap();
        assert_eq!(summary.total_found, 1);
        assert_eq!(summary.pages_fetched, 1);
        assert_eq!(summary.items_processed, 1);
        assert_eq!(summary.references_indexed, 1);

        let snapshot = scanner.snapshot().await;
        assert_eq!(snapshot.status, ScanStatus::Idle);
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].reference.to_string(), "Lykke.Foo 1.2.3");
        assert_eq!(snapshot.entries[0].repository.name(), "org/repo1");
        assert!(snapshot.last_updated.is_some());
        assert_eq!(snapshot.cycles_completed, 1);
        assert_eq!(scanner.items_processed(), 1);
    }

    #[tokio::test]
    async fn scan_once_emits_cycle_events_in_order() {
        let (scanner, mut rx) = build(single_item_provider());
        scanner.scan_once().await.unwrap();

        let mut kinds = Vec::new();
        let mut ids = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
            ids.push(event.cycle_id().to_owned());
        }
        assert_eq!(
            kinds,
            ["cycle_started", "page_fetched", "item_processed", "cycle_completed"]
        );
        assert!(ids.iter().all(|id| id == &ids[0]));
    }

    #[tokio::test]
    async fn cycle_rebuilds_graph_from_scratch() {
        let (scanner, _rx) = build(single_item_provider());
        scanner.scan_once().await.unwrap();
        scanner.scan_once().await.unwrap();

        let snapshot = scanner.snapshot().await;
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.cycles_completed, 2);
    }

    #[tokio::test]
    async fn invalid_repository_url_skips_item() {
        let mut bad = item(2, "org/bad", "Bad.csproj");
        bad.repository.html_url = "not-a-url".to_owned();
        let provider = MockProvider::new()
            .with_page(
                1,
                SearchPage {
                    total_count: 2,
                    incomplete_results: false,
                    items: vec![bad, item(1, "org/repo1", "src/App.csproj")],
                },
            )
            .with_content(2, "Bad.csproj", MANIFEST)
            .with_content(1, "src/App.csproj", MANIFEST);
        let (scanner, _rx) = build(provider);

        let summary = scanner.scan_once().await.unwrap();
        assert_eq!(summary.items_skipped, 1);
        assert_eq!(summary.items_processed, 1);
        assert_eq!(scanner.snapshot().await.entries.len(), 1);
    }

    #[tokio::test]
    async fn content_failure_sets_error_status() {
        let (scanner, mut rx) = build(single_item_provider().failing_after(0));

        let err = scanner.scan_once().await.unwrap_err();
        assert!(err.is_remote());

        let snapshot = scanner.snapshot().await;
        assert!(snapshot.status.is_error());
        assert_eq!(snapshot.cycles_failed, 1);
        assert!(snapshot.last_updated.is_none());

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert_eq!(last.map(|e| e.kind()), Some("cycle_failed"));
    }

    #[tokio::test]
    async fn scanner_health_check_before_start() {
        let (scanner, _rx) = build(MockProvider::new());
        assert!(scanner.health_check().await.is_unhealthy());
    }

    #[tokio::test]
    async fn scanner_double_stop_fails() {
        let (mut scanner, _rx) = build(MockProvider::new());
        assert!(scanner.stop().await.is_err());
    }

    #[tokio::test]
    async fn scanner_start_stop_lifecycle() {
        let (mut scanner, _rx) = build(MockProvider::new());

        scanner.start().await.unwrap();
        assert_eq!(scanner.state_name(), "running");

        assert!(scanner.start().await.is_err());

        scanner.stop().await.unwrap();
        assert_eq!(scanner.state_name(), "stopped");
        assert!(scanner.health_check().await.is_unhealthy());

        assert!(scanner.stop().await.is_err());
    }

    #[tokio::test]
    async fn health_degrades_after_failed_cycle() {
        let (mut scanner, mut rx) = build(single_item_provider().failing_after(0));
        scanner.start().await.unwrap();

        while let Some(event) = rx.recv().await {
            if event.is_terminal() {
                break;
            }
        }

        let health = scanner.health_check().await;
        assert!(health.is_degraded());

        scanner.stop().await.unwrap();
    }

    #[tokio::test]
    async fn health_is_healthy_after_successful_cycle() {
        let (mut scanner, mut rx) = build(single_item_provider());
        scanner.start().await.unwrap();

        while let Some(event) = rx.recv().await {
            if event.is_terminal() {
                break;
            }
        }

        assert!(scanner.health_check().await.is_healthy());

        scanner.stop().await.unwrap();
        assert!(scanner.snapshot().await.next_scan_at.is_none());
    }

    #[tokio::test]
    async fn view_is_shared_with_scanner() {
        let (scanner, _rx) = build(single_item_provider());
        let view = scanner.view();
        assert_eq!(view.status().await, ScanStatus::Idle);

        scanner.scan_once().await.unwrap();
        assert_eq!(view.snapshot().await.entries.len(), 1);
    }
}
