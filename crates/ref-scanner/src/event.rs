//! 스캔 진행 이벤트
//!
//! [`ScanEvent`]는 스캔 엔진이 사이클 진행 상황을 외부로 알리는 구조화된 이벤트입니다.
//! 엔진은 `tokio::mpsc` 채널로 `try_send`하며, 채널이 가득 차거나 닫혀 있으면
//! 경고 로그만 남기고 스캔을 계속합니다.
//!
//! 한 사이클에서 발생한 모든 이벤트는 같은 `cycle_id`(UUID v4)를 공유합니다.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::Serialize;

/// 스캔 사이클 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanEvent {
    /// 사이클 시작 (그래프가 비워진 직후)
    CycleStarted {
        cycle_id: String,
        started_at: SystemTime,
    },
    /// 검색 결과 페이지 수신
    PageFetched {
        cycle_id: String,
        page: u32,
        page_count: u32,
        items: usize,
        total_count: u64,
    },
    /// 검색 결과 항목 하나 처리 완료
    ItemProcessed {
        cycle_id: String,
        repository: String,
        path: String,
        /// 그래프에 새로 추가된 `(참조, 저장소)` 쌍 수
        references: usize,
    },
    /// 사이클 성공
    CycleCompleted {
        cycle_id: String,
        total_found: u64,
        items_processed: u64,
        references_indexed: usize,
        duration: Duration,
    },
    /// 사이클 실패 (원격 호출 에러로 중단)
    CycleFailed {
        cycle_id: String,
        error: String,
        items_processed: u64,
    },
}

impl ScanEvent {
    /// 이벤트가 속한 사이클 ID
    pub fn cycle_id(&self) -> &str {
        match self {
            Self::CycleStarted { cycle_id, .. }
            | Self::PageFetched { cycle_id, .. }
            | Self::ItemProcessed { cycle_id, .. }
            | Self::CycleCompleted { cycle_id, .. }
            | Self::CycleFailed { cycle_id, .. } => cycle_id,
        }
    }

    /// 이벤트 종류 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CycleStarted { .. } => "cycle_started",
            Self::PageFetched { .. } => "page_fetched",
            Self::ItemProcessed { .. } => "item_processed",
            Self::CycleCompleted { .. } => "cycle_completed",
            Self::CycleFailed { .. } => "cycle_failed",
        }
    }

    /// 사이클을 끝내는 이벤트인지 확인합니다.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::CycleCompleted { .. } | Self::CycleFailed { .. })
    }
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleStarted { cycle_id, .. } => write!(f, "ScanEvent[{cycle_id}] cycle started"),
            Self::PageFetched {
                cycle_id,
                page,
                page_count,
                items,
                ..
            } => write!(
                f,
                "ScanEvent[{cycle_id}] page {page}/{page_count} ({items} items)"
            ),
            Self::ItemProcessed {
                cycle_id,
                repository,
                path,
                references,
            } => write!(
                f,
                "ScanEvent[{cycle_id}] {repository}/{path}: {references} references"
            ),
            Self::CycleCompleted {
                cycle_id,
                total_found,
                references_indexed,
                ..
            } => write!(
                f,
                "ScanEvent[{cycle_id}] completed: found={total_found}, indexed={references_indexed}"
            ),
            Self::CycleFailed { cycle_id, error, .. } => {
                write!(f, "ScanEvent[{cycle_id}] failed: {error}")
            }
        }
    }
}
