//! 메트릭 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `refscan_`
//! - 모듈명: `scanner_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Scanner 메트릭 ─────────────────────────────────────────────────

/// Scanner: 완료된 스캔 사이클 수 (counter, label: result)
pub const SCANNER_CYCLES_TOTAL: &str = "refscan_scanner_cycles_total";

/// Scanner: 처리된 매니페스트 파일 수 (counter)
pub const SCANNER_ITEMS_PROCESSED_TOTAL: &str = "refscan_scanner_items_processed_total";

/// Scanner: 건너뛴 매니페스트 파일 수 (counter)
pub const SCANNER_ITEMS_SKIPPED_TOTAL: &str = "refscan_scanner_items_skipped_total";

/// Scanner: 그래프에 색인된 (패키지, 버전) 키 수 (gauge)
pub const SCANNER_REFERENCES_INDEXED: &str = "refscan_scanner_references_indexed";

/// Scanner: 스캔 사이클 소요 시간 (histogram, 초)
pub const SCANNER_CYCLE_DURATION_SECONDS: &str = "refscan_scanner_cycle_duration_seconds";
