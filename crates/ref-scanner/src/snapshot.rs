//! 스캔 결과 스냅샷 -- 읽기 경로가 보는 그래프와 상태의 한 시점 투영
//!
//! [`ScanSnapshot`]은 그래프 읽기 잠금 한 번 안에서 만들어지므로
//! 모든 항목이 그래프의 같은 순간을 반영합니다.
//! [`DataTable`]은 표시 계층(데이터 테이블 위젯)이 그대로 직렬화해 쓰는 형태입니다.

use std::fmt;
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::types::{PackageReference, RepositoryDescriptor};

/// 스캔 엔진 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ScanStatus {
    /// 대기 중 (다음 사이클 예약됨)
    Idle,
    /// 사이클 진행 중
    Scanning,
    /// 마지막 사이클이 실패함
    Error(String),
}

impl ScanStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// 에러 메시지 (에러 상태가 아니면 `None`)
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Scanning => write!(f, "scanning"),
            Self::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// 스냅샷의 한 항목 `(참조, 저장소)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    pub reference: PackageReference,
    pub repository: RepositoryDescriptor,
}

/// 그래프와 스캔 상태의 읽기 전용 투영
#[derive(Debug, Clone, Serialize)]
pub struct ScanSnapshot {
    /// 엔진 상태
    pub status: ScanStatus,
    /// 마지막으로 성공한 사이클의 완료 시각
    pub last_updated: Option<SystemTime>,
    /// 검색 API가 보고한 전체 결과 수
    pub total_found: u64,
    /// 패키지 이름, 버전, 저장소 순으로 정렬된 항목
    pub entries: Vec<SnapshotEntry>,
    /// 성공한 사이클 수
    pub cycles_completed: u64,
    /// 실패한 사이클 수
    pub cycles_failed: u64,
    /// 다음 사이클 예정 시각
    pub next_scan_at: Option<SystemTime>,
}

impl ScanSnapshot {
    /// 사람이 읽는 통계 문자열
    ///
    /// 예: `Last update time 2024-05-01T10:00:00Z. Packages found 42`
    pub fn statistics(&self) -> String {
        let last_update = self
            .last_updated
            .map(format_time)
            .unwrap_or_else(|| "never".to_owned());
        format!(
            "Last update time {last_update}. Packages found {}",
            self.total_found
        )
    }

    /// 데이터 테이블 위젯용 응답으로 변환합니다.
    pub fn to_data_table(&self) -> DataTable {
        let data: Vec<DataTableRow> = self
            .entries
            .iter()
            .map(|entry| DataTableRow {
                package_name: entry.reference.name().to_owned(),
                version: entry.reference.version().to_string(),
                repo_name: entry.repository.name().to_owned(),
                repo_url: entry.repository.url().to_owned(),
            })
            .collect();

        DataTable {
            draw: data.len(),
            records_total: data.len(),
            records_filtered: data.len(),
            error: self.status.error_message().unwrap_or_default().to_owned(),
            data,
        }
    }
}

/// 데이터 테이블 위젯 응답
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTable {
    pub draw: usize,
    pub records_total: usize,
    pub records_filtered: usize,
    pub data: Vec<DataTableRow>,
    pub error: String,
}

/// 데이터 테이블의 한 행
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataTableRow {
    pub package_name: String,
    pub version: String,
    pub repo_name: String,
    pub repo_url: String,
}

fn format_time(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn entry(name: &str, version: &str, repo: &str) -> SnapshotEntry {
        SnapshotEntry {
            reference: PackageReference::parse(name, version).unwrap(),
            repository: RepositoryDescriptor::new(repo, &format!("https://github.com/{repo}"))
                .unwrap(),
        }
    }

    fn snapshot(status: ScanStatus, entries: Vec<SnapshotEntry>) -> ScanSnapshot {
        ScanSnapshot {
            status,
            last_updated: None,
            total_found: 0,
            entries,
            cycles_completed: 0,
            cycles_failed: 0,
            next_scan_at: None,
        }
    }

    #[test]
    fn status_display() {
        assert_eq!(ScanStatus::Idle.to_string(), "idle");
        assert_eq!(ScanStatus::Scanning.to_string(), "scanning");
        assert_eq!(
            ScanStatus::Error("HTTP 502".to_owned()).to_string(),
            "error: HTTP 502"
        );
    }

    #[test]
    fn status_serializes_with_tag() {
        let json = serde_json::to_value(ScanStatus::Error("quota".to_owned())).unwrap();
        assert_eq!(json["state"], "error");
        assert_eq!(json["message"], "quota");
        let json = serde_json::to_value(ScanStatus::Idle).unwrap();
        assert_eq!(json["state"], "idle");
    }

    #[test]
    fn statistics_before_first_cycle() {
        let snap = snapshot(ScanStatus::Scanning, vec![]);
        assert_eq!(snap.statistics(), "Last update time never. Packages found 0");
    }

    #[test]
    fn statistics_formats_timestamp() {
        let mut snap = snapshot(ScanStatus::Idle, vec![]);
        snap.last_updated = Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_714_557_600));
        snap.total_found = 42;
        assert_eq!(
            snap.statistics(),
            "Last update time 2024-05-01T10:00:00Z. Packages found 42"
        );
    }

    #[test]
    fn data_table_mirrors_entries() {
        let snap = snapshot(
            ScanStatus::Idle,
            vec![
                entry("Lykke.Foo", "1.2.3", "org/repo1"),
                entry("Lykke.Foo", "1.2.3", "org/repo2"),
            ],
        );
        let table = snap.to_data_table();
        assert_eq!(table.draw, 2);
        assert_eq!(table.records_total, 2);
        assert_eq!(table.records_filtered, 2);
        assert!(table.error.is_empty());
        assert_eq!(table.data[1].repo_name, "org/repo2");
        assert_eq!(table.data[1].repo_url, "https://github.com/org/repo2");

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["recordsTotal"], 2);
        assert_eq!(json["data"][0]["packageName"], "Lykke.Foo");
        assert_eq!(json["data"][0]["version"], "1.2.3");
    }

    #[test]
    fn data_table_carries_error_message() {
        let snap = snapshot(ScanStatus::Error("rate limited".to_owned()), vec![]);
        assert_eq!(snap.to_data_table().error, "rate limited");
    }
}
