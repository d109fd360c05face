//! 스캐너 에러 타입
//!
//! [`ScannerError`]는 스캐너 크레이트 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<ScannerError> for RefscanError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **원격 호출 (사이클 중단)**: `Http`, `Api`, `RateLimited`, `InvalidResponse`
//! - **항목 단위 (건너뜀)**: `VersionParse`, `InvalidRepository`
//! - **설정 (생성 시 치명적)**: `Config`

use refscan_core::error::{ConfigError, RefscanError, ScanError};

/// 스캐너 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ScannerError {
    /// HTTP 전송 실패 (연결, 타임아웃 등)
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// API가 성공이 아닌 상태 코드를 반환
    #[error("api error: HTTP {status}: {message}")]
    Api {
        /// HTTP 상태 코드
        status: u16,
        /// 응답 본문에서 추출한 메시지
        message: String,
    },

    /// API 호출 한도 초과
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// 응답 본문을 해석할 수 없음
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// 버전 문자열 파싱 실패
    #[error("version parse error: '{version}': {reason}")]
    VersionParse {
        /// 파싱 대상 버전 문자열
        version: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 저장소 정보가 유효하지 않음
    #[error("invalid repository '{name}': {reason}")]
    InvalidRepository {
        /// 저장소 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl ScannerError {
    /// 사이클 전체를 중단해야 하는 원격 호출 에러인지 확인합니다.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Api { .. } | Self::RateLimited(_) | Self::InvalidResponse(_)
        )
    }
}

impl From<ScannerError> for RefscanError {
    fn from(err: ScannerError) -> Self {
        match err {
            ScannerError::Config { field, reason } => {
                RefscanError::Config(ConfigError::InvalidValue { field, reason })
            }
            ScannerError::VersionParse { .. } | ScannerError::InvalidRepository { .. } => {
                RefscanError::Scan(ScanError::ParseFailed(err.to_string()))
            }
            other => RefscanError::Scan(ScanError::RemoteFailed(other.to_string())),
        }
    }
}
