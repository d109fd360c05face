//! 스캐너 설정
//!
//! [`ScannerConfig`]는 core의 [`ScanConfig`](refscan_core::config::ScanConfig)에서
//! 파생되며, 엔진이 실제로 사용하는 값(기간은 [`Duration`]으로)과 검증 규칙을 제공합니다.
//! core 설정 검증과 달리 API 토큰이 비어 있으면 실패합니다.
//!
//! # 사용 예시
//!
//! ```
//! use refscan_scanner::ScannerConfigBuilder;
//!
//! let config = ScannerConfigBuilder::new()
//!     .api_token("ghp_example")
//!     .organization("acme")
//!     .namespace_prefix("Acme")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.page_count(250), 3);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use refscan_core::config::{DEFAULT_RESULT_LIMIT, MAX_PAGE_SIZE, ScanConfig};

use crate::error::ScannerError;

/// 설정 상한값 상수
const MAX_INTERVAL_SECS: u64 = 604_800; // 7 days
const MAX_ITEM_DELAY_MS: u64 = 60_000;
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// 스캔 엔진 설정
#[derive(Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// 코드 검색 쿼리 텍스트
    pub query: String,
    /// 검색 대상 조직
    pub organization: String,
    /// 매니페스트 파일 확장자
    pub extension: String,
    /// 추출할 패키지 이름 접두어 (비어 있으면 모두 추출)
    pub namespace_prefix: String,
    /// API 토큰
    pub api_token: String,
    /// API 기본 URL
    pub api_base_url: String,
    /// 검색 페이지당 결과 수
    pub page_size: u32,
    /// 한 사이클에서 처리할 최대 검색 결과 수
    pub result_limit: u64,
    /// 성공 후 다음 스캔까지 간격 (초)
    pub success_interval_secs: u64,
    /// 실패 후 재시도까지 간격 (초)
    pub error_interval_secs: u64,
    /// 항목 간 대기 시간 (밀리초)
    pub item_delay_ms: u64,
    /// API 호출 하나의 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self::from_core(&ScanConfig::default())
    }
}

impl ScannerConfig {
    /// core의 `ScanConfig`에서 스캐너 설정을 생성합니다.
    pub fn from_core(core: &ScanConfig) -> Self {
        Self {
            query: core.query.clone(),
            organization: core.organization.clone(),
            extension: core.extension.clone(),
            namespace_prefix: core.namespace_prefix.clone(),
            api_token: core.api_token.clone(),
            api_base_url: core.api_base_url.clone(),
            page_size: core.page_size,
            result_limit: core.result_limit,
            success_interval_secs: core.success_interval_secs,
            error_interval_secs: core.error_interval_secs,
            item_delay_ms: core.item_delay_ms,
            request_timeout_secs: core.request_timeout_secs,
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `api_token`: 공백이 아니어야 함
    /// - `query`: 공백이 아니어야 함
    /// - `api_base_url`: http(s) URL
    /// - `page_size`: 1-100
    /// - `result_limit`: 1 이상
    /// - `success_interval_secs`, `error_interval_secs`: 1-604800
    /// - `item_delay_ms`: 0-60000
    /// - `request_timeout_secs`: 1-600
    pub fn validate(&self) -> Result<(), ScannerError> {
        if self.api_token.trim().is_empty() {
            return Err(config_error("api_token", "api token must not be blank"));
        }

        if self.query.trim().is_empty() {
            return Err(config_error("query", "search query must not be blank"));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(config_error("api_base_url", "must be an http(s) URL"));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(config_error(
                "page_size",
                &format!("must be 1-{MAX_PAGE_SIZE}"),
            ));
        }

        if self.result_limit == 0 {
            return Err(config_error("result_limit", "must be greater than 0"));
        }

        for (field, value) in [
            ("success_interval_secs", self.success_interval_secs),
            ("error_interval_secs", self.error_interval_secs),
        ] {
            if value == 0 || value > MAX_INTERVAL_SECS {
                return Err(config_error(
                    field,
                    &format!("must be 1-{MAX_INTERVAL_SECS}"),
                ));
            }
        }

        if self.item_delay_ms > MAX_ITEM_DELAY_MS {
            return Err(config_error(
                "item_delay_ms",
                &format!("must be 0-{MAX_ITEM_DELAY_MS}"),
            ));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(config_error(
                "request_timeout_secs",
                &format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            ));
        }

        Ok(())
    }

    pub fn success_interval(&self) -> Duration {
        Duration::from_secs(self.success_interval_secs)
    }

    pub fn error_interval(&self) -> Duration {
        Duration::from_secs(self.error_interval_secs)
    }

    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }

    /// 전체 결과 수에 대해 요청할 페이지 수를 계산합니다.
    ///
    /// `ceil(min(total_count, result_limit) / page_size)`. 마지막 부분 페이지도 포함됩니다.
    pub fn page_count(&self, total_count: u64) -> u32 {
        let page_size = u64::from(self.page_size.max(1));
        let reachable = total_count.min(self.result_limit);
        u32::try_from(reachable.div_ceil(page_size)).unwrap_or(u32::MAX)
    }
}

// 토큰이 로그에 찍히지 않도록 Debug를 직접 구현
impl fmt::Debug for ScannerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerConfig")
            .field("query", &self.query)
            .field("organization", &self.organization)
            .field("extension", &self.extension)
            .field("namespace_prefix", &self.namespace_prefix)
            .field("api_token", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("page_size", &self.page_size)
            .field("result_limit", &self.result_limit)
            .field("success_interval_secs", &self.success_interval_secs)
            .field("error_interval_secs", &self.error_interval_secs)
            .field("item_delay_ms", &self.item_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

fn config_error(field: &str, reason: &str) -> ScannerError {
    ScannerError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// [`ScannerConfig`] 빌더
///
/// 빌드 시 유효성 검증을 수행합니다.
#[derive(Default)]
pub struct ScannerConfigBuilder {
    config: ScannerConfig,
}

impl ScannerConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 검색 쿼리를 설정합니다.
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.config.query = query.into();
        self
    }

    /// 검색 대상 조직을 설정합니다.
    pub fn organization(mut self, organization: impl Into<String>) -> Self {
        self.config.organization = organization.into();
        self
    }

    /// 매니페스트 파일 확장자를 설정합니다.
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.config.extension = extension.into();
        self
    }

    /// 패키지 이름 접두어를 설정합니다.
    pub fn namespace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.namespace_prefix = prefix.into();
        self
    }

    /// API 토큰을 설정합니다.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.config.api_token = token.into();
        self
    }

    /// API 기본 URL을 설정합니다.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn result_limit(mut self, limit: u64) -> Self {
        self.config.result_limit = limit;
        self
    }

    /// 성공 후 간격을 설정합니다.
    pub fn success_interval_secs(mut self, secs: u64) -> Self {
        self.config.success_interval_secs = secs;
        self
    }

    /// 실패 후 재시도 간격을 설정합니다.
    pub fn error_interval_secs(mut self, secs: u64) -> Self {
        self.config.error_interval_secs = secs;
        self
    }

    /// 항목 간 대기 시간을 설정합니다.
    pub fn item_delay_ms(mut self, ms: u64) -> Self {
        self.config.item_delay_ms = ms;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// 설정을 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `ScannerError::Config`를 반환합니다.
    pub fn build(self) -> Result<ScannerConfig, ScannerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
