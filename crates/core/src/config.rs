//! 설정 관리 -- refscan.toml 파싱 및 런타임 설정
//!
//! [`RefscanConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`REFSCAN_SCANNER_API_TOKEN=...` 형식)
//! 3. 설정 파일 (`refscan.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), refscan_core::error::RefscanError> {
//! use refscan_core::config::RefscanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = RefscanConfig::load("refscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = RefscanConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, RefscanError};

/// 검색 페이지당 최대 결과 수
pub const MAX_PAGE_SIZE: u32 = 100;

/// GitHub 코드 검색이 한 쿼리에 대해 제공하는 최대 결과 수
pub const DEFAULT_RESULT_LIMIT: u64 = 1000;

/// refscan 통합 설정
///
/// `refscan.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefscanConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스캐너 설정
    #[serde(default)]
    pub scanner: ScanConfig,
}

impl RefscanConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, RefscanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, RefscanError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RefscanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                RefscanError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, RefscanError> {
        toml::from_str(toml_str).map_err(|e| {
            RefscanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `REFSCAN_{SECTION}_{FIELD}`
    /// 예: `REFSCAN_SCANNER_API_TOKEN=ghp_...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "REFSCAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "REFSCAN_GENERAL_LOG_FORMAT");

        // Scanner
        override_string(&mut self.scanner.query, "REFSCAN_SCANNER_QUERY");
        override_string(
            &mut self.scanner.organization,
            "REFSCAN_SCANNER_ORGANIZATION",
        );
        override_string(&mut self.scanner.extension, "REFSCAN_SCANNER_EXTENSION");
        override_string(
            &mut self.scanner.namespace_prefix,
            "REFSCAN_SCANNER_NAMESPACE_PREFIX",
        );
        override_string(&mut self.scanner.api_token, "REFSCAN_SCANNER_API_TOKEN");
        override_string(
            &mut self.scanner.api_base_url,
            "REFSCAN_SCANNER_API_BASE_URL",
        );
        override_u32(&mut self.scanner.page_size, "REFSCAN_SCANNER_PAGE_SIZE");
        override_u64(
            &mut self.scanner.result_limit,
            "REFSCAN_SCANNER_RESULT_LIMIT",
        );
        override_u64(
            &mut self.scanner.success_interval_secs,
            "REFSCAN_SCANNER_SUCCESS_INTERVAL_SECS",
        );
        override_u64(
            &mut self.scanner.error_interval_secs,
            "REFSCAN_SCANNER_ERROR_INTERVAL_SECS",
        );
        override_u64(
            &mut self.scanner.item_delay_ms,
            "REFSCAN_SCANNER_ITEM_DELAY_MS",
        );
        override_u64(
            &mut self.scanner.request_timeout_secs,
            "REFSCAN_SCANNER_REQUEST_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// API 토큰 존재 여부는 스캐너 생성 시점에 검증합니다.
    pub fn validate(&self) -> Result<(), RefscanError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.scanner.query.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scanner.query".to_owned(),
                reason: "search query must not be empty".to_owned(),
            }
            .into());
        }

        if self.scanner.page_size == 0 || self.scanner.page_size > MAX_PAGE_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "scanner.page_size".to_owned(),
                reason: format!("must be 1-{MAX_PAGE_SIZE}"),
            }
            .into());
        }

        if self.scanner.result_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.result_limit".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.scanner.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.request_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.scanner.success_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.success_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.scanner.error_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scanner.error_interval_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if !self.scanner.api_base_url.starts_with("http://")
            && !self.scanner.api_base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "scanner.api_base_url".to_owned(),
                reason: "must be an http(s) URL".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 스캐너 설정
///
/// 검색 쿼리, 조직 범위, 파일 확장자, 패키지 네임스페이스 필터, API 인증 정보,
/// 스케줄링 간격을 포함합니다.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 코드 검색 쿼리 텍스트
    pub query: String,
    /// 검색 대상 조직
    pub organization: String,
    /// 매니페스트 파일 확장자
    pub extension: String,
    /// 추출할 패키지 이름 접두어
    pub namespace_prefix: String,
    /// API 토큰
    pub api_token: String,
    /// API 기본 URL
    pub api_base_url: String,
    /// 검색 페이지당 결과 수 (1-100)
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

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            query: "PackageReference Lykke".to_owned(),
            organization: "LykkeCity".to_owned(),
            extension: "csproj".to_owned(),
            namespace_prefix: "Lykke".to_owned(),
            api_token: String::new(),
            api_base_url: "https://api.github.com".to_owned(),
            page_size: MAX_PAGE_SIZE,
            result_limit: DEFAULT_RESULT_LIMIT,
            success_interval_secs: 3600, // 1 hour
            error_interval_secs: 1200,   // 20 minutes
            item_delay_ms: 500,
            request_timeout_secs: 30,
        }
    }
}

// 토큰이 로그에 찍히지 않도록 Debug를 직접 구현
impl std::fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanConfig")
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

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
