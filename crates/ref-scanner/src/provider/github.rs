//! GitHub REST API 클라이언트
//!
//! [`GitHubClient`]는 `reqwest`(rustls) 위에서 코드 검색과 파일 내용 조회를 구현합니다.
//!
//! - 검색: `GET {api}/search/code?q=<query> org:<org> extension:<ext>&per_page=&page=`
//! - 내용: `GET {api}/repositories/{id}/contents/{path}` (`Accept: application/vnd.github.raw`)
//!
//! 모든 요청은 Bearer 토큰, `User-Agent`, `X-GitHub-Api-Version` 헤더를 포함하며
//! 설정된 타임아웃을 넘기면 `ScannerError::Http`로 실패합니다.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ContentProvider, SearchPage, SearchProvider, SearchQuery};
use crate::config::ScannerConfig;
use crate::error::ScannerError;

const USER_AGENT: &str = concat!("refscan/", env!("CARGO_PKG_VERSION"));
const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw";

/// 에러 메시지에 포함할 응답 본문 최대 길이
const MAX_ERROR_BODY: usize = 200;

/// GitHub API 클라이언트
#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: Url,
    api_token: String,
}

impl GitHubClient {
    /// 새 클라이언트를 생성합니다.
    ///
    /// # Errors
    ///
    /// - 토큰이 비어 있으면 `ScannerError::Config`
    /// - 기본 URL이 http(s) URL이 아니면 `ScannerError::Config`
    /// - HTTP 클라이언트 생성 실패 시 `ScannerError::Http`
    pub fn new(
        api_base_url: &str,
        api_token: &str,
        timeout: Duration,
    ) -> Result<Self, ScannerError> {
        if api_token.trim().is_empty() {
            return Err(ScannerError::Config {
                field: "api_token".to_owned(),
                reason: "api token must not be blank".to_owned(),
            });
        }

        let base_url = Url::parse(api_base_url).map_err(|e| ScannerError::Config {
            field: "api_base_url".to_owned(),
            reason: format!("invalid url '{api_base_url}': {e}"),
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ScannerError::Config {
                field: "api_base_url".to_owned(),
                reason: format!("'{api_base_url}' is not an http(s) url"),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_token: api_token.trim().to_owned(),
        })
    }

    /// 스캐너 설정으로 클라이언트를 생성합니다.
    pub fn from_config(config: &ScannerConfig) -> Result<Self, ScannerError> {
        Self::new(
            &config.api_base_url,
            &config.api_token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// API 기본 URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, ScannerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ScannerError::Config {
                field: "api_base_url".to_owned(),
                reason: "url cannot be a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn search_url(&self, query: &SearchQuery) -> Result<Url, ScannerError> {
        let mut url = self.endpoint(["search", "code"])?;
        url.query_pairs_mut()
            .append_pair("q", &query.qualified_query())
            .append_pair("per_page", &query.per_page.to_string())
            .append_pair("page", &query.page.to_string());
        Ok(url)
    }

    fn content_url(&self, repository_id: u64, path: &str) -> Result<Url, ScannerError> {
        let id = repository_id.to_string();
        let segments = ["repositories", id.as_str(), "contents"]
            .into_iter()
            .chain(path.split('/').filter(|s| !s.is_empty()));
        self.endpoint(segments)
    }

    async fn get(&self, url: Url, accept: &str) -> Result<reqwest::Response, ScannerError> {
        debug!(url = %url, "github api request");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .header(ACCEPT, accept)
            .header(API_VERSION_HEADER, API_VERSION)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let rate_limited = is_rate_limited(status, response.headers());
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);

        if rate_limited {
            warn!(
                status = status.as_u16(),
                message = %message,
                "github api rate limit exceeded"
            );
            return Err(ScannerError::RateLimited(message));
        }

        Err(ScannerError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

impl SearchProvider for GitHubClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, ScannerError> {
        let url = self.search_url(query)?;
        let body = self.get(url, ACCEPT_JSON).await?.text().await?;

        let page: SearchPage = serde_json::from_str(&body)
            .map_err(|e| ScannerError::InvalidResponse(format!("search response: {e}")))?;

        if page.incomplete_results {
            warn!(page = query.page, "search results are incomplete");
        }
        debug!(
            page = query.page,
            total_count = page.total_count,
            items = page.items.len(),
            "search page received"
        );
        Ok(page)
    }
}

impl ContentProvider for GitHubClient {
    async fn get_content(&self, repository_id: u64, path: &str) -> Result<String, ScannerError> {
        let url = self.content_url(repository_id, path)?;
        let content = self.get(url, ACCEPT_RAW).await?.text().await?;
        Ok(content)
    }
}

// 토큰이 로그에 찍히지 않도록 Debug를 직접 구현
impl fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_token", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// 403/429 응답이 호출 한도 초과인지 판단합니다.
fn is_rate_limited(status: StatusCode, headers: &HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status != StatusCode::FORBIDDEN {
        return false;
    }
    let exhausted = headers
        .get(RATE_LIMIT_REMAINING_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    exhausted || headers.contains_key(RETRY_AFTER)
}

/// 에러 응답 본문에서 메시지를 추출합니다.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_owned();
    }
    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new("https://api.github.com", "ghp_test", Duration::from_secs(5)).unwrap()
    }

    fn query(page: u32) -> SearchQuery {
        SearchQuery {
            query: "PackageReference Lykke".to_owned(),
            extension: "csproj".to_owned(),
            organization: "LykkeCity".to_owned(),
            page,
            per_page: 100,
        }
    }

    #[test]
    fn rejects_blank_token() {
        let err = GitHubClient::new("https://api.github.com", "  ", Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, ScannerError::Config { ref field, .. } if field == "api_token"));
    }

    #[test]
    fn rejects_non_http_base_url() {
        assert!(GitHubClient::new("ftp://host", "t", Duration::from_secs(5)).is_err());
        assert!(GitHubClient::new("not a url", "t", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn search_url_encodes_query() {
        let url = client().search_url(&query(2)).unwrap();
        assert_eq!(url.path(), "/search/code");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            [
                (
                    "q".to_owned(),
                    "PackageReference Lykke org:LykkeCity extension:csproj".to_owned()
                ),
                ("per_page".to_owned(), "100".to_owned()),
                ("page".to_owned(), "2".to_owned()),
            ]
        );
    }

    #[test]
    fn content_url_keeps_path_segments() {
        let url = client()
            .content_url(42, "src/My Service/Service.csproj")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repositories/42/contents/src/My%20Service/Service.csproj"
        );
    }

    #[test]
    fn base_url_with_path_prefix() {
        let client =
            GitHubClient::new("https://ghe.local/api/v3/", "t", Duration::from_secs(5)).unwrap();
        let url = client.search_url(&query(1)).unwrap();
        assert_eq!(url.path(), "/api/v3/search/code");
    }

    #[test]
    fn rate_limit_detection() {
        let mut headers = HeaderMap::new();
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, &headers));
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, &headers));

        headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from_static("0"));
        assert!(is_rate_limited(StatusCode::FORBIDDEN, &headers));
        assert!(!is_rate_limited(StatusCode::NOT_FOUND, &headers));

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("60"));
        assert!(is_rate_limited(StatusCode::FORBIDDEN, &headers));
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"message":"Bad credentials","documentation_url":"x"}"#),
            "Bad credentials"
        );
        assert_eq!(error_message("  gateway timeout \n"), "gateway timeout");
        assert_eq!(error_message(""), "empty response body");
        assert_eq!(error_message(&"x".repeat(500)).len(), MAX_ERROR_BODY);
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", client());
        assert!(!debug.contains("ghp_test"));
        assert!(debug.contains("<redacted>"));
    }
}
