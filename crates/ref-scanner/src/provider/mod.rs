//! 원격 저장소 호스트 추상화
//!
//! 스캔 엔진은 두 trait에만 의존합니다.
//!
//! - [`SearchProvider`]: 매니페스트 파일 코드 검색 (페이지 단위)
//! - [`ContentProvider`]: 검색된 파일의 원본 내용 조회
//!
//! 운영 환경에서는 [`GitHubClient`]가 두 trait을 모두 구현하고,
//! 테스트에서는 메모리 기반 mock 구현을 사용합니다.

pub mod github;

use std::future::Future;

use serde::Deserialize;

use crate::error::ScannerError;

pub use github::GitHubClient;

/// 코드 검색 요청
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// 검색어 텍스트
    pub query: String,
    /// 파일 확장자 (`csproj`)
    pub extension: String,
    /// 검색 대상 조직
    pub organization: String,
    /// 페이지 번호 (1부터 시작)
    pub page: u32,
    /// 페이지당 결과 수
    pub per_page: u32,
}

impl SearchQuery {
    /// API `q` 파라미터 값을 만듭니다.
    ///
    /// 예: `PackageReference Lykke org:LykkeCity extension:csproj`
    pub fn qualified_query(&self) -> String {
        let mut q = self.query.trim().to_owned();
        if !self.organization.is_empty() {
            q.push_str(&format!(" org:{}", self.organization));
        }
        if !self.extension.is_empty() {
            q.push_str(&format!(" extension:{}", self.extension));
        }
        q
    }

    /// 같은 조건으로 다른 페이지를 요청하는 쿼리를 만듭니다.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }
}

/// 검색 결과 한 페이지
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    /// 쿼리 전체의 결과 수 (이 페이지의 항목 수가 아님)
    pub total_count: u64,
    /// API가 시간 제한으로 결과를 일부만 돌려줬는지 여부
    #[serde(default)]
    pub incomplete_results: bool,
    /// 이 페이지의 항목
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

/// 검색된 파일 하나
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchItem {
    /// 파일 이름
    pub name: String,
    /// 저장소 루트 기준 경로
    pub path: String,
    /// 파일이 속한 저장소
    pub repository: RepositoryInfo,
}

/// 검색 결과에 포함된 저장소 정보
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryInfo {
    /// 저장소 숫자 ID
    pub id: u64,
    /// `owner/name` 형식의 전체 이름
    pub full_name: String,
    /// 저장소 웹 URL
    pub html_url: String,
}

/// 코드 검색 제공자
///
/// 구현체는 `Send + Sync`여야 하며 스캔 태스크와 공유됩니다.
pub trait SearchProvider: Send + Sync + 'static {
    /// 검색 결과 한 페이지를 가져옵니다.
    ///
    /// # Errors
    ///
    /// 전송 실패, 호출 한도 초과, 잘못된 응답 등 원격 호출 에러.
    /// 어떤 에러든 현재 사이클을 중단시킵니다.
    fn search(
        &self,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<SearchPage, ScannerError>> + Send;
}

/// 파일 내용 제공자
pub trait ContentProvider: Send + Sync + 'static {
    /// 저장소의 파일 원본 내용을 가져옵니다.
    ///
    /// # Errors
    ///
    /// 원격 호출 에러 (현재 사이클 중단)
    fn get_content(
        &self,
        repository_id: u64,
        path: &str,
    ) -> impl Future<Output = Result<String, ScannerError>> + Send;
}

/// 테스트용 Mock 제공자
///
/// 페이지 번호별 검색 결과와 `(저장소 ID, 경로)`별 내용을 메모리에 보관합니다.
/// `fail_after`를 설정하면 그 수만큼 내용 조회에 성공한 뒤 에러를 반환합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockProvider {
    pub pages: std::collections::HashMap<u32, SearchPage>,
    pub contents: std::collections::HashMap<(u64, String), String>,
    pub fail_after: Option<usize>,
    pub search_calls: std::sync::Mutex<Vec<u32>>,
    pub content_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 페이지를 등록합니다.
    pub fn with_page(mut self, page: u32, result: SearchPage) -> Self {
        self.pages.insert(page, result);
        self
    }

    /// 파일 내용을 등록합니다.
    pub fn with_content(mut self, repository_id: u64, path: &str, content: &str) -> Self {
        self.contents
            .insert((repository_id, path.to_owned()), content.to_owned());
        self
    }

    /// `count`번 성공한 뒤 내용 조회가 실패하도록 설정합니다.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.search_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
impl SearchProvider for MockProvider {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, ScannerError> {
        if let Ok(mut calls) = self.search_calls.lock() {
            calls.push(query.page);
        }
        Ok(self.pages.get(&query.page).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
impl ContentProvider for MockProvider {
    async fn get_content(&self, repository_id: u64, path: &str) -> Result<String, ScannerError> {
        let done = self
            .content_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| done >= limit) {
            return Err(ScannerError::Api {
                status: 502,
                message: "mock failure".to_owned(),
            });
        }
        Ok(self
            .contents
            .get(&(repository_id, path.to_owned()))
            .cloned()
            .unwrap_or_default())
    }
}
