//! 참조 그래프 -- `(패키지, 버전) -> 저장소 집합`
//!
//! 그래프 자체는 동기화 기능이 없는 평범한 자료구조입니다.
//! 동시 접근 제어는 소유자([`ReferenceScanner`](crate::ReferenceScanner))의
//! `RwLock`이 담당하며, 한 번의 삽입은 쓰기 잠금 한 번 안에서 끝납니다.

use std::collections::{BTreeSet, HashMap};

use crate::types::{PackageReference, RepositoryDescriptor};

/// 패키지 참조별 저장소 집합
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    entries: HashMap<PackageReference, BTreeSet<RepositoryDescriptor>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 참조에 저장소를 추가합니다. 집합이 없으면 새로 만듭니다.
    ///
    /// 새로 추가된 쌍이면 `true`, 이미 있던 쌍이면 `false`를 반환합니다.
    pub fn insert(
        &mut self,
        reference: PackageReference,
        repository: RepositoryDescriptor,
    ) -> bool {
        self.entries.entry(reference).or_default().insert(repository)
    }

    /// 모든 항목을 제거합니다.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 서로 다른 `(패키지, 버전)` 키의 수
    pub fn reference_count(&self) -> usize {
        self.entries.len()
    }

    /// 모든 `(참조, 저장소)` 쌍의 수
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// 참조를 선언한 저장소 집합을 반환합니다.
    pub fn repositories(
        &self,
        reference: &PackageReference,
    ) -> Option<&BTreeSet<RepositoryDescriptor>> {
        self.entries.get(reference)
    }

    /// 모든 쌍을 패키지 이름, 버전, 저장소 이름, URL 순으로 정렬해 반환합니다.
    pub fn entries(&self) -> Vec<(PackageReference, RepositoryDescriptor)> {
        let mut pairs: Vec<_> = self
            .entries
            .iter()
            .flat_map(|(reference, repos)| {
                repos
                    .iter()
                    .map(move |repo| (reference.clone(), repo.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }
}
