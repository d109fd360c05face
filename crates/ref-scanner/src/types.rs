//! 도메인 타입 -- 패키지 참조, 버전, 저장소 식별자
//!
//! 모든 값은 생성 후 변경되지 않으며, 그래프의 키와 집합 원소로 사용됩니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScannerError;

/// 점으로 구분된 숫자 버전 (`major.minor[.build[.revision]]`)
///
/// 구성 요소별로 숫자 비교합니다. 없는 구성 요소는 어떤 값보다도 작습니다
/// (`1.2` < `1.2.0`). 따라서 `1.2`와 `1.2.0`은 서로 다른 버전입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageVersion {
    major: u32,
    minor: u32,
    build: Option<u32>,
    revision: Option<u32>,
}

impl PackageVersion {
    /// 구성 요소로 버전을 생성합니다.
    pub fn new(major: u32, minor: u32, build: Option<u32>, revision: Option<u32>) -> Self {
        // revision은 build가 있을 때만 의미가 있음
        let revision = if build.is_some() { revision } else { None };
        Self {
            major,
            minor,
            build,
            revision,
        }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn build(&self) -> Option<u32> {
        self.build
    }

    pub fn revision(&self) -> Option<u32> {
        self.revision
    }
}

impl FromStr for PackageVersion {
    type Err = ScannerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ScannerError::VersionParse {
            version: s.to_owned(),
            reason,
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty version string".to_owned()));
        }

        let parts: Vec<&str> = trimmed.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(invalid(format!(
                "expected 2-4 components, found {}",
                parts.len()
            )));
        }

        let mut components = [0u32; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid(format!("component '{part}' is not a number")));
            }
            *slot = part
                .parse::<u32>()
                .map_err(|e| invalid(format!("component '{part}': {e}")))?;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            build: (parts.len() > 2).then_some(components[2]),
            revision: (parts.len() > 3).then_some(components[3]),
        })
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{build}")?;
            if let Some(revision) = self.revision {
                write!(f, ".{revision}")?;
            }
        }
        Ok(())
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// 매니페스트에 선언된 패키지 참조 `(이름, 버전)`
///
/// 두 필드가 모두 같을 때만 같은 그래프 키입니다.
/// 정렬 순서는 이름(바이트 순) 다음 버전입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageReference {
    name: String,
    version: PackageVersion,
}

impl PackageReference {
    pub fn new(name: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// 이름과 버전 문자열로 참조를 생성합니다.
    ///
    /// # Errors
    ///
    /// 버전이 점으로 구분된 숫자 형식이 아니면 `ScannerError::VersionParse`
    pub fn parse(name: impl Into<String>, version: &str) -> Result<Self, ScannerError> {
        Ok(Self::new(name, version.parse()?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> PackageVersion {
        self.version
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// 소스 저장소 식별자 (표시 이름 + 절대 URL)
///
/// 그래프에서 집합 원소로만 사용되며 두 필드 모두로 비교합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    name: String,
    url: String,
}

impl RepositoryDescriptor {
    /// 저장소 전체 이름과 웹 URL로 식별자를 생성합니다.
    ///
    /// # Errors
    ///
    /// 이름이 비어 있거나 URL이 절대 http(s) URL이 아니면 `ScannerError::InvalidRepository`
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self, ScannerError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ScannerError::InvalidRepository {
                name,
                reason: "repository name must not be empty".to_owned(),
            });
        }

        let parsed = reqwest::Url::parse(url).map_err(|e| ScannerError::InvalidRepository {
            name: name.clone(),
            reason: format!("invalid url '{url}': {e}"),
        })?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ScannerError::InvalidRepository {
                name,
                reason: format!("url '{url}' is not an absolute http(s) url"),
            });
        }

        Ok(Self {
            name,
            url: parsed.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for RepositoryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> PackageVersion {
        s.parse().unwrap()
    }

    #[test]
    fn version_parses_two_to_four_components() {
        assert_eq!(v("1.2").to_string(), "1.2");
        assert_eq!(v("1.2.3").to_string(), "1.2.3");
        assert_eq!(v("1.2.3.4").to_string(), "1.2.3.4");
        assert_eq!(v(" 4.0.1 ").to_string(), "4.0.1");
    }

    #[test]
    fn version_rejects_malformed_strings() {
        for bad in [
            "", "1", "1.2.3.4.5", "1.x", "1.2.*", "$(Version)", "1.0.0-beta", "1..2", "-1.0",
            "99999999999.0",
        ] {
            assert!(bad.parse::<PackageVersion>().is_err(), "{bad}");
        }
    }

    #[test]
    fn version_ordering_is_numeric() {
        assert!(v("1.2.0") < v("1.10.0"));
        assert!(v("1.10.0") < v("2.0.0"));
        assert!(v("1.9.9.9") < v("1.10"));
    }

    #[test]
    fn missing_component_sorts_first() {
        assert!(v("1.2") < v("1.2.0"));
        assert!(v("1.2.0") < v("1.2.0.0"));
        assert_ne!(v("1.2"), v("1.2.0"));
    }

    #[test]
    fn version_serializes_as_string() {
        let json = serde_json::to_string(&v("3.1.4")).unwrap();
        assert_eq!(json, "\"3.1.4\"");
        let back: PackageVersion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("3.1.4"));
        assert!(serde_json::from_str::<PackageVersion>("\"nope\"").is_err());
    }

    #[test]
    fn version_new_drops_revision_without_build() {
        let version = PackageVersion::new(1, 0, None, Some(7));
        assert_eq!(version.revision(), None);
        assert_eq!(version.to_string(), "1.0");
    }

    #[test]
    fn reference_equality_uses_name_and_version() {
        let a = PackageReference::parse("Lykke.Foo", "1.2.3").unwrap();
        let b = PackageReference::parse("Lykke.Foo", "1.2.3").unwrap();
        let c = PackageReference::parse("Lykke.Foo", "1.2.4").unwrap();
        let d = PackageReference::parse("lykke.foo", "1.2.3").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.to_string(), "Lykke.Foo 1.2.3");
    }

    #[test]
    fn reference_sorts_by_name_then_version() {
        let mut refs = vec![
            PackageReference::parse("Lykke.B", "1.0").unwrap(),
            PackageReference::parse("Lykke.A", "1.10.0").unwrap(),
            PackageReference::parse("Lykke.A", "1.2.0").unwrap(),
        ];
        refs.sort();
        let rendered: Vec<String> = refs.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["Lykke.A 1.2.0", "Lykke.A 1.10.0", "Lykke.B 1.0"]);
    }

    #[test]
    fn repository_requires_absolute_http_url() {
        let repo = RepositoryDescriptor::new("org/repo1", "https://host/org/repo1").unwrap();
        assert_eq!(repo.name(), "org/repo1");
        assert_eq!(repo.url(), "https://host/org/repo1");

        assert!(RepositoryDescriptor::new("org/repo1", "/org/repo1").is_err());
        assert!(RepositoryDescriptor::new("org/repo1", "mailto:dev@host").is_err());
        assert!(RepositoryDescriptor::new("  ", "https://host/org/repo1").is_err());
    }

    #[test]
    fn repository_compares_both_fields() {
        let a = RepositoryDescriptor::new("org/repo", "https://host/org/repo").unwrap();
        let b = RepositoryDescriptor::new("org/repo", "https://mirror/org/repo").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.clone(), a);
    }
}
