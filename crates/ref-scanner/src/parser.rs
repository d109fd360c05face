//! 매니페스트 파서 -- csproj 등 MSBuild 프로젝트 파일에서 패키지 참조 추출
//!
//! [`ManifestParser`]는 I/O와 상태가 없는 순수 파서입니다.
//!
//! # 인식하는 선언
//!
//! ```xml
//! <PackageReference Include="Lykke.Common" Version="7.0.1" />
//! <PackageReference Include="Lykke.Logs">
//!   <Version>5.2.0</Version>
//! </PackageReference>
//! ```
//!
//! 요소/속성 이름은 ASCII 대소문자를 구분하지 않습니다.
//! 속성 `Version`과 자식 요소 `<Version>`이 모두 있으면 속성을 사용합니다.
//!
//! # 실패 정책
//!
//! - 문서 자체가 잘못된 경우(태그 불일치, 닫히지 않은 요소, 잘못된 속성) 빈 결과
//! - 버전이 없거나 잘못된 개별 선언은 건너뛰고 나머지는 계속 처리

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::types::PackageReference;

const PACKAGE_REFERENCE_TAG: &[u8] = b"PackageReference";
const VERSION_TAG: &[u8] = b"Version";
const INCLUDE_ATTR: &[u8] = b"Include";
const VERSION_ATTR: &[u8] = b"Version";

/// 네임스페이스 접두어로 필터링하는 매니페스트 파서
#[derive(Debug, Clone)]
pub struct ManifestParser {
    namespace_prefix: String,
}

impl ManifestParser {
    /// 주어진 접두어로 시작하는 패키지만 추출하는 파서를 생성합니다.
    ///
    /// 빈 접두어는 모든 패키지를 허용합니다.
    pub fn new(namespace_prefix: impl Into<String>) -> Self {
        Self {
            namespace_prefix: namespace_prefix.into(),
        }
    }

    pub fn namespace_prefix(&self) -> &str {
        &self.namespace_prefix
    }

    /// 패키지 이름이 네임스페이스에 속하는지 확인합니다 (ASCII 대소문자 무시).
    pub fn in_namespace(&self, package_name: &str) -> bool {
        let prefix = self.namespace_prefix.as_bytes();
        package_name
            .as_bytes()
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    }

    /// 매니페스트 전체 텍스트에서 패키지 참조를 문서 순서대로 추출합니다.
    ///
    /// 같은 파일 안의 중복 선언도 그대로 반환합니다.
    /// 잘못된 문서는 빈 벡터를 반환하며 절대 실패하지 않습니다.
    pub fn parse(&self, manifest: &str) -> Vec<PackageReference> {
        match self.try_parse(manifest) {
            Ok(references) => references,
            Err(reason) => {
                debug!(reason = %reason, "malformed manifest, ignoring");
                Vec::new()
            }
        }
    }

    fn try_parse(&self, manifest: &str) -> Result<Vec<PackageReference>, String> {
        let manifest = manifest.strip_prefix('\u{feff}').unwrap_or(manifest);
        let mut reader = Reader::from_str(manifest);
        reader.config_mut().trim_text(true);

        let mut references = Vec::new();
        let mut depth = 0usize;
        let mut pending: Option<PendingDeclaration> = None;
        let mut in_version = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    depth += 1;
                    if pending.is_none() && is_tag(&e, PACKAGE_REFERENCE_TAG) {
                        pending = Some(PendingDeclaration::from_element(&e, depth)?);
                    } else if pending.as_ref().is_some_and(|decl| depth == decl.depth + 1)
                        && is_tag(&e, VERSION_TAG)
                    {
                        in_version = true;
                    }
                }
                Ok(Event::Empty(e)) => {
                    if pending.is_none() && is_tag(&e, PACKAGE_REFERENCE_TAG) {
                        let decl = PendingDeclaration::from_element(&e, depth + 1)?;
                        self.accept(decl, &mut references);
                    }
                }
                Ok(Event::Text(t)) => {
                    if in_version && let Some(decl) = pending.as_mut() {
                        let text = t.unescape().map_err(|e| e.to_string())?;
                        decl.version_text.push_str(&text);
                    }
                }
                Ok(Event::CData(c)) => {
                    if in_version && let Some(decl) = pending.as_mut() {
                        decl.version_text
                            .push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Ok(Event::End(_)) => {
                    if in_version {
                        in_version = false;
                    } else if pending.as_ref().is_some_and(|decl| decl.depth == depth)
                        && let Some(decl) = pending.take()
                    {
                        self.accept(decl, &mut references);
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) => {
                    if depth != 0 {
                        return Err(format!("unexpected end of document ({depth} open elements)"));
                    }
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    return Err(format!(
                        "xml error at position {}: {e}",
                        reader.error_position()
                    ));
                }
            }
        }

        Ok(references)
    }

    /// 완성된 선언을 검증하여 결과에 추가합니다.
    fn accept(&self, decl: PendingDeclaration, out: &mut Vec<PackageReference>) {
        let Some(name) = decl.name else {
            debug!("package reference without Include attribute, skipping");
            return;
        };

        if !self.in_namespace(&name) {
            return;
        }

        let version = decl.version_attr.or_else(|| {
            let text = decl.version_text.trim();
            (!text.is_empty()).then(|| text.to_owned())
        });

        let Some(version) = version else {
            debug!(package = %name, "package reference without version, skipping");
            return;
        };

        match PackageReference::parse(name, &version) {
            Ok(reference) => out.push(reference),
            Err(e) => debug!(error = %e, "invalid package version, skipping"),
        }
    }
}

/// 자식 요소를 기다리는 중인 `PackageReference` 선언
struct PendingDeclaration {
    name: Option<String>,
    version_attr: Option<String>,
    version_text: String,
    depth: usize,
}

impl PendingDeclaration {
    fn from_element(element: &BytesStart<'_>, depth: usize) -> Result<Self, String> {
        let mut decl = Self {
            name: None,
            version_attr: None,
            version_text: String::new(),
            depth,
        };

        for attr in element.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = attr.key.local_name();
            if key.as_ref().eq_ignore_ascii_case(INCLUDE_ATTR) {
                let value = attr.unescape_value().map_err(|e| e.to_string())?;
                decl.name = Some(value.trim().to_owned());
            } else if key.as_ref().eq_ignore_ascii_case(VERSION_ATTR) {
                let value = attr.unescape_value().map_err(|e| e.to_string())?;
                decl.version_attr = Some(value.trim().to_owned());
            }
        }

        Ok(decl)
    }
}

fn is_tag(element: &BytesStart<'_>, tag: &[u8]) -> bool {
    element.local_name().as_ref().eq_ignore_ascii_case(tag)
}

/// 한 번만 쓰는 호출자를 위한 편의 함수
pub fn parse_manifest(manifest: &str, namespace_prefix: &str) -> Vec<PackageReference> {
    ManifestParser::new(namespace_prefix).parse(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_and_versions(refs: &[PackageReference]) -> Vec<String> {
        refs.iter().map(ToString::to_string).collect()
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>netcoreapp2.0</TargetFramework>
    <Version>1.0.1</Version>
  </PropertyGroup>
  <ItemGroup>
    <PackageReference Include="Lykke.Common" Version="7.0.1" />
    <PackageReference Include="Newtonsoft.Json" Version="11.0.2" />
    <PackageReference Include="Lykke.Logs">
      <Version>5.2.0</Version>
    </PackageReference>
    <PackageReference Include="Lykke.SettingsReader" Version="2.4.0.12" />
  </ItemGroup>
</Project>
"#;

    #[test]
    fn extracts_in_namespace_references_in_document_order() {
        let refs = ManifestParser::new("Lykke").parse(SAMPLE);
        assert_eq!(
            names_and_versions(&refs),
            [
                "Lykke.Common 7.0.1",
                "Lykke.Logs 5.2.0",
                "Lykke.SettingsReader 2.4.0.12"
            ]
        );
    }

    #[test]
    fn project_version_property_is_not_a_reference() {
        let refs = ManifestParser::new("").parse(SAMPLE);
        assert_eq!(refs.len(), 4);
        assert!(refs.iter().all(|r| r.version().to_string() != "1.0.1"));
    }

    #[test]
    fn single_declaration() {
        let refs =
            parse_manifest(r#"<PackageReference Include="Lykke.Foo" Version="1.2.3" />"#, "Lykke");
        assert_eq!(names_and_versions(&refs), ["Lykke.Foo 1.2.3"]);
    }

    #[test]
    fn duplicates_are_preserved() {
        let manifest = r#"<Project><ItemGroup>
            <PackageReference Include="Lykke.Foo" Version="1.0.0" />
            <PackageReference Include="Lykke.Foo" Version="1.0.0" />
        </ItemGroup></Project>"#;
        assert_eq!(parse_manifest(manifest, "Lykke").len(), 2);
    }

    #[test]
    fn invalid_version_skips_only_that_declaration() {
        let manifest = r#"<Project><ItemGroup>
            <PackageReference Include="Lykke.A" Version="1.0.0" />
            <PackageReference Include="Lykke.B" Version="$(LykkeVersion)" />
            <PackageReference Include="Lykke.C" Version="2.0.*" />
            <PackageReference Include="Lykke.D" />
            <PackageReference Include="Lykke.E" Version="3.1" />
        </ItemGroup></Project>"#;
        let refs = parse_manifest(manifest, "Lykke");
        assert_eq!(names_and_versions(&refs), ["Lykke.A 1.0.0", "Lykke.E 3.1"]);
    }

    #[test]
    fn malformed_markup_yields_empty() {
        for manifest in [
            r#"<Project><ItemGroup><PackageReference Include="Lykke.A" Version="1.0.0" /></Project>"#,
            r#"<Project><ItemGroup><PackageReference Include="Lykke.A" Version="1.0.0" />"#,
            r#"<Project><PackageReference Include=Lykke.A Version="1.0.0" /></Project>"#,
            r#"</Project>"#,
        ] {
            assert!(parse_manifest(manifest, "Lykke").is_empty(), "{manifest}");
        }
    }

    #[test]
    fn non_xml_text_yields_empty() {
        assert!(parse_manifest("this is not a project file", "Lykke").is_empty());
        assert!(parse_manifest("", "Lykke").is_empty());
    }

    #[test]
    fn namespace_match_is_case_insensitive_prefix() {
        let parser = ManifestParser::new("Lykke");
        assert!(parser.in_namespace("Lykke"));
        assert!(parser.in_namespace("Lykke.Service.Client"));
        assert!(parser.in_namespace("lykke.common"));
        assert!(!parser.in_namespace("Lyk"));
        assert!(!parser.in_namespace("Microsoft.Extensions.Logging"));
        assert!(!parser.in_namespace("Лykke"));
    }

    #[test]
    fn element_and_attribute_names_ignore_case() {
        let manifest = r#"<Project>
            <packagereference include="Lykke.Foo" version="1.2.3" />
        </Project>"#;
        assert_eq!(
            names_and_versions(&parse_manifest(manifest, "Lykke")),
            ["Lykke.Foo 1.2.3"]
        );
    }

    #[test]
    fn attribute_version_wins_over_child_element() {
        let manifest = r#"<Project>
            <PackageReference Include="Lykke.Foo" Version="2.0.0">
                <Version>1.0.0</Version>
                <PrivateAssets>all</PrivateAssets>
            </PackageReference>
        </Project>"#;
        assert_eq!(
            names_and_versions(&parse_manifest(manifest, "Lykke")),
            ["Lykke.Foo 2.0.0"]
        );
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let manifest =
            "\u{feff}<Project><PackageReference Include=\"Lykke.Foo\" Version=\"1.0\" /></Project>";
        assert_eq!(parse_manifest(manifest, "Lykke").len(), 1);
    }

    #[test]
    fn escaped_attribute_values_are_unescaped() {
        let manifest = r#"<Project>
            <PackageReference Include="Lykke.Foo&amp;Bar" Version=" 1.0.0 " />
        </Project>"#;
        assert_eq!(
            names_and_versions(&parse_manifest(manifest, "Lykke")),
            ["Lykke.Foo&Bar 1.0.0"]
        );
    }
}
