// ABOUTME: Native manifest format: product metadata plus services or named sub-stacks.
// ABOUTME: Also parses bare service fragments pulled in through includes.

use serde::Deserialize;
use serde_yaml::Value;

use super::deserialize::nullable_entries;
use super::format::{FormatKind, ManifestFormat, has_key};
use super::validate::{ValidationReport, ValidationWarning, validate_manifest};
use super::{
    Manifest, Metadata, NetworkSpec, ParseError, ServiceSection, StackDefinition, StackEntry,
    VolumeSpec,
};
use crate::types::OrderedMap;
use crate::variables::VariableSpec;

/// Variables, services, volumes and networks as written at any level.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStack {
    #[serde(default, deserialize_with = "nullable_entries")]
    variables: OrderedMap<VariableSpec>,
    #[serde(default)]
    services: ServiceSection,
    #[serde(default, deserialize_with = "nullable_entries")]
    volumes: OrderedMap<VolumeSpec>,
    #[serde(default, deserialize_with = "nullable_entries")]
    networks: OrderedMap<NetworkSpec>,
}

impl From<RawStack> for StackDefinition {
    fn from(raw: RawStack) -> Self {
        StackDefinition {
            variables: raw.variables,
            services: raw.services.services,
            service_includes: raw.services.includes,
            volumes: raw.volumes,
            networks: raw.networks,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    metadata: Metadata,
    #[serde(flatten)]
    root: RawStack,
    #[serde(default)]
    stacks: OrderedMap<Value>,
}

fn stack_entry(name: &str, value: Value) -> Result<StackEntry, ParseError> {
    if let Some(map) = value.as_mapping()
        && map.len() == 1
        && let Some(Value::String(path)) = map.get("include")
    {
        return Ok(StackEntry::Include(path.clone()));
    }

    let raw: RawStack = serde_yaml::from_value(value).map_err(|e| {
        ParseError::Yaml(serde::de::Error::custom(format!("stack '{name}': {e}")))
    })?;
    Ok(StackEntry::Inline(raw.into()))
}

/// The `metadata` + `services`/`stacks` dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFormat;

impl ManifestFormat for NativeFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Native
    }

    fn detect(&self, doc: &Value) -> bool {
        doc.get("metadata").is_some_and(Value::is_mapping)
            && (has_key(doc, "services") || has_key(doc, "stacks"))
    }

    fn parse(&self, doc: Value) -> Result<Manifest, ParseError> {
        let raw: RawManifest = serde_yaml::from_value(doc)?;

        let mut stacks = OrderedMap::new();
        for (name, value) in raw.stacks {
            let entry = stack_entry(&name, value)?;
            stacks.insert(name, entry);
        }

        Ok(Manifest {
            format: FormatKind::Native,
            metadata: raw.metadata,
            root: raw.root.into(),
            stacks,
        })
    }

    fn validate(&self, doc: Value) -> ValidationReport {
        let manifest = match self.parse(doc) {
            Ok(m) => m,
            Err(e) => return ValidationReport::from_parse_error(e),
        };
        let mut report = validate_manifest(&manifest);
        if manifest.metadata.name.is_none() {
            report.warn(ValidationWarning::MissingProductName);
        }
        report
    }
}

/// Parse an included file that is not a full manifest: either a document
/// with top-level `services`/`variables`/... keys, or a bare service map.
pub(crate) fn parse_fragment(doc: Value) -> Result<StackDefinition, ParseError> {
    let structured = ["services", "variables", "volumes", "networks"]
        .iter()
        .any(|key| has_key(&doc, key));

    if structured {
        let raw: RawStack = serde_yaml::from_value(doc)?;
        return Ok(raw.into());
    }

    let section: ServiceSection = serde_yaml::from_value(doc)?;
    Ok(StackDefinition {
        services: section.services,
        service_includes: section.includes,
        ..StackDefinition::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse;

    #[test]
    fn parses_single_stack_in_declaration_order() {
        let text = r#"
metadata:
  name: shop
  productVersion: 2.1.0
  tags: [web, retail]
variables:
  DB_PASSWORD: {type: password}
  TAG: {default: latest}
services:
  web:
    image: shop/web:${TAG}
    dependsOn: [db]
    ports: ["8080:80"]
  db:
    image: postgres:16
    volumes: ["dbdata:/var/lib/postgresql/data"]
volumes:
  dbdata:
"#;
        let manifest = parse(text).unwrap();
        assert_eq!(manifest.format, FormatKind::Native);
        assert_eq!(manifest.metadata.product_version.as_deref(), Some("2.1.0"));
        let names: Vec<_> = manifest.root.services.keys().collect();
        assert_eq!(names, vec!["web", "db"]);
        assert_eq!(manifest.root.variables.keys().collect::<Vec<_>>(), ["DB_PASSWORD", "TAG"]);
        assert!(manifest.root.volumes.contains_key("dbdata"));
        assert!(!manifest.is_multi_stack());
    }

    #[test]
    fn parses_inline_and_include_stacks() {
        let text = r#"
metadata: {name: suite}
variables:
  DOMAIN: {default: example.com}
stacks:
  api:
    services:
      api: {image: suite/api}
  worker:
    include: worker.yml
"#;
        let manifest = parse(text).unwrap();
        assert!(manifest.is_multi_stack());
        assert!(matches!(manifest.stacks.get("api"), Some(StackEntry::Inline(_))));
        assert!(matches!(
            manifest.stacks.get("worker"),
            Some(StackEntry::Include(p)) if p == "worker.yml"
        ));
        assert!(manifest.has_unresolved_includes());
    }

    #[test]
    fn service_include_list_is_split_out() {
        let text = r#"
metadata: {name: shop}
services:
  include: [extra.yml]
  web: {image: nginx}
"#;
        let manifest = parse(text).unwrap();
        assert_eq!(manifest.root.service_includes, vec!["extra.yml".to_string()]);
        assert!(manifest.root.services.contains_key("web"));
    }

    #[test]
    fn malformed_service_fails_whole_parse() {
        let text = "metadata: {name: x}\nservices:\n  web: {ports: {a: {b: c}}}\n";
        assert!(matches!(parse(text), Err(ParseError::Yaml(_))));
    }

    #[test]
    fn fragment_can_be_bare_service_map() {
        let doc: Value = serde_yaml::from_str("cache: {image: redis:7}\n").unwrap();
        let def = parse_fragment(doc).unwrap();
        assert!(def.services.contains_key("cache"));
    }
}
