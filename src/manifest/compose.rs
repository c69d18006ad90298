// ABOUTME: Compose-style manifest format: a version token plus top-level services.
// ABOUTME: Variables are inferred from the interpolation tokens the file uses.

use serde::Deserialize;
use serde_yaml::Value;

use super::deserialize::{nullable_entries, optional_scalar};
use super::format::{FormatKind, ManifestFormat, has_key};
use super::validate::{ValidationReport, ValidationWarning, validate_manifest};
use super::{
    Manifest, Metadata, NetworkSpec, ParseError, ServiceSection, StackDefinition, VolumeSpec,
};
use crate::types::OrderedMap;
use crate::variables::{VariableSpec, references};

#[derive(Debug, Deserialize)]
struct RawCompose {
    #[serde(default, deserialize_with = "optional_scalar")]
    name: Option<String>,
    #[serde(default)]
    services: ServiceSection,
    #[serde(default, deserialize_with = "nullable_entries")]
    volumes: OrderedMap<VolumeSpec>,
    #[serde(default, deserialize_with = "nullable_entries")]
    networks: OrderedMap<NetworkSpec>,
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Sequence(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Mapping(map) => map.values().for_each(|v| collect_strings(v, out)),
        Value::Tagged(tagged) => collect_strings(&tagged.value, out),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Declare one variable per interpolation token, in order of first use.
///
/// The first inline default seen for a name becomes its default; a name
/// never given a default is required.
pub(crate) fn infer_variables(doc: &Value) -> OrderedMap<VariableSpec> {
    let mut strings = Vec::new();
    for key in ["services", "volumes", "networks"] {
        if let Some(section) = doc.get(key) {
            collect_strings(section, &mut strings);
        }
    }

    let mut variables: OrderedMap<VariableSpec> = OrderedMap::new();
    for reference in strings.into_iter().flat_map(references) {
        match variables.get_mut(&reference.name) {
            Some(spec) => {
                if spec.default.is_none() {
                    spec.default = reference.default;
                }
            }
            None => {
                variables.insert(
                    reference.name,
                    VariableSpec {
                        default: reference.default,
                        ..VariableSpec::default()
                    },
                );
            }
        }
    }
    variables
}

/// The `version` + `services` dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeFormat;

impl ManifestFormat for ComposeFormat {
    fn kind(&self) -> FormatKind {
        FormatKind::Compose
    }

    fn detect(&self, doc: &Value) -> bool {
        has_key(doc, "version") && has_key(doc, "services") && !has_key(doc, "metadata")
    }

    fn parse(&self, doc: Value) -> Result<Manifest, ParseError> {
        let variables = infer_variables(&doc);
        let raw: RawCompose = serde_yaml::from_value(doc)?;

        Ok(Manifest {
            format: FormatKind::Compose,
            metadata: Metadata {
                name: raw.name,
                ..Metadata::default()
            },
            root: StackDefinition {
                variables,
                services: raw.services.services,
                service_includes: raw.services.includes,
                volumes: raw.volumes,
                networks: raw.networks,
            },
            stacks: OrderedMap::new(),
        })
    }

    fn validate(&self, doc: Value) -> ValidationReport {
        let manifest = match self.parse(doc) {
            Ok(m) => m,
            Err(e) => return ValidationReport::from_parse_error(e),
        };
        let mut report = validate_manifest(&manifest);
        for (name, service) in manifest.root.services.iter() {
            if service.image.is_none() && service.build.is_some() {
                report.warn(ValidationWarning::BuildOnly {
                    service: name.to_string(),
                });
            }
        }
        report
    }
}
