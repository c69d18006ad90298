// ABOUTME: Manifest model and parsing for native and Compose-style stack descriptions.
// ABOUTME: Exposes format detection, parsing, include resolution, and validation.

mod compose;
pub(crate) mod deserialize;
mod error;
mod format;
mod healthcheck;
mod include;
mod native;
mod restart_policy;
mod validate;
mod variables;

pub use compose::ComposeFormat;
pub use error::{ParseError, SelectStackError};
pub use format::{FormatKind, ManifestFormat, detect_format, format_for, parse, validate};
pub use healthcheck::HealthcheckSpec;
pub use include::ManifestParser;
pub use native::NativeFormat;
pub use restart_policy::RestartPolicy;
pub use validate::{ValidationError, ValidationReport, ValidationWarning, validate_manifest};
pub use variables::{extract_stack_variables, extract_variables};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::types::OrderedMap;
use crate::variables::VariableSpec;
use deserialize::{key_value_map, name_list, optional_scalar, port_list, scalar_list, volume_list};

/// Product metadata shared by every stack in a manifest.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub tags: Vec<String>,
    #[serde(default, alias = "product_version", deserialize_with = "optional_scalar")]
    pub product_version: Option<String>,
}

/// Command or entrypoint: a shell string or an exec-form argument list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Shell(String),
    Exec(Vec<String>),
}

impl CommandSpec {
    /// Argument vector as the runtime receives it.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            CommandSpec::Shell(cmd) => vec!["/bin/sh".to_string(), "-c".to_string(), cmd.clone()],
            CommandSpec::Exec(args) => args.clone(),
        }
    }

    pub(crate) fn interpolated(&self, f: impl Fn(&str) -> String) -> CommandSpec {
        match self {
            CommandSpec::Shell(cmd) => CommandSpec::Shell(f(cmd)),
            CommandSpec::Exec(args) => CommandSpec::Exec(args.iter().map(|a| f(a)).collect()),
        }
    }
}

/// Local build source; accepted in place of an image by validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BuildSpec {
    Context(String),
    Detailed {
        context: String,
        #[serde(default)]
        dockerfile: Option<String>,
    },
}

/// One service declaration. Native manifests use camelCase keys, Compose
/// files snake_case; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSpec {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub build: Option<BuildSpec>,
    #[serde(default, alias = "container_name")]
    pub container_name: Option<String>,
    #[serde(default, deserialize_with = "port_list")]
    pub ports: Vec<String>,
    #[serde(default, deserialize_with = "volume_list")]
    pub volumes: Vec<String>,
    #[serde(default, deserialize_with = "key_value_map")]
    pub environment: OrderedMap<String>,
    #[serde(default, deserialize_with = "key_value_map")]
    pub labels: OrderedMap<String>,
    #[serde(default, deserialize_with = "name_list")]
    pub networks: Vec<String>,
    #[serde(default, alias = "depends_on", deserialize_with = "name_list")]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub restart: Option<RestartPolicy>,
    #[serde(default)]
    pub command: Option<CommandSpec>,
    #[serde(default)]
    pub entrypoint: Option<CommandSpec>,
    #[serde(default, alias = "working_dir")]
    pub working_dir: Option<String>,
    #[serde(default, deserialize_with = "optional_scalar")]
    pub user: Option<String>,
    #[serde(default)]
    pub healthcheck: Option<HealthcheckSpec>,
}

impl ServiceSpec {
    pub fn has_image_or_build(&self) -> bool {
        self.image.as_deref().is_some_and(|i| !i.trim().is_empty()) || self.build.is_some()
    }
}

/// Named volume declaration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub external: bool,
    /// Runtime name for external volumes, when it differs from the key.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "driver_opts", deserialize_with = "key_value_map")]
    pub driver_opts: OrderedMap<String>,
}

/// Network declaration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSpec {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "driver_opts", deserialize_with = "key_value_map")]
    pub driver_opts: OrderedMap<String>,
}

/// Service map as written in a manifest: services plus an optional
/// `include` list of sibling files contributing extra services.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceSection {
    pub services: OrderedMap<ServiceSpec>,
    pub includes: Vec<String>,
}

impl<'de> Deserialize<'de> for ServiceSection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SectionVisitor;

        impl<'de> Visitor<'de> for SectionVisitor {
            type Value = ServiceSection;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of service names to service definitions")
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(ServiceSection::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut section = ServiceSection::default();
                while let Some(key) = access.next_key::<String>()? {
                    if key == "include" {
                        let files: Vec<String> = access.next_value()?;
                        section.includes.extend(files);
                        continue;
                    }
                    let value: serde_yaml::Value = access.next_value()?;
                    let spec: ServiceSpec = serde_yaml::from_value(value).map_err(|e| {
                        serde::de::Error::custom(format!("service '{key}': {e}"))
                    })?;
                    section.services.insert(key, spec);
                }
                Ok(section)
            }
        }

        deserializer.deserialize_any(SectionVisitor)
    }
}

/// Everything needed to deploy one stack.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StackDefinition {
    pub variables: OrderedMap<VariableSpec>,
    pub services: OrderedMap<ServiceSpec>,
    /// Sibling files still to be merged in; empty once includes are resolved.
    pub service_includes: Vec<String>,
    pub volumes: OrderedMap<VolumeSpec>,
    pub networks: OrderedMap<NetworkSpec>,
}

impl StackDefinition {
    /// Overlay `other` on top of `self`; entries in `other` win.
    ///
    /// Returns the names that were defined on both sides, prefixed with their
    /// kind (`service:web`), so the caller can report them.
    pub fn merge_overwriting(&mut self, other: StackDefinition) -> Vec<String> {
        let mut duplicates = Vec::new();
        for (name, spec) in other.variables {
            if self.variables.insert(name.clone(), spec).is_some() {
                duplicates.push(format!("variable:{name}"));
            }
        }
        for (name, spec) in other.services {
            if self.services.insert(name.clone(), spec).is_some() {
                duplicates.push(format!("service:{name}"));
            }
        }
        for (name, spec) in other.volumes {
            if self.volumes.insert(name.clone(), spec).is_some() {
                duplicates.push(format!("volume:{name}"));
            }
        }
        for (name, spec) in other.networks {
            if self.networks.insert(name.clone(), spec).is_some() {
                duplicates.push(format!("network:{name}"));
            }
        }
        self.service_includes.extend(other.service_includes);
        duplicates
    }

    /// Add entries from `other` that `self` does not define yet.
    ///
    /// Returns the service names that collided and were kept from `self`.
    pub fn merge_keeping_existing(&mut self, other: StackDefinition) -> Vec<String> {
        let mut collisions = Vec::new();
        for (name, spec) in other.services {
            if self.services.contains_key(&name) {
                collisions.push(name);
            } else {
                self.services.insert(name, spec);
            }
        }
        for (name, spec) in other.variables {
            if !self.variables.contains_key(&name) {
                self.variables.insert(name, spec);
            }
        }
        for (name, spec) in other.volumes {
            if !self.volumes.contains_key(&name) {
                self.volumes.insert(name, spec);
            }
        }
        for (name, spec) in other.networks {
            if !self.networks.contains_key(&name) {
                self.networks.insert(name, spec);
            }
        }
        collisions
    }
}

/// A named sub-stack: written inline or pointing at another manifest file.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEntry {
    Inline(StackDefinition),
    Include(String),
}

/// Structural form of a parsed manifest.
///
/// `root` holds the top-level variables, services, volumes and networks. In a
/// multi-stack manifest the root variables are shared by every sub-stack.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    pub format: FormatKind,
    pub metadata: Metadata,
    pub root: StackDefinition,
    pub stacks: OrderedMap<StackEntry>,
}

impl Manifest {
    pub fn is_multi_stack(&self) -> bool {
        !self.stacks.is_empty()
    }

    pub fn stack_names(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys()
    }

    /// True when any stack still carries an unresolved file reference.
    pub fn has_unresolved_includes(&self) -> bool {
        !self.root.service_includes.is_empty()
            || self.stacks.values().any(|entry| match entry {
                StackEntry::Include(_) => true,
                StackEntry::Inline(def) => !def.service_includes.is_empty(),
            })
    }

    /// Pick the stack to deploy.
    ///
    /// Single-stack manifests ignore `name`. Multi-stack manifests need a name
    /// unless they declare exactly one sub-stack; the result is the root
    /// definition overlaid with the selected sub-stack.
    pub fn select_stack(&self, name: Option<&str>) -> Result<StackDefinition, SelectStackError> {
        if !self.is_multi_stack() {
            return Ok(self.root.clone());
        }

        let (stack_name, entry) = match name {
            Some(n) => (
                n,
                self.stacks
                    .get(n)
                    .ok_or_else(|| SelectStackError::UnknownStack(n.to_string()))?,
            ),
            None if self.stacks.len() == 1 => match self.stacks.first() {
                Some(first) => first,
                None => return Err(SelectStackError::StackRequired),
            },
            None => return Err(SelectStackError::StackRequired),
        };

        match entry {
            StackEntry::Include(path) => Err(SelectStackError::UnresolvedInclude {
                stack: stack_name.to_string(),
                path: path.clone(),
            }),
            StackEntry::Inline(def) => {
                let mut merged = self.root.clone();
                merged.merge_overwriting(def.clone());
                Ok(merged)
            }
        }
    }

    /// Collapse every stack into one definition (root first, then each
    /// sub-stack in declaration order, later entries winning).
    pub(crate) fn flatten(self) -> (StackDefinition, Vec<String>) {
        let mut merged = self.root;
        let mut duplicates = Vec::new();
        for (_, entry) in self.stacks {
            if let StackEntry::Inline(def) = entry {
                duplicates.extend(merged.merge_overwriting(def));
            }
        }
        (merged, duplicates)
    }
}
