// ABOUTME: Deployment plan: the fully resolved, ordered output of compiling a stack.
// ABOUTME: Handed as-is to the container runtime collaborator.

mod compiler;
mod error;
mod graph;

pub use compiler::PlanCompiler;
pub use error::{CompileError, CompileErrors};
pub use graph::DependencyGraph;

use serde::Serialize;

use crate::manifest::{CommandSpec, HealthcheckSpec, RestartPolicy};
use crate::types::OrderedMap;
use crate::variables::VariableSet;

/// How a service volume entry is backed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MountKind {
    /// Named volume, scoped to the stack unless external.
    Named,
    /// Host path.
    Bind,
    /// Container path only; the runtime creates an anonymous volume.
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMount {
    pub kind: MountKind,
    /// Resolved volume name or host path; empty for anonymous volumes.
    pub source: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl VolumeMount {
    pub fn read_only(&self) -> bool {
        self.mode
            .as_deref()
            .is_some_and(|m| m.split(',').any(|flag| flag == "ro"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedNetwork {
    pub name: String,
    pub external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVolume {
    pub name: String,
    pub external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "OrderedMap::is_empty")]
    pub driver_opts: OrderedMap<String>,
}

/// One service, ready to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentStep {
    pub service: String,
    pub image: String,
    pub version_tag: Option<String>,
    pub container_name: String,
    /// No published ports.
    pub internal: bool,
    /// Resolved network names.
    pub networks: Vec<String>,
    pub environment: OrderedMap<String>,
    pub labels: OrderedMap<String>,
    pub ports: Vec<String>,
    pub volumes: Vec<VolumeMount>,
    pub depends_on: Vec<String>,
    /// Position of the service in the manifest.
    pub declaration_index: usize,
    pub restart: RestartPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<CommandSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<HealthcheckSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentPlan {
    pub stack_name: String,
    /// Dependencies first.
    pub steps: Vec<DeploymentStep>,
    pub networks: OrderedMap<ResolvedNetwork>,
    pub volumes: OrderedMap<ResolvedVolume>,
    pub variables: VariableSet,
}

impl DeploymentPlan {
    pub fn step(&self, service: &str) -> Option<&DeploymentStep> {
        self.steps.iter().find(|s| s.service == service)
    }

    pub fn service_order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.service.as_str()).collect()
    }

    /// Image per service, in deployment order.
    pub fn images(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps
            .iter()
            .map(|s| (s.service.as_str(), s.image.as_str()))
    }
}
