// ABOUTME: A service owned by a deployment, with its container identity and status label.
// ABOUTME: Replaced wholesale whenever the deployment's service set changes.

use serde::Serialize;

use crate::plan::DeploymentStep;

/// Status labels that count as healthy.
const HEALTHY_LABELS: [&str; 2] = ["running", "healthy"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployedService {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub status: String,
}

impl DeployedService {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            container_id: None,
            container_name: None,
            image: None,
            status: status.into(),
        }
    }

    /// Service as planned, before the runtime reports a container id.
    pub fn from_step(step: &DeploymentStep, status: impl Into<String>) -> Self {
        Self {
            name: step.service.clone(),
            container_id: None,
            container_name: Some(step.container_name.clone()),
            image: Some(step.image.clone()),
            status: status.into(),
        }
    }

    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn is_healthy(&self) -> bool {
        HEALTHY_LABELS
            .iter()
            .any(|label| self.status.eq_ignore_ascii_case(label))
    }

    pub fn is_running(&self) -> bool {
        self.status.eq_ignore_ascii_case("running")
    }
}
