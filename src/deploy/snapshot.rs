// ABOUTME: Rollback snapshot of a running deployment, taken before an upgrade.
// ABOUTME: Captures version, variables, and per-service images.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::service::DeployedService;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSnapshot {
    pub stack_version: String,
    pub variables: BTreeMap<String, String>,
    /// Image per service; services without a known image are left out.
    pub service_images: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DeploymentSnapshot {
    pub(crate) fn capture(
        stack_version: &str,
        variables: &BTreeMap<String, String>,
        services: &[DeployedService],
        description: Option<String>,
    ) -> Self {
        Self {
            stack_version: stack_version.to_string(),
            variables: variables.clone(),
            service_images: services
                .iter()
                .filter_map(|s| s.image.clone().map(|image| (s.name.clone(), image)))
                .collect(),
            description,
            created_at: Utc::now(),
        }
    }

    pub fn image_for(&self, service: &str) -> Option<&str> {
        self.service_images.get(service).map(String::as_str)
    }
}
