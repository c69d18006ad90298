// ABOUTME: Deployment status, operation mode, and phase enums with their transition tables.
// ABOUTME: Status and mode are orthogonal; each has its own adjacency rule.

use serde::Serialize;
use std::fmt;

/// Lifecycle status of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Pending,
    Running,
    Stopped,
    Failed,
    Removed,
}

impl DeploymentStatus {
    /// Legal targets from this status.
    pub fn allowed_transitions(self) -> &'static [DeploymentStatus] {
        use DeploymentStatus::*;
        match self {
            Pending => &[Running, Failed],
            Running => &[Stopped, Failed],
            Stopped => &[Running, Removed],
            Failed | Removed => &[],
        }
    }

    pub fn can_transition_to(self, target: DeploymentStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// Failed and Removed accept no further lifecycle changes.
    pub fn is_terminal(self) -> bool {
        matches!(self, DeploymentStatus::Failed | DeploymentStatus::Removed)
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentStatus::Pending => "pending",
            DeploymentStatus::Running => "running",
            DeploymentStatus::Stopped => "stopped",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::Removed => "removed",
        };
        f.write_str(s)
    }
}

/// What the operator is doing with a deployment, independent of its status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    #[default]
    Normal,
    Maintenance,
    Migrating,
    Failed,
    Stopped,
}

impl OperationMode {
    pub fn allowed_transitions(self) -> &'static [OperationMode] {
        use OperationMode::*;
        match self {
            Normal => &[Maintenance, Migrating, Stopped],
            Maintenance => &[Normal],
            Migrating => &[Normal, Failed],
            Failed => &[Normal],
            Stopped => &[Normal],
        }
    }

    pub fn can_transition_to(self, target: OperationMode) -> bool {
        self.allowed_transitions().contains(&target)
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationMode::Normal => "normal",
            OperationMode::Maintenance => "maintenance",
            OperationMode::Migrating => "migrating",
            OperationMode::Failed => "failed",
            OperationMode::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Step of a deployment, as shown in progress and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    Initializing,
    ValidatingPrerequisites,
    PullingImages,
    CreatingNetworks,
    CreatingVolumes,
    StartingServices,
    HealthChecking,
    Upgrading,
    Stopping,
    Restarting,
    Removing,
    RollingBack,
    Completed,
    Failed,
}

impl fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentPhase::Initializing => "initializing",
            DeploymentPhase::ValidatingPrerequisites => "validating prerequisites",
            DeploymentPhase::PullingImages => "pulling images",
            DeploymentPhase::CreatingNetworks => "creating networks",
            DeploymentPhase::CreatingVolumes => "creating volumes",
            DeploymentPhase::StartingServices => "starting services",
            DeploymentPhase::HealthChecking => "health checking",
            DeploymentPhase::Upgrading => "upgrading",
            DeploymentPhase::Stopping => "stopping",
            DeploymentPhase::Restarting => "restarting",
            DeploymentPhase::Removing => "removing",
            DeploymentPhase::RollingBack => "rolling back",
            DeploymentPhase::Completed => "completed",
            DeploymentPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}
