// ABOUTME: Facts recorded by the deployment aggregate and its phase history entries.
// ABOUTME: Callers drain facts after each mutation and publish them as they see fit.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::status::{DeploymentPhase, OperationMode};
use crate::types::EnvironmentId;

/// Something that happened to a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeploymentEvent {
    Started {
        environment_id: EnvironmentId,
        stack_name: String,
        stack_version: Option<String>,
    },
    ProgressUpdated {
        phase: DeploymentPhase,
        percentage: u8,
        message: String,
    },
    Completed {
        service_count: usize,
    },
    CompletedWithError {
        message: String,
    },
    Stopped,
    Restarted,
    Removed,
    CancellationRequested {
        reason: String,
    },
    OperationModeChanged {
        from: OperationMode,
        to: OperationMode,
    },
    SnapshotCreated {
        stack_version: String,
    },
    SnapshotCleared,
    RolledBack {
        stack_version: String,
    },
    UpgradeRecorded {
        previous_version: Option<String>,
        new_version: String,
        upgrade_count: u32,
    },
    UpgradeCompleted {
        service_count: usize,
    },
    VariablesApplied {
        count: usize,
    },
    ServiceStatusChanged {
        service: String,
        from: String,
        to: String,
    },
}

impl DeploymentEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DeploymentEvent::Started { .. } => "started",
            DeploymentEvent::ProgressUpdated { .. } => "progress_updated",
            DeploymentEvent::Completed { .. } => "completed",
            DeploymentEvent::CompletedWithError { .. } => "completed_with_error",
            DeploymentEvent::Stopped => "stopped",
            DeploymentEvent::Restarted => "restarted",
            DeploymentEvent::Removed => "removed",
            DeploymentEvent::CancellationRequested { .. } => "cancellation_requested",
            DeploymentEvent::OperationModeChanged { .. } => "operation_mode_changed",
            DeploymentEvent::SnapshotCreated { .. } => "snapshot_created",
            DeploymentEvent::SnapshotCleared => "snapshot_cleared",
            DeploymentEvent::RolledBack { .. } => "rolled_back",
            DeploymentEvent::UpgradeRecorded { .. } => "upgrade_recorded",
            DeploymentEvent::UpgradeCompleted { .. } => "upgrade_completed",
            DeploymentEvent::VariablesApplied { .. } => "variables_applied",
            DeploymentEvent::ServiceStatusChanged { .. } => "service_status_changed",
        }
    }
}

/// One entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseRecord {
    pub phase: DeploymentPhase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
