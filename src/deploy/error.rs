// ABOUTME: Errors for illegal lifecycle calls on a deployment aggregate.
// ABOUTME: A rejected call leaves the aggregate exactly as it was.

use super::status::{DeploymentStatus, OperationMode};

/// A mutator was called in a state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Status change not present in the transition table.
    #[error("cannot move deployment from {from} to {to}")]
    InvalidTransition {
        from: DeploymentStatus,
        to: DeploymentStatus,
    },

    /// Deployment is Failed or Removed.
    #[error("deployment is {status} and accepts no further changes")]
    Terminal { status: DeploymentStatus },

    /// Already removed.
    #[error("deployment is already removed")]
    AlreadyRemoved,

    /// Operation mode change not allowed by the mode adjacency rule.
    #[error("cannot change operation mode from {from} to {to}")]
    InvalidModeTransition {
        from: OperationMode,
        to: OperationMode,
    },

    /// Progress outside 0..=100.
    #[error("progress percentage {0} is outside 0-100")]
    InvalidPercentage(u8),

    /// Cancellation can only be requested before the deployment runs.
    #[error("cancellation can only be requested while pending (deployment is {status})")]
    CancellationNotAllowed { status: DeploymentStatus },

    /// Confirmation without a prior request.
    #[error("no cancellation has been requested")]
    NoCancellationRequested,

    /// A snapshot is already pending.
    #[error("a rollback snapshot already exists")]
    SnapshotExists,

    /// Snapshots are only taken of running deployments.
    #[error("snapshot requires a running deployment (deployment is {status})")]
    SnapshotRequiresRunning { status: DeploymentStatus },

    /// Snapshot of a deployment without a stack version.
    #[error("snapshot requires a stack version")]
    MissingVersion,

    /// Rollback without a pending snapshot.
    #[error("no rollback snapshot is available")]
    NoSnapshot,

    /// Rollback of a deployment that has not failed.
    #[error("rollback requires a failed deployment (deployment is {status})")]
    RollbackRequiresFailed { status: DeploymentStatus },

    /// Upgrades start from a running deployment.
    #[error("upgrade requires a running deployment (deployment is {status})")]
    UpgradeRequiresRunning { status: DeploymentStatus },

    /// Service is not owned by this deployment.
    #[error("unknown service: {0}")]
    UnknownService(String),
}
