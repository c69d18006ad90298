// ABOUTME: Deployment lifecycle: aggregate, status machines, snapshots, and orchestration.
// ABOUTME: Exports the aggregate, its facts, collaborator traits, and the registry.

mod deployment;
mod error;
mod events;
mod orchestrator;
mod registry;
mod runtime;
mod service;
mod snapshot;
mod status;

pub use deployment::{Deployment, Progress};
pub use error::TransitionError;
pub use events::{DeploymentEvent, PhaseRecord};
pub use orchestrator::{
    InstallRequest, Orchestrator, OrchestratorError, OrchestratorErrorKind, UpgradeOutcome,
    UpgradeRequest,
};
pub use registry::{DeploymentGuard, DeploymentHandle, DeploymentRegistry};
pub use runtime::{
    ContainerRuntime, DeploymentResult, EnvironmentLookup, OperationResult, RuntimeError,
};
pub use service::DeployedService;
pub use snapshot::DeploymentSnapshot;
pub use status::{DeploymentPhase, DeploymentStatus, OperationMode};
