// ABOUTME: Collaborator interfaces consumed by the orchestrator.
// ABOUTME: Container runtime that executes plans and environment lookup.

use async_trait::async_trait;
use serde::Serialize;

use crate::plan::DeploymentPlan;
use crate::prereq::Environment;
use crate::types::EnvironmentId;

/// Outcome of executing a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentResult {
    pub success: bool,
    /// Services whose containers started, in start order.
    pub deployed_services: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl DeploymentResult {
    /// Any container started; past this point a snapshot no longer helps.
    pub fn any_started(&self) -> bool {
        !self.deployed_services.is_empty()
    }

    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            "runtime reported failure without details".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}

/// Outcome of a whole-stack operation (remove, stop, start).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub errors: Vec<String>,
}

/// The runtime could not be reached at all.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("runtime unavailable: {0}")]
    Unavailable(String),

    #[error("runtime request failed: {0}")]
    Request(String),
}

/// Provisions networks, volumes, and containers for a compiled plan.
///
/// Per-service failures come back inside the result; `Err` means the call
/// itself never happened.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn execute_deployment(
        &self,
        environment: &EnvironmentId,
        plan: &DeploymentPlan,
    ) -> Result<DeploymentResult, RuntimeError>;

    async fn remove_stack(
        &self,
        environment: &EnvironmentId,
        stack_name: &str,
    ) -> Result<OperationResult, RuntimeError>;

    /// Stop every container of the stack. The defaults for stop and start
    /// report success without doing anything, for runtimes that only
    /// deploy and remove.
    async fn stop_stack(
        &self,
        _environment: &EnvironmentId,
        _stack_name: &str,
    ) -> Result<OperationResult, RuntimeError> {
        Ok(OperationResult {
            success: true,
            errors: Vec::new(),
        })
    }

    /// Start the stopped containers of the stack.
    async fn start_stack(
        &self,
        _environment: &EnvironmentId,
        _stack_name: &str,
    ) -> Result<OperationResult, RuntimeError> {
        Ok(OperationResult {
            success: true,
            errors: Vec::new(),
        })
    }
}

/// Read-only lookup of deployment targets.
pub trait EnvironmentLookup: Send + Sync {
    fn get(&self, id: &EnvironmentId) -> Option<Environment>;
}
