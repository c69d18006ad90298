// ABOUTME: Application-layer driver that compiles stacks and feeds runtime results into deployments.
// ABOUTME: Install, upgrade with point-of-no-return snapshots, rollback, stop, restart, remove.

use snafu::{ResultExt, Snafu, ensure};
use std::sync::Arc;
use tracing::{info, warn};

use super::deployment::Deployment;
use super::error::TransitionError;
use super::runtime::{ContainerRuntime, DeploymentResult, EnvironmentLookup, RuntimeError};
use super::service::DeployedService;
use super::status::{DeploymentPhase, DeploymentStatus};
use crate::manifest::StackDefinition;
use crate::plan::{CompileError, CompileErrors, DeploymentPlan, PlanCompiler};
use crate::types::{DeploymentId, EnvironmentId};
use crate::variables::VariableResolver;

/// Application-level failure while driving a deployment.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum OrchestratorError {
    #[snafu(display("environment {environment} not found"))]
    EnvironmentNotFound { environment: EnvironmentId },

    #[snafu(display("stack {stack} does not compile: {}", summarize(errors)))]
    Compile { stack: String, errors: CompileErrors },

    #[snafu(display("illegal lifecycle call: {source}"))]
    Transition { source: TransitionError },

    #[snafu(display("container runtime error: {source}"))]
    Runtime { source: RuntimeError },

    #[snafu(display("runtime could not {operation} stack {stack}: {}", errors.join("; ")))]
    Operation {
        operation: &'static str,
        stack: String,
        errors: Vec<String>,
    },
}

fn summarize(errors: &CompileErrors) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorErrorKind {
    EnvironmentNotFound,
    /// Services depend on each other in a loop.
    CircularDependency,
    /// Only required variables are missing.
    MissingVariables,
    /// Any other compile failure.
    InvalidStack,
    /// The caller asked for something the deployment's state forbids.
    InvalidState,
    RuntimeUnavailable,
    RuntimeOperation,
}

impl OrchestratorError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> OrchestratorErrorKind {
        match self {
            OrchestratorError::EnvironmentNotFound { .. } => {
                OrchestratorErrorKind::EnvironmentNotFound
            }
            OrchestratorError::Compile { errors, .. } => {
                if errors
                    .iter()
                    .any(|e| matches!(e, CompileError::CircularDependency { .. }))
                {
                    OrchestratorErrorKind::CircularDependency
                } else if errors.iter().all(|e| e.missing_variable().is_some()) {
                    OrchestratorErrorKind::MissingVariables
                } else {
                    OrchestratorErrorKind::InvalidStack
                }
            }
            OrchestratorError::Transition { .. } => OrchestratorErrorKind::InvalidState,
            OrchestratorError::Runtime { .. } => OrchestratorErrorKind::RuntimeUnavailable,
            OrchestratorError::Operation { .. } => OrchestratorErrorKind::RuntimeOperation,
        }
    }

    /// Names of missing required variables, if this is a compile failure.
    pub fn missing_variables(&self) -> Vec<&str> {
        match self {
            OrchestratorError::Compile { errors, .. } => {
                errors.iter().filter_map(CompileError::missing_variable).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl From<TransitionError> for OrchestratorError {
    fn from(source: TransitionError) -> Self {
        OrchestratorError::Transition { source }
    }
}

/// What a first deployment needs.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub environment_id: EnvironmentId,
    pub stack_name: String,
    pub stack_version: Option<String>,
    pub stack: StackDefinition,
    pub variables: VariableResolver,
}

/// A new version of an already running stack.
#[derive(Debug, Clone)]
pub struct UpgradeRequest {
    pub stack_version: String,
    pub stack: StackDefinition,
    pub variables: VariableResolver,
}

/// How an upgrade ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeOutcome {
    Completed,
    /// Nothing started; the snapshot is still there.
    FailedRollbackAvailable,
    /// At least one container started before the failure.
    FailedPastPointOfNoReturn,
}

/// Drives deployments through the container runtime.
///
/// Callers hold the deployment exclusively (see `DeploymentRegistry`) for
/// the duration of each call.
#[derive(Clone)]
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    environments: Arc<dyn EnvironmentLookup>,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        environments: Arc<dyn EnvironmentLookup>,
    ) -> Self {
        Self {
            runtime,
            environments,
        }
    }

    /// Compile and deploy a stack for the first time.
    ///
    /// Errors before the deployment exists (unknown environment, compile
    /// failure) are returned; runtime failures are recorded on the returned
    /// deployment as status Failed.
    pub async fn install(&self, request: InstallRequest) -> Result<Deployment, OrchestratorError> {
        let InstallRequest {
            environment_id,
            stack_name,
            stack_version,
            stack,
            variables,
        } = request;

        ensure!(
            self.environments.get(&environment_id).is_some(),
            EnvironmentNotFoundSnafu {
                environment: environment_id.clone(),
            }
        );

        let plan = compile(&stack_name, &stack, &variables)?;
        let mut deployment = Deployment::start(
            DeploymentId::generate(),
            environment_id,
            stack_name,
            stack_version,
            plan.variables.as_map().clone(),
        );
        info!(
            deployment = %deployment.id(),
            stack = deployment.stack_name(),
            services = plan.steps.len(),
            "installing stack"
        );

        self.deploy_plan(&mut deployment, &plan).await?;
        publish(&mut deployment);
        Ok(deployment)
    }

    /// Upgrade a running deployment.
    ///
    /// A snapshot is taken first and dropped as soon as any upgraded
    /// container has started. A failure before that point leaves the
    /// deployment Failed with rollback available.
    pub async fn upgrade(
        &self,
        deployment: &mut Deployment,
        request: UpgradeRequest,
    ) -> Result<UpgradeOutcome, OrchestratorError> {
        let previous = deployment.stack_version().map(str::to_string);
        deployment.create_snapshot(Some(format!(
            "before upgrade to {}",
            request.stack_version
        )))?;
        deployment.record_upgrade(previous, request.stack_version.clone())?;

        let plan = match compile(deployment.stack_name(), &request.stack, &request.variables) {
            Ok(plan) => plan,
            Err(err) => {
                deployment.mark_as_failed(err.to_string())?;
                publish(deployment);
                return Err(err);
            }
        };
        deployment.apply_variables(plan.variables.as_map().clone())?;
        deployment.update_progress(
            DeploymentPhase::StartingServices,
            10,
            format!("Starting {} service(s)", plan.steps.len()),
        )?;

        let outcome = match self
            .runtime
            .execute_deployment(deployment.environment_id(), &plan)
            .await
        {
            Ok(result) => {
                warn_result(&result);
                if result.any_started() {
                    deployment.clear_snapshot();
                }
                if result.success {
                    deployment.complete_upgrade(services_from(&plan, &result))?;
                    UpgradeOutcome::Completed
                } else {
                    deployment.mark_as_failed(result.error_summary())?;
                    if result.any_started() {
                        UpgradeOutcome::FailedPastPointOfNoReturn
                    } else {
                        UpgradeOutcome::FailedRollbackAvailable
                    }
                }
            }
            Err(err) => {
                warn!(deployment = %deployment.id(), error = %err, "runtime call failed during upgrade");
                deployment.mark_as_failed(err.to_string())?;
                UpgradeOutcome::FailedRollbackAvailable
            }
        };
        publish(deployment);
        Ok(outcome)
    }

    /// Restore the snapshot of a failed upgrade and redeploy it.
    ///
    /// `stack` is the definition of the snapshot's version.
    pub async fn rollback(
        &self,
        deployment: &mut Deployment,
        stack: &StackDefinition,
    ) -> Result<(), OrchestratorError> {
        deployment.rollback_to_previous()?;
        let resolver = VariableResolver::new().with_explicit(deployment.variables().clone());
        let plan = match compile(deployment.stack_name(), stack, &resolver) {
            Ok(plan) => plan,
            Err(err) => {
                deployment.mark_as_failed(err.to_string())?;
                publish(deployment);
                return Err(err);
            }
        };
        info!(
            deployment = %deployment.id(),
            version = deployment.stack_version().unwrap_or_default(),
            "redeploying previous version"
        );
        self.deploy_plan(deployment, &plan).await?;
        publish(deployment);
        Ok(())
    }

    /// Stop a running deployment.
    pub async fn stop(&self, deployment: &mut Deployment) -> Result<(), OrchestratorError> {
        ensure_transition(deployment, DeploymentStatus::Stopped)?;
        let result = self
            .runtime
            .stop_stack(deployment.environment_id(), deployment.stack_name())
            .await
            .context(RuntimeSnafu)?;
        ensure!(
            result.success,
            OperationSnafu {
                operation: "stop",
                stack: deployment.stack_name(),
                errors: result.errors,
            }
        );
        deployment.mark_as_stopped()?;
        publish(deployment);
        Ok(())
    }

    /// Start a stopped deployment again.
    pub async fn restart(&self, deployment: &mut Deployment) -> Result<(), OrchestratorError> {
        if deployment.status() != DeploymentStatus::Stopped {
            return Err(TransitionError::InvalidTransition {
                from: deployment.status(),
                to: DeploymentStatus::Running,
            }
            .into());
        }
        let result = self
            .runtime
            .start_stack(deployment.environment_id(), deployment.stack_name())
            .await
            .context(RuntimeSnafu)?;
        ensure!(
            result.success,
            OperationSnafu {
                operation: "start",
                stack: deployment.stack_name(),
                errors: result.errors,
            }
        );
        deployment.restart()?;
        publish(deployment);
        Ok(())
    }

    /// Remove the stack's containers, then mark the deployment removed.
    ///
    /// A failed removal leaves the deployment untouched.
    pub async fn remove(&self, deployment: &mut Deployment) -> Result<(), OrchestratorError> {
        if deployment.status() == DeploymentStatus::Removed {
            return Err(TransitionError::AlreadyRemoved.into());
        }
        let result = self
            .runtime
            .remove_stack(deployment.environment_id(), deployment.stack_name())
            .await
            .context(RuntimeSnafu)?;
        ensure!(
            result.success,
            OperationSnafu {
                operation: "remove",
                stack: deployment.stack_name(),
                errors: result.errors,
            }
        );
        deployment.mark_as_removed()?;
        publish(deployment);
        Ok(())
    }

    /// Execute `plan` and move a Pending deployment to Running or Failed.
    async fn deploy_plan(
        &self,
        deployment: &mut Deployment,
        plan: &DeploymentPlan,
    ) -> Result<(), OrchestratorError> {
        deployment.update_progress(
            DeploymentPhase::StartingServices,
            10,
            format!("Starting {} service(s)", plan.steps.len()),
        )?;
        match self
            .runtime
            .execute_deployment(deployment.environment_id(), plan)
            .await
        {
            Ok(result) => {
                warn_result(&result);
                if result.success {
                    deployment.mark_as_running(services_from(plan, &result))?;
                } else {
                    deployment.mark_as_failed(result.error_summary())?;
                }
            }
            Err(err) => {
                warn!(deployment = %deployment.id(), error = %err, "runtime call failed");
                deployment.mark_as_failed(err.to_string())?;
            }
        }
        Ok(())
    }
}

fn compile(
    stack_name: &str,
    stack: &StackDefinition,
    variables: &VariableResolver,
) -> Result<DeploymentPlan, OrchestratorError> {
    PlanCompiler::new(stack_name)
        .compile_with(stack, variables)
        .map_err(|errors| OrchestratorError::Compile {
            stack: stack_name.to_string(),
            errors,
        })
}

fn ensure_transition(
    deployment: &Deployment,
    target: DeploymentStatus,
) -> Result<(), TransitionError> {
    if deployment.can_transition_to(target) {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition {
            from: deployment.status(),
            to: target,
        })
    }
}

/// Services the runtime reports as started, in plan order.
fn services_from(plan: &DeploymentPlan, result: &DeploymentResult) -> Vec<DeployedService> {
    plan.steps
        .iter()
        .filter(|step| result.deployed_services.contains(&step.service))
        .map(|step| DeployedService::from_step(step, "running"))
        .collect()
}

fn warn_result(result: &DeploymentResult) {
    for warning in &result.warnings {
        warn!(warning = %warning, "runtime warning");
    }
}

/// Drain and log the facts recorded since the last publish.
fn publish(deployment: &mut Deployment) {
    for event in deployment.take_events() {
        info!(
            deployment = %deployment.id(),
            event = event.name(),
            "{}",
            serde_json::to_string(&event).unwrap_or_default()
        );
    }
}
