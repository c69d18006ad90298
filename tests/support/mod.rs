// ABOUTME: In-memory container runtime and environment lookup for orchestrator tests.
// ABOUTME: Runtime replies are scripted per call and every call is recorded.

#![allow(dead_code)]

use async_trait::async_trait;
use bosun::deploy::{
    ContainerRuntime, DeploymentResult, EnvironmentLookup, OperationResult, RuntimeError,
};
use bosun::plan::DeploymentPlan;
use bosun::prereq::Environment;
use bosun::types::{EnvironmentId, OrganizationId};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A reply for the next `execute_deployment` call.
pub enum Reply {
    /// Start every planned service.
    Success,
    /// Report success without listing any started service.
    SuccessUnreported,
    /// Start the first `started` services, then fail with `error`.
    Partial { started: usize, error: String },
    /// The runtime cannot be reached.
    Unreachable,
}

#[derive(Default)]
pub struct FakeRuntime {
    replies: Mutex<VecDeque<Reply>>,
    operation_failure: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.replies.lock().push_back(reply);
        self
    }

    /// Make stop, start, and remove report failure.
    pub fn failing_operations(self, error: &str) -> Self {
        *self.operation_failure.lock() = Some(error.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn operation(&self, name: &str, stack: &str) -> OperationResult {
        self.calls.lock().push(format!("{name} {stack}"));
        match self.operation_failure.lock().clone() {
            Some(error) => OperationResult {
                success: false,
                errors: vec![error],
            },
            None => OperationResult {
                success: true,
                errors: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn execute_deployment(
        &self,
        _environment: &EnvironmentId,
        plan: &DeploymentPlan,
    ) -> Result<DeploymentResult, RuntimeError> {
        let order: Vec<String> = plan.service_order().into_iter().map(String::from).collect();
        self.calls.lock().push(format!("deploy {}", order.join(",")));

        let reply = self.replies.lock().pop_front().unwrap_or(Reply::Success);
        match reply {
            Reply::Success => Ok(DeploymentResult {
                success: true,
                deployed_services: order,
                ..DeploymentResult::default()
            }),
            Reply::SuccessUnreported => Ok(DeploymentResult {
                success: true,
                ..DeploymentResult::default()
            }),
            Reply::Partial { started, error } => Ok(DeploymentResult {
                success: false,
                deployed_services: order.into_iter().take(started).collect(),
                warnings: vec!["container exited early".to_string()],
                errors: vec![error],
            }),
            Reply::Unreachable => Err(RuntimeError::Unavailable("socket closed".to_string())),
        }
    }

    async fn remove_stack(
        &self,
        _environment: &EnvironmentId,
        stack_name: &str,
    ) -> Result<OperationResult, RuntimeError> {
        Ok(self.operation("remove", stack_name))
    }

    async fn stop_stack(
        &self,
        _environment: &EnvironmentId,
        stack_name: &str,
    ) -> Result<OperationResult, RuntimeError> {
        Ok(self.operation("stop", stack_name))
    }

    async fn start_stack(
        &self,
        _environment: &EnvironmentId,
        stack_name: &str,
    ) -> Result<OperationResult, RuntimeError> {
        Ok(self.operation("start", stack_name))
    }
}

pub struct Environments(pub Vec<Environment>);

impl Environments {
    pub fn with(id: &str) -> Self {
        Self(vec![Environment {
            id: EnvironmentId::new(id),
            name: id.to_string(),
            organization_id: OrganizationId::new("org-1"),
        }])
    }
}

impl EnvironmentLookup for Environments {
    fn get(&self, id: &EnvironmentId) -> Option<Environment> {
        self.0.iter().find(|env| &env.id == id).cloned()
    }
}
