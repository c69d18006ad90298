// ABOUTME: Deployment aggregate: status, operation mode, progress, services, and snapshot.
// ABOUTME: Every lifecycle change goes through a mutator that validates before it mutates.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::TransitionError;
use super::events::{DeploymentEvent, PhaseRecord};
use super::service::DeployedService;
use super::snapshot::DeploymentSnapshot;
use super::status::{DeploymentPhase, DeploymentStatus, OperationMode};
use crate::types::{DeploymentId, EnvironmentId};

/// Current phase, percentage, and message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub phase: DeploymentPhase,
    pub percentage: u8,
    pub message: String,
}

/// One stack deployed into one environment.
///
/// Mutators are synchronous and take `&mut self`; callers serialize access
/// per deployment. Each successful mutator records facts that the caller
/// collects with [`take_events`](Self::take_events).
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    id: DeploymentId,
    environment_id: EnvironmentId,
    stack_name: String,
    stack_version: Option<String>,
    status: DeploymentStatus,
    operation_mode: OperationMode,
    progress: Progress,
    phase_history: Vec<PhaseRecord>,
    variables: BTreeMap<String, String>,
    services: Vec<DeployedService>,
    pending_snapshot: Option<DeploymentSnapshot>,
    error_message: Option<String>,
    cancellation_requested: bool,
    cancellation_reason: Option<String>,
    previous_version: Option<String>,
    last_upgraded_at: Option<DateTime<Utc>>,
    upgrade_count: u32,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<DeploymentEvent>,
}

impl Deployment {
    /// Begin a deployment: status Pending, phase Initializing.
    pub fn start(
        id: DeploymentId,
        environment_id: EnvironmentId,
        stack_name: impl Into<String>,
        stack_version: Option<String>,
        variables: BTreeMap<String, String>,
    ) -> Self {
        let stack_name = stack_name.into();
        let now = Utc::now();
        let message = format!("Deploying stack {stack_name}");
        let mut deployment = Self {
            id,
            environment_id: environment_id.clone(),
            stack_name: stack_name.clone(),
            stack_version: stack_version.clone(),
            status: DeploymentStatus::Pending,
            operation_mode: OperationMode::Normal,
            progress: Progress {
                phase: DeploymentPhase::Initializing,
                percentage: 0,
                message: message.clone(),
            },
            phase_history: Vec::new(),
            variables,
            services: Vec::new(),
            pending_snapshot: None,
            error_message: None,
            cancellation_requested: false,
            cancellation_reason: None,
            previous_version: None,
            last_upgraded_at: None,
            upgrade_count: 0,
            created_at: now,
            completed_at: None,
            events: Vec::new(),
        };
        deployment.record_phase(DeploymentPhase::Initializing, message);
        deployment.events.push(DeploymentEvent::Started {
            environment_id,
            stack_name,
            stack_version,
        });
        deployment
    }

    // Accessors

    pub fn id(&self) -> &DeploymentId {
        &self.id
    }

    pub fn environment_id(&self) -> &EnvironmentId {
        &self.environment_id
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn stack_version(&self) -> Option<&str> {
        self.stack_version.as_deref()
    }

    pub fn status(&self) -> DeploymentStatus {
        self.status
    }

    pub fn operation_mode(&self) -> OperationMode {
        self.operation_mode
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn phase_history(&self) -> &[PhaseRecord] {
        &self.phase_history
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn services(&self) -> &[DeployedService] {
        &self.services
    }

    pub fn pending_snapshot(&self) -> Option<&DeploymentSnapshot> {
        self.pending_snapshot.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.cancellation_requested
    }

    pub fn cancellation_reason(&self) -> Option<&str> {
        self.cancellation_reason.as_deref()
    }

    pub fn previous_version(&self) -> Option<&str> {
        self.previous_version.as_deref()
    }

    pub fn last_upgraded_at(&self) -> Option<DateTime<Utc>> {
        self.last_upgraded_at
    }

    pub fn upgrade_count(&self) -> u32 {
        self.upgrade_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Facts recorded since the last call.
    pub fn take_events(&mut self) -> Vec<DeploymentEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[DeploymentEvent] {
        &self.events
    }

    pub fn can_transition_to(&self, target: DeploymentStatus) -> bool {
        self.status.can_transition_to(target)
    }

    // Internal helpers

    fn record_phase(&mut self, phase: DeploymentPhase, message: impl Into<String>) {
        self.phase_history.push(PhaseRecord {
            phase,
            message: message.into(),
            timestamp: Utc::now(),
        });
    }

    fn set_progress(&mut self, phase: DeploymentPhase, percentage: u8, message: String) {
        self.progress = Progress {
            phase,
            percentage,
            message: message.clone(),
        };
        self.record_phase(phase, message);
    }

    fn ensure_not_terminal(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal {
                status: self.status,
            });
        }
        Ok(())
    }

    fn ensure_transition(&self, target: DeploymentStatus) -> Result<(), TransitionError> {
        if !self.can_transition_to(target) {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        Ok(())
    }

    fn set_all_service_status(&mut self, status: &str) {
        for service in &mut self.services {
            service.status = status.to_string();
        }
    }

    // Lifecycle

    /// Report progress of a running phase.
    pub fn update_progress(
        &mut self,
        phase: DeploymentPhase,
        percentage: u8,
        message: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.ensure_not_terminal()?;
        if percentage > 100 {
            return Err(TransitionError::InvalidPercentage(percentage));
        }
        let message = message.into();
        self.set_progress(phase, percentage, message.clone());
        self.events.push(DeploymentEvent::ProgressUpdated {
            phase,
            percentage,
            message,
        });
        Ok(())
    }

    /// Deployment finished; `services` becomes the owned service set.
    pub fn mark_as_running(&mut self, services: Vec<DeployedService>) -> Result<(), TransitionError> {
        self.ensure_transition(DeploymentStatus::Running)?;
        let count = services.len();
        self.status = DeploymentStatus::Running;
        self.services = services;
        self.completed_at = Some(Utc::now());
        self.set_progress(
            DeploymentPhase::Completed,
            100,
            format!("Deployment completed with {count} service(s)"),
        );
        self.events
            .push(DeploymentEvent::Completed { service_count: count });
        Ok(())
    }

    /// Allowed from any non-terminal status, including Stopped.
    pub fn mark_as_failed(&mut self, message: impl Into<String>) -> Result<(), TransitionError> {
        self.ensure_not_terminal()?;
        let message = message.into();
        self.status = DeploymentStatus::Failed;
        self.error_message = Some(message.clone());
        self.completed_at = Some(Utc::now());
        let percentage = self.progress.percentage;
        self.set_progress(
            DeploymentPhase::Failed,
            percentage,
            format!("Deployment failed: {message}"),
        );
        self.events
            .push(DeploymentEvent::CompletedWithError { message });
        Ok(())
    }

    /// Running -> Stopped. Also moves the operation mode to Stopped when the
    /// mode allows it.
    pub fn mark_as_stopped(&mut self) -> Result<(), TransitionError> {
        self.ensure_transition(DeploymentStatus::Stopped)?;
        self.status = DeploymentStatus::Stopped;
        self.set_all_service_status("stopped");
        self.record_phase(DeploymentPhase::Stopping, "Stack stopped");
        self.events.push(DeploymentEvent::Stopped);
        if self.operation_mode.can_transition_to(OperationMode::Stopped) {
            self.apply_mode(OperationMode::Stopped);
        }
        Ok(())
    }

    /// Stopped -> Running. A Stopped operation mode returns to Normal.
    pub fn restart(&mut self) -> Result<(), TransitionError> {
        if self.status != DeploymentStatus::Stopped {
            return Err(TransitionError::InvalidTransition {
                from: self.status,
                to: DeploymentStatus::Running,
            });
        }
        self.status = DeploymentStatus::Running;
        self.set_all_service_status("starting");
        self.record_phase(DeploymentPhase::Restarting, "Stack restarting");
        self.events.push(DeploymentEvent::Restarted);
        if self.operation_mode == OperationMode::Stopped {
            self.apply_mode(OperationMode::Normal);
        }
        Ok(())
    }

    /// Allowed from every status except Removed itself, so failed and
    /// pending deployments can be cleaned up.
    pub fn mark_as_removed(&mut self) -> Result<(), TransitionError> {
        if self.status == DeploymentStatus::Removed {
            return Err(TransitionError::AlreadyRemoved);
        }
        self.status = DeploymentStatus::Removed;
        self.set_all_service_status("removed");
        self.record_phase(DeploymentPhase::Removing, "Stack removed");
        self.events.push(DeploymentEvent::Removed);
        Ok(())
    }

    // Cancellation

    pub fn request_cancellation(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        if self.status != DeploymentStatus::Pending {
            return Err(TransitionError::CancellationNotAllowed {
                status: self.status,
            });
        }
        let reason = reason.into();
        self.cancellation_requested = true;
        self.cancellation_reason = Some(reason.clone());
        self.events
            .push(DeploymentEvent::CancellationRequested { reason });
        Ok(())
    }

    /// Finish a requested cancellation by failing the deployment.
    pub fn confirm_cancellation(&mut self) -> Result<(), TransitionError> {
        if !self.cancellation_requested {
            return Err(TransitionError::NoCancellationRequested);
        }
        let reason = self
            .cancellation_reason
            .clone()
            .unwrap_or_else(|| "no reason given".to_string());
        self.mark_as_failed(format!("Cancelled: {reason}"))
    }

    // Operation mode

    fn apply_mode(&mut self, to: OperationMode) {
        let from = self.operation_mode;
        self.operation_mode = to;
        self.events
            .push(DeploymentEvent::OperationModeChanged { from, to });
    }

    /// Move to `to` if the mode adjacency rule allows it.
    ///
    /// A terminal status blocks every change except recovery from the
    /// Failed mode back to Normal.
    pub fn change_operation_mode(&mut self, to: OperationMode) -> Result<(), TransitionError> {
        let recovering = self.operation_mode == OperationMode::Failed && to == OperationMode::Normal;
        if !recovering {
            self.ensure_not_terminal()?;
        }
        if !self.operation_mode.can_transition_to(to) {
            return Err(TransitionError::InvalidModeTransition {
                from: self.operation_mode,
                to,
            });
        }
        self.apply_mode(to);
        Ok(())
    }

    pub fn enter_maintenance(&mut self) -> Result<(), TransitionError> {
        self.change_operation_mode(OperationMode::Maintenance)
    }

    pub fn exit_maintenance(&mut self) -> Result<(), TransitionError> {
        if self.operation_mode != OperationMode::Maintenance {
            return Err(TransitionError::InvalidModeTransition {
                from: self.operation_mode,
                to: OperationMode::Normal,
            });
        }
        self.change_operation_mode(OperationMode::Normal)
    }

    pub fn start_migration(&mut self) -> Result<(), TransitionError> {
        self.change_operation_mode(OperationMode::Migrating)
    }

    pub fn complete_migration(&mut self) -> Result<(), TransitionError> {
        if self.operation_mode != OperationMode::Migrating {
            return Err(TransitionError::InvalidModeTransition {
                from: self.operation_mode,
                to: OperationMode::Normal,
            });
        }
        self.change_operation_mode(OperationMode::Normal)
    }

    pub fn fail_migration(&mut self) -> Result<(), TransitionError> {
        self.change_operation_mode(OperationMode::Failed)
    }

    /// Failed mode -> Normal; allowed even when the status is terminal.
    pub fn recover(&mut self) -> Result<(), TransitionError> {
        if self.operation_mode != OperationMode::Failed {
            return Err(TransitionError::InvalidModeTransition {
                from: self.operation_mode,
                to: OperationMode::Normal,
            });
        }
        self.change_operation_mode(OperationMode::Normal)
    }

    // Snapshot and rollback

    /// Capture version, variables, and service images before an upgrade.
    pub fn create_snapshot(&mut self, description: Option<String>) -> Result<(), TransitionError> {
        if self.status != DeploymentStatus::Running {
            return Err(TransitionError::SnapshotRequiresRunning {
                status: self.status,
            });
        }
        let version = match self.stack_version.as_deref() {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => return Err(TransitionError::MissingVersion),
        };
        if self.pending_snapshot.is_some() {
            return Err(TransitionError::SnapshotExists);
        }
        self.pending_snapshot = Some(DeploymentSnapshot::capture(
            &version,
            &self.variables,
            &self.services,
            description,
        ));
        self.events.push(DeploymentEvent::SnapshotCreated {
            stack_version: version,
        });
        Ok(())
    }

    /// Drop the pending snapshot. Called at the point of no return, once the
    /// first upgraded container has started.
    pub fn clear_snapshot(&mut self) {
        if self.pending_snapshot.take().is_some() {
            self.events.push(DeploymentEvent::SnapshotCleared);
        }
    }

    pub fn can_rollback(&self) -> bool {
        self.pending_snapshot.is_some() && self.status == DeploymentStatus::Failed
    }

    /// Restore the snapshot's version and variables and start over from
    /// Pending. The snapshot is consumed.
    pub fn rollback_to_previous(&mut self) -> Result<(), TransitionError> {
        if self.pending_snapshot.is_none() {
            return Err(TransitionError::NoSnapshot);
        }
        if self.status != DeploymentStatus::Failed {
            return Err(TransitionError::RollbackRequiresFailed {
                status: self.status,
            });
        }
        let Some(snapshot) = self.pending_snapshot.take() else {
            return Err(TransitionError::NoSnapshot);
        };

        let version = snapshot.stack_version;
        self.stack_version = Some(version.clone());
        self.variables = snapshot.variables;
        for service in &mut self.services {
            if let Some(image) = snapshot.service_images.get(&service.name) {
                service.image = Some(image.clone());
            }
        }
        self.status = DeploymentStatus::Pending;
        self.error_message = None;
        self.cancellation_requested = false;
        self.cancellation_reason = None;
        self.completed_at = None;
        self.record_phase(
            DeploymentPhase::RollingBack,
            format!("Rolled back to version {version}"),
        );
        self.progress = Progress {
            phase: DeploymentPhase::Initializing,
            percentage: 0,
            message: format!("Redeploying version {version}"),
        };
        self.events.push(DeploymentEvent::RolledBack {
            stack_version: version,
        });
        Ok(())
    }

    // Upgrades

    pub fn can_upgrade(&self) -> bool {
        self.status == DeploymentStatus::Running
    }

    /// Note an upgrade from `previous` to `new` on a running deployment.
    pub fn record_upgrade(
        &mut self,
        previous: Option<String>,
        new: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if !self.can_upgrade() {
            return Err(TransitionError::UpgradeRequiresRunning {
                status: self.status,
            });
        }
        let new = new.into();
        self.previous_version = previous.clone();
        self.stack_version = Some(new.clone());
        self.upgrade_count += 1;
        self.last_upgraded_at = Some(Utc::now());
        let message = match &previous {
            Some(prev) => format!("Upgrading from {prev} to {new}"),
            None => format!("Upgrading to {new}"),
        };
        self.set_progress(DeploymentPhase::Upgrading, 0, message);
        self.events.push(DeploymentEvent::UpgradeRecorded {
            previous_version: previous,
            new_version: new,
            upgrade_count: self.upgrade_count,
        });
        Ok(())
    }

    /// Upgraded services are up; the status stays Running. A completed
    /// upgrade is past the point of no return, so any pending snapshot is
    /// consumed.
    pub fn complete_upgrade(&mut self, services: Vec<DeployedService>) -> Result<(), TransitionError> {
        if !self.can_upgrade() {
            return Err(TransitionError::UpgradeRequiresRunning {
                status: self.status,
            });
        }
        self.clear_snapshot();
        let count = services.len();
        self.services = services;
        self.completed_at = Some(Utc::now());
        self.set_progress(
            DeploymentPhase::Completed,
            100,
            format!("Upgrade completed with {count} service(s)"),
        );
        self.events
            .push(DeploymentEvent::UpgradeCompleted { service_count: count });
        Ok(())
    }

    /// Replace the resolved variables, e.g. before redeploying.
    pub fn apply_variables(
        &mut self,
        variables: BTreeMap<String, String>,
    ) -> Result<(), TransitionError> {
        self.ensure_not_terminal()?;
        let count = variables.len();
        self.variables = variables;
        self.events.push(DeploymentEvent::VariablesApplied { count });
        Ok(())
    }

    // Services

    pub fn are_all_services_healthy(&self) -> bool {
        self.services.iter().all(DeployedService::is_healthy)
    }

    pub fn unhealthy_services(&self) -> Vec<&DeployedService> {
        self.services.iter().filter(|s| !s.is_healthy()).collect()
    }

    pub fn running_service_count(&self) -> usize {
        self.services.iter().filter(|s| s.is_running()).count()
    }

    /// Set a service's status label; a fact is recorded only on change.
    pub fn update_service_status(
        &mut self,
        service: &str,
        status: impl Into<String>,
    ) -> Result<(), TransitionError> {
        self.ensure_not_terminal()?;
        let status = status.into();
        let Some(entry) = self.services.iter_mut().find(|s| s.name == service) else {
            return Err(TransitionError::UnknownService(service.to_string()));
        };
        if entry.status == status {
            return Ok(());
        }
        let from = std::mem::replace(&mut entry.status, status.clone());
        self.events.push(DeploymentEvent::ServiceStatusChanged {
            service: service.to_string(),
            from,
            to: status,
        });
        Ok(())
    }

    // Timing

    /// Creation to completion; `None` until completed.
    pub fn duration(&self) -> Option<Duration> {
        self.completed_at.map(|done| done - self.created_at)
    }

    /// Time since creation.
    pub fn elapsed_time(&self) -> Duration {
        self.elapsed_at(Utc::now())
    }

    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.created_at
    }

    /// Still Pending after `expected` has passed.
    pub fn is_overdue(&self, expected: std::time::Duration) -> bool {
        self.is_overdue_at(expected, Utc::now())
    }

    pub fn is_overdue_at(&self, expected: std::time::Duration, now: DateTime<Utc>) -> bool {
        if self.status != DeploymentStatus::Pending {
            return false;
        }
        match Duration::from_std(expected) {
            Ok(expected) => self.elapsed_at(now) > expected,
            Err(_) => false,
        }
    }
}
