// ABOUTME: Integration tests for the orchestrator against a scripted in-memory runtime.
// ABOUTME: Covers install, upgrade outcomes around the point of no return, rollback, and stack operations.

mod support;

use bosun::deploy::*;
use bosun::manifest::{StackDefinition, parse};
use bosun::types::EnvironmentId;
use bosun::variables::VariableResolver;
use std::sync::Arc;
use support::{Environments, FakeRuntime, Reply};

const ENV: &str = "env-prod";

fn shop(version: &str) -> StackDefinition {
    let text = format!(
        r#"
metadata:
  name: shop
variables:
  DB_PASSWORD: {{}}
  TAG:
    default: "{version}"
services:
  web:
    image: "shop/web:${{TAG}}"
    dependsOn: [db]
  db:
    image: mariadb:11
"#
    );
    parse(&text).unwrap().select_stack(None).unwrap()
}

fn secrets() -> VariableResolver {
    VariableResolver::new().with_explicit([("DB_PASSWORD", "s3cret")])
}

fn orchestrator(runtime: FakeRuntime) -> (Orchestrator, Arc<FakeRuntime>) {
    let runtime = Arc::new(runtime);
    let orchestrator = Orchestrator::new(runtime.clone(), Arc::new(Environments::with(ENV)));
    (orchestrator, runtime)
}

fn install_request(version: &str) -> InstallRequest {
    InstallRequest {
        environment_id: EnvironmentId::new(ENV),
        stack_name: "shop".to_string(),
        stack_version: Some(version.to_string()),
        stack: shop(version),
        variables: secrets(),
    }
}

fn upgrade_request(version: &str) -> UpgradeRequest {
    UpgradeRequest {
        stack_version: version.to_string(),
        stack: shop(version),
        variables: secrets(),
    }
}

mod install {
    use super::*;

    #[tokio::test]
    async fn deploys_in_dependency_order() {
        let (orchestrator, runtime) = orchestrator(FakeRuntime::new());
        let deployment = orchestrator.install(install_request("1.0")).await.unwrap();

        assert_eq!(deployment.status(), DeploymentStatus::Running);
        assert_eq!(deployment.stack_version(), Some("1.0"));
        let names: Vec<&str> = deployment.services().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["db", "web"]);
        assert_eq!(deployment.services()[1].image.as_deref(), Some("shop/web:1.0"));
        assert_eq!(
            deployment.variables().get("DB_PASSWORD").map(String::as_str),
            Some("s3cret")
        );
        assert!(deployment.pending_events().is_empty());
        assert_eq!(runtime.calls(), ["deploy db,web"]);
    }

    #[tokio::test]
    async fn runtime_failure_is_recorded_on_the_deployment() {
        let (orchestrator, _) = orchestrator(FakeRuntime::new().reply(Reply::Partial {
            started: 1,
            error: "web: image not found".into(),
        }));
        let deployment = orchestrator.install(install_request("1.0")).await.unwrap();
        assert_eq!(deployment.status(), DeploymentStatus::Failed);
        assert_eq!(deployment.error_message(), Some("web: image not found"));
    }

    #[tokio::test]
    async fn unreachable_runtime_fails_the_deployment() {
        let (orchestrator, _) = orchestrator(FakeRuntime::new().reply(Reply::Unreachable));
        let deployment = orchestrator.install(install_request("1.0")).await.unwrap();
        assert_eq!(deployment.status(), DeploymentStatus::Failed);
        assert!(deployment.error_message().unwrap().contains("socket closed"));
    }

    #[tokio::test]
    async fn unknown_environment_never_reaches_the_runtime() {
        let (orchestrator, runtime) = orchestrator(FakeRuntime::new());
        let request = InstallRequest {
            environment_id: EnvironmentId::new("env-nowhere"),
            ..install_request("1.0")
        };
        let err = orchestrator.install(request).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::EnvironmentNotFound);
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_variables_are_named() {
        let (orchestrator, runtime) = orchestrator(FakeRuntime::new());
        let request = InstallRequest {
            variables: VariableResolver::new(),
            ..install_request("1.0")
        };
        let err = orchestrator.install(request).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::MissingVariables);
        assert_eq!(err.missing_variables(), ["DB_PASSWORD"]);
        assert!(runtime.calls().is_empty());
    }

    #[tokio::test]
    async fn dependency_cycle_is_its_own_kind() {
        let (orchestrator, _) = orchestrator(FakeRuntime::new());
        let stack = parse("metadata: {name: loop}\nservices:\n  a: {image: a, dependsOn: [b]}\n  b: {image: b, dependsOn: [a]}\n")
            .unwrap()
            .select_stack(None)
            .unwrap();
        let request = InstallRequest {
            stack,
            ..install_request("1.0")
        };
        let err = orchestrator.install(request).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::CircularDependency);
        assert!(err.to_string().contains("does not compile"));
    }
}

mod upgrade {
    use super::*;

    async fn installed(runtime: FakeRuntime) -> (Orchestrator, Arc<FakeRuntime>, Deployment) {
        let (orchestrator, runtime) = orchestrator(runtime);
        let deployment = orchestrator.install(install_request("1.0")).await.unwrap();
        (orchestrator, runtime, deployment)
    }

    #[tokio::test]
    async fn successful_upgrade_stays_running_without_snapshot() {
        let (orchestrator, _, mut deployment) = installed(FakeRuntime::new()).await;
        let outcome = orchestrator
            .upgrade(&mut deployment, upgrade_request("2.0"))
            .await
            .unwrap();

        assert_eq!(outcome, UpgradeOutcome::Completed);
        assert_eq!(deployment.status(), DeploymentStatus::Running);
        assert_eq!(deployment.stack_version(), Some("2.0"));
        assert_eq!(deployment.previous_version(), Some("1.0"));
        assert_eq!(deployment.upgrade_count(), 1);
        assert!(deployment.pending_snapshot().is_none());
        assert_eq!(deployment.services()[1].image.as_deref(), Some("shop/web:2.0"));
    }

    #[tokio::test]
    async fn completed_upgrade_without_started_services_drops_snapshot() {
        let (orchestrator, _, mut deployment) = installed(
            FakeRuntime::new()
                .reply(Reply::Success)
                .reply(Reply::SuccessUnreported),
        )
        .await;

        let outcome = orchestrator
            .upgrade(&mut deployment, upgrade_request("2.0"))
            .await
            .unwrap();
        assert_eq!(outcome, UpgradeOutcome::Completed);
        assert!(deployment.pending_snapshot().is_none());

        let outcome = orchestrator
            .upgrade(&mut deployment, upgrade_request("3.0"))
            .await
            .unwrap();
        assert_eq!(outcome, UpgradeOutcome::Completed);
        assert_eq!(deployment.stack_version(), Some("3.0"));
        assert_eq!(deployment.upgrade_count(), 2);
    }

    #[tokio::test]
    async fn failure_before_any_start_keeps_rollback() {
        let (orchestrator, runtime, mut deployment) = installed(
            FakeRuntime::new().reply(Reply::Success).reply(Reply::Partial {
                started: 0,
                error: "pull failed".into(),
            }),
        )
        .await;

        let outcome = orchestrator
            .upgrade(&mut deployment, upgrade_request("2.0"))
            .await
            .unwrap();
        assert_eq!(outcome, UpgradeOutcome::FailedRollbackAvailable);
        assert_eq!(deployment.status(), DeploymentStatus::Failed);
        assert!(deployment.can_rollback());

        orchestrator.rollback(&mut deployment, &shop("1.0")).await.unwrap();
        assert_eq!(deployment.status(), DeploymentStatus::Running);
        assert_eq!(deployment.stack_version(), Some("1.0"));
        assert_eq!(deployment.services()[1].image.as_deref(), Some("shop/web:1.0"));
        assert_eq!(runtime.calls().len(), 3);
    }

    #[tokio::test]
    async fn failure_after_a_start_passes_the_point_of_no_return() {
        let (orchestrator, _, mut deployment) = installed(
            FakeRuntime::new().reply(Reply::Success).reply(Reply::Partial {
                started: 1,
                error: "web crashed".into(),
            }),
        )
        .await;

        let outcome = orchestrator
            .upgrade(&mut deployment, upgrade_request("2.0"))
            .await
            .unwrap();
        assert_eq!(outcome, UpgradeOutcome::FailedPastPointOfNoReturn);
        assert_eq!(deployment.status(), DeploymentStatus::Failed);
        assert!(deployment.pending_snapshot().is_none());
        assert!(!deployment.can_rollback());

        let err = orchestrator
            .rollback(&mut deployment, &shop("1.0"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn unreachable_runtime_keeps_rollback() {
        let (orchestrator, _, mut deployment) = installed(
            FakeRuntime::new().reply(Reply::Success).reply(Reply::Unreachable),
        )
        .await;
        let outcome = orchestrator
            .upgrade(&mut deployment, upgrade_request("2.0"))
            .await
            .unwrap();
        assert_eq!(outcome, UpgradeOutcome::FailedRollbackAvailable);
        assert!(deployment.can_rollback());
    }

    #[tokio::test]
    async fn compile_failure_fails_the_deployment_with_rollback() {
        let (orchestrator, runtime, mut deployment) = installed(FakeRuntime::new()).await;
        let request = UpgradeRequest {
            variables: VariableResolver::new(),
            ..upgrade_request("2.0")
        };
        let err = orchestrator.upgrade(&mut deployment, request).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::MissingVariables);
        assert_eq!(deployment.status(), DeploymentStatus::Failed);
        assert!(deployment.can_rollback());
        assert_eq!(runtime.calls().len(), 1);
    }

    #[tokio::test]
    async fn stopped_deployment_cannot_be_upgraded() {
        let (orchestrator, _, mut deployment) = installed(FakeRuntime::new()).await;
        orchestrator.stop(&mut deployment).await.unwrap();

        let err = orchestrator
            .upgrade(&mut deployment, upgrade_request("2.0"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::InvalidState);
        assert_eq!(deployment.status(), DeploymentStatus::Stopped);
        assert_eq!(deployment.upgrade_count(), 0);
    }
}

mod operations {
    use super::*;

    #[tokio::test]
    async fn stop_restart_remove() {
        let (orchestrator, runtime) = orchestrator(FakeRuntime::new());
        let mut deployment = orchestrator.install(install_request("1.0")).await.unwrap();

        orchestrator.stop(&mut deployment).await.unwrap();
        assert_eq!(deployment.status(), DeploymentStatus::Stopped);
        orchestrator.restart(&mut deployment).await.unwrap();
        assert_eq!(deployment.status(), DeploymentStatus::Running);
        orchestrator.remove(&mut deployment).await.unwrap();
        assert_eq!(deployment.status(), DeploymentStatus::Removed);

        let err = orchestrator.remove(&mut deployment).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::InvalidState);
        assert_eq!(
            runtime.calls(),
            ["deploy db,web", "stop shop", "start shop", "remove shop"]
        );
    }

    #[tokio::test]
    async fn illegal_calls_do_not_reach_the_runtime() {
        let (orchestrator, runtime) = orchestrator(FakeRuntime::new());
        let mut deployment = orchestrator.install(install_request("1.0")).await.unwrap();

        let err = orchestrator.restart(&mut deployment).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::InvalidState);
        assert_eq!(runtime.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_runtime_operation_leaves_state_untouched() {
        let (orchestrator, _) = orchestrator(FakeRuntime::new().failing_operations("daemon busy"));
        let mut deployment = orchestrator.install(install_request("1.0")).await.unwrap();

        let err = orchestrator.stop(&mut deployment).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::RuntimeOperation);
        assert!(err.to_string().contains("daemon busy"));
        assert_eq!(deployment.status(), DeploymentStatus::Running);

        let err = orchestrator.remove(&mut deployment).await.unwrap_err();
        assert_eq!(err.kind(), OrchestratorErrorKind::RuntimeOperation);
        assert_eq!(deployment.status(), DeploymentStatus::Running);
    }
}

mod registry {
    use super::*;

    #[tokio::test]
    async fn one_writer_at_a_time() {
        let (orchestrator, _) = orchestrator(FakeRuntime::new());
        let registry = Arc::new(DeploymentRegistry::new());
        let deployment = orchestrator.install(install_request("1.0")).await.unwrap();
        let id = deployment.id().clone();
        assert!(registry.insert(deployment).is_none());

        let env = EnvironmentId::new(ENV);
        assert_eq!(registry.active_for(&env, "shop"), [id.clone()]);
        assert!(registry.active_for(&env, "other").is_empty());

        let mut guard = registry.lock(&id).await.unwrap();
        assert_eq!(registry.active_for(&env, "shop"), [id.clone()]);

        let waiter = {
            let registry = registry.clone();
            let id = id.clone();
            tokio::spawn(async move { registry.lock(&id).await.map(|d| d.status()) })
        };
        orchestrator.stop(&mut guard).await.unwrap();
        drop(guard);

        assert_eq!(waiter.await.unwrap(), Some(DeploymentStatus::Stopped));
    }

    #[tokio::test]
    async fn held_deployment_stays_listed_until_its_removal_is_released() {
        let (orchestrator, _) = orchestrator(FakeRuntime::new());
        let registry = DeploymentRegistry::new();
        let deployment = orchestrator.install(install_request("1.0")).await.unwrap();
        let id = deployment.id().clone();
        registry.insert(deployment);
        let env = EnvironmentId::new(ENV);

        let mut guard = registry.lock(&id).await.unwrap();
        orchestrator.remove(&mut guard).await.unwrap();
        assert_eq!(registry.active_for(&env, "shop"), [id.clone()]);

        drop(guard);
        assert!(registry.active_for(&env, "shop").is_empty());
    }

    #[tokio::test]
    async fn removed_deployments_are_not_active() {
        let (orchestrator, _) = orchestrator(FakeRuntime::new());
        let registry = DeploymentRegistry::new();
        let mut deployment = orchestrator.install(install_request("1.0")).await.unwrap();
        orchestrator.remove(&mut deployment).await.unwrap();
        let id = deployment.id().clone();
        registry.insert(deployment);

        assert_eq!(registry.len(), 1);
        assert!(registry.active_for(&EnvironmentId::new(ENV), "shop").is_empty());
        assert!(registry.remove(&id).is_some());
        assert!(registry.is_empty());
        assert!(registry.lock(&id).await.is_none());
    }
}
