// ABOUTME: Integration tests for upgrade snapshots, the point of no return, and rollback.
// ABOUTME: Exercises snapshot preconditions and the state restored by a rollback.

use bosun::deploy::*;
use bosun::types::{DeploymentId, EnvironmentId};
use std::collections::BTreeMap;

fn vars(tag: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("TAG".to_string(), tag.to_string())])
}

fn running(version: Option<&str>) -> Deployment {
    let mut deployment = Deployment::start(
        DeploymentId::new("dep-7"),
        EnvironmentId::new("env-staging"),
        "shop",
        version.map(str::to_string),
        vars("1.0"),
    );
    deployment
        .mark_as_running(vec![
            DeployedService::new("web", "running").with_image("shop/web:1.0"),
            DeployedService::new("sidecar", "running"),
        ])
        .unwrap();
    deployment.take_events();
    deployment
}

mod snapshot {
    use super::*;

    #[test]
    fn captures_version_variables_and_images() {
        let mut deployment = running(Some("1.0"));
        deployment
            .create_snapshot(Some("before 2.0".to_string()))
            .unwrap();

        let snapshot = deployment.pending_snapshot().unwrap();
        assert_eq!(snapshot.stack_version, "1.0");
        assert_eq!(snapshot.variables, vars("1.0"));
        assert_eq!(snapshot.image_for("web"), Some("shop/web:1.0"));
        assert_eq!(snapshot.image_for("sidecar"), None);
        assert_eq!(snapshot.description.as_deref(), Some("before 2.0"));
        assert_eq!(
            deployment.take_events(),
            [DeploymentEvent::SnapshotCreated {
                stack_version: "1.0".into()
            }]
        );
    }

    #[test]
    fn only_one_pending_snapshot() {
        let mut deployment = running(Some("1.0"));
        deployment.create_snapshot(None).unwrap();
        assert_eq!(
            deployment.create_snapshot(None),
            Err(TransitionError::SnapshotExists)
        );
    }

    #[test]
    fn requires_running_status() {
        let mut deployment = running(Some("1.0"));
        deployment.mark_as_stopped().unwrap();
        assert_eq!(
            deployment.create_snapshot(None),
            Err(TransitionError::SnapshotRequiresRunning {
                status: DeploymentStatus::Stopped
            })
        );
        assert!(deployment.pending_snapshot().is_none());
    }

    #[test]
    fn requires_a_stack_version() {
        assert_eq!(
            running(None).create_snapshot(None),
            Err(TransitionError::MissingVersion)
        );
        assert_eq!(
            running(Some("  ")).create_snapshot(None),
            Err(TransitionError::MissingVersion)
        );
    }

    #[test]
    fn clearing_is_unconditional_and_ends_rollback() {
        let mut deployment = running(Some("1.0"));
        deployment.clear_snapshot();
        assert!(deployment.take_events().is_empty());

        deployment.create_snapshot(None).unwrap();
        deployment.take_events();
        deployment.clear_snapshot();
        assert!(deployment.pending_snapshot().is_none());
        assert_eq!(deployment.take_events(), [DeploymentEvent::SnapshotCleared]);

        deployment.mark_as_failed("second container crashed").unwrap();
        assert!(!deployment.can_rollback());
        assert_eq!(
            deployment.rollback_to_previous(),
            Err(TransitionError::NoSnapshot)
        );
    }
}

mod rollback {
    use super::*;

    fn failed_upgrade() -> Deployment {
        let mut deployment = running(Some("1.0"));
        deployment.create_snapshot(None).unwrap();
        deployment
            .record_upgrade(Some("1.0".to_string()), "2.0")
            .unwrap();
        deployment.apply_variables(vars("2.0")).unwrap();
        deployment.mark_as_failed("image not found").unwrap();
        deployment.take_events();
        deployment
    }

    #[test]
    fn restores_snapshot_and_returns_to_pending() {
        let mut deployment = failed_upgrade();
        assert!(deployment.can_rollback());
        assert_eq!(deployment.stack_version(), Some("2.0"));

        deployment.rollback_to_previous().unwrap();

        assert!(deployment.pending_snapshot().is_none());
        assert_eq!(deployment.status(), DeploymentStatus::Pending);
        assert_eq!(deployment.stack_version(), Some("1.0"));
        assert_eq!(deployment.variables(), &vars("1.0"));
        assert_eq!(deployment.progress().phase, DeploymentPhase::Initializing);
        assert_eq!(deployment.error_message(), None);
        assert!(!deployment.is_cancellation_requested());
        assert_eq!(
            deployment.phase_history().last().map(|r| r.phase),
            Some(DeploymentPhase::RollingBack)
        );
        assert_eq!(
            deployment.take_events(),
            [DeploymentEvent::RolledBack {
                stack_version: "1.0".into()
            }]
        );
    }

    #[test]
    fn rolled_back_deployment_can_run_again() {
        let mut deployment = failed_upgrade();
        deployment.rollback_to_previous().unwrap();
        deployment
            .mark_as_running(vec![DeployedService::new("web", "running")])
            .unwrap();
        assert_eq!(deployment.status(), DeploymentStatus::Running);
    }

    #[test]
    fn requires_failed_status() {
        let mut deployment = running(Some("1.0"));
        deployment.create_snapshot(None).unwrap();
        assert!(!deployment.can_rollback());
        assert_eq!(
            deployment.rollback_to_previous(),
            Err(TransitionError::RollbackRequiresFailed {
                status: DeploymentStatus::Running
            })
        );
        assert!(deployment.pending_snapshot().is_some());
    }
}

mod upgrades {
    use super::*;

    #[test]
    fn bookkeeping_tracks_versions_and_count() {
        let mut deployment = running(Some("1.0"));
        assert!(deployment.can_upgrade());

        deployment
            .record_upgrade(Some("1.0".to_string()), "1.1")
            .unwrap();
        deployment
            .complete_upgrade(vec![DeployedService::new("web", "running")])
            .unwrap();
        deployment
            .record_upgrade(Some("1.1".to_string()), "1.2")
            .unwrap();

        assert_eq!(deployment.upgrade_count(), 2);
        assert_eq!(deployment.previous_version(), Some("1.1"));
        assert_eq!(deployment.stack_version(), Some("1.2"));
        assert!(deployment.last_upgraded_at().is_some());
        assert_eq!(deployment.status(), DeploymentStatus::Running);
        assert_eq!(deployment.progress().phase, DeploymentPhase::Upgrading);
    }

    #[test]
    fn completing_an_upgrade_consumes_the_snapshot() {
        let mut deployment = running(Some("1.0"));
        deployment.create_snapshot(None).unwrap();
        deployment
            .record_upgrade(Some("1.0".to_string()), "2.0")
            .unwrap();
        deployment.take_events();

        deployment.complete_upgrade(Vec::new()).unwrap();
        assert!(deployment.pending_snapshot().is_none());
        assert_eq!(
            deployment.take_events(),
            [
                DeploymentEvent::SnapshotCleared,
                DeploymentEvent::UpgradeCompleted { service_count: 0 }
            ]
        );
        deployment.create_snapshot(None).unwrap();
    }

    #[test]
    fn upgrade_requires_running() {
        let mut deployment = running(Some("1.0"));
        deployment.mark_as_stopped().unwrap();
        assert!(!deployment.can_upgrade());
        assert_eq!(
            deployment.record_upgrade(None, "2.0"),
            Err(TransitionError::UpgradeRequiresRunning {
                status: DeploymentStatus::Stopped
            })
        );
        assert_eq!(deployment.upgrade_count(), 0);
    }
}
