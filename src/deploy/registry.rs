// ABOUTME: In-memory registry that hands out one exclusive handle per deployment identity.
// ABOUTME: Serializes mutations of a deployment across concurrent callers.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::deployment::Deployment;
use super::status::DeploymentStatus;
use crate::types::{DeploymentId, EnvironmentId};

/// Shared handle to one deployment. Lock it for every mutation.
pub type DeploymentHandle = Arc<Mutex<Deployment>>;

/// Identity and last released status of one stored deployment.
///
/// Environment and stack never change after creation, so queries read them
/// here instead of waiting on the deployment's own lock.
#[derive(Debug)]
struct Entry {
    environment: EnvironmentId,
    stack: String,
    status: Arc<parking_lot::Mutex<DeploymentStatus>>,
    handle: DeploymentHandle,
}

impl Entry {
    /// Live status when the deployment is free, otherwise the status its
    /// current holder started from.
    fn status(&self) -> DeploymentStatus {
        match self.handle.try_lock() {
            Ok(deployment) => {
                let status = deployment.status();
                *self.status.lock() = status;
                status
            }
            Err(_) => *self.status.lock(),
        }
    }
}

/// Exclusive access to a stored deployment.
///
/// Dropping the guard publishes the deployment's status to the registry.
#[derive(Debug)]
pub struct DeploymentGuard {
    deployment: OwnedMutexGuard<Deployment>,
    status: Arc<parking_lot::Mutex<DeploymentStatus>>,
}

impl Deref for DeploymentGuard {
    type Target = Deployment;

    fn deref(&self) -> &Deployment {
        &self.deployment
    }
}

impl DerefMut for DeploymentGuard {
    fn deref_mut(&mut self) -> &mut Deployment {
        &mut self.deployment
    }
}

impl Drop for DeploymentGuard {
    fn drop(&mut self) {
        *self.status.lock() = self.deployment.status();
    }
}

/// Deployments by identity.
///
/// The map lock is held only to look up or insert handles, never across an
/// await; each deployment has its own async mutex for the single-writer rule.
#[derive(Debug, Default)]
pub struct DeploymentRegistry {
    deployments: RwLock<HashMap<DeploymentId, Entry>>,
}

impl DeploymentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a deployment. Returns the previous handle if the id was taken.
    pub fn insert(&self, deployment: Deployment) -> Option<DeploymentHandle> {
        let id = deployment.id().clone();
        let entry = Entry {
            environment: deployment.environment_id().clone(),
            stack: deployment.stack_name().to_string(),
            status: Arc::new(parking_lot::Mutex::new(deployment.status())),
            handle: Arc::new(Mutex::new(deployment)),
        };
        self.deployments
            .write()
            .insert(id, entry)
            .map(|previous| previous.handle)
    }

    pub fn get(&self, id: &DeploymentId) -> Option<DeploymentHandle> {
        self.deployments.read().get(id).map(|e| e.handle.clone())
    }

    /// Wait for exclusive access to a deployment.
    pub async fn lock(&self, id: &DeploymentId) -> Option<DeploymentGuard> {
        let (handle, status) = {
            let deployments = self.deployments.read();
            let entry = deployments.get(id)?;
            (entry.handle.clone(), entry.status.clone())
        };
        Some(DeploymentGuard {
            deployment: handle.lock_owned().await,
            status,
        })
    }

    pub fn remove(&self, id: &DeploymentId) -> Option<DeploymentHandle> {
        self.deployments.write().remove(id).map(|e| e.handle)
    }

    pub fn len(&self) -> usize {
        self.deployments.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.deployments.read().is_empty()
    }

    /// Ids of deployments of `stack` in `environment` that are not removed.
    ///
    /// A deployment held by another caller is judged by the status it had
    /// when that caller took it.
    pub fn active_for(&self, environment: &EnvironmentId, stack: &str) -> Vec<DeploymentId> {
        self.deployments
            .read()
            .iter()
            .filter(|(_, entry)| {
                &entry.environment == environment
                    && entry.stack == stack
                    && entry.status() != DeploymentStatus::Removed
            })
            .map(|(id, _)| id.clone())
            .collect()
    }
}
