// ABOUTME: Checks that an environment, organization, and user may receive a deployment.
// ABOUTME: Pure function over read-only context; reports every failing category together.

use serde::Serialize;
use thiserror::Error;

use crate::manifest::StackDefinition;
use crate::types::{EnvironmentId, OrganizationId, UserId};
use crate::variables::{VariableError, VariableResolver};

/// A deployment target as known to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    pub organization_id: OrganizationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub enabled: bool,
    /// Allowed to deploy into the organization.
    pub authorized: bool,
}

/// Everything the validator looks at. Lookups happen before the call.
#[derive(Debug, Clone, Copy)]
pub struct PrerequisiteContext<'a> {
    pub environment: Option<&'a Environment>,
    pub organization: Option<&'a Organization>,
    pub user: Option<&'a User>,
    pub stack: &'a StackDefinition,
    pub variables: &'a VariableResolver,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrerequisiteError {
    #[error("environment not found")]
    EnvironmentNotFound,

    #[error("organization not found")]
    OrganizationNotFound,

    #[error("environment belongs to organization {expected}, not {actual}")]
    OrganizationMismatch {
        expected: OrganizationId,
        actual: OrganizationId,
    },

    #[error("organization '{name}' is not active")]
    OrganizationInactive { name: String },

    #[error("no user supplied for the deployment")]
    UserNotFound,

    #[error("user '{name}' is disabled")]
    UserDisabled { name: String },

    #[error("user '{name}' may not deploy into this organization")]
    UserNotAuthorized { name: String },

    #[error("stack declares no services")]
    NoServices,

    #[error("{} variable problem(s): {}", .errors.len(), join(.errors))]
    InvalidVariables { errors: Vec<VariableError> },
}

fn join(errors: &[VariableError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrerequisiteReport {
    pub errors: Vec<PrerequisiteError>,
}

impl PrerequisiteReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), Vec<PrerequisiteError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// Run every check. A missing environment or organization stops early,
/// since nothing else can be judged without them.
pub fn validate_prerequisites(ctx: &PrerequisiteContext<'_>) -> PrerequisiteReport {
    let mut errors = Vec::new();

    let Some(environment) = ctx.environment else {
        errors.push(PrerequisiteError::EnvironmentNotFound);
        return PrerequisiteReport { errors };
    };
    let Some(organization) = ctx.organization else {
        errors.push(PrerequisiteError::OrganizationNotFound);
        return PrerequisiteReport { errors };
    };

    if environment.organization_id != organization.id {
        errors.push(PrerequisiteError::OrganizationMismatch {
            expected: environment.organization_id.clone(),
            actual: organization.id.clone(),
        });
    }
    if !organization.active {
        errors.push(PrerequisiteError::OrganizationInactive {
            name: organization.name.clone(),
        });
    }

    match ctx.user {
        None => errors.push(PrerequisiteError::UserNotFound),
        Some(user) => {
            if !user.enabled {
                errors.push(PrerequisiteError::UserDisabled {
                    name: user.name.clone(),
                });
            }
            if !user.authorized {
                errors.push(PrerequisiteError::UserNotAuthorized {
                    name: user.name.clone(),
                });
            }
        }
    }

    if ctx.stack.services.is_empty() {
        errors.push(PrerequisiteError::NoServices);
    }

    if let Err(variable_errors) = ctx.variables.resolve_all(&ctx.stack.variables) {
        errors.push(PrerequisiteError::InvalidVariables {
            errors: variable_errors.into_iter().collect(),
        });
    }

    PrerequisiteReport { errors }
}
