// ABOUTME: Errors that stop a stack from compiling into a deployment plan.
// ABOUTME: Compilation reports every error it finds, except a dependency cycle.

use nonempty::NonEmpty;
use thiserror::Error;

use crate::variables::VariableError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("circular dependency at service '{service}': {}", .cycle.join(" -> "))]
    CircularDependency { service: String, cycle: Vec<String> },

    #[error("service '{service}' depends on unknown service '{dependency}'")]
    UnknownDependency { service: String, dependency: String },

    #[error("service '{service}' uses undeclared network '{network}'")]
    UnknownNetwork { service: String, network: String },

    #[error("service '{service}' has no image to deploy")]
    MissingImage { service: String },

    #[error("service '{service}' has an invalid volume entry '{entry}'")]
    InvalidVolume { service: String, entry: String },

    #[error(transparent)]
    Variable(#[from] VariableError),
}

impl CompileError {
    /// Name of the missing variable, for missing-required errors.
    pub fn missing_variable(&self) -> Option<&str> {
        match self {
            CompileError::Variable(VariableError::MissingRequired { name }) => Some(name),
            _ => None,
        }
    }
}

/// At least one compile error.
pub type CompileErrors = NonEmpty<CompileError>;
