// ABOUTME: Application-wide error types for bosun.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::manifest::{ParseError, SelectStackError};
use crate::plan::CompileErrors;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid assignment '{0}', expected KEY=VALUE")]
    InvalidAssignment(String),

    #[error("manifest is invalid ({0} error(s))")]
    InvalidManifest(usize),

    #[error("failed to parse manifest: {0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    SelectStack(#[from] SelectStackError),

    #[error("stack does not compile ({} error(s)): {}", .0.len(), join(.0))]
    Compile(CompileErrors),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

fn join(errors: &CompileErrors) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<CompileErrors> for Error {
    fn from(errors: CompileErrors) -> Self {
        Error::Compile(errors)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
