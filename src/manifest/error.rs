// ABOUTME: Error types for manifest parsing and stack selection.
// ABOUTME: Parse failures are fatal; include I/O failures are downgraded elsewhere.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unrecognised manifest format (expected metadata + services/stacks, or version + services)")]
    UnknownFormat,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("circular include: {}", display_chain(chain))]
    CircularInclude { chain: Vec<PathBuf> },

    #[error("in included file {}: {source}", path.display())]
    Include {
        path: PathBuf,
        #[source]
        source: Box<ParseError>,
    },
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectStackError {
    #[error("unknown stack: {0}")]
    UnknownStack(String),

    #[error("manifest declares several stacks; choose one with --stack")]
    StackRequired,

    #[error("stack '{stack}' still points at unresolved include {path}")]
    UnresolvedInclude { stack: String, path: String },
}
