// ABOUTME: Library root for bosun - exposes the manifest compiler and deployment lifecycle core.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod manifest;
pub mod output;
pub mod plan;
pub mod prereq;
pub mod types;
pub mod variables;
