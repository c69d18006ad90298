// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bosun")]
#[command(about = "Compile multi-service stack manifests into ordered deployment plans")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print only essential results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new bosun.yml configuration file
    Init {
        /// Manifest path to reference from the config
        #[arg(short, long)]
        manifest: Option<String>,

        /// Overwrite an existing bosun.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Check a manifest for structural problems
    Validate {
        /// Manifest file (defaults to the configured manifest)
        file: Option<PathBuf>,
    },

    /// List the variables a stack declares
    Variables {
        /// Manifest file (defaults to the configured manifest)
        file: Option<PathBuf>,

        /// Stack to list for a multi-stack manifest
        #[arg(short, long)]
        stack: Option<String>,
    },

    /// Resolve variables and compile the deployment plan
    Plan {
        /// Manifest file (defaults to the configured manifest)
        file: Option<PathBuf>,

        /// Stack to compile for a multi-stack manifest
        #[arg(short, long)]
        stack: Option<String>,

        /// Environment from bosun.yml whose overrides apply
        #[arg(short, long)]
        environment: Option<String>,

        /// Deploy-time variable value, KEY=VALUE (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
}
