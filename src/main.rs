// ABOUTME: Entry point for the bosun CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use bosun::config;
use bosun::error::Result;
use bosun::output::{Output, OutputMode};
use clap::Parser;
use cli::{Cli, Commands};
use commands::PlanArgs;
use std::env;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);

    if let Err(e) = run(cli.command, &mut output) {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(command: Commands, output: &mut Output) -> Result<()> {
    match command {
        Commands::Init { manifest, force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, manifest.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::Validate { file } => commands::validate(file.as_deref(), output),
        Commands::Variables { file, stack } => {
            commands::variables(file.as_deref(), stack.as_deref(), output)
        }
        Commands::Plan {
            file,
            stack,
            environment,
            set,
        } => commands::plan(
            PlanArgs {
                file: file.as_deref(),
                stack: stack.as_deref(),
                environment: environment.as_deref(),
                set: &set,
            },
            output,
        ),
    }
}
