// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes for reports, variables, and plans.

use serde::Serialize;
use std::time::Instant;

use crate::diagnostics::Diagnostics;
use crate::manifest::ValidationReport;
use crate::plan::{DeploymentPlan, MountKind};
use crate::variables::Variable;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON documents for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.json_event("success", message, false),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.json_event("error", message, true),
        }
    }

    fn json_event(&self, event: &str, message: &str, to_stderr: bool) {
        let event = JsonEvent {
            event,
            message,
            duration_secs: self.start_time.map(|_| self.elapsed_secs()),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            if to_stderr {
                eprintln!("{json}");
            } else {
                println!("{json}");
            }
        }
    }

    fn json<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string_pretty(value) {
            println!("{json}");
        }
    }

    /// Warnings collected while loading includes.
    pub fn diagnostics(&self, diagnostics: &Diagnostics) {
        if self.mode != OutputMode::Normal {
            return;
        }
        for warning in diagnostics.warnings() {
            eprintln!("Warning: {}", warning.message);
        }
    }

    pub fn validation(&self, report: &ValidationReport) {
        match self.mode {
            OutputMode::Json => self.json(report),
            OutputMode::Quiet => {
                for error in &report.errors {
                    println!("error: {error}");
                }
                if report.is_valid() {
                    println!("valid");
                }
            }
            OutputMode::Normal => {
                for error in &report.errors {
                    println!("  ✗ {error}");
                }
                for warning in &report.warnings {
                    println!("  ! {warning}");
                }
                if report.is_valid() {
                    println!(
                        "Manifest is valid ({} warning(s))",
                        report.warnings.len()
                    );
                } else {
                    println!("Manifest has {} error(s)", report.errors.len());
                }
            }
        }
    }

    pub fn variables(&self, variables: &[Variable]) {
        match self.mode {
            OutputMode::Json => {
                let rows: Vec<VariableRow<'_>> = variables.iter().map(VariableRow::from).collect();
                self.json(&rows);
            }
            OutputMode::Quiet => {
                for variable in variables {
                    println!("{}", variable.name);
                }
            }
            OutputMode::Normal => {
                let mut group: Option<&str> = None;
                for variable in variables {
                    let current = variable.spec.group.as_deref();
                    if current != group {
                        if let Some(name) = current {
                            println!("[{name}]");
                        }
                        group = current;
                    }
                    let requirement = if variable.is_required() {
                        "required".to_string()
                    } else {
                        format!("default: {}", variable.default_value().unwrap_or(""))
                    };
                    match variable.spec.description.as_deref() {
                        Some(description) => println!(
                            "  {} ({requirement}) - {description}",
                            variable.name
                        ),
                        None => println!("  {} ({requirement})", variable.name),
                    }
                }
            }
        }
    }

    pub fn plan(&self, plan: &DeploymentPlan) {
        match self.mode {
            OutputMode::Json => self.json(plan),
            OutputMode::Quiet => {
                for step in &plan.steps {
                    println!("{} {}", step.service, step.image);
                }
            }
            OutputMode::Normal => {
                println!("Stack: {}", plan.stack_name);
                println!("Networks:");
                for (key, network) in plan.networks.iter() {
                    let external = if network.external { " (external)" } else { "" };
                    println!("  {key} -> {}{external}", network.name);
                }
                if !plan.volumes.is_empty() {
                    println!("Volumes:");
                    for (key, volume) in plan.volumes.iter() {
                        println!("  {key} -> {}", volume.name);
                    }
                }
                println!("Services:");
                for (position, step) in plan.steps.iter().enumerate() {
                    println!(
                        "  {}. {} ({}) as {}",
                        position + 1,
                        step.service,
                        step.image,
                        step.container_name
                    );
                    if !step.depends_on.is_empty() {
                        println!("     after: {}", step.depends_on.join(", "));
                    }
                    if !step.ports.is_empty() {
                        println!("     ports: {}", step.ports.join(", "));
                    }
                    for mount in &step.volumes {
                        let source = match mount.kind {
                            MountKind::Anonymous => "(anonymous)",
                            MountKind::Named | MountKind::Bind => mount.source.as_str(),
                        };
                        println!("     volume: {source} -> {}", mount.target);
                    }
                }
            }
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct VariableRow<'a> {
    #[serde(flatten)]
    variable: &'a Variable,
    #[serde(rename = "isRequired")]
    required: bool,
}

impl<'a> From<&'a Variable> for VariableRow<'a> {
    fn from(variable: &'a Variable) -> Self {
        Self {
            variable,
            required: variable.is_required(),
        }
    }
}
