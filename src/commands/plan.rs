// ABOUTME: Plan command implementation.
// ABOUTME: Selects a stack, resolves variables from every source, and prints the compiled plan.

use super::Project;
use bosun::error::{Error, Result};
use bosun::manifest::{Manifest, ManifestParser};
use bosun::output::Output;
use bosun::plan::PlanCompiler;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub struct PlanArgs<'a> {
    pub file: Option<&'a Path>,
    pub stack: Option<&'a str>,
    pub environment: Option<&'a str>,
    pub set: &'a [String],
}

pub fn plan(args: PlanArgs<'_>, output: &mut Output) -> Result<()> {
    output.start_timer();
    let project = Project::load()?;
    let config = match args.environment {
        Some(name) => project.config.for_environment(name)?,
        None => project.config.clone(),
    };
    let path = project.manifest_path(args.file);

    let mut parser = ManifestParser::new();
    let manifest = parser.parse_from_path(&path)?;
    output.diagnostics(parser.diagnostics());

    let selected = args.stack.or(config.stack.as_deref());
    let stack = manifest.select_stack(selected)?;
    let stack_name = stack_name(&manifest, selected, &path);
    debug!(stack = %stack_name, path = %path.display(), "compiling");

    let explicit = parse_assignments(args.set)?;
    let resolver = config.resolver(explicit)?;
    let plan = PlanCompiler::new(&stack_name).compile_with(&stack, &resolver)?;

    if let Some(id) = config.environment_id.as_deref() {
        output.progress(&format!("Environment: {id}"));
    }
    output.progress(&format!(
        "Expected duration: {}",
        format_duration(config.expected_duration)
    ));
    output.plan(&plan);
    output.success(&format!(
        "Compiled {} service(s) for stack {stack_name}",
        plan.steps.len()
    ));
    Ok(())
}

/// Selected stack, else the single declared stack, else product name, else
/// the manifest file stem.
fn stack_name(manifest: &Manifest, selected: Option<&str>, path: &Path) -> String {
    if let Some(name) = selected {
        return name.to_string();
    }
    if manifest.is_multi_stack()
        && let Some(name) = manifest.stack_names().next()
    {
        return name.to_string();
    }
    if let Some(name) = manifest.metadata.name.as_deref()
        && !name.trim().is_empty()
    {
        return name.to_string();
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "stack".to_string())
}

/// Whole minutes as `15m`, anything else in seconds.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

fn parse_assignments(values: &[String]) -> Result<Vec<(String, String)>> {
    values
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.to_string()))
            }
            _ => Err(Error::InvalidAssignment(entry.clone())),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_print_in_minutes_when_whole() {
        assert_eq!(format_duration(Duration::from_secs(900)), "15m");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }
}
