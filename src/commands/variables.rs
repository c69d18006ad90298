// ABOUTME: Variables command implementation.
// ABOUTME: Lists the ordered variable declarations of a manifest or one of its stacks.

use super::Project;
use bosun::error::Result;
use bosun::manifest::{ManifestParser, extract_stack_variables, extract_variables};
use bosun::output::Output;
use std::path::Path;

pub fn variables(file: Option<&Path>, stack: Option<&str>, output: &Output) -> Result<()> {
    let project = Project::load()?;
    let path = project.manifest_path(file);

    let mut parser = ManifestParser::new();
    let manifest = parser.parse_from_path(&path)?;
    output.diagnostics(parser.diagnostics());

    let stack = stack.or(project.config.stack.as_deref());
    let variables = match stack {
        Some(_) => extract_stack_variables(&manifest, stack)?,
        None => extract_variables(&manifest),
    };
    output.variables(&variables);
    Ok(())
}
