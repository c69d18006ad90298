// ABOUTME: Validate command implementation.
// ABOUTME: Loads a manifest with its includes and prints the structural report.

use super::Project;
use bosun::error::{Error, Result};
use bosun::manifest::{ManifestParser, ValidationReport, validate_manifest};
use bosun::output::Output;
use std::path::Path;

pub fn validate(file: Option<&Path>, output: &Output) -> Result<()> {
    let project = Project::load()?;
    let path = project.manifest_path(file);
    output.progress(&format!("Validating {}", path.display()));

    let mut parser = ManifestParser::new();
    let report = match parser.parse_from_path(&path) {
        Ok(manifest) => validate_manifest(&manifest),
        Err(err) => ValidationReport::from_parse_error(err),
    };
    output.diagnostics(parser.diagnostics());
    output.validation(&report);

    if report.is_valid() {
        Ok(())
    } else {
        Err(Error::InvalidManifest(report.errors.len()))
    }
}
