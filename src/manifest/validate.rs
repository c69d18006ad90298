// ABOUTME: Structural validation of parsed manifests.
// ABOUTME: Reports every error and warning at once instead of stopping at the first.

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use super::{Manifest, ParseError, StackDefinition, StackEntry};
use crate::variables::VariableType;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("manifest does not parse: {message}")]
    Syntax { message: String },

    #[error("unrecognised manifest format")]
    UnknownFormat,

    #[error("service '{service}' declares neither an image nor a build source")]
    MissingImage { service: String },

    #[error("service '{service}' depends on unknown service '{dependency}'")]
    UnknownDependency { service: String, dependency: String },

    #[error("variable '{variable}' has an invalid pattern: {reason}")]
    InvalidPattern { variable: String, reason: String },

    #[error("variable '{variable}' has min {min} greater than max {max}")]
    MinExceedsMax { variable: String, min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    #[error("select variable '{variable}' declares no options")]
    SelectWithoutOptions { variable: String },

    #[error("stack '{stack}' declares no services")]
    EmptyStack { stack: String },

    #[error("stack '{stack}' includes {path}; its contents are checked only when loaded from disk")]
    UnresolvedInclude { stack: String, path: String },

    #[error("metadata has no product name")]
    MissingProductName,

    #[error("service '{service}' has only a build source and cannot be deployed from a registry")]
    BuildOnly { service: String },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn from_error(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    /// Report for a manifest that could not be parsed at all.
    pub fn from_parse_error(error: ParseError) -> Self {
        match error {
            ParseError::UnknownFormat => Self::from_error(ValidationError::UnknownFormat),
            other => Self::from_error(ValidationError::Syntax {
                message: other.to_string(),
            }),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error(&mut self, error: ValidationError) {
        if !self.errors.contains(&error) {
            self.errors.push(error);
        }
    }

    pub fn warn(&mut self, warning: ValidationWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

fn check_stack(def: &StackDefinition, label: &str, report: &mut ValidationReport) {
    if def.services.is_empty() && def.service_includes.is_empty() {
        report.warn(ValidationWarning::EmptyStack {
            stack: label.to_string(),
        });
    }

    for (name, service) in def.services.iter() {
        if !service.has_image_or_build() {
            report.error(ValidationError::MissingImage {
                service: name.to_string(),
            });
        }
        // Services pulled in from include files are not visible here.
        if !def.service_includes.is_empty() {
            continue;
        }
        for dependency in &service.depends_on {
            if !def.services.contains_key(dependency) {
                report.error(ValidationError::UnknownDependency {
                    service: name.to_string(),
                    dependency: dependency.clone(),
                });
            }
        }
    }

    for (name, spec) in def.variables.iter() {
        if spec.kind == VariableType::Select && spec.options.is_empty() {
            report.warn(ValidationWarning::SelectWithoutOptions {
                variable: name.to_string(),
            });
        }
        if let Some(pattern) = &spec.pattern
            && let Err(e) = Regex::new(pattern)
        {
            report.error(ValidationError::InvalidPattern {
                variable: name.to_string(),
                reason: e.to_string(),
            });
        }
        if let (Some(min), Some(max)) = (spec.min, spec.max)
            && min > max
        {
            report.error(ValidationError::MinExceedsMax {
                variable: name.to_string(),
                min,
                max,
            });
        }
    }
}

/// Check the root definition, or each sub-stack layered over the root.
pub fn validate_manifest(manifest: &Manifest) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !manifest.is_multi_stack() {
        check_stack(&manifest.root, "default", &mut report);
        return report;
    }

    for (name, entry) in manifest.stacks.iter() {
        match entry {
            StackEntry::Include(path) => report.warn(ValidationWarning::UnresolvedInclude {
                stack: name.to_string(),
                path: path.clone(),
            }),
            StackEntry::Inline(def) => {
                let mut merged = manifest.root.clone();
                merged.merge_overwriting(def.clone());
                check_stack(&merged, name, &mut report);
            }
        }
    }
    report
}
