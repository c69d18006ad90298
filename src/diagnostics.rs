// ABOUTME: Diagnostics accumulator for non-fatal warnings raised while loading manifests.
// ABOUTME: Collects warnings that shouldn't fail a parse but should be shown to users.

use serde::Serialize;
use std::path::Path;

/// Collects non-fatal warnings during manifest loading.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A non-fatal warning collected while loading a manifest.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// An include file could not be read and was left out.
    pub fn include_skipped(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self {
            kind: WarningKind::IncludeSkipped,
            message: format!("skipping include {}: {reason}", path.display()),
        }
    }

    /// A service include redefined a service that already existed.
    pub fn service_collision(service: &str, path: &Path) -> Self {
        Self {
            kind: WarningKind::ServiceCollision,
            message: format!(
                "service '{service}' from {} ignored; already defined",
                path.display()
            ),
        }
    }

    /// Two merged sub-stacks defined the same entry; the later one won.
    pub fn duplicate_definition(entry: &str, path: &Path) -> Self {
        Self {
            kind: WarningKind::DuplicateDefinition,
            message: format!(
                "{entry} defined by several stacks in {}; last definition wins",
                path.display()
            ),
        }
    }
}

/// Categories of warnings that can occur while loading manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Include file missing or unreadable.
    IncludeSkipped,
    /// Service include lost to an existing service of the same name.
    ServiceCollision,
    /// Duplicate across flattened sub-stacks.
    DuplicateDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::include_skipped(Path::new("extra.yml"), "not found"));
        diag.warn(Warning::service_collision("web", Path::new("extra.yml")));

        assert!(diag.has_warnings());
        assert_eq!(diag.warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        let skipped = Warning::include_skipped(Path::new("a.yml"), "denied");
        assert_eq!(skipped.kind, WarningKind::IncludeSkipped);
        assert!(skipped.message.contains("a.yml"));

        let duplicate = Warning::duplicate_definition("service:web", Path::new("b.yml"));
        assert_eq!(duplicate.kind, WarningKind::DuplicateDefinition);
    }
}
