// ABOUTME: Format detection and dispatch between native and Compose-style manifests.
// ABOUTME: Each format implements the ManifestFormat capability trait.

use serde::Serialize;
use serde_yaml::Value;
use std::fmt;

use super::compose::ComposeFormat;
use super::native::NativeFormat;
use super::validate::{ValidationError, ValidationReport, validate_manifest};
use super::{Manifest, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Native,
    Compose,
    Unknown,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Native => write!(f, "native"),
            FormatKind::Compose => write!(f, "compose"),
            FormatKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// One manifest dialect.
pub trait ManifestFormat: Sync {
    fn kind(&self) -> FormatKind;

    /// Structural check on an already-parsed YAML document.
    fn detect(&self, doc: &Value) -> bool;

    fn parse(&self, doc: Value) -> Result<Manifest, ParseError>;

    /// Parse and run structural validation. A document that does not parse
    /// yields a report with a single syntax error.
    fn validate(&self, doc: Value) -> ValidationReport {
        match self.parse(doc) {
            Ok(manifest) => validate_manifest(&manifest),
            Err(e) => ValidationReport::from_error(ValidationError::Syntax {
                message: e.to_string(),
            }),
        }
    }
}

static FORMATS: [&dyn ManifestFormat; 2] = [&NativeFormat, &ComposeFormat];

pub(crate) fn has_key(doc: &Value, key: &str) -> bool {
    doc.as_mapping().is_some_and(|m| m.contains_key(key))
}

pub(crate) fn format_of(doc: &Value) -> Option<&'static dyn ManifestFormat> {
    FORMATS.iter().copied().find(|f| f.detect(doc))
}

/// Implementation for `kind`, if it is a real format.
pub fn format_for(kind: FormatKind) -> Option<&'static dyn ManifestFormat> {
    FORMATS.iter().copied().find(|f| f.kind() == kind)
}

/// Which format `text` is written in. Unparseable YAML is `Unknown`.
pub fn detect_format(text: &str) -> FormatKind {
    match serde_yaml::from_str::<Value>(text) {
        Ok(doc) => format_of(&doc).map_or(FormatKind::Unknown, |f| f.kind()),
        Err(_) => FormatKind::Unknown,
    }
}

pub(crate) fn parse_document(doc: Value) -> Result<Manifest, ParseError> {
    match format_of(&doc) {
        Some(format) => format.parse(doc),
        None => Err(ParseError::UnknownFormat),
    }
}

/// Parse manifest text without resolving file includes.
///
/// Fails on malformed YAML or an unrecognised layout; there is no partial
/// result.
pub fn parse(text: &str) -> Result<Manifest, ParseError> {
    let doc: Value = serde_yaml::from_str(text)?;
    parse_document(doc)
}

/// Structural validation of manifest text.
pub fn validate(text: &str) -> ValidationReport {
    let doc: Value = match serde_yaml::from_str(text) {
        Ok(doc) => doc,
        Err(e) => {
            return ValidationReport::from_error(ValidationError::Syntax {
                message: e.to_string(),
            });
        }
    };
    match format_of(&doc) {
        Some(format) => format.validate(doc),
        None => ValidationReport::from_error(ValidationError::UnknownFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_native_by_metadata() {
        let text = "metadata: {name: shop}\nservices:\n  web: {image: nginx}\n";
        assert_eq!(detect_format(text), FormatKind::Native);
    }

    #[test]
    fn detects_native_multi_stack() {
        let text = "metadata: {name: shop}\nstacks:\n  api: {include: api.yml}\n";
        assert_eq!(detect_format(text), FormatKind::Native);
    }

    #[test]
    fn detects_compose_by_version() {
        let text = "version: '3.8'\nservices:\n  web: {image: nginx}\n";
        assert_eq!(detect_format(text), FormatKind::Compose);
    }

    #[test]
    fn ambiguous_documents_are_unknown() {
        assert_eq!(detect_format("services:\n  web: {image: nginx}\n"), FormatKind::Unknown);
        assert_eq!(detect_format("metadata: {name: x}\n"), FormatKind::Unknown);
        assert_eq!(detect_format(": : :"), FormatKind::Unknown);
        assert!(matches!(
            parse("services: {}\n"),
            Err(ParseError::UnknownFormat)
        ));
    }

    #[test]
    fn format_for_unknown_is_none() {
        assert!(format_for(FormatKind::Unknown).is_none());
        assert_eq!(
            format_for(FormatKind::Compose).map(|f| f.kind()),
            Some(FormatKind::Compose)
        );
    }
}
