// ABOUTME: Loads manifests from disk and resolves stack and service includes recursively.
// ABOUTME: Guards against include cycles; unreadable includes are skipped with a warning.

use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::format::{format_of, parse_document};
use super::native::parse_fragment;
use super::{FormatKind, Manifest, Metadata, ParseError, StackDefinition, StackEntry};
use crate::diagnostics::{Diagnostics, Warning};
use crate::types::OrderedMap;

/// Stateful manifest loader.
///
/// Keeps the chain of files currently being loaded so that a file that
/// (directly or indirectly) includes itself is reported instead of looping.
#[derive(Debug, Default)]
pub struct ManifestParser {
    diagnostics: Diagnostics,
    active: Vec<PathBuf>,
}

impl ManifestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse manifest text. File includes stay unresolved.
    pub fn parse(&mut self, text: &str) -> Result<Manifest, ParseError> {
        super::parse(text)
    }

    /// Load a manifest file and resolve all of its includes relative to the
    /// file's directory.
    pub fn parse_from_path(&mut self, path: &Path) -> Result<Manifest, ParseError> {
        self.load(path, false)
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn load(&mut self, path: &Path, fragment_ok: bool) -> Result<Manifest, ParseError> {
        let canonical = path.canonicalize().map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if self.active.contains(&canonical) {
            let mut chain = self.active.clone();
            chain.push(canonical);
            return Err(ParseError::CircularInclude { chain });
        }

        self.active.push(canonical.clone());
        let result = self.load_active(&canonical, fragment_ok);
        self.active.pop();
        result
    }

    fn load_active(&mut self, path: &Path, fragment_ok: bool) -> Result<Manifest, ParseError> {
        debug!(path = %path.display(), "loading manifest");
        let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: Value = serde_yaml::from_str(&text)?;

        let mut manifest = if fragment_ok && format_of(&doc).is_none() {
            Manifest {
                format: FormatKind::Native,
                metadata: Metadata::default(),
                root: parse_fragment(doc)?,
                stacks: OrderedMap::new(),
            }
        } else {
            parse_document(doc)?
        };

        let base = path.parent().unwrap_or(Path::new("."));
        self.resolve(&mut manifest, base)?;
        Ok(manifest)
    }

    fn resolve(&mut self, manifest: &mut Manifest, base: &Path) -> Result<(), ParseError> {
        self.resolve_service_includes(&mut manifest.root, base)?;

        let stacks = std::mem::take(&mut manifest.stacks);
        for (name, entry) in stacks {
            match entry {
                StackEntry::Inline(mut def) => {
                    self.resolve_service_includes(&mut def, base)?;
                    manifest.stacks.insert(name, StackEntry::Inline(def));
                }
                StackEntry::Include(file) => {
                    if let Some(def) = self.load_definition(&base.join(&file))? {
                        manifest.stacks.insert(name, StackEntry::Inline(def));
                    }
                }
            }
        }
        Ok(())
    }

    fn resolve_service_includes(
        &mut self,
        def: &mut StackDefinition,
        base: &Path,
    ) -> Result<(), ParseError> {
        for file in std::mem::take(&mut def.service_includes) {
            let path = base.join(&file);
            if let Some(included) = self.load_definition(&path)? {
                for service in def.merge_keeping_existing(included) {
                    self.diagnostics
                        .warn(Warning::service_collision(&service, &path));
                }
            }
        }
        Ok(())
    }

    /// Load an included file as one flattened definition.
    ///
    /// `Ok(None)` means the file could not be read and was skipped.
    fn load_definition(&mut self, path: &Path) -> Result<Option<StackDefinition>, ParseError> {
        match self.load(path, true) {
            Ok(manifest) => {
                let (def, duplicates) = manifest.flatten();
                for entry in duplicates {
                    self.diagnostics
                        .warn(Warning::duplicate_definition(&entry, path));
                }
                Ok(Some(def))
            }
            Err(ParseError::Io { source, .. }) => {
                self.diagnostics
                    .warn(Warning::include_skipped(path, source));
                Ok(None)
            }
            Err(e @ ParseError::CircularInclude { .. }) => Err(e),
            Err(e) => Err(ParseError::Include {
                path: path.to_path_buf(),
                source: Box::new(e),
            }),
        }
    }
}
