// ABOUTME: Resolves each declared variable from explicit values, overrides, and defaults.
// ABOUTME: Collects every missing or invalid variable in one pass.

use nonempty::NonEmpty;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use super::{Variable, VariableConstraintError, VariableSpec};
use crate::types::OrderedMap;

/// Prefix for process variables that act as environment-style overrides.
pub const DEFAULT_ENV_PREFIX: &str = "BOSUN_VAR_";

/// Where a resolved value came from, highest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Explicit,
    Environment,
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSource::Explicit => write!(f, "explicit"),
            ValueSource::Environment => write!(f, "environment"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedValue {
    pub value: String,
    pub source: ValueSource,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariableError {
    #[error("missing required variable: {name}")]
    MissingRequired { name: String },

    #[error(transparent)]
    Constraint(#[from] VariableConstraintError),
}

impl VariableError {
    pub fn variable(&self) -> &str {
        match self {
            VariableError::MissingRequired { name } => name,
            VariableError::Constraint(e) => e.variable(),
        }
    }
}

/// Fully resolved name to value map handed to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct VariableSet {
    values: BTreeMap<String, String>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.values
    }
}

impl From<BTreeMap<String, String>> for VariableSet {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Applies explicit > environment override > inline default.
#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
    explicit: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl VariableResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy-time values, e.g. `--set KEY=VALUE`.
    pub fn with_explicit<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.explicit
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Environment-style overrides, e.g. from a config environment.
    pub fn with_overrides<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Read overrides from process variables named `{prefix}{NAME}`.
    ///
    /// Values already supplied through [`with_overrides`](Self::with_overrides)
    /// are kept.
    pub fn with_process_env(mut self, prefix: &str) -> Self {
        for (key, value) in std::env::vars() {
            if let Some(name) = key.strip_prefix(prefix)
                && !name.is_empty()
            {
                self.overrides.entry(name.to_string()).or_insert(value);
            }
        }
        self
    }

    /// Effective value for one variable, before constraint checks.
    pub fn lookup(&self, variable: &Variable) -> Option<ResolvedValue> {
        let name = variable.name.as_str();
        if let Some(v) = self.explicit.get(name) {
            return Some(ResolvedValue {
                value: v.clone(),
                source: ValueSource::Explicit,
            });
        }
        if let Some(v) = self.overrides.get(name) {
            return Some(ResolvedValue {
                value: v.clone(),
                source: ValueSource::Environment,
            });
        }
        variable.default_value().map(|v| ResolvedValue {
            value: v.to_string(),
            source: ValueSource::Default,
        })
    }

    /// Resolve and check one variable.
    ///
    /// `Ok(None)` means an optional variable has no value from any source.
    /// An empty value counts as missing for a required variable.
    pub fn resolve(&self, variable: &Variable) -> Result<Option<ResolvedValue>, VariableError> {
        let resolved = self.lookup(variable);
        let has_value = resolved.as_ref().is_some_and(|r| !r.value.is_empty());

        if !has_value {
            if variable.is_required() {
                return Err(VariableError::MissingRequired {
                    name: variable.name.clone(),
                });
            }
            return Ok(resolved);
        }

        if let Some(r) = &resolved {
            variable.check(&r.value)?;
            debug!(variable = %variable.name, source = %r.source, "resolved variable");
        }
        Ok(resolved)
    }

    /// Resolve every declaration, reporting all failures together.
    ///
    /// Explicit values and overrides for names the manifest does not declare
    /// are passed through so they can still be interpolated.
    pub fn resolve_all(
        &self,
        declarations: &OrderedMap<VariableSpec>,
    ) -> Result<VariableSet, NonEmpty<VariableError>> {
        let mut set = VariableSet::new();
        let mut errors = Vec::new();

        for (name, spec) in declarations.iter() {
            let variable = Variable::new(name, spec.clone());
            match self.resolve(&variable) {
                Ok(Some(r)) => set.insert(name, r.value),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        for (name, value) in self.overrides.iter().chain(self.explicit.iter()) {
            if !declarations.contains_key(name) {
                set.insert(name.as_str(), value.as_str());
            }
        }

        match NonEmpty::from_vec(errors) {
            Some(errors) => Err(errors),
            None => Ok(set),
        }
    }
}
