// ABOUTME: Variable override values that are literal or read from the process environment.
// ABOUTME: Used by bosun.yml environments to feed the environment-style override layer.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// One override in `bosun.yml`.
///
/// Plain scalars (`8080`, `true`, `info`) are literals; a mapping with an
/// `env` key reads the named process variable at plan time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawValue")]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        var: String,
        default: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Number(serde_yaml::Number),
    Flag(bool),
    Reference {
        env: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl From<RawValue> for EnvValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Text(s) => EnvValue::Literal(s),
            RawValue::Number(n) => EnvValue::Literal(n.to_string()),
            RawValue::Flag(b) => EnvValue::Literal(b.to_string()),
            RawValue::Reference { env, default } => EnvValue::FromEnv { var: env, default },
        }
    }
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, .. } => self
                .resolve_with(|name| std::env::var(name).ok())
                .ok_or_else(|| Error::MissingEnvVar(var.clone())),
        }
    }

    /// Resolve against `lookup` instead of the process environment.
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        match self {
            EnvValue::Literal(s) => Some(s.clone()),
            EnvValue::FromEnv { var, default } => lookup(var).or_else(|| default.clone()),
        }
    }
}

/// Resolve every value. All unset references without a default are named
/// in one error.
pub fn resolve_env_map(map: &HashMap<String, EnvValue>) -> Result<BTreeMap<String, String>> {
    let mut resolved = BTreeMap::new();
    let mut missing = Vec::new();
    for (name, value) in map {
        match value.resolve_with(|var| std::env::var(var).ok()) {
            Some(v) => {
                resolved.insert(name.clone(), v);
            }
            None => {
                if let EnvValue::FromEnv { var, .. } = value {
                    missing.push(var.clone());
                }
            }
        }
    }
    if missing.is_empty() {
        Ok(resolved)
    } else {
        missing.sort();
        Err(Error::MissingEnvVar(missing.join(", ")))
    }
}
