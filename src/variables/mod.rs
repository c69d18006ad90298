// ABOUTME: Manifest variable declarations, constraint checks, and value resolution.
// ABOUTME: Precedence is explicit value, then environment override, then inline default.

mod interpolate;
mod resolver;

pub use interpolate::{Reference, interpolate, references};
pub use resolver::{
    DEFAULT_ENV_PREFIX, ResolvedValue, ValueSource, VariableError, VariableResolver, VariableSet,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::manifest::deserialize::{optional_scalar, scalar_list};

/// Declared type of a variable; drives which constraint checks apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    String,
    Text,
    Password,
    #[serde(alias = "integer", alias = "int")]
    Number,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "enum")]
    Select,
    Email,
    Url,
}

/// A variable as declared in a manifest (`variables.<NAME>`).
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpec {
    #[serde(default, deserialize_with = "optional_scalar")]
    pub default: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: VariableType,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default, alias = "pattern_error")]
    pub pattern_error: Option<String>,
    #[serde(default, deserialize_with = "scalar_list")]
    pub options: Vec<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    /// Explicit override of the inferred requiredness.
    #[serde(default)]
    pub required: Option<bool>,
}

/// Constraint violations for a single value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariableConstraintError {
    #[error("{name}: {message}")]
    PatternMismatch { name: String, message: String },

    #[error("{name}: declared pattern is not a valid regular expression: {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("{name}: '{value}' is not a number")]
    NotANumber { name: String, value: String },

    #[error("{name}: {value} is below the minimum of {min}")]
    BelowMinimum { name: String, value: f64, min: f64 },

    #[error("{name}: {value} is above the maximum of {max}")]
    AboveMaximum { name: String, value: f64, max: f64 },

    #[error("{name}: '{value}' is not a boolean (expected true or false)")]
    NotABoolean { name: String, value: String },

    #[error("{name}: '{value}' is not one of [{}]", .options.join(", "))]
    NotAnOption {
        name: String,
        value: String,
        options: Vec<String>,
    },

    #[error("{name}: '{value}' is not a valid {expected}")]
    InvalidFormat {
        name: String,
        value: String,
        expected: &'static str,
    },
}

impl VariableConstraintError {
    pub fn variable(&self) -> &str {
        match self {
            VariableConstraintError::PatternMismatch { name, .. }
            | VariableConstraintError::InvalidPattern { name, .. }
            | VariableConstraintError::NotANumber { name, .. }
            | VariableConstraintError::BelowMinimum { name, .. }
            | VariableConstraintError::AboveMaximum { name, .. }
            | VariableConstraintError::NotABoolean { name, .. }
            | VariableConstraintError::NotAnOption { name, .. }
            | VariableConstraintError::InvalidFormat { name, .. } => name,
        }
    }
}

/// A named variable declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    #[serde(flatten)]
    pub spec: VariableSpec,
}

impl Variable {
    pub fn new(name: impl Into<String>, spec: VariableSpec) -> Self {
        Self {
            name: name.into(),
            spec,
        }
    }

    /// Required unless a default exists; an explicit `required` flag wins
    /// in either direction.
    pub fn is_required(&self) -> bool {
        self.spec.required.unwrap_or(self.spec.default.is_none())
    }

    pub fn default_value(&self) -> Option<&str> {
        self.spec.default.as_deref()
    }

    /// Check a value against the declared pattern, range, and options.
    pub fn check(&self, value: &str) -> Result<(), VariableConstraintError> {
        let name = || self.name.clone();

        if let Some(pattern) = &self.spec.pattern {
            let anchored = format!("^(?:{pattern})$");
            let re = Regex::new(&anchored).map_err(|e| VariableConstraintError::InvalidPattern {
                name: name(),
                reason: e.to_string(),
            })?;
            if !re.is_match(value) {
                return Err(VariableConstraintError::PatternMismatch {
                    name: name(),
                    message: self
                        .spec
                        .pattern_error
                        .clone()
                        .unwrap_or_else(|| format!("value does not match pattern {pattern}")),
                });
            }
        }

        match self.spec.kind {
            VariableType::Number => {
                let number = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|number| number.is_finite())
                    .ok_or_else(|| VariableConstraintError::NotANumber {
                        name: name(),
                        value: value.to_string(),
                    })?;
                if let Some(min) = self.spec.min
                    && number < min
                {
                    return Err(VariableConstraintError::BelowMinimum {
                        name: name(),
                        value: number,
                        min,
                    });
                }
                if let Some(max) = self.spec.max
                    && number > max
                {
                    return Err(VariableConstraintError::AboveMaximum {
                        name: name(),
                        value: number,
                        max,
                    });
                }
            }
            VariableType::Boolean => {
                if !matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "false") {
                    return Err(VariableConstraintError::NotABoolean {
                        name: name(),
                        value: value.to_string(),
                    });
                }
            }
            VariableType::Select => {
                if !self.spec.options.is_empty() && !self.spec.options.iter().any(|o| o == value) {
                    return Err(VariableConstraintError::NotAnOption {
                        name: name(),
                        value: value.to_string(),
                        options: self.spec.options.clone(),
                    });
                }
            }
            VariableType::Email => {
                let valid = value
                    .split_once('@')
                    .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
                if !valid {
                    return Err(VariableConstraintError::InvalidFormat {
                        name: name(),
                        value: value.to_string(),
                        expected: "email address",
                    });
                }
            }
            VariableType::Url => {
                let valid = value
                    .split_once("://")
                    .is_some_and(|(scheme, rest)| !scheme.is_empty() && !rest.is_empty());
                if !valid {
                    return Err(VariableConstraintError::InvalidFormat {
                        name: name(),
                        value: value.to_string(),
                        expected: "URL",
                    });
                }
            }
            VariableType::String | VariableType::Text | VariableType::Password => {}
        }

        Ok(())
    }
}
