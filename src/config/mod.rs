// ABOUTME: Project configuration types and parsing for bosun.yml.
// ABOUTME: Handles discovery, environment overrides, and variable reference resolution.

mod env_value;
mod init;

pub use env_value::{EnvValue, resolve_env_map};
pub use init::init_config;

use crate::error::{Error, Result};
use crate::variables::{DEFAULT_ENV_PREFIX, VariableResolver};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "bosun.yml";
pub const CONFIG_FILENAME_ALT: &str = "bosun.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".bosun/config.yml";
pub const DEFAULT_MANIFEST: &str = "stack.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Manifest path, relative to the config file's directory.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Stack to select from a multi-stack manifest.
    #[serde(default)]
    pub stack: Option<String>,

    /// Identifier of the target environment, set by an environment entry.
    #[serde(default)]
    pub environment_id: Option<String>,

    /// Environment-style variable overrides.
    #[serde(default)]
    pub variables: HashMap<String, EnvValue>,

    /// Prefix of process variables read as overrides.
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    /// How long a deployment may stay pending before it counts as overdue.
    #[serde(default = "default_expected_duration", with = "humantime_serde")]
    pub expected_duration: Duration,

    #[serde(default)]
    pub environments: HashMap<String, EnvironmentConfig>,

    /// Directory of the file this config was loaded from.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub stack: Option<String>,

    #[serde(default)]
    pub variables: HashMap<String, EnvValue>,

    #[serde(default, with = "humantime_serde")]
    pub expected_duration: Option<Duration>,
}

fn default_manifest() -> PathBuf {
    PathBuf::from(DEFAULT_MANIFEST)
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}

fn default_expected_duration() -> Duration {
    Duration::from_secs(15 * 60)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            manifest: default_manifest(),
            stack: None,
            environment_id: None,
            variables: HashMap::new(),
            env_prefix: default_env_prefix(),
            expected_duration: default_expected_duration(),
            environments: HashMap::new(),
            base_dir: None,
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Path of the first config file present in `dir`.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Err(Error::ConfigNotFound(dir.to_path_buf())),
        }
    }

    /// Like [`discover`](Self::discover), but a missing file yields defaults.
    pub fn discover_or_default(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// The base config with the named environment applied on top.
    pub fn for_environment(&self, name: &str) -> Result<Config> {
        let env = self
            .environments
            .get(name)
            .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref id) = env.id {
            merged.environment_id = Some(id.clone());
        } else if merged.environment_id.is_none() {
            merged.environment_id = Some(name.to_string());
        }

        if let Some(ref stack) = env.stack {
            merged.stack = Some(stack.clone());
        }

        // Deep merge variables
        for (k, v) in &env.variables {
            merged.variables.insert(k.clone(), v.clone());
        }

        if let Some(duration) = env.expected_duration {
            merged.expected_duration = duration;
        }

        Ok(merged)
    }

    /// Manifest path resolved against the config file's directory, or
    /// against `dir` when no file was loaded.
    pub fn manifest_path(&self, dir: &Path) -> PathBuf {
        self.base_dir.as_deref().unwrap_or(dir).join(&self.manifest)
    }

    /// Resolve `variables` references against the process environment.
    pub fn resolved_variables(&self) -> Result<BTreeMap<String, String>> {
        resolve_env_map(&self.variables)
    }

    /// Resolver with prefixed process variables overlaid by config overrides,
    /// and `explicit` values on top of both.
    pub fn resolver<I>(&self, explicit: I) -> Result<VariableResolver>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides = self.resolved_variables()?;
        Ok(VariableResolver::new()
            .with_process_env(&self.env_prefix)
            .with_overrides(overrides)
            .with_explicit(explicit))
    }
}
