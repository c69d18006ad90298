// ABOUTME: Command module aggregator for the bosun CLI.
// ABOUTME: Shared project loading plus validate, variables, and plan handlers.

mod plan;
mod validate;
mod variables;

pub use plan::{PlanArgs, plan};
pub use validate::validate;
pub use variables::variables;

use bosun::config::Config;
use bosun::error::Result;
use std::env;
use std::path::{Path, PathBuf};

/// Working directory plus its configuration, if any.
pub struct Project {
    pub dir: PathBuf,
    pub config: Config,
}

impl Project {
    pub fn load() -> Result<Self> {
        let dir = env::current_dir()?;
        let config = Config::discover_or_default(&dir)?;
        Ok(Self { dir, config })
    }

    /// The given manifest path, else the configured one.
    pub fn manifest_path(&self, file: Option<&Path>) -> PathBuf {
        match file {
            Some(path) => self.dir.join(path),
            None => self.config.manifest_path(&self.dir),
        }
    }
}
