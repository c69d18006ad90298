// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates a commented bosun.yml template.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, DEFAULT_MANIFEST};

pub fn init_config(dir: &Path, manifest: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let manifest = manifest.unwrap_or(DEFAULT_MANIFEST);
    if manifest.trim().is_empty() {
        return Err(Error::InvalidConfig("manifest path is empty".to_string()));
    }

    std::fs::write(&config_path, generate_template_yaml(manifest))?;
    Ok(())
}

fn generate_template_yaml(manifest: &str) -> String {
    format!(
        r#"manifest: {manifest}
# Stack to select when the manifest declares several
# stack: web

# Overrides applied to every environment
# variables:
#   LOG_LEVEL: info

expected_duration: 15m

environments:
  dev:
    id: dev
    variables:
      PUBLIC_URL: http://localhost:8080
  prod:
    id: prod
    expected_duration: 30m
    variables:
      # Read from the process environment at plan time
      DB_PASSWORD:
        env: PROD_DB_PASSWORD
"#
    )
}
