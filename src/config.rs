use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::paths::{expand_tilde, is_contained};

pub const CONFIG_ENV: &str = "MDM_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub defaults: Defaults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Where `mdm add` puts dependencies.
    pub libs_dir: String,
    /// Where `mdm release-init` and `mdm release` look for the releases repo.
    pub releases_dir: String,
    /// Behave as if `--use-defaults` were always given.
    pub use_defaults: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            libs_dir: "lib".to_string(),
            releases_dir: "releases".to_string(),
            use_defaults: false,
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Ok(expand_tilde(&path));
        }
    }
    let proj = directories::ProjectDirs::from("", "", "mdm")
        .context("could not determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// A missing config file is not an error; every key has a default.
pub fn load_default_config() -> Result<Config> {
    let path = default_config_path()?;
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(&path)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config at {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).context("failed to parse config TOML")?;

    for (key, value) in [
        ("libs_dir", &config.defaults.libs_dir),
        ("releases_dir", &config.defaults.releases_dir),
    ] {
        if value.trim().is_empty() {
            bail!("defaults.{} must not be empty", key);
        }
        if !is_contained(Path::new(value)) {
            bail!(
                "defaults.{} must be a relative path inside the project: {:?}",
                key,
                value
            );
        }
    }

    Ok(config)
}
