//! Infrastructure implementation of the `ConfigStore` port.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::ProvisionConfig;

/// Location used when neither `--config` nor `HOSTKIT_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostkit/config.yaml";

/// Answers stored as a flat YAML mapping. Only ever read.
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for YamlConfigStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<Option<ProvisionConfig>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(Some(ProvisionConfig::default()));
        }
        serde_yaml::from_str(&content)
            .map(Some)
            .with_context(|| format!("cannot parse {}", self.path.display()))
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
