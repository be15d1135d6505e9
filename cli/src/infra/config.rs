//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::ports::ConfigStore;
use crate::domain::config::ProvisionerConfig;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "RPI_PROVISIONER_CONFIG";

/// Reads `~/.rpi-provisioner/config.yaml`.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ProvisionerConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(ProvisionerConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    fn path(&self) -> Result<PathBuf> {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".rpi-provisioner").join("config.yaml"))
    }
}

/// Expand a leading `~/` to the home directory.
///
/// # Errors
///
/// Returns an error if the path starts with `~/` and there is no home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(Path::new(path).to_path_buf()),
    }
}
