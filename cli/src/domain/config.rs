//! Domain types for the optional provisioner configuration file.
//!
//! Pure types only; loading lives in `infra::config`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_KEY_FILE: &str = "~/.ssh/id_rsa";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
/// Package upgrades on a fresh image are slow.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 1800;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.rpi-provisioner/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProvisionerConfig {
    pub ssh: SshConfig,
    pub deployer: DeployerConfig,
}

/// Connection defaults shared by both layers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SshConfig {
    pub port: u16,
    /// Private key used by the software layer. `~` expands to the home directory.
    pub key_file: String,
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SSH_PORT,
            key_file: DEFAULT_KEY_FILE.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DeployerConfig {
    /// Deployer group; `None` means the deployer user name.
    pub group: Option<String>,
}
