//! Port trait definitions for the Application layer.
//!
//! Ports are the contracts infrastructure must fulfill. This file imports
//! only from `crate::domain`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

use std::time::Duration;

use anyhow::Result;

use crate::domain::config::ProvisionerConfig;
use crate::domain::error::{CommandError, KeyProviderError};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Captured outcome of one remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the command never reported an exit status (channel error,
    /// deadline).
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl CommandResult {
    /// A result for a command that could not run to completion.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            stderr: reason.into(),
            ..Self::default()
        }
    }

    /// Convert an unsuccessful result into a [`CommandError`] under `label`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` when `success` is false.
    pub fn into_checked(self, label: &str) -> Result<Self, CommandError> {
        if self.success {
            Ok(self)
        } else {
            Err(CommandError {
                label: label.to_string(),
                exit_code: self.exit_code,
                stdout: self.stdout,
                stderr: self.stderr,
            })
        }
    }
}

// ── Remote Session Port ───────────────────────────────────────────────────────

/// One authenticated connection to the target host.
///
/// Execution never errors across this boundary: channel failures and
/// deadlines come back as `success == false` with the reason in `stderr`.
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    /// Run `command` under the session's default deadline.
    async fn execute(&self, command: &str) -> CommandResult;
    /// Run `command`, giving up after `timeout`.
    async fn execute_with_timeout(&self, command: &str, timeout: Duration) -> CommandResult;
}

impl<T: RemoteSession> RemoteSession for &T {
    async fn execute(&self, command: &str) -> CommandResult {
        (**self).execute(command).await
    }

    async fn execute_with_timeout(&self, command: &str, timeout: Duration) -> CommandResult {
        (**self).execute_with_timeout(command, timeout).await
    }
}

// ── Key Provider Port ─────────────────────────────────────────────────────────

/// Source of the desired authorized keys.
///
/// Sync trait: callers run it on the blocking pool.
pub trait KeyProvider {
    /// Fetch normalized public-key lines from `uri`.
    ///
    /// # Errors
    ///
    /// Returns `KeyProviderError` when the source is unsupported,
    /// unreachable, or holds no keys.
    fn fetch_keys(&self, uri: &str) -> Result<Vec<String>, KeyProviderError>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Lets services emit progress without depending on the Presentation layer.
/// Synchronous.
pub trait ProgressReporter {
    /// A step is starting.
    fn step(&self, message: &str);
    /// A step finished.
    fn success(&self, message: &str);
    /// A soft failure the run continues past.
    fn warn(&self, message: &str);
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Read access to the optional configuration file.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<ProvisionerConfig>;
    /// Location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<std::path::PathBuf>;
}
