//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

/// Phrase the SSH server side reports once password login has been disabled.
pub const NO_SUPPORTED_METHODS: &str = "no supported methods remain";

// ── Connection errors ─────────────────────────────────────────────────────────

/// Errors raised while opening an SSH session.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("cannot reach {address}: {reason}")]
    Unreachable { address: String, reason: String },

    #[error("ssh handshake with {address} failed: {reason}")]
    Handshake { address: String, reason: String },

    #[error("cannot use private key {path}: {reason}")]
    KeyFile { path: String, reason: String },

    #[error(
        "ssh: unable to authenticate as '{user}', attempted methods [{attempted}], \
         server allows [{allowed}], no supported methods remain"
    )]
    NoSupportedMethods {
        user: String,
        attempted: String,
        allowed: String,
    },

    #[error("ssh authentication as '{user}' failed: {reason}")]
    AuthenticationFailed { user: String, reason: String },
}

impl ConnectionError {
    /// Returns `true` when the failure means the host has already been
    /// hardened (password login turned off), not that something is broken.
    #[must_use]
    pub fn is_already_provisioned(&self) -> bool {
        matches!(self, Self::NoSupportedMethods { .. })
            || self.to_string().contains(NO_SUPPORTED_METHODS)
    }
}

// ── Command errors ────────────────────────────────────────────────────────────

/// A remote command finished unsuccessfully.
///
/// Carries a human label instead of the raw command text, since elevated
/// commands embed passwords.
#[derive(Debug, Error)]
#[error("{label} failed{}: {}", exit_suffix(.exit_code), diagnostic(.stdout, .stderr))]
pub struct CommandError {
    pub label: String,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

#[allow(clippy::ref_option)]
fn exit_suffix(code: &Option<i32>) -> String {
    code.map_or_else(String::new, |c| format!(" (exit {c})"))
}

fn diagnostic(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if stdout.is_empty() {
        "no output".to_string()
    } else {
        stdout.to_string()
    }
}

// ── Key provider / reconciliation errors ──────────────────────────────────────

/// Failure fetching the desired authorized keys.
#[derive(Debug, Error)]
pub enum KeyProviderError {
    #[error("unsupported key source '{0}' (expected https://, http:// or file://)")]
    UnsupportedScheme(String),

    #[error("cannot fetch keys from {uri}: {reason}")]
    Fetch { uri: String, reason: String },

    #[error("key source {0} contains no public keys")]
    Empty(String),
}

/// Sub-step of key reconciliation, named in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    CreateDirectory,
    WriteKeys,
    ChmodDirectory,
    ChmodFile,
    ChownDirectory,
    ChownFile,
}

impl ReconcileStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateDirectory => "create-directory",
            Self::WriteKeys => "write-keys",
            Self::ChmodDirectory => "chmod-directory",
            Self::ChmodFile => "chmod-file",
            Self::ChownDirectory => "chown-directory",
            Self::ChownFile => "chown-file",
        }
    }
}

impl std::fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by authorized-key reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("error getting authorized keys")]
    Fetch(#[from] KeyProviderError),

    #[error("authorized keys {stage} failed")]
    Stage {
        stage: ReconcileStage,
        #[source]
        source: CommandError,
    },
}

// ── Parse errors ──────────────────────────────────────────────────────────────

/// Malformed input detected before any connection is opened.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid S3 path '{input}': {reason}. Must match the pattern region/bucket/file")]
    S3Path { input: String, reason: &'static str },

    #[error("invalid hostname '{0}': must be 1-63 letters, digits or hyphens, not starting or ending with a hyphen")]
    Hostname(String),

    #[error("invalid {field} '{value}': must match ^[a-z_][a-z0-9_-]{{0,31}}$")]
    Username { field: &'static str, value: String },
}

// ── Step and layer errors ─────────────────────────────────────────────────────

/// Why a step's apply phase failed.
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Errors that abort a layer run.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("step '{step}' failed")]
    Step {
        step: &'static str,
        #[source]
        source: StepFailure,
    },

    #[error("provisioning cancelled during step '{step}'")]
    Cancelled { step: &'static str },
}

impl LayerError {
    /// Name of the step that aborted the layer.
    #[must_use]
    pub fn step(&self) -> &'static str {
        match self {
            Self::Step { step, .. } | Self::Cancelled { step } => step,
        }
    }
}
