//! Immutable per-layer provisioning settings and their validators.
//!
//! Built once by the command handler before any connection is opened and
//! passed by shared reference to every step.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::ParseError;
use crate::domain::s3::S3Location;
use crate::domain::secret::Secret;

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // literal pattern
    Regex::new(r"^[a-z_][a-z0-9_-]{0,31}$").expect("valid regex")
});

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // literal pattern
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("valid regex")
});

/// Validates a POSIX account or group name.
///
/// # Errors
///
/// Returns `ParseError::Username` naming `field` when `value` is not a valid name.
pub fn validate_username(field: &'static str, value: &str) -> Result<(), ParseError> {
    if USERNAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(ParseError::Username {
            field,
            value: value.to_string(),
        })
    }
}

/// Validates a single-label hostname.
///
/// # Errors
///
/// Returns `ParseError::Hostname` when `value` is not a valid label.
pub fn validate_hostname(value: &str) -> Result<(), ParseError> {
    if HOSTNAME_RE.is_match(value) {
        Ok(())
    } else {
        Err(ParseError::Hostname(value.to_string()))
    }
}

// ── Key source ────────────────────────────────────────────────────────────────

/// Where the desired authorized keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    S3(S3Location),
    Uri(String),
}

impl KeySource {
    /// URI handed to the key provider.
    #[must_use]
    pub fn uri(&self) -> String {
        match self {
            Self::S3(loc) => loc.https_url(),
            Self::Uri(uri) => uri.clone(),
        }
    }
}

// ── Static network ────────────────────────────────────────────────────────────

/// Static IPv4 configuration applied to `eth0` and `wlan0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticNetwork {
    pub address: Ipv4Addr,
    pub router: Ipv4Addr,
    pub dns: Vec<Ipv4Addr>,
}

impl StaticNetwork {
    /// Router defaults to `.1` in the address's /24; DNS defaults to the
    /// router followed by `8.8.8.8`.
    #[must_use]
    pub fn new(address: Ipv4Addr, router: Option<Ipv4Addr>, dns: Vec<Ipv4Addr>) -> Self {
        let router = router.unwrap_or_else(|| {
            let [a, b, c, _] = address.octets();
            Ipv4Addr::new(a, b, c, 1)
        });
        let dns = if dns.is_empty() {
            vec![router, Ipv4Addr::new(8, 8, 8, 8)]
        } else {
            dns
        };
        Self {
            address,
            router,
            dns,
        }
    }
}

// ── Layer settings ────────────────────────────────────────────────────────────

/// Target state for the bootstrap layer.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub login_user: String,
    pub login_password: Secret,
    pub deployer_user: String,
    pub deployer_group: String,
    pub deployer_password: Secret,
    pub root_password: Option<Secret>,
    pub hostname: String,
    pub key_source: KeySource,
    pub static_network: Option<StaticNetwork>,
}

impl BootstrapSettings {
    /// Checks every name that ends up interpolated into remote commands.
    ///
    /// # Errors
    ///
    /// Returns the first `ParseError` found.
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_username("login user", &self.login_user)?;
        validate_username("deployer user", &self.deployer_user)?;
        validate_username("deployer group", &self.deployer_group)?;
        validate_hostname(&self.hostname)
    }

    /// Every password this run may place on the wire.
    #[must_use]
    pub fn secrets(&self) -> Vec<Secret> {
        let mut secrets = vec![self.login_password.clone(), self.deployer_password.clone()];
        secrets.extend(self.root_password.clone());
        secrets
    }
}

/// Target state for the software layer.
#[derive(Debug, Clone)]
pub struct SoftwareSettings {
    pub user: String,
    /// Empty when the user has passwordless sudo (the bootstrap layer's rule).
    pub sudo_password: Secret,
}

impl SoftwareSettings {
    /// # Errors
    ///
    /// Returns `ParseError::Username` when the user name is invalid.
    pub fn validate(&self) -> Result<(), ParseError> {
        validate_username("user", &self.user)
    }

    #[must_use]
    pub fn secrets(&self) -> Vec<Secret> {
        vec![self.sudo_password.clone()]
    }
}
