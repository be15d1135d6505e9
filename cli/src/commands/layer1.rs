//! `rpi-provisioner layer1`: bootstrap a fresh host.

use std::net::Ipv4Addr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{ArgGroup, Args};
use tracing::info;

use crate::app::AppContext;
use crate::application::ports::RemoteSession;
use crate::application::services::bootstrap::{self, BootstrapEnv, LAYER};
use crate::application::services::orchestrator::run_layer;
use crate::domain::config::ProvisionerConfig;
use crate::domain::error::{ConnectionError, ParseError};
use crate::domain::secret::Secret;
use crate::domain::settings::{BootstrapSettings, KeySource, StaticNetwork};
use crate::infra::keys::HttpKeyProvider;
use crate::infra::ssh::{SshAuth, SshTarget};

const KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments for the layer1 command.
#[derive(Args)]
#[command(group(ArgGroup::new("key_source").required(true).args(["s3_path", "keys_uri"])))]
pub struct Layer1Args {
    /// User the fresh image ships with
    #[arg(long)]
    pub login_user: String,

    /// Password of the login user, also used for sudo
    #[arg(long, env = "RPI_LOGIN_PASSWORD", hide_env_values = true)]
    pub login_password: String,

    /// Account to create for deployments
    #[arg(long)]
    pub deployer_user: String,

    /// Password for the deployer account
    #[arg(long, env = "RPI_DEPLOYER_PASSWORD", hide_env_values = true)]
    pub deployer_password: String,

    /// Group granted passwordless sudo [default: the deployer user name]
    #[arg(long)]
    pub deployer_group: Option<String>,

    /// New root password (left unchanged when omitted)
    #[arg(long, env = "RPI_ROOT_PASSWORD", hide_env_values = true)]
    pub root_password: Option<String>,

    /// Address of the host to provision
    #[arg(long)]
    pub host: String,

    /// SSH port [default: 22, or ssh.port from the config file]
    #[arg(long)]
    pub port: Option<u16>,

    /// Hostname to assign
    #[arg(long)]
    pub hostname: String,

    /// S3 object holding authorized_keys, as region/bucket/file
    #[arg(long)]
    pub s3_path: Option<String>,

    /// URL (https://, http://, file://) of an authorized_keys document
    #[arg(long)]
    pub keys_uri: Option<String>,

    /// Static IPv4 address for eth0 and wlan0
    #[arg(long)]
    pub static_ip: Option<Ipv4Addr>,

    /// Gateway for the static address [default: .1 in the same /24]
    #[arg(long, requires = "static_ip")]
    pub router: Option<Ipv4Addr>,

    /// DNS server for the static address; repeat for several [default: router, 8.8.8.8]
    #[arg(long, requires = "static_ip")]
    pub dns: Vec<Ipv4Addr>,

    /// Per-command timeout in seconds [default: 1800]
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Layer1Args {
    /// Build and validate the bootstrap settings.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` for a malformed S3 path, hostname, or account name.
    pub fn settings(&self, config: &ProvisionerConfig) -> Result<BootstrapSettings, ParseError> {
        let key_source = match (&self.s3_path, &self.keys_uri) {
            (Some(path), _) => KeySource::S3(path.parse()?),
            (None, Some(uri)) => KeySource::Uri(uri.clone()),
            (None, None) => {
                return Err(ParseError::S3Path {
                    input: String::new(),
                    reason: "no key source given",
                });
            }
        };
        let deployer_group = self
            .deployer_group
            .clone()
            .or_else(|| config.deployer.group.clone())
            .unwrap_or_else(|| self.deployer_user.clone());

        let settings = BootstrapSettings {
            login_user: self.login_user.clone(),
            login_password: Secret::new(self.login_password.clone()),
            deployer_user: self.deployer_user.clone(),
            deployer_group,
            deployer_password: Secret::new(self.deployer_password.clone()),
            root_password: self.root_password.clone().map(Secret::new),
            hostname: self.hostname.clone(),
            key_source,
            static_network: self
                .static_ip
                .map(|ip| StaticNetwork::new(ip, self.router, self.dns.clone())),
        };
        settings.validate()?;
        Ok(settings)
    }
}

/// Run `rpi-provisioner layer1`.
///
/// # Errors
///
/// Returns an error for invalid arguments, connection failures other than
/// the already-provisioned signature, and the first failing step.
pub async fn run(app: &AppContext, args: Layer1Args) -> Result<ExitCode> {
    let settings = args.settings(&app.config)?;
    let target = SshTarget {
        host: args.host.clone(),
        port: args.port.unwrap_or(app.config.ssh.port),
        user: settings.login_user.clone(),
    };
    let connector = super::connector(app, args.timeout);
    let auth = SshAuth::Password(settings.login_password.clone());
    let connected = super::connect(app, &connector, &target, &auth, settings.secrets()).await;

    let env = BootstrapEnv {
        settings,
        key_provider: Arc::new(HttpKeyProvider::new(KEY_FETCH_TIMEOUT)),
    };
    provision(app, &env, &target.host, connected).await
}

/// Run the bootstrap layer over the outcome of the password login.
///
/// A server that no longer offers password login has been through this
/// layer already: nothing runs and the command succeeds. The session is
/// dropped, and so disconnected, before the report is rendered.
///
/// # Errors
///
/// Returns any other connection error, or the layer's first hard failure.
pub async fn provision<S: RemoteSession>(
    app: &AppContext,
    env: &BootstrapEnv,
    host: &str,
    connected: Result<S, ConnectionError>,
) -> Result<ExitCode> {
    let session = match connected {
        Ok(session) => session,
        Err(e) if e.is_already_provisioned() => {
            info!(%host, error = %e, "password login refused, host already bootstrapped");
            super::render_already_provisioned(app, LAYER, &env.settings.login_user)?;
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => return Err(e.into()),
    };

    let plan = bootstrap::plan(&env.settings);
    let result = run_layer(&session, env, &plan, &app.reporter(), &app.cancel).await;
    drop(session);

    let report = result?;
    let next_command = format!("ssh {}@{host}", env.settings.deployer_user);
    super::render_report(app, &report, &next_command, true)?;
    Ok(ExitCode::SUCCESS)
}
