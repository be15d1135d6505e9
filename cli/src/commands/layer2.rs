//! `rpi-provisioner layer2`: install the software bundle.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::orchestrator::run_layer;
use crate::application::services::software::{self, SoftwareEnv};
use crate::domain::config::ProvisionerConfig;
use crate::domain::secret::Secret;
use crate::domain::settings::SoftwareSettings;
use crate::infra::config::expand_home;
use crate::infra::ssh::{SshAuth, SshTarget};

/// Arguments for the layer2 command.
#[derive(Args)]
pub struct Layer2Args {
    /// Deployer account created by layer1
    #[arg(long)]
    pub user: String,

    /// Address of the host to provision
    #[arg(long)]
    pub host: String,

    /// SSH port [default: 22, or ssh.port from the config file]
    #[arg(long)]
    pub port: Option<u16>,

    /// Private key for the deployer [default: ~/.ssh/id_rsa]
    #[arg(long)]
    pub key_file: Option<String>,

    /// sudo password, if the account's sudo is not passwordless
    #[arg(long, env = "RPI_SUDO_PASSWORD", hide_env_values = true, default_value = "")]
    pub sudo_password: String,

    /// Per-command timeout in seconds [default: 1800]
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Layer2Args {
    /// # Errors
    ///
    /// Returns `ParseError::Username` when the user name is invalid.
    pub fn settings(&self) -> Result<SoftwareSettings, crate::domain::error::ParseError> {
        let settings = SoftwareSettings {
            user: self.user.clone(),
            sudo_password: Secret::new(self.sudo_password.clone()),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Key file from the flag, else the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if `~` cannot be expanded.
    pub fn key_path(&self, config: &ProvisionerConfig) -> Result<PathBuf> {
        expand_home(self.key_file.as_deref().unwrap_or(&config.ssh.key_file))
    }
}

/// Run `rpi-provisioner layer2`.
///
/// # Errors
///
/// Returns an error for invalid arguments, connection failures, and the
/// first failing step.
pub async fn run(app: &AppContext, args: Layer2Args) -> Result<ExitCode> {
    let settings = args.settings()?;
    let target = SshTarget {
        host: args.host.clone(),
        port: args.port.unwrap_or(app.config.ssh.port),
        user: settings.user.clone(),
    };
    let auth = SshAuth::KeyFile(args.key_path(&app.config)?);
    let connector = super::connector(app, args.timeout);
    let session = super::connect(app, &connector, &target, &auth, settings.secrets()).await?;

    let next_command = format!("ssh {}@{}", target.user, target.host);
    let env = SoftwareEnv { settings };
    let result = run_layer(&session, &env, &software::plan(), &app.reporter(), &app.cancel).await;
    session.close();

    let report = result?;
    super::render_report(app, &report, &next_command, false)?;
    Ok(ExitCode::SUCCESS)
}
