//! Subcommand handlers and the plumbing they share.

pub mod layer1;
pub mod layer2;

use std::time::Duration;

use anyhow::Result;

use crate::app::AppContext;
use crate::domain::error::ConnectionError;
use crate::domain::report::LayerReport;
use crate::domain::secret::Secret;
use crate::infra::ssh::{SshAuth, SshConnector, SshSession, SshTarget};
use crate::output::Renderer;
use crate::output::progress::ConnectSpinner;

/// Timeouts after applying flag overrides to the config file values.
fn connector(app: &AppContext, command_timeout_secs: Option<u64>) -> SshConnector {
    SshConnector::new(
        Duration::from_secs(app.config.ssh.connect_timeout_secs),
        Duration::from_secs(command_timeout_secs.unwrap_or(app.config.ssh.command_timeout_secs)),
    )
}

/// Connect with a spinner on interactive terminals.
async fn connect(
    app: &AppContext,
    connector: &SshConnector,
    target: &SshTarget,
    auth: &SshAuth,
    secrets: Vec<Secret>,
) -> Result<SshSession, ConnectionError> {
    let spinner = app
        .output
        .show_progress()
        .then(|| ConnectSpinner::start(target));
    let result = connector.connect(target, auth, secrets).await;
    if let Some(spinner) = spinner {
        if result.is_ok() {
            spinner.connected();
        } else {
            spinner.abandon();
        }
    }
    result
}

fn render_report(
    app: &AppContext,
    report: &LayerReport,
    next_command: &str,
    reboot: bool,
) -> Result<()> {
    match app.renderer() {
        Renderer::Human(r) => {
            r.render_layer_report(report, next_command, reboot);
            Ok(())
        }
        Renderer::Json(r) => r.render_layer_report(report, next_command, reboot),
    }
}

fn render_already_provisioned(app: &AppContext, layer: &str, user: &str) -> Result<()> {
    match app.renderer() {
        Renderer::Human(r) => {
            r.render_already_provisioned(layer, user);
            Ok(())
        }
        Renderer::Json(r) => r.render_already_provisioned(layer),
    }
}
