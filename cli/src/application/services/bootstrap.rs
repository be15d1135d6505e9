//! The bootstrap layer (layer1): accounts, keys, sshd and hostname.
//!
//! Turns a fresh image into a host reachable only by the deployer's key.
//! Runs as the image's login user, elevating with its password.

use std::sync::Arc;

use tracing::warn;

use crate::application::ports::{KeyProvider, RemoteSession};
use crate::application::services::orchestrator::LayerPlan;
use crate::application::services::reconcile::reconcile;
use crate::application::services::step::{apply, ensure, run_checked, Step};
use crate::domain::error::{CommandError, KeyProviderError, ReconcileError, StepFailure};
use crate::domain::report::StepOutcome;
use crate::domain::settings::BootstrapSettings;
use crate::domain::shell;

pub const LAYER: &str = "bootstrap";

/// Everything the bootstrap steps read.
#[derive(Clone)]
pub struct BootstrapEnv {
    pub settings: BootstrapSettings,
    pub key_provider: Arc<dyn KeyProvider + Send + Sync>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStep {
    DeployerGroup,
    SudoAccess,
    Sudoers,
    DeployerUser,
    RootPassword,
    AuthorizedKeys,
    SshdHardening,
    Hostname,
    LoginUser,
    StaticNetwork,
}

/// Fixed execution order.
pub const STEPS: [BootstrapStep; 9] = [
    BootstrapStep::DeployerGroup,
    BootstrapStep::SudoAccess,
    BootstrapStep::Sudoers,
    BootstrapStep::DeployerUser,
    BootstrapStep::RootPassword,
    BootstrapStep::AuthorizedKeys,
    BootstrapStep::SshdHardening,
    BootstrapStep::Hostname,
    BootstrapStep::LoginUser,
];

/// Bootstrap plan; the static network step runs as the best-effort tail.
#[must_use]
pub fn plan(settings: &BootstrapSettings) -> LayerPlan<BootstrapStep> {
    LayerPlan {
        name: LAYER,
        steps: STEPS.to_vec(),
        tail: settings
            .static_network
            .is_some()
            .then_some(BootstrapStep::StaticNetwork),
    }
}

impl Step for BootstrapStep {
    type Env = BootstrapEnv;

    fn name(&self) -> &'static str {
        match self {
            Self::DeployerGroup => "deployer-group",
            Self::SudoAccess => "sudo-access",
            Self::Sudoers => "sudoers",
            Self::DeployerUser => "deployer-user",
            Self::RootPassword => "root-password",
            Self::AuthorizedKeys => "authorized-keys",
            Self::SshdHardening => "sshd-hardening",
            Self::Hostname => "hostname",
            Self::LoginUser => "login-user",
            Self::StaticNetwork => "static-network",
        }
    }

    fn is_soft(&self) -> bool {
        matches!(self, Self::SudoAccess)
    }

    async fn run<S: RemoteSession>(
        &self,
        session: &S,
        env: &BootstrapEnv,
    ) -> Result<StepOutcome, StepFailure> {
        let s = &env.settings;
        let pw = &s.login_password;
        let outcome = match self {
            Self::DeployerGroup => {
                ensure(
                    session,
                    &shell::group_exists(&s.deployer_group),
                    &[shell::create_group(&s.deployer_group, pw)],
                )
                .await?
            }
            Self::SudoAccess => {
                run_checked(session, &shell::sudo_access(pw)).await?;
                StepOutcome::AlreadySatisfied
            }
            Self::Sudoers => sudoers(session, s).await?,
            Self::DeployerUser => {
                ensure(
                    session,
                    &shell::user_exists(&s.deployer_user),
                    &shell::create_user(
                        &s.deployer_user,
                        &s.deployer_group,
                        &s.deployer_password,
                        pw,
                    ),
                )
                .await?
            }
            Self::RootPassword => match &s.root_password {
                Some(root) => {
                    apply(session, &[shell::set_root_password(root, pw)]).await?;
                    StepOutcome::Applied
                }
                None => StepOutcome::Skipped("no root password supplied".to_string()),
            },
            Self::AuthorizedKeys => authorized_keys(session, env).await?,
            Self::SshdHardening => {
                ensure(session, &shell::sshd_hardened(), &shell::harden_sshd(pw)).await?
            }
            Self::Hostname => {
                ensure(
                    session,
                    &shell::hostname_set(&s.hostname),
                    &shell::set_hostname(&s.hostname, pw),
                )
                .await?
            }
            Self::LoginUser => {
                ensure(
                    session,
                    &shell::login_disabled(&s.login_user),
                    &shell::disable_login(&s.login_user, pw),
                )
                .await?
            }
            Self::StaticNetwork => match &s.static_network {
                Some(net) => {
                    ensure(
                        session,
                        &shell::static_ip_configured(net),
                        &shell::configure_static_ip(net, pw),
                    )
                    .await?
                }
                None => StepOutcome::Skipped("no static address requested".to_string()),
            },
        };
        Ok(outcome)
    }
}

/// Append the group's NOPASSWD rule unless present; restore the backup if
/// `visudo` rejects the result.
async fn sudoers(
    session: &impl RemoteSession,
    s: &BootstrapSettings,
) -> Result<StepOutcome, CommandError> {
    let pw = &s.login_password;
    let current = session.execute(&shell::read_sudoers(pw).text).await;
    if current.success && shell::sudoers_has_rule(&current.stdout, &s.deployer_group) {
        return Ok(StepOutcome::AlreadySatisfied);
    }

    apply(
        session,
        &[
            shell::backup_sudoers(pw),
            shell::append_sudoers_rule(&s.deployer_group, pw),
        ],
    )
    .await?;

    if let Err(invalid) = run_checked(session, &shell::check_sudoers(pw)).await {
        warn!(error = %invalid, "sudoers validation failed, restoring backup");
        if let Err(restore) = run_checked(session, &shell::restore_sudoers(pw)).await {
            warn!(error = %restore, "cannot restore sudoers backup");
        }
        return Err(invalid);
    }
    Ok(StepOutcome::Applied)
}

async fn authorized_keys(
    session: &impl RemoteSession,
    env: &BootstrapEnv,
) -> Result<StepOutcome, StepFailure> {
    let s = &env.settings;
    let uri = s.key_source.uri();
    let provider = Arc::clone(&env.key_provider);
    let fetch_uri = uri.clone();
    let keys = tokio::task::spawn_blocking(move || provider.fetch_keys(&fetch_uri))
        .await
        .map_err(|e| KeyProviderError::Fetch {
            uri,
            reason: e.to_string(),
        })
        .and_then(|fetched| fetched)
        .map_err(ReconcileError::from)?;

    let changed = reconcile(
        session,
        &s.deployer_user,
        &s.deployer_group,
        &keys,
        &s.login_password,
    )
    .await?;
    Ok(if changed {
        StepOutcome::Applied
    } else {
        StepOutcome::AlreadySatisfied
    })
}
