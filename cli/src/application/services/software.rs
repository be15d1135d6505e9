//! The software layer (layer2).
//!
//! Runs as the deployer over key authentication.

use crate::application::ports::RemoteSession;
use crate::application::services::orchestrator::LayerPlan;
use crate::application::services::step::{Step, apply, ensure, probe, run_checked};
use crate::domain::error::StepFailure;
use crate::domain::report::StepOutcome;
use crate::domain::settings::SoftwareSettings;
use crate::domain::shell;

pub const LAYER: &str = "software";

pub struct SoftwareEnv {
    pub settings: SoftwareSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftwareStep {
    PackageIndex,
    Packages,
    Fish,
    Docker,
    DockerCompose,
}

pub const STEPS: [SoftwareStep; 5] = [
    SoftwareStep::PackageIndex,
    SoftwareStep::Packages,
    SoftwareStep::Fish,
    SoftwareStep::Docker,
    SoftwareStep::DockerCompose,
];

#[must_use]
pub fn plan() -> LayerPlan<SoftwareStep> {
    LayerPlan {
        name: LAYER,
        steps: STEPS.to_vec(),
        tail: None,
    }
}

impl Step for SoftwareStep {
    type Env = SoftwareEnv;

    fn name(&self) -> &'static str {
        match self {
            Self::PackageIndex => "package-index",
            Self::Packages => "packages",
            Self::Fish => "fish",
            Self::Docker => "docker",
            Self::DockerCompose => "docker-compose",
        }
    }

    async fn run<S: RemoteSession>(
        &self,
        session: &S,
        env: &SoftwareEnv,
    ) -> Result<StepOutcome, StepFailure> {
        let s = &env.settings;
        let pw = &s.sudo_password;
        let outcome = match self {
            Self::PackageIndex => {
                apply(session, &shell::update_package_index(pw)).await?;
                StepOutcome::Applied
            }
            Self::Packages => {
                apply(session, &[shell::install_packages(shell::PACKAGES, pw)]).await?;
                StepOutcome::Applied
            }
            Self::Fish => {
                ensure(
                    session,
                    &shell::binary_on_path("fish"),
                    &shell::install_fish(&s.user, pw),
                )
                .await?
            }
            Self::Docker => {
                ensure(
                    session,
                    &shell::binary_on_path("docker"),
                    &shell::install_docker(&s.user, pw),
                )
                .await?
            }
            Self::DockerCompose => docker_compose(session, &s.user).await?,
        };
        Ok(outcome)
    }
}

/// pip installs into `~/.local/bin`, which fish only searches once added.
async fn docker_compose(
    session: &impl RemoteSession,
    user: &str,
) -> Result<StepOutcome, StepFailure> {
    if probe(session, &shell::binary_on_path("docker-compose")).await {
        return Ok(StepOutcome::AlreadySatisfied);
    }
    run_checked(session, &shell::create_local_bin()).await?;
    let path = run_checked(session, &shell::read_path()).await?;
    let bin = shell::local_bin_dir(user);
    if !shell::path_contains(&path.stdout, &bin) {
        run_checked(session, &shell::persist_path(&bin)).await?;
    }
    run_checked(session, &shell::install_docker_compose()).await?;
    Ok(StepOutcome::Applied)
}
