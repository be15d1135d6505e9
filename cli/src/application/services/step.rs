//! Idempotent step primitives.
//!
//! A step probes remote state first and only applies when the probe fails.
//! Probes never error; apply stops at the first failing command.

use std::time::Duration;

use tracing::debug;

use crate::application::ports::{CommandResult, RemoteSession};
use crate::domain::error::{CommandError, StepFailure};
use crate::domain::report::StepOutcome;
use crate::domain::shell::ShellCommand;

/// Deadline for read-only probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// A named unit of provisioning work.
#[allow(async_fn_in_trait)]
pub trait Step {
    /// Shared, read-only input for every step in the layer.
    type Env;

    fn name(&self) -> &'static str;

    /// Soft steps turn a failure into a warning instead of aborting the layer.
    fn is_soft(&self) -> bool {
        false
    }

    /// Bring the host into the step's target state.
    ///
    /// # Errors
    ///
    /// Returns `StepFailure` when an apply command fails.
    async fn run<S: RemoteSession>(
        &self,
        session: &S,
        env: &Self::Env,
    ) -> Result<StepOutcome, StepFailure>;
}

/// `true` when `command` succeeds, meaning the target state already holds.
pub async fn probe(session: &impl RemoteSession, command: &ShellCommand) -> bool {
    let result = session
        .execute_with_timeout(&command.text, PROBE_TIMEOUT)
        .await;
    debug!(probe = %command.label, satisfied = result.success, "probe finished");
    result.success
}

/// Execute one command, turning failure into a [`CommandError`].
///
/// # Errors
///
/// Returns `CommandError` labelled with the command's label.
pub async fn run_checked(
    session: &impl RemoteSession,
    command: &ShellCommand,
) -> Result<CommandResult, CommandError> {
    debug!(command = %command.label, elevated = command.elevated, "applying");
    session.execute(&command.text).await.into_checked(&command.label)
}

/// Execute `commands` in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the first `CommandError`.
pub async fn apply(
    session: &impl RemoteSession,
    commands: &[ShellCommand],
) -> Result<(), CommandError> {
    for command in commands {
        run_checked(session, command).await?;
    }
    Ok(())
}

/// Probe, then apply only if the probe failed.
///
/// # Errors
///
/// Returns the first `CommandError` from apply.
pub async fn ensure(
    session: &impl RemoteSession,
    check: &ShellCommand,
    commands: &[ShellCommand],
) -> Result<StepOutcome, CommandError> {
    if probe(session, check).await {
        return Ok(StepOutcome::AlreadySatisfied);
    }
    apply(session, commands).await?;
    Ok(StepOutcome::Applied)
}
