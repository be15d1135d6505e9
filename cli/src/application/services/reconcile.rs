//! Bringing a remote authorized_keys file in line with the desired key set.
//!
//! Makes a user's `authorized_keys` equal the desired key set, writing only
//! when the current content differs.

use tracing::{debug, info};

use crate::application::ports::RemoteSession;
use crate::application::services::step::run_checked;
use crate::domain::error::{ReconcileError, ReconcileStage};
use crate::domain::keys::{KeySet, parse_current};
use crate::domain::secret::Secret;
use crate::domain::shell::{self, ShellCommand};

async fn stage(
    session: &impl RemoteSession,
    command: &ShellCommand,
    stage: ReconcileStage,
) -> Result<(), ReconcileError> {
    run_checked(session, command)
        .await
        .map(|_| ())
        .map_err(|source| ReconcileError::Stage { stage, source })
}

/// Install `desired` for `user`. Returns `true` when the file was rewritten.
///
/// An unreadable `authorized_keys` counts as empty.
///
/// # Errors
///
/// Returns `ReconcileError::Stage` naming the first remote command that failed.
pub async fn reconcile(
    session: &impl RemoteSession,
    user: &str,
    group: &str,
    desired: &[String],
    password: &Secret,
) -> Result<bool, ReconcileError> {
    let dir = shell::ssh_dir(user);
    let file = shell::authorized_keys_path(user);

    stage(
        session,
        &shell::create_ssh_dir(user, password),
        ReconcileStage::CreateDirectory,
    )
    .await?;

    let read = session
        .execute(&shell::read_authorized_keys(user, password).text)
        .await;
    let current = if read.success {
        parse_current(&read.stdout)
    } else {
        debug!(%file, "authorized_keys unreadable, treating as empty");
        Vec::new()
    };

    let wanted = KeySet::from_desired(desired.iter().cloned());
    if !wanted.differs_from(&current) {
        debug!(%file, keys = wanted.keys().len(), "authorized_keys already up to date");
        return Ok(false);
    }

    info!(%file, keys = wanted.keys().len(), "updating authorized_keys");
    let writes = [
        (
            shell::write_authorized_keys(user, &wanted.render(), password),
            ReconcileStage::WriteKeys,
        ),
        (
            shell::chmod("700", &dir, password),
            ReconcileStage::ChmodDirectory,
        ),
        (
            shell::chmod("600", &file, password),
            ReconcileStage::ChmodFile,
        ),
        (
            shell::chown(user, group, &dir, password),
            ReconcileStage::ChownDirectory,
        ),
        (
            shell::chown(user, group, &file, password),
            ReconcileStage::ChownFile,
        ),
    ];
    for (command, which) in &writes {
        stage(session, command, *which).await?;
    }
    Ok(true)
}
