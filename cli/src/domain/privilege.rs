//! Non-interactive privilege elevation.
//!
//! Pure text transform: no I/O. The password travels on sudo's stdin so no
//! terminal prompt is needed, and the inner command runs under `bash -c` as
//! a single quoted word.

use std::borrow::Cow;

use crate::domain::secret::Secret;

/// Quote `word` for a POSIX shell.
#[must_use]
pub fn quote(word: &str) -> Cow<'_, str> {
    shell_escape::unix::escape(Cow::Borrowed(word))
}

/// Wrap `command` so it runs as root, feeding `password` to `sudo -S`.
///
/// `-p ''` silences the prompt so it never lands in captured stderr.
#[must_use]
pub fn elevate(command: &str, password: &Secret) -> String {
    format!(
        "printf '%s\\n' {} | sudo -S -p '' bash -c {}",
        quote(password.expose()),
        quote(command)
    )
}
