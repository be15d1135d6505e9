//! Spinner shown while an SSH session is being opened.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::infra::ssh::SshTarget;

const TICK: Duration = Duration::from_millis(100);
const TICKS: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

fn template(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Live "connecting" line for one target. Dropping it without a verdict
/// leaves the line as drawn, so callers finish it explicitly.
pub struct ConnectSpinner {
    bar: ProgressBar,
    address: String,
}

impl ConnectSpinner {
    #[must_use]
    pub fn start(target: &SshTarget) -> Self {
        let address = target.address();
        let bar = ProgressBar::new_spinner()
            .with_style(template("  {spinner:.cyan} {msg} {elapsed:.dim}").tick_chars(TICKS))
            .with_message(format!("connecting to {address} as {}", target.user));
        bar.enable_steady_tick(TICK);
        Self { bar, address }
    }

    /// Replace the spinner with a `✓ connected` line.
    pub fn connected(self) {
        self.bar.set_style(template("  ✓ {msg}"));
        self.bar.finish_with_message(format!("connected to {}", self.address));
    }

    /// Erase the line; the error is reported elsewhere.
    pub fn abandon(self) {
        self.bar.finish_and_clear();
    }
}
