//! Colors for provisioning output.

use owo_colors::Style;

/// One style per kind of line the provisioner prints. `Default` is uncolored.
#[derive(Default, Clone)]
pub struct Styles {
    /// A step that changed the host, and a successful connection.
    pub applied: Style,
    /// Soft failures and best-effort tail warnings.
    pub warning: Style,
    /// Reboot hints and the already-provisioned notice.
    pub note: Style,
    /// Arrow in front of a step that is running.
    pub running: Style,
    /// Summary labels.
    pub label: Style,
    /// Layer title and the suggested next command.
    pub emphasis: Style,
}

impl Styles {
    #[must_use]
    pub fn colored() -> Self {
        Self {
            applied: Style::new().green(),
            warning: Style::new().yellow().bold(),
            note: Style::new().blue(),
            running: Style::new().cyan(),
            label: Style::new().dimmed(),
            emphasis: Style::new().bold(),
        }
    }
}
