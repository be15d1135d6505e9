//! Terminal and JSON output.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::{OwoColorize as _, Style};
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// How human-readable lines look and whether they are printed at all.
pub struct OutputContext {
    pub styles: Styles,
    /// stdout is a terminal.
    pub is_tty: bool,
    /// Nothing but errors reaches the terminal. Set in JSON mode too.
    pub quiet: bool,
}

impl OutputContext {
    /// `no_color` also covers `NO_COLOR`, which clap reads into the flag.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let styles = if is_tty && !no_color {
            Styles::colored()
        } else {
            Styles::default()
        };
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    fn mark(&self, marker: &str, style: Style, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", marker.style(style));
        }
    }

    pub fn running(&self, msg: &str) {
        self.mark("→", self.styles.running, msg);
    }

    pub fn applied(&self, msg: &str) {
        self.mark("✓", self.styles.applied, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.mark("⚠", self.styles.warning, msg);
    }

    pub fn note(&self, msg: &str) {
        self.mark("ℹ", self.styles.note, msg);
    }

    pub fn title(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.emphasis));
        }
    }

    /// Summary line with the label padded to `width` columns.
    pub fn field(&self, label: &str, value: impl std::fmt::Display, width: usize) {
        if !self.quiet {
            let padded = format!("{label:<width$}");
            println!("  {} {value}", padded.style(self.styles.label));
        }
    }
}

/// Renders results in the mode selected on the command line.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}
