//! Step progress on the terminal, for the layer orchestrator.

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// `→` while a step runs, `✓` once it holds, `⚠` for soft failures.
/// Silent when the context is quiet.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.ctx.running(message);
    }

    fn success(&self, message: &str) {
        self.ctx.applied(message);
    }

    fn warn(&self, message: &str) {
        self.ctx.warn(message);
    }
}
