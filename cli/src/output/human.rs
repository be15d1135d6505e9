//! Human-readable layer summaries.

use owo_colors::OwoColorize as _;

use crate::domain::report::{LayerReport, StepOutcome, TailOutcome};
use crate::output::OutputContext;

const LABEL_WIDTH: usize = 21;

pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Summarise a finished layer and suggest what to run next.
    pub fn render_layer_report(&self, report: &LayerReport, next_command: &str, reboot: bool) {
        if self.ctx.quiet {
            return;
        }
        let satisfied = report
            .steps
            .iter()
            .filter(|r| r.outcome == StepOutcome::AlreadySatisfied)
            .count();

        println!();
        self.ctx.title(&format!("{} layer complete", report.layer));
        self.ctx.field("Changed:", report.changed_count(), LABEL_WIDTH);
        self.ctx.field("Already provisioned:", satisfied, LABEL_WIDTH);
        for warning in report.warnings() {
            self.ctx.warn(warning);
        }
        if let TailOutcome::AppliedWithWarning(detail) = &report.tail {
            self.ctx.warn(&format!("best-effort step did not complete: {detail}"));
        }

        println!();
        self.ctx.field(
            "Next:",
            next_command.style(self.ctx.styles.emphasis),
            LABEL_WIDTH,
        );
        if reboot {
            self.ctx
                .note("Reboot the host for the hostname change to take effect.");
        }
    }

    /// The host no longer accepts the login this layer needs.
    pub fn render_already_provisioned(&self, layer: &str, user: &str) {
        self.ctx.note(&format!(
            "{layer} layer already applied: the server no longer accepts password login for '{user}'."
        ));
    }
}
