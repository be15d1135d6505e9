//! Step and layer outcomes.

use serde::Serialize;

/// Result of running a single step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Probe passed; nothing was changed.
    AlreadySatisfied,
    /// Apply ran to completion.
    Applied,
    /// Not applicable to this run.
    Skipped(String),
    /// Soft step failed; the layer continued.
    Warning(String),
}

impl StepOutcome {
    /// `true` when this run changed the host.
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Result of the best-effort step run after a successful layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum TailOutcome {
    Applied,
    Skipped,
    AppliedWithWarning(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: &'static str,
    pub outcome: StepOutcome,
}

/// Everything a layer run did, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerReport {
    pub layer: &'static str,
    pub steps: Vec<StepReport>,
    pub tail: TailOutcome,
}

impl LayerReport {
    /// Outcome of the named step, if it ran.
    #[must_use]
    pub fn outcome(&self, step: &str) -> Option<&StepOutcome> {
        self.steps.iter().find(|r| r.step == step).map(|r| &r.outcome)
    }

    /// Number of steps that changed the host.
    #[must_use]
    pub fn changed_count(&self) -> usize {
        self.steps.iter().filter(|r| r.outcome.changed()).count()
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|r| match &r.outcome {
                StepOutcome::Warning(detail) => Some(detail.as_str()),
                _ => None,
            })
            .collect()
    }
}
