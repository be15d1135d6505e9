//! Runs a layer's steps in order.
//!
//! Steps run strictly in sequence against one session. The first hard
//! failure aborts the layer; partial progress is left in place.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::application::ports::{ProgressReporter, RemoteSession};
use crate::application::services::step::Step;
use crate::domain::error::LayerError;
use crate::domain::report::{LayerReport, StepOutcome, StepReport, TailOutcome};

/// Ordered steps of one layer plus an optional best-effort tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerPlan<St> {
    pub name: &'static str,
    pub steps: Vec<St>,
    pub tail: Option<St>,
}

fn describe(name: &str, outcome: &StepOutcome) -> String {
    match outcome {
        StepOutcome::AlreadySatisfied => format!("{name}: already provisioned"),
        StepOutcome::Applied => format!("{name}: provisioned successfully"),
        StepOutcome::Skipped(reason) => format!("{name}: skipped ({reason})"),
        StepOutcome::Warning(detail) => format!("{name}: {detail}"),
    }
}

/// Run every step in `plan`, then the tail if all steps passed.
///
/// # Errors
///
/// Returns `LayerError::Step` for the first hard failure, or
/// `LayerError::Cancelled` when `cancel` fires before the layer completes.
pub async fn run_layer<S, St>(
    session: &S,
    env: &St::Env,
    plan: &LayerPlan<St>,
    reporter: &impl ProgressReporter,
    cancel: &CancellationToken,
) -> Result<LayerReport, LayerError>
where
    S: RemoteSession,
    St: Step,
{
    info!(layer = plan.name, steps = plan.steps.len(), "starting layer");
    let mut steps = Vec::with_capacity(plan.steps.len());

    for step in &plan.steps {
        let name = step.name();
        if cancel.is_cancelled() {
            return Err(LayerError::Cancelled { step: name });
        }
        reporter.step(&format!("{name}..."));
        info!(step = name, "running step");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LayerError::Cancelled { step: name }),
            result = step.run(session, env) => result,
        };

        let outcome = match result {
            Ok(outcome) => {
                reporter.success(&describe(name, &outcome));
                outcome
            }
            Err(err) if step.is_soft() => {
                warn!(step = name, error = %err, "soft step failed, continuing");
                let outcome = StepOutcome::Warning(err.to_string());
                reporter.warn(&describe(name, &outcome));
                outcome
            }
            Err(source) => return Err(LayerError::Step { step: name, source }),
        };
        steps.push(StepReport {
            step: name,
            outcome,
        });
    }

    let tail = match &plan.tail {
        Some(step) => run_tail(session, env, step, reporter, cancel).await,
        None => TailOutcome::Skipped,
    };

    info!(layer = plan.name, "layer finished");
    Ok(LayerReport {
        layer: plan.name,
        steps,
        tail,
    })
}

/// Failures here are logged and reported, never propagated.
async fn run_tail<S, St>(
    session: &S,
    env: &St::Env,
    step: &St,
    reporter: &impl ProgressReporter,
    cancel: &CancellationToken,
) -> TailOutcome
where
    S: RemoteSession,
    St: Step,
{
    let name = step.name();
    reporter.step(&format!("{name}..."));

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            warn!(step = name, "cancelled during best-effort step");
            return TailOutcome::AppliedWithWarning("cancelled".to_string());
        }
        result = step.run(session, env) => result,
    };

    match result {
        Ok(StepOutcome::Skipped(_)) => TailOutcome::Skipped,
        Ok(outcome) => {
            reporter.success(&describe(name, &outcome));
            TailOutcome::Applied
        }
        Err(err) => {
            warn!(step = name, error = %err, "best-effort step failed");
            reporter.warn(&format!("{name}: {err}"));
            TailOutcome::AppliedWithWarning(err.to_string())
        }
    }
}
