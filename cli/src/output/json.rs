//! JSON output helpers.
//!
//! Every `--json` code path prints exactly one pretty-printed object on
//! stdout: a layer result on success, or the error object on failure.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::error::{ConnectionError, LayerError, ParseError};
use crate::domain::report::LayerReport;

/// Machine-readable renderer.
pub struct JsonRenderer;

#[derive(Serialize)]
struct LayerOutput<'a> {
    #[serde(flatten)]
    report: &'a LayerReport,
    next_command: &'a str,
    reboot_required: bool,
}

#[derive(Serialize)]
struct AlreadyProvisioned<'a> {
    layer: &'a str,
    already_provisioned: bool,
}

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_layer_report(
        &self,
        report: &LayerReport,
        next_command: &str,
        reboot_required: bool,
    ) -> Result<()> {
        let out = LayerOutput {
            report,
            next_command,
            reboot_required,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_already_provisioned(&self, layer: &str) -> Result<()> {
        let out = AlreadyProvisioned {
            layer,
            already_provisioned: true,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&out).context("JSON serialization failed")?
        );
        Ok(())
    }
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Stable error code for the JSON error object, taken from the first typed
/// error in the chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(layer) = cause.downcast_ref::<LayerError>() {
            return match layer {
                LayerError::Step { .. } => "step_failed",
                LayerError::Cancelled { .. } => "cancelled",
            };
        }
        if cause.downcast_ref::<ConnectionError>().is_some() {
            return "connection_failed";
        }
        if cause.downcast_ref::<ParseError>().is_some() {
            return "invalid_input";
        }
    }
    "error"
}
