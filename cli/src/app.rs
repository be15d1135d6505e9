//! Per-invocation state handed to every command handler.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::application::ports::ConfigStore;
use crate::domain::config::ProvisionerConfig;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Where layer results go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Step lines and a summary on the terminal.
    Human,
    /// One JSON document on stdout.
    Json,
}

/// Global flags that shape output.
pub struct AppFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
}

/// Built once per run from the global flags and the config file.
pub struct AppContext {
    /// Quiet in JSON mode so stdout carries only JSON.
    pub output: OutputContext,
    pub mode: OutputMode,
    /// Values from the config file; flags override them per command.
    pub config: ProvisionerConfig,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}

impl AppContext {
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or parsed.
    pub fn new(
        flags: &AppFlags,
        store: &impl ConfigStore,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        let config = store.load().context("cannot load configuration")?;

        Ok(Self {
            output: OutputContext::new(flags.no_color, flags.quiet || flags.json),
            mode,
            config,
            cancel,
        })
    }

    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Progress reporter handed to the layer orchestrator.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }
}
