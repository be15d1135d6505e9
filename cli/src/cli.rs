//! Command-line surface: global flags and the two layer subcommands.

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, AppFlags};
use crate::commands;
use crate::infra::config::YamlConfigStore;

/// Provision a Raspberry Pi (or any Debian host) over SSH in idempotent layers
#[derive(Parser)]
#[command(
    name = "rpi-provisioner",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Print the layer result (or the error) as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Print nothing but errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Plain output without ANSI colors
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Log more detail to stderr (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Bootstrap a fresh host: deployer account, keys, sshd hardening, hostname
    Layer1(commands::layer1::Layer1Args),

    /// Install the software bundle as the deployer: packages, fish, Docker
    Layer2(commands::layer2::Layer2Args),
}

impl Cli {
    /// Load the config file and dispatch to the chosen layer.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or the command fails.
    pub async fn run(self, cancel: CancellationToken) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            command,
            ..
        } = self;
        let flags = AppFlags {
            no_color,
            quiet,
            json,
        };
        let app = AppContext::new(&flags, &YamlConfigStore, cancel)?;
        match command {
            Command::Layer1(args) => commands::layer1::run(&app, args).await,
            Command::Layer2(args) => commands::layer2::run(&app, args).await,
        }
    }
}
