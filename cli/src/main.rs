//! rpi-provisioner - turn a fresh Raspberry Pi into a configured server over SSH

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rpi_provisioner::cli::Cli;
use rpi_provisioner::output::json::{error_code, format_error};

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "rpi_provisioner=debug,info",
        _ => "rpi_provisioner=trace,debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let json = cli.json;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping after the current command");
            on_interrupt.cancel();
        }
    });

    match cli.run(cancel).await {
        Ok(code) => code,
        Err(e) => {
            match json.then(|| format_error(&format!("{e:#}"), error_code(&e))) {
                Some(Ok(obj)) => println!("{obj}"),
                _ => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
