//! Prism - command-line front end for the fingerprint sensor.
//!
//! Results go to stdout as JSON (one object for `search`, one object per
//! line for `enroll`); logs go to stderr and are filtered with `RUST_LOG`.

mod cli;

use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use prism_hardware::{SerialPortConnector, available_ports};
use prism_scanner::ScannerDriver;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search => search(&cli).await,
        Commands::Enroll => enroll(&cli).await,
        Commands::Ports { json } => ports(json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn driver(cli: &Cli) -> Result<ScannerDriver<SerialPortConnector>> {
    let config = cli.scanner_config()?;
    info!(port = %config.port, baud_rate = config.baud_rate, "Prism v{}", prism_core::VERSION);
    Ok(ScannerDriver::new(SerialPortConnector::new(), config)?)
}

async fn search(cli: &Cli) -> Result<()> {
    let outcome = driver(cli)?.search().await;

    let response = serde_json::to_string(&outcome.to_search_response())?;
    println!("{response}");
    Ok(())
}

async fn enroll(cli: &Cli) -> Result<()> {
    let mut progress = driver(cli)?.enroll();
    let mut stdout = std::io::stdout().lock();

    while let Some(event) = progress.next().await {
        stdout.write_all(event.to_json_line()?.as_bytes())?;
        stdout.flush().context("Failed to write progress")?;
    }
    Ok(())
}

fn ports(json: bool) -> Result<()> {
    let ports = available_ports().context("Failed to enumerate serial ports")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    if ports.is_empty() {
        eprintln!("No serial ports found");
        return Ok(());
    }

    for port in &ports {
        let ids = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
            _ => "-".to_string(),
        };
        let product = port.product.as_deref().unwrap_or("");
        println!("{:<24} {:<10} {:<10} {}", port.name, port.kind, ids, product);
    }
    Ok(())
}
