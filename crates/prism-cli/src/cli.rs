//! Command-line argument parsing and configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use prism_scanner::ScannerConfig;

/// Prism fingerprint sensor CLI
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(about = "Enroll and identify fingerprints on a serial sensor", long_about = None)]
#[command(version = prism_core::VERSION)]
pub struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Serial port (overrides the configuration file)
    #[arg(long, short, global = true)]
    pub port: Option<String>,

    /// Baud rate (overrides the configuration file)
    #[arg(long, short, global = true)]
    pub baud: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Identify the finger on the sensor and print one JSON result
    Search,

    /// Enroll a new finger, printing progress as newline-delimited JSON
    Enroll,

    /// List serial ports present on this machine
    Ports {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    /// Build the scanner configuration from the file and the overrides.
    pub fn scanner_config(&self) -> Result<ScannerConfig> {
        let config = match &self.config {
            Some(path) => load_config(path)?,
            None => ScannerConfig::default(),
        };
        let config = apply_overrides(config, self.port.as_deref(), self.baud);

        config.validate().context("Invalid scanner configuration")?;
        Ok(config)
    }
}

/// Read a [`ScannerConfig`] from a TOML file.
pub fn load_config(path: &Path) -> Result<ScannerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

fn parse_config(text: &str) -> Result<ScannerConfig> {
    Ok(toml::from_str(text)?)
}

fn apply_overrides(mut config: ScannerConfig, port: Option<&str>, baud: Option<u32>) -> ScannerConfig {
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(baud) = baud {
        config = config.with_baud_rate(baud);
    }
    config
}
