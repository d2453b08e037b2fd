//! Scanner configuration.
//!
//! [`ScannerConfig`] is passed to [`ScannerDriver::new`](crate::ScannerDriver::new)
//! and fixes the port, the line speed and the three timings of every
//! operation. Durations are stored as milliseconds when serialized:
//!
//! ```toml
//! port = "COM22"
//! baud_rate = 9600
//! read_timeout_ms = 1000
//! overall_timeout_ms = 60000
//! settle_delay_ms = 2000
//! ```
//!
//! Missing keys fall back to the defaults.

use std::time::Duration;

use prism_core::{Error, Result, constants::*};
use prism_hardware::types::{LinkSettings, duration_ms};
use serde::{Deserialize, Serialize};

/// Configuration for a [`ScannerDriver`](crate::ScannerDriver).
///
/// # Examples
///
/// ```
/// use prism_scanner::ScannerConfig;
/// use std::time::Duration;
///
/// let config = ScannerConfig::new("COM22")
///     .with_overall_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.baud_rate, 9600);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Serial port the sensor is attached to.
    pub port: String,

    /// Baud rate in bits per second.
    pub baud_rate: u32,

    /// Longest wait for a single line before polling again.
    #[serde(rename = "read_timeout_ms", with = "duration_ms")]
    pub read_timeout: Duration,

    /// Deadline for one operation, counted from the command write.
    #[serde(rename = "overall_timeout_ms", with = "duration_ms")]
    pub overall_timeout: Duration,

    /// Grace period between opening the port and writing the command.
    #[serde(rename = "settle_delay_ms", with = "duration_ms")]
    pub settle_delay: Duration,
}

impl ScannerConfig {
    /// Create a configuration for `port` with every other value at its default.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn with_overall_timeout(mut self, overall_timeout: Duration) -> Self {
        self.overall_timeout = overall_timeout;
        self
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Check the configuration before it is handed to a driver.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the port is empty, the baud rate or read
    /// timeout is zero, or the read timeout exceeds the overall timeout.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(Error::Config("port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(Error::Config("baud rate must be positive".to_string()));
        }
        if self.read_timeout.is_zero() {
            return Err(Error::Config("read timeout must be positive".to_string()));
        }
        if self.read_timeout > self.overall_timeout {
            return Err(Error::Config(format!(
                "read timeout ({}ms) exceeds overall timeout ({}ms)",
                self.read_timeout.as_millis(),
                self.overall_timeout.as_millis()
            )));
        }
        Ok(())
    }

    /// Settings used to open the serial link.
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings::new(self.port.clone())
            .with_baud_rate(self.baud_rate)
            .with_read_timeout(self.read_timeout)
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            overall_timeout: Duration::from_millis(DEFAULT_OVERALL_TIMEOUT_MS),
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
        }
    }
}
