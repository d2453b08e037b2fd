//! Common types shared by serial link implementations.
//!
//! This module defines the settings used to open a link, the metadata of an
//! open connection, and the description of ports found during discovery.

use chrono::{DateTime, Utc};
use prism_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_PORT, DEFAULT_READ_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{HardwareError, Result};

/// Parameters needed to open a serial link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Port identifier (e.g. "/dev/ttyUSB0", "COM22").
    pub port: String,

    /// Baud rate in bits per second.
    pub baud_rate: u32,

    /// Timeout applied to a single blocking read on the port.
    pub read_timeout: Duration,
}

impl LinkSettings {
    /// Create settings for `port` with the sensor's default baud rate and read timeout.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
        }
    }

    /// Set the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Check the settings before attempting to open a port.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the port is empty, the baud rate is
    /// zero or the read timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(HardwareError::configuration("port must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(HardwareError::configuration("baud rate must be positive"));
        }
        if self.read_timeout.is_zero() {
            return Err(HardwareError::configuration("read timeout must be positive"));
        }
        Ok(())
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

/// Metadata of one open serial session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Port identifier.
    pub port: String,

    /// Baud rate in bits per second.
    pub baud_rate: u32,

    /// Timeout applied to a single blocking read.
    #[serde(with = "duration_ms")]
    pub read_timeout: Duration,

    /// When the port was opened.
    pub opened_at: DateTime<Utc>,
}

impl ConnectionInfo {
    /// Create connection info for settings that were just opened.
    pub fn opened(settings: &LinkSettings) -> Self {
        Self {
            port: settings.port.clone(),
            baud_rate: settings.baud_rate,
            read_timeout: settings.read_timeout,
            opened_at: Utc::now(),
        }
    }

    /// Get how long the session has been open.
    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.opened_at
    }
}

/// A serial port found during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port identifier usable with [`LinkSettings::new`].
    pub name: String,

    /// Port kind ("usb", "pci", "bluetooth" or "unknown").
    pub kind: String,

    /// USB vendor id, if the port is a USB device.
    pub vid: Option<u16>,

    /// USB product id, if the port is a USB device.
    pub pid: Option<u16>,

    /// Manufacturer string reported by the USB device.
    pub manufacturer: Option<String>,

    /// Product string reported by the USB device.
    pub product: Option<String>,
}

impl PortInfo {
    /// Create port info with only a name and kind.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        }
    }
}

/// Serde adapter storing a [`Duration`] as whole milliseconds.
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
