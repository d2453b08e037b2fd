//! Error types for serial link operations.
//!
//! This module defines error types specific to talking to the sensor over a
//! serial port, covering ports that cannot be opened, links that drop
//! mid-session, and low-level I/O failures.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during serial link operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The serial port could not be opened or claimed.
    #[error("Port unavailable: {port}: {message}")]
    PortUnavailable { port: String, message: String },

    /// Link is not open or has been closed.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Device communication error.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Link configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Error reported by the serial port driver.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new port unavailable error.
    pub fn port_unavailable(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PortUnavailable {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Returns `true` if the error happened while opening the port.
    pub fn is_open_failure(&self) -> bool {
        matches!(self, Self::PortUnavailable { .. })
    }
}
