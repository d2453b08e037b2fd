//! Serial link layer for the Prism fingerprint sensor.
//!
//! This crate owns the physical side of talking to the sensor: opening the
//! USB virtual COM port, waiting for the board to settle, writing single
//! command bytes, and reading newline-terminated responses. The scan driver
//! in `prism-scanner` only sees the [`SerialLink`] and [`LinkConnector`]
//! traits, so the real port and the scripted mock are interchangeable.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **One session per operation**: A [`LinkConnector`] opens a fresh link for
//!   every operation and the link is closed on every exit path.
//! - **Error-aware**: All operations return `Result<T>` with detailed error information.
//!
//! # Opening a Link
//!
//! ```no_run
//! use prism_hardware::{LinkConnector, LinkSettings, SerialLink, SerialPortConnector};
//! use std::time::Duration;
//!
//! # async fn example() -> prism_hardware::Result<()> {
//! let connector = SerialPortConnector::new();
//! let mut link = connector.open(&LinkSettings::new("/dev/ttyUSB0")).await?;
//!
//! link.settle(Duration::from_secs(2)).await;
//! link.clear_input_buffer().await?;
//! link.write_command(b'2').await?;
//! let reply = link.read_line(Duration::from_secs(1)).await?;
//! # let _ = reply;
//! # Ok(())
//! # }
//! ```
//!
//! # Mock Implementations
//!
//! [`mock::MockDevice`] answers command bytes with scripted lines and records
//! every open, write and close, for development and testing without physical
//! hardware.

pub mod error;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use serial::{SerialPortConnector, SerialPortLink, available_ports};
pub use traits::{LinkConnector, SerialLink};
pub use types::{ConnectionInfo, LinkSettings, PortInfo};
