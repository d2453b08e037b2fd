//! Serial link trait definitions.
//!
//! This module defines the contract between the scan driver and the physical
//! connection to the sensor. [`LinkConnector`] opens one session per
//! operation and [`SerialLink`] is that open session.
//!
//! Methods return `impl Future + Send` so the driver can run an operation on
//! a spawned Tokio task. Implementations are free to write them as plain
//! `async fn`.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::types::{ConnectionInfo, LinkSettings};

/// One open serial session with the sensor.
///
/// A link is owned by exactly one operation. It is never shared between
/// concurrent operations because the sensor has no notion of sessions.
///
/// # Examples
///
/// ```no_run
/// use prism_hardware::traits::SerialLink;
/// use prism_hardware::error::Result;
/// use std::time::Duration;
///
/// async fn first_line<L: SerialLink>(link: &mut L) -> Result<Option<String>> {
///     link.settle(Duration::from_secs(2)).await;
///     link.clear_input_buffer().await?;
///     link.write_command(b'2').await?;
///     link.read_line(Duration::from_secs(1)).await
/// }
/// ```
pub trait SerialLink: Send {
    /// Metadata of this session.
    fn info(&self) -> &ConnectionInfo;

    /// Returns `true` until [`close`](SerialLink::close) has run.
    fn is_open(&self) -> bool;

    /// Wait for the device to finish its reset sequence.
    ///
    /// Boards with a USB-serial bridge reboot when the port is opened and
    /// drop bytes written during boot.
    fn settle(&mut self, delay: Duration) -> impl Future<Output = ()> + Send;

    /// Discard everything received before this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the driver rejects the request.
    fn clear_input_buffer(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Write exactly one command byte.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the write fails.
    fn write_command(&mut self, command: u8) -> impl Future<Output = Result<()>> + Send;

    /// Wait up to `timeout` for one complete line.
    ///
    /// Returns `Ok(None)` when no line arrived in time; that is a normal
    /// condition while a person is still placing a finger. Returned lines
    /// are trimmed and decoded lossily.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is closed or the port fails.
    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Release the port. Calling it again has no effect.
    fn close(&mut self);
}

/// Factory that opens a [`SerialLink`] for each operation.
pub trait LinkConnector: Send + Sync + 'static {
    /// Link type produced by this connector.
    type Link: SerialLink + 'static;

    /// Open a new session.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PortUnavailable`](crate::HardwareError::PortUnavailable)
    /// if the port cannot be opened or is claimed by another process.
    fn open(&self, settings: &LinkSettings) -> impl Future<Output = Result<Self::Link>> + Send;
}
