//! Serial port link backed by the `serialport` crate.
//!
//! The sensor board enumerates as a USB virtual COM port. [`SerialPortConnector`]
//! opens it with the configured baud rate and read timeout and hands out a
//! [`SerialPortLink`] for the duration of one operation.
//!
//! `serialport` is a blocking API. Reads only consume bytes the driver reports
//! as already buffered, and the link yields to the runtime between polls, so
//! a pending read never blocks a Tokio worker for longer than one poll.
//!
//! # Example
//!
//! ```no_run
//! use prism_hardware::serial::SerialPortConnector;
//! use prism_hardware::traits::{LinkConnector, SerialLink};
//! use prism_hardware::types::LinkSettings;
//! use std::time::Duration;
//!
//! # async fn example() -> prism_hardware::Result<()> {
//! let connector = SerialPortConnector::new();
//! let mut link = connector.open(&LinkSettings::new("/dev/ttyUSB0")).await?;
//!
//! link.settle(Duration::from_secs(2)).await;
//! link.clear_input_buffer().await?;
//! link.write_command(b'2').await?;
//!
//! if let Some(line) = link.read_line(Duration::from_secs(1)).await? {
//!     println!("sensor: {line}");
//! }
//! link.close();
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Write};
use std::time::Duration;

use prism_protocol::LineParser;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::{HardwareError, Result};
use crate::traits::{LinkConnector, SerialLink};
use crate::types::{ConnectionInfo, LinkSettings, PortInfo};

/// Interval between checks for newly buffered bytes.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Largest chunk consumed from the driver in one read.
const READ_CHUNK_SIZE: usize = 256;

/// Opens [`SerialPortLink`] sessions on real serial ports.
#[derive(Debug, Clone, Default)]
pub struct SerialPortConnector;

impl SerialPortConnector {
    /// Create a connector for physical serial ports.
    pub fn new() -> Self {
        Self
    }
}

impl LinkConnector for SerialPortConnector {
    type Link = SerialPortLink;

    async fn open(&self, settings: &LinkSettings) -> Result<SerialPortLink> {
        settings.validate()?;

        let port = serialport::new(&settings.port, settings.baud_rate)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| HardwareError::port_unavailable(&settings.port, e.to_string()))?;

        info!(
            port = %settings.port,
            baud_rate = settings.baud_rate,
            "Opened serial port"
        );

        Ok(SerialPortLink {
            port: Some(port),
            info: ConnectionInfo::opened(settings),
            parser: LineParser::new(),
        })
    }
}

/// Open session on a physical serial port.
pub struct SerialPortLink {
    /// Underlying port, `None` once closed.
    port: Option<Box<dyn SerialPort>>,

    /// Metadata of this session.
    info: ConnectionInfo,

    /// Splits received bytes into lines.
    parser: LineParser,
}

impl SerialPortLink {
    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected(&self.info.port))
    }

    /// Move whatever the driver has buffered into the line parser.
    ///
    /// Returns the number of bytes consumed.
    fn pump(&mut self) -> Result<usize> {
        let port = self
            .port
            .as_mut()
            .ok_or_else(|| HardwareError::disconnected(&self.info.port))?;

        let available = port.bytes_to_read()? as usize;
        let n = read_available(port, available, &mut self.parser)?;
        if n > 0 {
            trace!(port = %self.info.port, bytes = n, "Read from serial port");
        }
        Ok(n)
    }
}

/// Read up to `available` bytes (at most one chunk) and feed them to `parser`.
///
/// A read that times out counts as zero bytes. Lines split across reads stay
/// buffered in the parser until their terminator arrives.
fn read_available<R: Read + ?Sized>(
    reader: &mut R,
    available: usize,
    parser: &mut LineParser,
) -> Result<usize> {
    if available == 0 {
        return Ok(0);
    }

    let mut buf = [0u8; READ_CHUNK_SIZE];
    let len = available.min(READ_CHUNK_SIZE);
    match reader.read(&mut buf[..len]) {
        Ok(n) => {
            parser.feed(&buf[..n]);
            Ok(n)
        }
        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
        Err(e) => Err(e.into()),
    }
}

impl std::fmt::Debug for SerialPortLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortLink")
            .field("info", &self.info)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialLink for SerialPortLink {
    fn info(&self) -> &ConnectionInfo {
        &self.info
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn settle(&mut self, delay: Duration) {
        debug!(port = %self.info.port, delay_ms = delay.as_millis() as u64, "Waiting for device reset");
        tokio::time::sleep(delay).await;
    }

    async fn clear_input_buffer(&mut self) -> Result<()> {
        self.port_mut()?.clear(ClearBuffer::Input)?;
        self.parser.clear();
        debug!(port = %self.info.port, "Cleared input buffer");
        Ok(())
    }

    async fn write_command(&mut self, command: u8) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(&[command])?;
        port.flush()?;
        debug!(port = %self.info.port, command = %(command as char), "Sent command");
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(line) = self.parser.next_line() {
                return Ok(Some(line));
            }
            if self.pump()? > 0 {
                continue;
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn close(&mut self) {
        if let Some(port) = self.port.take() {
            drop(port);
            if self.parser.overflows() > 0 {
                warn!(
                    port = %self.info.port,
                    overflows = self.parser.overflows(),
                    "Discarded oversized partial lines"
                );
            }
            info!(
                port = %self.info.port,
                uptime_ms = self.info.uptime().num_milliseconds(),
                "Closed serial port"
            );
        }
    }
}

impl Drop for SerialPortLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// List the serial ports present on this machine.
///
/// # Errors
///
/// Returns an error if the operating system refuses to enumerate ports.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;

    Ok(ports
        .into_iter()
        .map(|port| match port.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                name: port.port_name,
                kind: "usb".to_string(),
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            SerialPortType::PciPort => PortInfo::new(port.port_name, "pci"),
            SerialPortType::BluetoothPort => PortInfo::new(port.port_name, "bluetooth"),
            SerialPortType::Unknown => PortInfo::new(port.port_name, "unknown"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_missing_port_is_unavailable() {
        let connector = SerialPortConnector::new();
        let settings = LinkSettings::new("/dev/prism-does-not-exist");

        let error = connector.open(&settings).await.unwrap_err();
        assert!(error.is_open_failure());
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_settings() {
        let connector = SerialPortConnector::new();
        let settings = LinkSettings::new("");

        let error = connector.open(&settings).await.unwrap_err();
        assert!(matches!(error, HardwareError::ConfigurationError { .. }));
    }

    /// Hands out at most `chunk` bytes per read, like a slow USB bridge.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Trickle {
        fn new(data: &[u8], chunk: usize) -> Self {
            Self {
                data: data.to_vec(),
                pos: 0,
                chunk,
            }
        }

        fn remaining(&self) -> usize {
            self.data.len() - self.pos
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = buf.len().min(self.chunk).min(self.remaining());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct TimesOut;

    impl Read for TimesOut {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "no data"))
        }
    }

    #[test]
    fn test_read_available_reassembles_split_lines() {
        let mut reader = Trickle::new(b"PLACE_FINGER\r\nREMOVE_FIN", 5);
        let mut parser = LineParser::new();
        let mut lines = Vec::new();

        while reader.remaining() > 0 {
            let available = reader.remaining();
            let n = read_available(&mut reader, available, &mut parser).unwrap();
            assert!(n > 0 && n <= 5);
            while let Some(line) = parser.next_line() {
                lines.push(line);
            }
        }
        assert_eq!(lines, vec!["PLACE_FINGER"]);

        // The tail of the second line arrives in a later burst.
        let mut reader = Trickle::new(b"GER\r\n", 2);
        while reader.remaining() > 0 {
            let available = reader.remaining();
            read_available(&mut reader, available, &mut parser).unwrap();
        }
        assert_eq!(parser.next_line().as_deref(), Some("REMOVE_FINGER"));
        assert_eq!(parser.next_line(), None);
    }

    #[test]
    fn test_read_available_caps_chunk_size() {
        let data = vec![b'A'; READ_CHUNK_SIZE + 10];
        let mut reader = Trickle::new(&data, usize::MAX);
        let mut parser = LineParser::new();

        let n = read_available(&mut reader, data.len(), &mut parser).unwrap();
        assert_eq!(n, READ_CHUNK_SIZE);
        assert_eq!(reader.remaining(), 10);
    }

    #[test]
    fn test_read_available_nothing_buffered() {
        let mut reader = Trickle::new(b"SEARCH_ID\r\n", 64);
        let mut parser = LineParser::new();

        assert_eq!(read_available(&mut reader, 0, &mut parser).unwrap(), 0);
        assert_eq!(reader.remaining(), 11);
    }

    #[test]
    fn test_read_available_timeout_is_empty_read() {
        let mut parser = LineParser::new();
        assert_eq!(read_available(&mut TimesOut, 8, &mut parser).unwrap(), 0);
        assert_eq!(parser.next_line(), None);
    }
}
