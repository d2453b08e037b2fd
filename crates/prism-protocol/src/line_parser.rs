//! Line parser for the sensor's newline-terminated output.
//!
//! The serial link delivers bytes in arbitrary chunks. [`LineParser`]
//! accumulates them and yields complete lines once a `\n` arrives.
//!
//! # Decoding
//!
//! The firmware prints ASCII, but a board that resets mid-transmission or
//! runs at the wrong baud rate produces garbage. Lines are therefore decoded
//! lossily: invalid UTF-8 sequences become `U+FFFD` instead of failing.
//! Surrounding whitespace (including the `\r` of `\r\n` endings) is trimmed
//! and blank lines are dropped.
//!
//! # Usage
//!
//! ```
//! use prism_protocol::LineParser;
//!
//! let mut parser = LineParser::new();
//!
//! parser.feed(b"REMOVE_FIN");
//! assert!(parser.next_line().is_none());
//!
//! parser.feed(b"GER\r\nPLACE_SAME_FINGER\r\n");
//! assert_eq!(parser.next_line().as_deref(), Some("REMOVE_FINGER"));
//! assert_eq!(parser.next_line().as_deref(), Some("PLACE_SAME_FINGER"));
//! ```

use bytes::BytesMut;
use std::collections::VecDeque;

/// Maximum number of buffered bytes without a newline.
///
/// The firmware never prints lines this long; a buffer that grows past it
/// is noise from a mismatched baud rate and is discarded.
const MAX_LINE_LENGTH: usize = 1024;

/// Initial buffer capacity for incoming serial data.
const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Stateful splitter for newline-terminated sensor output.
#[derive(Debug)]
pub struct LineParser {
    /// Bytes received after the last newline.
    buffer: BytesMut,

    /// Complete lines ready for extraction.
    lines: VecDeque<String>,

    /// Number of times an oversized partial line was discarded.
    overflows: u64,
}

impl LineParser {
    /// Create an empty line parser.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            lines: VecDeque::new(),
            overflows: 0,
        }
    }

    /// Feed bytes read from the serial link.
    ///
    /// Every complete line contained in the new data is queued; a trailing
    /// partial line stays buffered until its newline arrives.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw = self.buffer.split_to(pos + 1);
            let line = String::from_utf8_lossy(&raw[..pos]);
            let line = line.trim();
            if !line.is_empty() {
                self.lines.push_back(line.to_string());
            }
        }

        if self.buffer.len() > MAX_LINE_LENGTH {
            self.buffer.clear();
            self.overflows += 1;
        }
    }

    /// Extract the next complete line, if any.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Returns number of complete lines ready for extraction.
    pub fn lines_available(&self) -> usize {
        self.lines.len()
    }

    /// Returns number of bytes waiting for a newline.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Returns how many oversized partial lines were discarded.
    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    /// Discard buffered bytes and queued lines.
    ///
    /// Used together with clearing the port's input buffer so nothing from a
    /// previous session is read as part of the next one.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.lines.clear();
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}
