//! Core constants for the fingerprint sensor line protocol.
//!
//! This module defines the wire-level vocabulary spoken by the sensor
//! firmware and the fixed timings of a scan session. Every other crate in the
//! workspace refers to these constants instead of repeating string literals.
//!
//! # Protocol Structure
//!
//! The host writes a single ASCII command byte and the sensor answers with
//! newline-terminated ASCII lines:
//!
//! ```text
//! host   -> '1'
//! sensor <- READY_TO_ENROLL\r\n
//! sensor <- REMOVE_FINGER\r\n
//! sensor <- PLACE_SAME_FINGER\r\n
//! sensor <- SUCCESS_ENROLL:42\r\n
//! ```
//!
//! # Marker Semantics
//!
//! | Marker | Operation | Meaning |
//! |--------|-----------|---------|
//! | `READY_TO_ENROLL` | enroll | Sensor waits for the first placement |
//! | `REMOVE_FINGER` | enroll | First capture done, lift the finger |
//! | `PLACE_SAME_FINGER` | enroll | Waiting for the second capture |
//! | `SUCCESS_ENROLL:<id>` | enroll | Template stored under `<id>` |
//! | `FOUND_ID:<id>` | search | Finger matched template `<id>` |
//! | `NOT_FOUND` | search | No template matched |
//! | `FAIL` | both | Sensor failure (may be embedded in a longer line) |
//!
//! # Usage
//!
//! ```
//! use prism_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(COMMAND_ENROLL, b'1');
//! assert_eq!(DEFAULT_BAUD_RATE, 9600);
//!
//! let timeout = Duration::from_millis(DEFAULT_OVERALL_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 60);
//! ```

// ============================================================================
// Command Bytes
// ============================================================================

/// Command byte that starts the two-capture enrollment ceremony.
pub const COMMAND_ENROLL: u8 = b'1';

/// Command byte that starts a one-to-many template search.
pub const COMMAND_SEARCH: u8 = b'2';

// ============================================================================
// Response Markers
// ============================================================================

/// Sensor is ready and waiting for the first finger placement.
pub const MARKER_READY_TO_ENROLL: &str = "READY_TO_ENROLL";

/// First capture finished; the finger must be lifted.
pub const MARKER_REMOVE_FINGER: &str = "REMOVE_FINGER";

/// Sensor waits for the same finger to be placed a second time.
pub const MARKER_PLACE_SAME_FINGER: &str = "PLACE_SAME_FINGER";

/// Enrollment stored; followed by `:` and the slot identifier.
///
/// # Examples
///
/// ```
/// use prism_core::constants::{ID_SEPARATOR, MARKER_SUCCESS_ENROLL};
///
/// let line = format!("{MARKER_SUCCESS_ENROLL}{ID_SEPARATOR}42");
/// assert_eq!(line, "SUCCESS_ENROLL:42");
/// ```
pub const MARKER_SUCCESS_ENROLL: &str = "SUCCESS_ENROLL";

/// Search matched; followed by `:` and the slot identifier.
pub const MARKER_FOUND_ID: &str = "FOUND_ID";

/// Search finished without a match.
pub const MARKER_NOT_FOUND: &str = "NOT_FOUND";

/// Failure marker. Matched as a substring because the firmware embeds it in
/// diagnostic lines such as `FAIL: sensor dirty` or `ENROLL_FAIL`.
pub const MARKER_FAIL: &str = "FAIL";

/// Separator between a success marker and its identifier.
pub const ID_SEPARATOR: char = ':';

// ============================================================================
// Serial Link Defaults
// ============================================================================

/// Default serial port path.
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Baud rate used by the sensor firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

// ============================================================================
// Timeout Configuration
// ============================================================================

/// Per-read timeout for a single line poll (milliseconds).
///
/// A poll that expires is a normal condition while a person is still moving
/// their finger to the sensor, so it never fails the operation by itself.
///
/// # Value: 1000ms (1 second)
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Grace period after opening the port before any byte is written (milliseconds).
///
/// Most USB-serial boards reset when the port is opened and discard anything
/// received while the bootloader runs.
///
/// # Value: 2000ms (2 seconds)
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Overall deadline for one enroll or search operation (milliseconds).
///
/// # Value: 60000ms (60 seconds)
///
/// # Examples
///
/// ```
/// use prism_core::constants::DEFAULT_OVERALL_TIMEOUT_MS;
/// use std::time::Duration;
///
/// let timeout = Duration::from_millis(DEFAULT_OVERALL_TIMEOUT_MS);
/// assert_eq!(timeout.as_secs(), 60);
/// ```
pub const DEFAULT_OVERALL_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// User-Facing Messages
// ============================================================================

/// Message sent when an enrollment starts.
pub const MSG_STARTING: &str = "Sensor Initializing...";

/// Prompt for the first placement.
pub const MSG_PLACE_FINGER: &str = "Place your finger on the sensor...";

/// Prompt for lifting the finger between captures.
pub const MSG_REMOVE_FINGER: &str = "Great! Now remove your finger.";

/// Prompt for the second placement.
pub const MSG_PLACE_SAME_FINGER: &str = "Place the SAME finger again...";

/// Message attached to a successful terminal event.
pub const MSG_SUCCESS: &str = "Success!";

/// Message for an operation that saw no qualifying event in time.
pub const MSG_TIMEOUT: &str = "Timeout: No finger detected.";

/// Message for a search without a match.
pub const MSG_NOT_MATCHED: &str = "Fingerprint not matched.";

/// Message for a port that could not be opened.
pub const MSG_DEVICE_UNREACHABLE: &str = "Could not connect to Fingerprint Sensor.";

/// Prefix for a sensor-reported failure; the raw line follows.
pub const MSG_SENSOR_ERROR_PREFIX: &str = "Sensor Error";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bytes_are_ascii_digits() {
        assert_eq!(COMMAND_ENROLL as char, '1');
        assert_eq!(COMMAND_SEARCH as char, '2');
    }

    #[test]
    fn test_markers_do_not_contain_fail() {
        // FAIL is matched by containment and wins over everything else
        for marker in [
            MARKER_READY_TO_ENROLL,
            MARKER_REMOVE_FINGER,
            MARKER_PLACE_SAME_FINGER,
            MARKER_SUCCESS_ENROLL,
            MARKER_FOUND_ID,
            MARKER_NOT_FOUND,
        ] {
            assert!(!marker.contains(MARKER_FAIL), "{marker}");
        }
    }

    #[test]
    fn test_not_found_does_not_shadow_found_id() {
        assert!(!MARKER_NOT_FOUND.contains(MARKER_FOUND_ID));
    }

    #[test]
    fn test_read_timeout_within_overall_timeout() {
        assert!(DEFAULT_READ_TIMEOUT_MS < DEFAULT_OVERALL_TIMEOUT_MS);
        assert!(DEFAULT_SETTLE_DELAY_MS < DEFAULT_OVERALL_TIMEOUT_MS);
    }
}
