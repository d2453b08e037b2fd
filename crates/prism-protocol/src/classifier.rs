//! Response classifier for sensor output lines.
//!
//! This module turns the raw text lines printed by the sensor firmware into
//! [`DeviceEvent`] values. Classification is a pure function of the line and
//! the operation in progress; it never fails.
//!
//! # Matching Policy
//!
//! Markers are matched by case-sensitive substring containment, checked in a
//! fixed priority order:
//!
//! 1. `FAIL` (any operation). A line carrying both a failure marker and
//!    another marker is always a failure.
//! 2. Enroll: `SUCCESS_ENROLL:<id>`, `PLACE_SAME_FINGER`, `REMOVE_FINGER`,
//!    `READY_TO_ENROLL`.
//! 3. Search: `FOUND_ID:<id>`, `NOT_FOUND`.
//!
//! Markers that belong to the other operation, and lines matching nothing,
//! classify as [`DeviceEvent::Unrecognized`]. Firmware builds print boot
//! banners and debug chatter on the same link, so unknown lines are normal.
//!
//! # Identifier Extraction
//!
//! For success markers the identifier is the integer after the first `:` of
//! the line, up to the next `:` if there is one. When it does not parse, the
//! event degrades to [`DeviceEvent::SensorFailure`] with the raw line.
//!
//! # Examples
//!
//! ```
//! use prism_core::{FingerprintId, OperationKind};
//! use prism_protocol::{DeviceEvent, classify};
//!
//! let event = classify("FOUND_ID:17", OperationKind::Search);
//! assert_eq!(event, DeviceEvent::SearchFound { id: FingerprintId::new(17) });
//!
//! let event = classify("SUCCESS_ENROLL:abc", OperationKind::Enroll);
//! assert!(event.is_failure());
//!
//! let event = classify("REMOVE_FINGER", OperationKind::Search);
//! assert!(event.is_unrecognized());
//! ```

use crate::event::DeviceEvent;
use prism_core::{FingerprintId, OperationKind, constants::*};

/// Classifier for sensor response lines.
pub struct ResponseClassifier;

impl ResponseClassifier {
    /// Classify one response line for the given operation.
    ///
    /// Surrounding whitespace (including a trailing `\r`) is ignored and the
    /// trimmed text is what failure and unrecognized events carry.
    pub fn classify(line: &str, kind: OperationKind) -> DeviceEvent {
        let line = line.trim();

        if line.contains(MARKER_FAIL) {
            return DeviceEvent::sensor_failure(line);
        }

        match kind {
            OperationKind::Enroll => Self::classify_enroll(line),
            OperationKind::Search => Self::classify_search(line),
        }
    }

    fn classify_enroll(line: &str) -> DeviceEvent {
        if line.contains(MARKER_SUCCESS_ENROLL) {
            return match Self::extract_id(line) {
                Some(id) => DeviceEvent::EnrollSucceeded { id },
                None => DeviceEvent::sensor_failure(line),
            };
        }
        if line.contains(MARKER_PLACE_SAME_FINGER) {
            return DeviceEvent::PlaceSameFingerAgain;
        }
        if line.contains(MARKER_REMOVE_FINGER) {
            return DeviceEvent::RemoveFinger;
        }
        if line.contains(MARKER_READY_TO_ENROLL) {
            return DeviceEvent::ReadyForFinger;
        }
        DeviceEvent::unrecognized(line)
    }

    fn classify_search(line: &str) -> DeviceEvent {
        if line.contains(MARKER_FOUND_ID) {
            return match Self::extract_id(line) {
                Some(id) => DeviceEvent::SearchFound { id },
                None => DeviceEvent::sensor_failure(line),
            };
        }
        if line.contains(MARKER_NOT_FOUND) {
            return DeviceEvent::SearchNotFound;
        }
        DeviceEvent::unrecognized(line)
    }

    /// Parse the identifier between the first `:` and the next one.
    fn extract_id(line: &str) -> Option<FingerprintId> {
        let (_, rest) = line.split_once(ID_SEPARATOR)?;
        let field = rest.split(ID_SEPARATOR).next().unwrap_or(rest);
        field.parse().ok()
    }
}

/// Classify one response line for the given operation.
///
/// Shorthand for [`ResponseClassifier::classify`].
pub fn classify(line: &str, kind: OperationKind) -> DeviceEvent {
    ResponseClassifier::classify(line, kind)
}
