//! Typed events decoded from sensor response lines.

use prism_core::FingerprintId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of one line received from the sensor.
///
/// Events are constructed fresh for every line and never mutated. The raw
/// text is kept for failures and unrecognized chatter so it can be reported
/// or logged verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    /// Sensor waits for the first finger placement.
    ReadyForFinger,

    /// First capture finished, the finger must be lifted.
    RemoveFinger,

    /// Sensor waits for the same finger a second time.
    PlaceSameFingerAgain,

    /// Enrollment stored under `id`.
    EnrollSucceeded { id: FingerprintId },

    /// Search matched template `id`.
    SearchFound { id: FingerprintId },

    /// Search finished without a match.
    SearchNotFound,

    /// Sensor reported a failure, or a success line carried a malformed id.
    SensorFailure { raw: String },

    /// Line outside the vocabulary of the current operation.
    Unrecognized { raw: String },
}

impl DeviceEvent {
    /// Create a sensor failure event from the raw line.
    pub fn sensor_failure(raw: impl Into<String>) -> Self {
        Self::SensorFailure { raw: raw.into() }
    }

    /// Create an unrecognized event from the raw line.
    pub fn unrecognized(raw: impl Into<String>) -> Self {
        Self::Unrecognized { raw: raw.into() }
    }

    /// Returns `true` for lines the state machines ignore.
    #[must_use]
    pub fn is_unrecognized(&self) -> bool {
        matches!(self, Self::Unrecognized { .. })
    }

    /// Returns `true` if the event reports a sensor failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SensorFailure { .. })
    }

    /// Short name used in logs and transition traces.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadyForFinger => "ReadyForFinger",
            Self::RemoveFinger => "RemoveFinger",
            Self::PlaceSameFingerAgain => "PlaceSameFingerAgain",
            Self::EnrollSucceeded { .. } => "EnrollSucceeded",
            Self::SearchFound { .. } => "SearchFound",
            Self::SearchNotFound => "SearchNotFound",
            Self::SensorFailure { .. } => "SensorFailure",
            Self::Unrecognized { .. } => "Unrecognized",
        }
    }
}

impl fmt::Display for DeviceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnrollSucceeded { id } | Self::SearchFound { id } => {
                write!(f, "{}({})", self.name(), id)
            }
            Self::SensorFailure { raw } | Self::Unrecognized { raw } => {
                write!(f, "{}({:?})", self.name(), raw)
            }
            _ => f.write_str(self.name()),
        }
    }
}
