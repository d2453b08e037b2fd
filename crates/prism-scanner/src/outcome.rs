//! Operation results and enrollment progress.
//!
//! Every operation ends in exactly one [`Outcome`]. Enrollment additionally
//! streams [`ProgressEvent`]s: one `Starting`, zero or more `Step`s and a
//! single `Finished` carrying the outcome.
//!
//! # Wire Format
//!
//! The web layer relays progress as newline-delimited JSON:
//!
//! ```text
//! {"status":"starting","message":"Sensor Initializing..."}
//! {"status":"step","message":"Place your finger on the sensor..."}
//! {"status":"done","success":true,"id":42,"message":"Success!"}
//! ```
//!
//! Search results are a single object, `{"success":true,"id":17}` or
//! `{"success":false,"message":"Fingerprint not matched."}`.

use std::fmt;

use prism_core::{FingerprintId, constants::*};
use serde::{Deserialize, Serialize};

/// Why an operation failed.
///
/// The `Display` output is the message shown to the person at the sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "raw", rename_all = "snake_case")]
pub enum FailureReason {
    /// No terminal event arrived before the overall deadline.
    Timeout,

    /// The sensor reported a failure; the raw line is preserved.
    SensorError(String),

    /// Search finished without a match.
    NotMatched,

    /// The port could not be opened or the link dropped.
    DeviceUnreachable,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str(MSG_TIMEOUT),
            Self::SensorError(raw) => write!(f, "{MSG_SENSOR_ERROR_PREFIX}: {raw}"),
            Self::NotMatched => f.write_str(MSG_NOT_MATCHED),
            Self::DeviceUnreachable => f.write_str(MSG_DEVICE_UNREACHABLE),
        }
    }
}

impl std::error::Error for FailureReason {}

impl FailureReason {
    /// Returns `true` if asking the user to scan again may succeed.
    ///
    /// A missing or unreachable sensor is fatal until someone reconnects it,
    /// and a finger that is not enrolled will not match on a second try.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::SensorError(_))
    }
}

/// Terminal result of one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Enrollment stored, or search matched, the template `id`.
    Success { id: FingerprintId },

    /// The operation failed.
    Failure { reason: FailureReason },
}

impl Outcome {
    /// Create a success outcome.
    pub fn success(id: impl Into<FingerprintId>) -> Self {
        Self::Success { id: id.into() }
    }

    /// Create a failure outcome.
    pub fn failure(reason: FailureReason) -> Self {
        Self::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Identifier of a successful outcome.
    pub fn id(&self) -> Option<FingerprintId> {
        match self {
            Self::Success { id } => Some(*id),
            Self::Failure { .. } => None,
        }
    }

    /// Failure reason, if the operation failed.
    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { reason } => Some(reason),
        }
    }

    /// User-facing message for this outcome.
    pub fn message(&self) -> String {
        match self {
            Self::Success { .. } => MSG_SUCCESS.to_string(),
            Self::Failure { reason } => reason.to_string(),
        }
    }

    /// Encode as a search response object.
    pub fn to_search_response(&self) -> SearchResponse {
        match self {
            Self::Success { id } => SearchResponse {
                success: true,
                id: Some(*id),
                message: None,
            },
            Self::Failure { reason } => SearchResponse {
                success: false,
                id: None,
                message: Some(reason.to_string()),
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { id } => write!(f, "Success({id})"),
            Self::Failure { reason } => write!(f, "Failure({reason})"),
        }
    }
}

/// Intermediate instruction for the person enrolling a finger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollStep {
    PlaceFinger,
    RemoveFinger,
    PlaceSameFingerAgain,
}

impl EnrollStep {
    /// Prompt shown to the person at the sensor.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::PlaceFinger => MSG_PLACE_FINGER,
            Self::RemoveFinger => MSG_REMOVE_FINGER,
            Self::PlaceSameFingerAgain => MSG_PLACE_SAME_FINGER,
        }
    }
}

impl fmt::Display for EnrollStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = match self {
            Self::PlaceFinger => "place finger",
            Self::RemoveFinger => "remove finger",
            Self::PlaceSameFingerAgain => "place same finger again",
        };
        f.write_str(step)
    }
}

/// One entry of an enrollment progress sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The operation acquired the sensor and is initializing it.
    Starting,

    /// The sensor asked for the next physical step.
    Step(EnrollStep),

    /// Terminal entry; nothing follows it.
    Finished(Outcome),
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished(_))
    }

    /// Encode as a streaming wire message.
    pub fn to_message(&self) -> ProgressMessage {
        match self {
            Self::Starting => ProgressMessage {
                status: ProgressStatus::Starting,
                success: None,
                id: None,
                message: MSG_STARTING.to_string(),
            },
            Self::Step(step) => ProgressMessage {
                status: ProgressStatus::Step,
                success: None,
                id: None,
                message: step.prompt().to_string(),
            },
            Self::Finished(outcome) => ProgressMessage {
                status: ProgressStatus::Done,
                success: Some(outcome.is_success()),
                id: outcome.id(),
                message: outcome.message(),
            },
        }
    }

    /// Encode as one line of newline-delimited JSON, newline included.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(&self.to_message())?;
        line.push('\n');
        Ok(line)
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => f.write_str("starting"),
            Self::Step(step) => write!(f, "step: {step}"),
            Self::Finished(outcome) => write!(f, "done: {outcome}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    Starting,
    Step,
    Done,
}

/// Streaming wire representation of a [`ProgressEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressMessage {
    pub status: ProgressStatus,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub success: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<FingerprintId>,

    pub message: String,
}

/// Wire representation of a search [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<FingerprintId>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}
