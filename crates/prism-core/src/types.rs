use crate::{
    Result,
    constants::{COMMAND_ENROLL, COMMAND_SEARCH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Template slot identifier assigned by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintId(u32);

impl FingerprintId {
    /// Create a fingerprint identifier from its raw slot number.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        FingerprintId(id)
    }

    /// Get the raw slot number.
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FingerprintId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FingerprintId {
    fn from(id: u32) -> Self {
        FingerprintId(id)
    }
}

impl std::str::FromStr for FingerprintId {
    type Err = Error;

    /// Parse a decimal slot number, ignoring surrounding whitespace.
    ///
    /// # Errors
    /// Returns `Error::InvalidFingerprintId` if the text is not a non-negative integer.
    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .map(FingerprintId)
            .map_err(|_| Error::InvalidFingerprintId(s.to_string()))
    }
}

/// Operation requested from the sensor.
///
/// The kind selects the command byte written to the device and which part of
/// the response vocabulary is meaningful for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Register a new fingerprint.
    Enroll,
    /// Identify an already enrolled fingerprint.
    Search,
}

impl OperationKind {
    /// Command byte that starts this operation on the sensor.
    #[inline]
    #[must_use]
    pub fn command_byte(self) -> u8 {
        match self {
            OperationKind::Enroll => COMMAND_ENROLL,
            OperationKind::Search => COMMAND_SEARCH,
        }
    }

    /// Lowercase name used in logs and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Enroll => "enroll",
            OperationKind::Search => "search",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enroll" => Ok(OperationKind::Enroll),
            "search" => Ok(OperationKind::Search),
            _ => Err(Error::UnknownOperation(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("42", 42)]
    #[case(" 17 ", 17)]
    #[case("0", 0)]
    fn test_fingerprint_id_parse(#[case] input: &str, #[case] expected: u32) {
        let id: FingerprintId = input.parse().unwrap();
        assert_eq!(id.as_u32(), expected);
    }

    #[rstest]
    #[case("abc")]
    #[case("")]
    #[case("-3")]
    #[case("4 2")]
    fn test_fingerprint_id_parse_invalid(#[case] input: &str) {
        let result: Result<FingerprintId> = input.parse();
        assert!(matches!(result, Err(Error::InvalidFingerprintId(_))));
    }

    #[test]
    fn test_fingerprint_id_display() {
        assert_eq!(FingerprintId::new(7).to_string(), "7");
    }

    #[rstest]
    #[case(OperationKind::Enroll, b'1')]
    #[case(OperationKind::Search, b'2')]
    fn test_operation_command_byte(#[case] kind: OperationKind, #[case] byte: u8) {
        assert_eq!(kind.command_byte(), byte);
    }

    #[test]
    fn test_operation_from_str() {
        assert_eq!("Enroll".parse::<OperationKind>().unwrap(), OperationKind::Enroll);
        assert_eq!("search".parse::<OperationKind>().unwrap(), OperationKind::Search);
        assert!("delete".parse::<OperationKind>().is_err());
    }

    #[test]
    fn test_operation_serde() {
        let json = serde_json::to_string(&OperationKind::Search).unwrap();
        assert_eq!(json, "\"search\"");
    }
}
