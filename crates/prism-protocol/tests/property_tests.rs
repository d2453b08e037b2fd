//! Property-based tests for the response classifier.
//!
//! These tests use proptest to generate arbitrary sensor output and verify
//! that classification is total, deterministic and never panics.

use prism_core::{FingerprintId, OperationKind};
use proptest::prelude::*;
use prism_protocol::{DeviceEvent, LineParser, classify};

/// Strategy for generating either operation kind.
fn operation_kind() -> impl Strategy<Value = OperationKind> {
    prop_oneof![Just(OperationKind::Enroll), Just(OperationKind::Search)]
}

/// Strategy for identifier text that is not a valid u32.
///
/// Letters are required so the value never parses as a number.
fn malformed_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9]{0,3}[a-zA-Z_#]{1,6}[0-9]{0,3}")
        .expect("Failed to create malformed id regex strategy")
}

/// Strategy for printable diagnostic chatter without any vocabulary marker.
fn chatter() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9 .,!?=-]{0,60}")
        .expect("Failed to create chatter regex strategy")
}

proptest! {
    /// Property: classification is pure; the same input yields the same event.
    #[test]
    fn prop_classify_is_deterministic(line in ".{0,80}", kind in operation_kind()) {
        let first = classify(&line, kind);
        let second = classify(&line, kind);
        prop_assert_eq!(first, second);
    }

    /// Property: any line containing FAIL is a sensor failure for both kinds.
    #[test]
    fn prop_fail_marker_always_wins(
        prefix in "[A-Z_:0-9 ]{0,20}",
        suffix in "[A-Z_:0-9 ]{0,20}",
        kind in operation_kind(),
    ) {
        let line = format!("{prefix}FAIL{suffix}");
        let event = classify(&line, kind);
        prop_assert_eq!(event, DeviceEvent::sensor_failure(line.trim()));
    }

    /// Property: malformed identifiers degrade to a failure, never a panic.
    #[test]
    fn prop_malformed_enroll_id_is_failure(id in malformed_id()) {
        let line = format!("SUCCESS_ENROLL:{id}");
        prop_assert!(classify(&line, OperationKind::Enroll).is_failure());
    }

    /// Property: malformed identifiers degrade to a failure for search too.
    #[test]
    fn prop_malformed_search_id_is_failure(id in malformed_id()) {
        let line = format!("FOUND_ID:{id}");
        prop_assert!(classify(&line, OperationKind::Search).is_failure());
    }

    /// Property: every u32 identifier is extracted exactly.
    #[test]
    fn prop_valid_ids_roundtrip(id in any::<u32>()) {
        prop_assert_eq!(
            classify(&format!("FOUND_ID:{id}"), OperationKind::Search),
            DeviceEvent::SearchFound { id: FingerprintId::new(id) }
        );
        prop_assert_eq!(
            classify(&format!("SUCCESS_ENROLL:{id}"), OperationKind::Enroll),
            DeviceEvent::EnrollSucceeded { id: FingerprintId::new(id) }
        );
    }

    /// Property: lowercase chatter never matches the uppercase vocabulary.
    #[test]
    fn prop_chatter_is_unrecognized(line in chatter(), kind in operation_kind()) {
        prop_assert!(classify(&line, kind).is_unrecognized());
    }

    /// Property: arbitrary bytes never panic the line parser and every
    /// yielded line is trimmed and non-empty.
    #[test]
    fn prop_line_parser_handles_arbitrary_bytes(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..16)
    ) {
        let mut parser = LineParser::new();
        for chunk in &chunks {
            parser.feed(chunk);
        }
        while let Some(line) = parser.next_line() {
            prop_assert!(!line.is_empty());
            prop_assert_eq!(line.trim(), line.as_str());
        }
    }
}
