//! Maps raw call-log type codes onto semantic call outcomes.
//!
//! Pure domain logic - no I/O, no platform dependencies.

use crate::models::{CallOutcome, ClassifiedCall, RawCallEntry};

/// Raw type code the platform uses for incoming calls.
pub const INCOMING_TYPE: i64 = 1;
/// Raw type code for outgoing calls.
pub const OUTGOING_TYPE: i64 = 2;
/// Raw type code for missed calls.
pub const MISSED_TYPE: i64 = 3;
/// Raw type code for rejected calls.
pub const REJECTED_TYPE: i64 = 5;

/// Resolve the outcome for a type code and duration.
///
/// A zero-duration incoming record is a missed call on this platform. Outgoing
/// calls stay outgoing even when nobody picked up.
pub fn resolve_outcome(raw_type_code: i64, duration_seconds: u64) -> CallOutcome {
    match raw_type_code {
        INCOMING_TYPE if duration_seconds > 0 => CallOutcome::Incoming,
        INCOMING_TYPE => CallOutcome::Missed,
        OUTGOING_TYPE => CallOutcome::Outgoing,
        MISSED_TYPE => CallOutcome::Missed,
        REJECTED_TYPE => CallOutcome::Rejected,
        _ => CallOutcome::Unknown,
    }
}

pub fn classify(entry: RawCallEntry) -> ClassifiedCall {
    ClassifiedCall {
        outcome: resolve_outcome(entry.raw_type_code, entry.duration_seconds),
        phone_number: entry.phone_number,
        duration_seconds: entry.duration_seconds,
        occurred_at_epoch_millis: entry.occurred_at_epoch_millis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: i64, duration: u64) -> RawCallEntry {
        RawCallEntry {
            phone_number: "+34600111222".into(),
            raw_type_code: code,
            duration_seconds: duration,
            occurred_at_epoch_millis: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_incoming_with_duration_is_incoming() {
        assert_eq!(classify(entry(1, 5)).outcome, CallOutcome::Incoming);
    }

    #[test]
    fn test_incoming_without_duration_is_missed() {
        assert_eq!(classify(entry(1, 0)).outcome, CallOutcome::Missed);
    }

    #[test]
    fn test_unanswered_outgoing_is_still_outgoing() {
        assert_eq!(classify(entry(2, 0)).outcome, CallOutcome::Outgoing);
        assert_eq!(classify(entry(2, 120)).outcome, CallOutcome::Outgoing);
    }

    #[test]
    fn test_missed_and_rejected_codes() {
        assert_eq!(classify(entry(3, 0)).outcome, CallOutcome::Missed);
        assert_eq!(classify(entry(3, 9)).outcome, CallOutcome::Missed);
        assert_eq!(classify(entry(5, 0)).outcome, CallOutcome::Rejected);
    }

    #[test]
    fn test_unrecognised_codes_are_unknown() {
        assert_eq!(classify(entry(99, 0)).outcome, CallOutcome::Unknown);
        assert_eq!(classify(entry(4, 10)).outcome, CallOutcome::Unknown);
        assert_eq!(classify(entry(0, 0)).outcome, CallOutcome::Unknown);
        assert_eq!(classify(entry(-1, 0)).outcome, CallOutcome::Unknown);
    }

    #[test]
    fn test_extreme_inputs_still_classify() {
        assert_eq!(resolve_outcome(i64::MIN, u64::MAX), CallOutcome::Unknown);
        assert_eq!(resolve_outcome(i64::MAX, 0), CallOutcome::Unknown);
        assert_eq!(resolve_outcome(1, u64::MAX), CallOutcome::Incoming);
    }

    #[test]
    fn test_fields_pass_through() {
        let raw = entry(1, 42);
        let call = classify(raw.clone());
        assert_eq!(call.phone_number, raw.phone_number);
        assert_eq!(call.duration_seconds, 42);
        assert_eq!(call.occurred_at_epoch_millis, raw.occurred_at_epoch_millis);
    }
}
