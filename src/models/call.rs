//! Call data models shared by the watcher, the delivery channel and the history store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated call-log entry as read from the platform provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCallEntry {
    pub phone_number: String,
    pub raw_type_code: i64,
    pub duration_seconds: u64,
    pub occurred_at_epoch_millis: i64,
}

/// Semantic outcome of a call, derived from the raw type code and duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Incoming,
    Outgoing,
    Missed,
    Rejected,
    Unknown,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Incoming => "incoming",
            CallOutcome::Outgoing => "outgoing",
            CallOutcome::Missed => "missed",
            CallOutcome::Rejected => "rejected",
            CallOutcome::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "incoming" => Some(CallOutcome::Incoming),
            "outgoing" => Some(CallOutcome::Outgoing),
            "missed" => Some(CallOutcome::Missed),
            "rejected" => Some(CallOutcome::Rejected),
            "unknown" => Some(CallOutcome::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a call: two reads of the same row always produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIdentity {
    pub phone_number: String,
    pub occurred_at_epoch_millis: i64,
}

/// A call after classification. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedCall {
    pub outcome: CallOutcome,
    pub phone_number: String,
    pub duration_seconds: u64,
    pub occurred_at_epoch_millis: i64,
}

impl ClassifiedCall {
    pub fn identity(&self) -> CallIdentity {
        CallIdentity {
            phone_number: self.phone_number.clone(),
            occurred_at_epoch_millis: self.occurred_at_epoch_millis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_round_trips_through_str() {
        for outcome in [
            CallOutcome::Incoming,
            CallOutcome::Outgoing,
            CallOutcome::Missed,
            CallOutcome::Rejected,
            CallOutcome::Unknown,
        ] {
            assert_eq!(CallOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(CallOutcome::parse("voicemail"), None);
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&CallOutcome::Rejected).unwrap();
        assert_eq!(json, "\"rejected\"");
    }

    #[test]
    fn test_identity_ignores_outcome_and_duration() {
        let a = ClassifiedCall {
            outcome: CallOutcome::Missed,
            phone_number: "+15550100".into(),
            duration_seconds: 0,
            occurred_at_epoch_millis: 42,
        };
        let b = ClassifiedCall {
            outcome: CallOutcome::Incoming,
            duration_seconds: 30,
            ..a.clone()
        };
        assert_eq!(a.identity(), b.identity());
    }
}
