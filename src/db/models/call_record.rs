//! Persisted call history rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CallOutcome, ClassifiedCall};

/// How the follow-up prompts for a call were answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRecord {
    pub is_client: bool,
    pub message_sent: bool,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    pub outcome: CallOutcome,
    pub phone_number: String,
    pub duration_seconds: u64,
    pub occurred_at_epoch_millis: i64,
    pub recorded_at: DateTime<Utc>,
    pub follow_up: Option<FollowUpRecord>,
}

impl CallRecord {
    pub fn call(&self) -> ClassifiedCall {
        ClassifiedCall {
            outcome: self.outcome,
            phone_number: self.phone_number.clone(),
            duration_seconds: self.duration_seconds,
            occurred_at_epoch_millis: self.occurred_at_epoch_millis,
        }
    }
}
