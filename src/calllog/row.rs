use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::RawCallEntry;

use super::CallLogError;

/// Unvalidated call-log row, shaped after the platform's call-log columns.
///
/// Numeric columns may arrive either as JSON numbers or as numeric strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallLogRow {
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default, rename = "type")]
    pub type_code: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub date: Option<Value>,
}

impl CallLogRow {
    /// Occurrence time, when the `date` column holds a usable integer.
    pub fn occurred_at(&self) -> Option<i64> {
        parse_integer(self.date.as_ref(), "date").ok()
    }
}

impl From<&RawCallEntry> for CallLogRow {
    fn from(entry: &RawCallEntry) -> Self {
        Self {
            number: Some(entry.phone_number.clone()),
            type_code: Some(Value::from(entry.raw_type_code)),
            duration: Some(Value::from(entry.duration_seconds)),
            date: Some(Value::from(entry.occurred_at_epoch_millis)),
        }
    }
}

impl TryFrom<CallLogRow> for RawCallEntry {
    type Error = CallLogError;

    fn try_from(row: CallLogRow) -> Result<Self, Self::Error> {
        let phone_number = row.number.ok_or_else(|| missing("number"))?;
        let raw_type_code = parse_integer(row.type_code.as_ref(), "type")?;
        let duration = parse_integer(row.duration.as_ref(), "duration")?;
        let occurred_at_epoch_millis = parse_integer(row.date.as_ref(), "date")?;

        let duration_seconds = u64::try_from(duration).map_err(|_| CallLogError::MalformedEntry {
            field: "duration",
            reason: format!("is negative ({duration})"),
        })?;

        Ok(RawCallEntry {
            phone_number,
            raw_type_code,
            duration_seconds,
            occurred_at_epoch_millis,
        })
    }
}

fn missing(field: &'static str) -> CallLogError {
    CallLogError::MalformedEntry {
        field,
        reason: "is missing".into(),
    }
}

fn parse_integer(value: Option<&Value>, field: &'static str) -> Result<i64, CallLogError> {
    let not_numeric = |raw: &dyn std::fmt::Display| CallLogError::MalformedEntry {
        field,
        reason: format!("is not an integer ({raw})"),
    };

    match value {
        None | Some(Value::Null) => Err(missing(field)),
        Some(Value::Number(number)) => number.as_i64().ok_or_else(|| not_numeric(number)),
        Some(Value::String(text)) => text.trim().parse::<i64>().map_err(|_| not_numeric(text)),
        Some(other) => Err(not_numeric(other)),
    }
}
