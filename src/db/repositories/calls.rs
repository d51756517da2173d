use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_outcome, to_i64, to_u64},
    models::{CallRecord, FollowUpRecord},
};
use crate::models::{CallIdentity, ClassifiedCall};

fn row_to_call_record(row: &Row) -> Result<CallRecord> {
    let outcome: String = row.get("outcome")?;
    let duration_seconds: i64 = row.get("duration_seconds")?;
    let recorded_at: String = row.get("recorded_at")?;
    let is_client: Option<bool> = row.get("is_client")?;
    let message_sent: Option<bool> = row.get("message_sent")?;
    let resolved_at: Option<String> = row.get("resolved_at")?;

    let follow_up = match (is_client, message_sent, resolved_at) {
        (Some(is_client), Some(message_sent), Some(resolved_at)) => Some(FollowUpRecord {
            is_client,
            message_sent,
            resolved_at: parse_datetime(&resolved_at, "resolved_at")?,
        }),
        _ => None,
    };

    Ok(CallRecord {
        id: row.get("id")?,
        outcome: parse_outcome(&outcome)?,
        phone_number: row.get("phone_number")?,
        duration_seconds: to_u64(duration_seconds, "duration_seconds")?,
        occurred_at_epoch_millis: row.get("occurred_at_ms")?,
        recorded_at: parse_datetime(&recorded_at, "recorded_at")?,
        follow_up,
    })
}

/// Insert unless a row with the same identity exists. Returns true on insert.
fn insert_call_row(conn: &Connection, call: &ClassifiedCall, recorded_at: DateTime<Utc>) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO calls (id, phone_number, outcome, duration_seconds, occurred_at_ms, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            Uuid::new_v4().to_string(),
            call.phone_number,
            call.outcome.as_str(),
            to_i64(call.duration_seconds)?,
            call.occurred_at_epoch_millis,
            recorded_at.to_rfc3339(),
        ],
    )?;
    Ok(inserted > 0)
}

impl Database {
    pub async fn insert_call(&self, call: &ClassifiedCall) -> Result<bool> {
        let record = call.clone();
        self.execute(move |conn| insert_call_row(conn, &record, Utc::now()))
            .await
    }

    /// Fire-and-forget insert for callers that cannot await.
    pub fn submit_call(&self, call: &ClassifiedCall) -> Result<()> {
        let record = call.clone();
        self.submit("insert_call", move |conn| {
            insert_call_row(conn, &record, Utc::now()).map(|_| ())
        })
    }

    /// Most recent calls first.
    pub async fn list_recent_calls(&self, limit: usize) -> Result<Vec<CallRecord>> {
        let limit = to_i64(limit as u64)?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.phone_number, c.outcome, c.duration_seconds, c.occurred_at_ms, c.recorded_at,
                        f.is_client, f.message_sent, f.resolved_at
                 FROM calls c
                 LEFT JOIN follow_ups f ON f.call_id = c.id
                 ORDER BY c.occurred_at_ms DESC
                 LIMIT ?1",
            )?;

            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_call_record(row)?);
            }

            Ok(records)
        })
        .await
    }

    pub async fn count_calls(&self) -> Result<u64> {
        self.execute(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM calls", [], |row| row.get(0))?;
            to_u64(count, "count")
        })
        .await
    }

    /// Store the answers to the follow-up prompts. A second answer for the same
    /// call replaces the first.
    pub async fn record_follow_up(
        &self,
        identity: &CallIdentity,
        is_client: bool,
        message_sent: bool,
    ) -> Result<()> {
        let identity = identity.clone();
        self.execute(move |conn| {
            let call_id: Option<String> = conn
                .query_row(
                    "SELECT id FROM calls WHERE phone_number = ?1 AND occurred_at_ms = ?2",
                    params![identity.phone_number, identity.occurred_at_epoch_millis],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(call_id) = call_id else {
                bail!(
                    "no recorded call from {} at {}",
                    identity.phone_number,
                    identity.occurred_at_epoch_millis
                );
            };

            conn.execute(
                "INSERT INTO follow_ups (call_id, is_client, message_sent, resolved_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(call_id) DO UPDATE SET
                     is_client = excluded.is_client,
                     message_sent = excluded.message_sent,
                     resolved_at = excluded.resolved_at",
                params![call_id, is_client, message_sent, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }
}
