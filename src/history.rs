//! Persists every delivered call to the history database.

use log::debug;

use crate::db::Database;
use crate::delivery::{EventChannel, Subscription};

pub struct HistoryRecorder;

impl HistoryRecorder {
    /// Subscribe `db` to `channel`. Inserts are queued on the database thread so
    /// the handler returns without waiting for SQLite.
    pub fn attach(channel: &EventChannel, db: Database) -> Subscription {
        channel.subscribe(move |call| {
            debug!(
                "queueing history insert for {} at {}",
                call.phone_number, call.occurred_at_epoch_millis
            );
            db.submit_call(call)
        })
    }
}
