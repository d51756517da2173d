use serde::{Deserialize, Serialize};

use crate::models::RawCallEntry;

/// Timestamp watermark of the most recently delivered call.
///
/// Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatcherCursor(i64);

impl WatcherCursor {
    pub const EPOCH: WatcherCursor = WatcherCursor(0);

    pub fn at(epoch_millis: i64) -> Self {
        Self(epoch_millis)
    }

    pub fn epoch_millis(&self) -> i64 {
        self.0
    }

    fn advanced_to(self, epoch_millis: i64) -> Self {
        Self(self.0.max(epoch_millis))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    New {
        entry: RawCallEntry,
        updated_cursor: WatcherCursor,
    },
    NoChange,
}

/// Compare the newest call-log entry against the cursor.
///
/// Only a strictly newer timestamp counts; re-reading the same row is NoChange.
pub fn check_for_new_call(cursor: WatcherCursor, latest: Option<RawCallEntry>) -> Detection {
    match latest {
        Some(entry) if entry.occurred_at_epoch_millis > cursor.epoch_millis() => {
            let updated_cursor = cursor.advanced_to(entry.occurred_at_epoch_millis);
            Detection::New {
                entry,
                updated_cursor,
            }
        }
        _ => Detection::NoChange,
    }
}

/// Owns the cursor and applies [`check_for_new_call`] poll after poll.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    cursor: WatcherCursor,
}

impl ChangeDetector {
    pub fn new(cursor: WatcherCursor) -> Self {
        Self { cursor }
    }

    /// Seed from the newest entry already on the device so existing history is
    /// not replayed. With nothing to seed from the cursor starts at the epoch.
    pub fn seeded_from(latest: Option<&RawCallEntry>) -> Self {
        let cursor = latest
            .map(|entry| WatcherCursor::EPOCH.advanced_to(entry.occurred_at_epoch_millis))
            .unwrap_or(WatcherCursor::EPOCH);
        Self { cursor }
    }

    pub fn cursor(&self) -> WatcherCursor {
        self.cursor
    }

    /// Returns the entry when it is new and advances the cursor past it.
    pub fn observe(&mut self, latest: Option<RawCallEntry>) -> Option<RawCallEntry> {
        match check_for_new_call(self.cursor, latest) {
            Detection::New {
                entry,
                updated_cursor,
            } => {
                self.cursor = updated_cursor;
                Some(entry)
            }
            Detection::NoChange => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: i64) -> RawCallEntry {
        RawCallEntry {
            phone_number: "+15550100".into(),
            raw_type_code: 1,
            duration_seconds: 0,
            occurred_at_epoch_millis: ts,
        }
    }

    #[test]
    fn test_equal_timestamp_is_no_change() {
        assert_eq!(
            check_for_new_call(WatcherCursor::at(1000), Some(entry(1000))),
            Detection::NoChange
        );
    }

    #[test]
    fn test_newer_timestamp_advances_cursor() {
        assert_eq!(
            check_for_new_call(WatcherCursor::at(1000), Some(entry(1500))),
            Detection::New {
                entry: entry(1500),
                updated_cursor: WatcherCursor::at(1500),
            }
        );
    }

    #[test]
    fn test_absent_and_older_entries_are_no_change() {
        assert_eq!(check_for_new_call(WatcherCursor::at(1000), None), Detection::NoChange);
        assert_eq!(
            check_for_new_call(WatcherCursor::at(1000), Some(entry(999))),
            Detection::NoChange
        );
    }

    #[test]
    fn test_seeding_skips_existing_history() {
        let mut detector = ChangeDetector::seeded_from(Some(&entry(5000)));
        assert_eq!(detector.cursor(), WatcherCursor::at(5000));
        assert_eq!(detector.observe(Some(entry(5000))), None);
        assert_eq!(detector.observe(Some(entry(6000))), Some(entry(6000)));
    }

    #[test]
    fn test_unseeded_detector_reports_existing_entry_once() {
        // Seeding failed: the newest existing row surfaces on the first poll.
        let mut detector = ChangeDetector::default();
        assert_eq!(detector.observe(Some(entry(5000))), Some(entry(5000)));
        assert_eq!(detector.observe(Some(entry(5000))), None);
        assert_eq!(detector.cursor(), WatcherCursor::at(5000));
    }

    #[test]
    fn test_cursor_never_decreases() {
        let mut detector = ChangeDetector::new(WatcherCursor::at(2000));
        detector.observe(Some(entry(1000)));
        detector.observe(None);
        assert_eq!(detector.cursor(), WatcherCursor::at(2000));
    }

    #[test]
    fn test_negative_seed_keeps_epoch_floor() {
        let detector = ChangeDetector::seeded_from(Some(&entry(-5)));
        assert_eq!(detector.cursor(), WatcherCursor::EPOCH);
    }
}
