use std::sync::Mutex;
use std::time::Duration;

use crate::models::RawCallEntry;

use super::{CallLogError, CallLogProvider, CallLogRow};

#[derive(Default)]
struct MemoryState {
    rows: Vec<CallLogRow>,
    denied: bool,
    pending_failures: usize,
    read_delay: Duration,
    reads: usize,
}

/// In-process call log. Rows are appended in occurrence order, so the last row
/// pushed is the newest.
///
/// Read failures, permission loss and slow reads can be scripted, which makes
/// this the provider of choice for embedding callers and tests.
#[derive(Default)]
pub struct MemoryCallLog {
    state: Mutex<MemoryState>,
}

impl MemoryCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: impl IntoIterator<Item = RawCallEntry>) -> Self {
        let log = Self::new();
        for entry in entries {
            log.push_entry(&entry);
        }
        log
    }

    pub fn push_entry(&self, entry: &RawCallEntry) {
        self.push_row(CallLogRow::from(entry));
    }

    pub fn push_row(&self, row: CallLogRow) {
        self.lock().rows.push(row);
    }

    /// Simulate the user revoking (or granting back) call-log access.
    pub fn set_denied(&self, denied: bool) {
        self.lock().denied = denied;
    }

    /// Make the next `count` reads fail with a transient read error.
    pub fn fail_next_reads(&self, count: usize) {
        self.lock().pending_failures = count;
    }

    /// Delay every read, holding the calling thread.
    pub fn set_read_delay(&self, delay: Duration) {
        self.lock().read_delay = delay;
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CallLogProvider for MemoryCallLog {
    fn latest(&self) -> Result<Option<CallLogRow>, CallLogError> {
        let delay = {
            let mut state = self.lock();
            state.reads += 1;
            state.read_delay
        };

        // Sleep outside the lock so pushes from other threads are not blocked.
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.lock();
        if state.denied {
            return Err(CallLogError::PermissionDenied(
                "call-log permission revoked".into(),
            ));
        }
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return Err(CallLogError::ReadFailure("provider unavailable".into()));
        }

        Ok(state.rows.last().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ts: i64) -> RawCallEntry {
        RawCallEntry {
            phone_number: "600000000".into(),
            raw_type_code: 1,
            duration_seconds: 3,
            occurred_at_epoch_millis: ts,
        }
    }

    #[test]
    fn test_empty_log_reads_as_none() {
        let log = MemoryCallLog::new();
        assert_eq!(log.latest().unwrap(), None);
        assert_eq!(log.read_count(), 1);
    }

    #[test]
    fn test_latest_is_last_pushed() {
        let log = MemoryCallLog::with_entries([entry(10), entry(20)]);
        let row = log.latest().unwrap().unwrap();
        assert_eq!(RawCallEntry::try_from(row).unwrap().occurred_at_epoch_millis, 20);
    }

    #[test]
    fn test_scripted_failures_are_consumed() {
        let log = MemoryCallLog::with_entries([entry(10)]);
        log.fail_next_reads(2);
        assert!(matches!(log.latest(), Err(CallLogError::ReadFailure(_))));
        assert!(matches!(log.latest(), Err(CallLogError::ReadFailure(_))));
        assert!(log.latest().unwrap().is_some());
    }

    #[test]
    fn test_denied_until_granted_again() {
        let log = MemoryCallLog::with_entries([entry(10)]);
        log.set_denied(true);
        assert!(matches!(log.latest(), Err(CallLogError::PermissionDenied(_))));
        log.set_denied(false);
        assert!(log.latest().unwrap().is_some());
    }
}
