use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{watch, Notify};
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    calllog::{CallLogError, CallLogProvider, CallLogRow},
    classifier::classify,
    delivery::EventChannel,
    models::RawCallEntry,
};

use super::config::WatcherConfig;
use super::detector::{ChangeDetector, WatcherCursor};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Read slot shared by every run of one watcher: the seeding read, each tick,
/// and reads abandoned by an earlier run that are still blocking.
#[derive(Default)]
pub(super) struct PollStatus {
    in_flight: AtomicBool,
    idle: Notify,
}

impl PollStatus {
    pub(super) fn is_polling(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Claim the in-flight slot. `None` while an earlier read is still running.
    pub(super) fn try_begin(self: &Arc<Self>) -> Option<InFlight> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(InFlight(Arc::clone(self)))
        }
    }

    /// Claim the slot, waiting up to `within` for an outstanding read to return.
    pub(super) async fn begin_within(self: &Arc<Self>, within: Duration) -> Option<InFlight> {
        let deadline = Instant::now() + within;
        loop {
            // Registered before the check so a release in between is not missed.
            let released = self.idle.notified();
            if let Some(in_flight) = self.try_begin() {
                return Some(in_flight);
            }
            if tokio::time::timeout_at(deadline, released).await.is_err() {
                return self.try_begin();
            }
        }
    }
}

/// Clears the in-flight flag once the blocking read returns, even when the
/// tick that started it has already been abandoned.
pub(super) struct InFlight(Arc<PollStatus>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::SeqCst);
        self.0.idle.notify_waiters();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum TickOutcome {
    Delivered,
    Duplicate,
    NoChange,
    Skipped,
    Cancelled,
}

pub(super) struct WatchLoop {
    pub provider: Arc<dyn CallLogProvider>,
    pub channel: EventChannel,
    pub detector: ChangeDetector,
    pub config: WatcherConfig,
    pub status: Arc<PollStatus>,
    pub cursor_tx: watch::Sender<WatcherCursor>,
}

pub(super) async fn watch_loop(mut state: WatchLoop, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval(state.config.poll_interval);
    // A slow read swallows the ticks that came due meanwhile instead of bunching them up.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log_info!(
        "call watcher running every {:?} from cursor {}",
        state.config.poll_interval,
        state.detector.cursor().epoch_millis()
    );

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("call watcher shutting down");
                break;
            }
            _ = ticker.tick() => {
                if poll_tick(&mut state, &cancel_token).await == TickOutcome::Cancelled {
                    log_info!("call watcher stopped mid-poll; in-flight read discarded");
                    break;
                }
            }
        }
    }
}

async fn poll_tick(state: &mut WatchLoop, cancel_token: &CancellationToken) -> TickOutcome {
    let Some(in_flight) = state.status.try_begin() else {
        log_warn!("previous call-log read still in flight; skipping tick");
        return TickOutcome::Skipped;
    };

    let read = read_latest(
        Arc::clone(&state.provider),
        state.config.read_timeout,
        in_flight,
    );

    let result = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return TickOutcome::Cancelled,
        result = read => result,
    };

    let row = match result {
        Ok(row) => row,
        Err(CallLogError::PermissionDenied(reason)) => {
            log_warn!("call-log access denied, skipping tick: {reason}");
            return TickOutcome::Skipped;
        }
        Err(err) => {
            log_error!("call-log poll failed, skipping tick: {err}");
            return TickOutcome::Skipped;
        }
    };

    let latest = match row.map(RawCallEntry::try_from).transpose() {
        Ok(latest) => latest,
        Err(err) => {
            log_warn!("discarding call-log entry: {err}");
            return TickOutcome::Skipped;
        }
    };

    // stop() may have landed while the read was completing.
    if cancel_token.is_cancelled() {
        return TickOutcome::Cancelled;
    }

    let Some(entry) = state.detector.observe(latest) else {
        return TickOutcome::NoChange;
    };
    state.cursor_tx.send_replace(state.detector.cursor());

    let call = classify(entry);
    log_info!(
        "new {} call from {} at {} ({}s)",
        call.outcome,
        call.phone_number,
        call.occurred_at_epoch_millis,
        call.duration_seconds
    );

    if state.channel.publish(call) {
        TickOutcome::Delivered
    } else {
        log_debug!("call already delivered; not forwarding again");
        TickOutcome::Duplicate
    }
}

/// Run the provider's blocking read off the async workers, bounded by `timeout`.
///
/// `in_flight` travels with the blocking closure, so the slot stays claimed
/// past a timeout until the provider actually returns.
pub(super) async fn read_latest(
    provider: Arc<dyn CallLogProvider>,
    timeout: Duration,
    in_flight: InFlight,
) -> Result<Option<CallLogRow>, CallLogError> {
    let read = tokio::task::spawn_blocking(move || {
        let _in_flight = in_flight;
        provider.latest()
    });

    match tokio::time::timeout(timeout, read).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(CallLogError::ReadFailure(format!(
            "call-log read worker failed: {join_err}"
        ))),
        Err(_) => Err(CallLogError::ReadFailure(format!(
            "call-log read timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}
