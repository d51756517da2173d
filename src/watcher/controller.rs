use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::calllog::CallLogProvider;
use crate::delivery::EventChannel;
use crate::models::RawCallEntry;

use super::config::WatcherConfig;
use super::detector::{ChangeDetector, WatcherCursor};
use super::loop_worker::{read_latest, watch_loop, PollStatus, WatchLoop};

struct ActiveWatch {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
    cursor_rx: watch::Receiver<WatcherCursor>,
}

/// Owns the polling lifecycle: `Stopped` until [`CallWatcher::start`], `Running`
/// until [`CallWatcher::stop`].
///
/// The cursor and the poll loop belong to one running instance; restarting
/// reseeds the cursor from the live call log. The read slot outlives runs, so
/// a read abandoned by `stop()` still blocks the next run's reads until it
/// returns.
pub struct CallWatcher {
    provider: Arc<dyn CallLogProvider>,
    channel: EventChannel,
    config: WatcherConfig,
    status: Arc<PollStatus>,
    active: Option<ActiveWatch>,
}

impl CallWatcher {
    pub fn new(provider: Arc<dyn CallLogProvider>, channel: EventChannel) -> Self {
        Self::with_config(provider, channel, WatcherConfig::default())
    }

    pub fn with_config(
        provider: Arc<dyn CallLogProvider>,
        channel: EventChannel,
        config: WatcherConfig,
    ) -> Self {
        Self {
            provider,
            channel,
            config,
            status: Arc::new(PollStatus::default()),
            active: None,
        }
    }

    pub fn config(&self) -> WatcherConfig {
        self.config
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Whether a call-log read is outstanding, including one abandoned by a
    /// previous `stop()` that has not returned yet.
    pub fn is_polling(&self) -> bool {
        self.status.is_polling()
    }

    /// Cursor of the running instance; `None` while stopped.
    pub fn cursor(&self) -> Option<WatcherCursor> {
        self.active.as_ref().map(|active| *active.cursor_rx.borrow())
    }

    /// Seed the cursor and begin polling. Returns false if already running.
    pub async fn start(&mut self) -> bool {
        if self.active.is_some() {
            warn!("call watcher already running; ignoring start");
            return false;
        }

        let detector = self.seed_detector().await;
        let cursor = detector.cursor();
        info!("call watcher cursor seeded at {}", cursor.epoch_millis());

        let cancel_token = CancellationToken::new();
        let (cursor_tx, cursor_rx) = watch::channel(cursor);

        let state = WatchLoop {
            provider: Arc::clone(&self.provider),
            channel: self.channel.clone(),
            detector,
            config: self.config,
            status: Arc::clone(&self.status),
            cursor_tx,
        };
        let handle = tokio::spawn(watch_loop(state, cancel_token.clone()));

        self.active = Some(ActiveWatch {
            handle,
            cancel_token,
            cursor_rx,
        });
        true
    }

    /// Cancel polling and wait for the loop to exit. A read still in flight
    /// finishes on its own thread; its result is dropped.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        active.cancel_token.cancel();
        active
            .handle
            .await
            .context("call watcher task failed to join")?;
        info!("call watcher stopped");
        Ok(())
    }

    async fn seed_detector(&self) -> ChangeDetector {
        // A read left over from the previous run holds the slot; give it one
        // read timeout to finish rather than reading alongside it.
        let Some(in_flight) = self.status.begin_within(self.config.read_timeout).await else {
            warn!("previous call-log read still in flight; cursor starts at epoch");
            return ChangeDetector::default();
        };
        let latest = read_latest(
            Arc::clone(&self.provider),
            self.config.read_timeout,
            in_flight,
        )
        .await;

        match latest.map(|row| row.map(RawCallEntry::try_from).transpose()) {
            Ok(Ok(entry)) => ChangeDetector::seeded_from(entry.as_ref()),
            Ok(Err(err)) => {
                warn!("newest call-log entry unusable for seeding ({err}); cursor starts at epoch");
                ChangeDetector::default()
            }
            Err(err) => {
                // Known hazard: the newest existing call will be reported as new.
                warn!("could not seed call watcher cursor ({err}); cursor starts at epoch");
                ChangeDetector::default()
            }
        }
    }
}

impl Drop for CallWatcher {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel_token.cancel();
        }
    }
}
