pub mod utils;

pub mod calllog;
pub mod classifier;
pub mod db;
pub mod delivery;
pub mod followup;
pub mod history;
pub mod models;
pub mod settings;
pub mod watcher;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::info;

pub use calllog::{CallLogError, CallLogProvider, JsonFileCallLog, MemoryCallLog};
pub use classifier::classify;
pub use db::Database;
pub use delivery::{EventChannel, Subscription};
pub use history::HistoryRecorder;
pub use models::{CallIdentity, CallOutcome, ClassifiedCall, RawCallEntry};
pub use settings::SettingsStore;
pub use utils::logging::init_logging;
pub use watcher::{CallWatcher, WatcherConfig};

pub const DATABASE_FILE: &str = "callwatch.sqlite3";
pub const SETTINGS_FILE: &str = "settings.json";

/// Long-lived handles shared by every front end.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub channel: EventChannel,
}

impl AppState {
    /// Open (or create) the history database and settings under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DATABASE_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        info!("callwatch data directory: {}", data_dir.display());

        Ok(Self {
            db,
            settings,
            channel: EventChannel::new(),
        })
    }

    /// Watcher over `provider` publishing into this state's channel. Timing
    /// comes from the saved settings unless `poll_interval` overrides it.
    pub fn watcher(
        &self,
        provider: Arc<dyn CallLogProvider>,
        poll_interval: Option<Duration>,
    ) -> CallWatcher {
        let mut config = self.settings.watcher().to_config();
        if let Some(interval) = poll_interval {
            config = config.with_poll_interval(interval);
        }
        CallWatcher::with_config(provider, self.channel.clone(), config)
    }
}
