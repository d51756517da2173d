use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::watcher::{WatcherConfig, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    pub poll_interval_ms: u64,
    pub read_timeout_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            read_timeout_ms: DEFAULT_READ_TIMEOUT.as_millis() as u64,
        }
    }
}

impl WatcherSettings {
    pub fn to_config(&self) -> WatcherConfig {
        WatcherConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_read_timeout(Duration::from_millis(self.read_timeout_ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUpSettings {
    /// Message body; `{number}` is replaced with the caller's number.
    pub message_template: String,
    /// Also prompt for calls whose type code was not recognised.
    pub prompt_unknown_calls: bool,
}

impl Default for FollowUpSettings {
    fn default() -> Self {
        Self {
            message_template: "Hi! Sorry I couldn't take your call. How can I help?".into(),
            prompt_unknown_calls: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    watcher: WatcherSettings,
    follow_up: FollowUpSettings,
}

/// JSON-backed settings, loaded once and written back on every update.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn watcher(&self) -> WatcherSettings {
        self.read().watcher.clone()
    }

    pub fn follow_up(&self) -> FollowUpSettings {
        self.read().follow_up.clone()
    }

    pub fn update_watcher(&self, settings: WatcherSettings) -> Result<()> {
        let mut guard = self.write();
        guard.watcher = settings;
        self.persist(&guard)
    }

    pub fn update_follow_up(&self, settings: FollowUpSettings) -> Result<()> {
        let mut guard = self.write();
        guard.follow_up = settings;
        self.persist(&guard)
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.watcher(), WatcherSettings::default());
        assert_eq!(store.watcher().to_config(), WatcherConfig::default());
    }

    #[test]
    fn test_updates_persist_across_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_watcher(WatcherSettings {
                poll_interval_ms: 1500,
                ..WatcherSettings::default()
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.watcher().poll_interval_ms, 1500);
        assert_eq!(reloaded.follow_up(), FollowUpSettings::default());
    }

    #[test]
    fn test_follow_up_update_keeps_watcher_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_watcher(WatcherSettings {
                read_timeout_ms: 2500,
                ..WatcherSettings::default()
            })
            .unwrap();
        store
            .update_follow_up(FollowUpSettings {
                message_template: "Call me back at {number}".into(),
                prompt_unknown_calls: true,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.follow_up().message_template, "Call me back at {number}");
        assert!(reloaded.follow_up().prompt_unknown_calls);
        assert_eq!(reloaded.watcher().read_timeout_ms, 2500);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"follow_up": {"prompt_unknown_calls": true}}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert!(store.follow_up().prompt_unknown_calls);
        assert_eq!(
            store.follow_up().message_template,
            FollowUpSettings::default().message_template
        );
        assert_eq!(store.watcher(), WatcherSettings::default());
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.watcher(), WatcherSettings::default());
    }
}
