use std::time::Duration;

/// Default period between call-log polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound on a single call-log read before the tick is abandoned.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Timing knobs for the polling watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherConfig {
    pub poll_interval: Duration,
    pub read_timeout: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl WatcherConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        // tokio::time::interval panics on a zero period
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout.max(Duration::from_millis(1));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatcherConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.read_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = WatcherConfig::default().with_poll_interval(Duration::ZERO);
        assert_eq!(config.poll_interval, Duration::from_millis(1));
    }
}
