pub mod config;
pub mod controller;
pub mod detector;
mod loop_worker;

pub use config::{WatcherConfig, DEFAULT_POLL_INTERVAL, DEFAULT_READ_TIMEOUT};
pub use controller::CallWatcher;
pub use detector::{check_for_new_call, ChangeDetector, Detection, WatcherCursor};
