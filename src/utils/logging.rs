//! Conditional logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! The watcher loop logs on every tick; flipping the flag in that module
//! silences it without touching `RUST_LOG` for the rest of the crate.
//!
//! Usage:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("polled call log");
//! ```

/// Conditional debug logging.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Conditional info logging.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Conditional warn logging.
///
/// The calling module must define `const ENABLE_LOGS: bool`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Conditional error logging.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}

/// Initialise `env_logger`. `RUST_LOG` wins; otherwise `info`, or `debug` when
/// `CALLWATCH_DEBUG` is set to `1`/`true`.
pub fn init_logging() {
    let debug_mode = std::env::var("CALLWATCH_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_filter = if debug_mode { "debug" } else { "info" };

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter),
    )
    .try_init();
}
