//! Logging macros gated on a module-level `ENABLE_LOGS` flag, for loops that
//! would otherwise flood the log.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::log_info;
//!
//! log_info!("analyzed {} of {}", current, total);
//! ```

/// `log::info!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// `log::warn!` when the calling module's `ENABLE_LOGS` is true.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}
