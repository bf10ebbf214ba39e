//! Logging macros gated on a module-level `ENABLE_LOGS` flag, for modules
//! that log on every reading or tick and need a quick off switch.
//!
//! Usage:
//! ```rust,ignore
//! // In the module, define the flag first:
//! const ENABLE_LOGS: bool = true;
//!
//! // The macros are exported at the crate root:
//! use crate::{log_info, log_warn};
//!
//! log_info!("step watch {id} released");
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
