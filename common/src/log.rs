//! Logging macros shared by the workspace.
//!
//! They are thin wrappers over `tracing` so the terminal formatter in the CLI
//! can pick the right symbol for each line.

/// Target used for positive outcomes, rendered with a `[+]` prefix.
pub const SUCCESS_TARGET: &str = "scopr::success";

/// Target used for raw terminal output without a prefix.
pub const PRINT_TARGET: &str = "scopr::print";

#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::__tracing::info!(target: "scopr::success", $($arg)*)
    };
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::__tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::__tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::__tracing::error!($($arg)*)
    };
}
