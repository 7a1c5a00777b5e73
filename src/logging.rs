//! Logging setup and helpers.
//!
//! The crate logs through the `log` facade; binaries call [`init_logger`]
//! once to route it to `env_logger` (`RUST_LOG=debug` shows the TX/RX
//! frame traces emitted by the transport).

use log::{debug, error, info, warn};

/// Routes the `log` facade to `env_logger`. Safe to call more than once;
/// later calls are ignored.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env().try_init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    error!("{message}");
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    warn!("{message}");
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    info!("{message}");
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    debug!("{message}");
}
