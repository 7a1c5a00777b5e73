//! Client configuration.
//!
//! All options are injected as a plain struct; there is no file or
//! environment loading in this crate. Defaults match the public-client
//! low-level-security profile most Indian-market meters ship with.

use crate::constants::{
    DEFAULT_CLIENT_SAP, DEFAULT_FRAME_TIMEOUT_MS, DEFAULT_PACING_MS, DEFAULT_SERVER_SAP,
    MAX_RETRY_COUNT,
};
use std::time::Duration;

/// Configuration for one meter association.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client service access point, one byte.
    pub client_sap: u8,
    /// Server service access point, one byte.
    pub server_sap: u8,
    /// 16-byte low-level-security password carried in the AARQ.
    pub password: [u8; 16],
    /// Serial line rate, 8N1.
    pub baud: u32,
    /// Hard deadline for receiving one frame.
    pub per_frame_timeout: Duration,
    /// Delay between the steps of a GET transaction.
    pub pacing: Duration,
    /// Per-step retry limit for timeouts and CRC failures.
    pub max_retries: u8,
    /// Number of time-of-day zones to read per cycle (0..=8).
    pub read_tod_zones: u8,
    /// Overall deadline for one session; `None` disables the check.
    pub session_budget: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            client_sap: DEFAULT_CLIENT_SAP,
            server_sap: DEFAULT_SERVER_SAP,
            password: *b"1111111111111111",
            baud: 9_600,
            per_frame_timeout: Duration::from_millis(DEFAULT_FRAME_TIMEOUT_MS),
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            max_retries: MAX_RETRY_COUNT,
            read_tod_zones: 4,
            session_budget: None,
        }
    }
}
