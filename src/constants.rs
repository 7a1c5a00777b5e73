//! DLMS/COSEM and HDLC protocol constants
//!
//! This module defines the constants used by the HDLC framing layer and the
//! COSEM application layer, based on IEC 62056-46 and the DLMS Green Book.

/// HDLC frame delimiter. Every well-formed frame starts and ends with it.
pub const HDLC_FLAG: u8 = 0x7E;

/// Frame format type 3 identifier (high bits of the two-byte format field).
pub const HDLC_FORMAT_TYPE3: u8 = 0xA0;

/// Maximum accepted frame size, including both flags.
pub const MAX_FRAME_SIZE: usize = 256;

/// Minimum frame size: flag + format(2) + dest + src + control + CS(2) + flag.
pub const MIN_FRAME_SIZE: usize = 9;

/// LLC header on outbound information fields (dest LSAP, src LSAP, quality).
pub const LLC_REQUEST: [u8; 3] = [0xE6, 0xE6, 0x00];

/// LLC header on responses from the meter.
pub const LLC_RESPONSE: [u8; 3] = [0xE6, 0xE7, 0x00];

/// SNRM control byte (with poll bit).
pub const CONTROL_SNRM: u8 = 0x93;

/// UA control byte (with final bit).
pub const CONTROL_UA: u8 = 0x73;

/// DISC control byte (with poll bit).
pub const CONTROL_DISC: u8 = 0x53;

/// DM control byte (with final bit).
pub const CONTROL_DM: u8 = 0x1F;

/// Default client SAP (public client with low-level security).
pub const DEFAULT_CLIENT_SAP: u8 = 0x41;

/// Default server SAP (management logical device).
pub const DEFAULT_SERVER_SAP: u8 = 0x03;

/// Initial value of the I-frame send/receive counter.
pub const FRAME_COUNTER_INITIAL: u8 = 0x10;

/// Counter increment after a verified request/response pair
/// (advances both N(S) and N(R) by one, modulo 8).
pub const FRAME_COUNTER_STEP: u8 = 0x22;

/// Highest counter value; the next advance wraps to the initial value.
pub const FRAME_COUNTER_MAX: u8 = 0xFE;

/// SNRM negotiation parameters: window size 1 in both directions and the
/// canonical maximum-information-length offer. Sent as the SNRM
/// information field, without an LLC header.
pub const SNRM_NEGOTIATION_PARAMS: [u8; 23] = [
    0x81, 0x80, 0x14, // format identifier, group identifier, group length
    0x05, 0x02, 0x05, 0x01, // maximum information field length, transmit
    0x06, 0x02, 0x05, 0x01, // maximum information field length, receive
    0x07, 0x04, 0x00, 0x00, 0x00, 0x01, // window size, transmit
    0x08, 0x04, 0x00, 0x00, 0x00, 0x01, // window size, receive
];

/// xDLMS GET-Request tag.
pub const APDU_GET_REQUEST: u8 = 0xC0;

/// xDLMS GET-Response tag.
pub const APDU_GET_RESPONSE: u8 = 0xC4;

/// Invoke-id-and-priority byte used on every GET of this client.
pub const APDU_INVOKE_ID: u8 = 0xC1;

/// ACSE AARQ tag.
pub const APDU_AARQ: u8 = 0x60;

/// ACSE AARE tag.
pub const APDU_AARE: u8 = 0x61;

/// Prefix of the association-result field inside an AARE APDU
/// (`A2 03 02 01 <result>`).
pub const AARE_RESULT_PREFIX: [u8; 4] = [0xA2, 0x03, 0x02, 0x01];

/// COSEM attribute indices used by the GET transaction.
pub const ATTR_LOGICAL_NAME: u8 = 0x01;
pub const ATTR_VALUE: u8 = 0x02;
pub const ATTR_SCALER_UNIT: u8 = 0x03;
pub const ATTR_CAPTURE_TIME: u8 = 0x05;

/// Per-frame receive deadline.
pub const DEFAULT_FRAME_TIMEOUT_MS: u64 = 2_000;

/// Deadline for the best-effort UA after a DISC.
pub const DISC_TIMEOUT_MS: u64 = 500;

/// Pause after SNRM/UA and AARQ/AARE round trips.
pub const HANDSHAKE_PAUSE_MS: u64 = 100;

/// Pacing delay between the steps of a GET transaction.
pub const DEFAULT_PACING_MS: u64 = 50;

/// DTR assertion time before the first SNRM wakes the meter.
pub const DTR_WAKE_MS: u64 = 500;

/// Transport attempts for SNRM and AARQ, and the default per-step
/// retry limit for GET transactions.
pub const MAX_RETRY_COUNT: u8 = 3;

/// Number of time-of-day billing zones a meter can expose.
pub const TOD_ZONES: usize = 8;
