//! Error types for the DLMS/COSEM client.
//!
//! Transport- and CRC-level errors are recovered locally by retry; handshake
//! errors abort the session; per-register access and decode errors are
//! accumulated by the reading assembler without aborting the cycle.

use crate::obis::ObisCode;
use thiserror::Error;

/// Handshake phase in which a session setup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Snrm,
    Aarq,
}

/// Step of a GET transaction, reported when a register read fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetStep {
    Class,
    Value,
    ScalerUnit,
    CaptureTime,
}

/// Errors raised by the transport, session, and decoding layers.
#[derive(Debug, Error)]
pub enum DlmsError {
    /// Underlying serial port failure.
    #[error("serial port error: {0}")]
    SerialPort(String),

    /// No complete frame arrived within the receive deadline.
    #[error("no frame received within the deadline")]
    TransportTimeout,

    /// Malformed flag, length, or address in a received frame.
    #[error("framing error: {0}")]
    Framing(String),

    /// HCS or FCS mismatch. Carries the raw frame for diagnostics.
    #[error("CRC mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    Crc {
        expected: u16,
        computed: u16,
        raw: Vec<u8>,
    },

    /// SNRM refused, association rejected, or no usable handshake response.
    #[error("{phase:?} handshake rejected: {reason}")]
    HandshakeRejected {
        phase: HandshakePhase,
        reason: String,
    },

    /// The meter returned a non-success data-access-result for a GET.
    #[error("meter returned data-access-result {code}")]
    AccessResult { code: u8 },

    /// The A-XDR decoder could not parse the response data.
    #[error("cannot decode tag {tag:#04x} at offset {offset}")]
    Decode { tag: u8, offset: usize },

    /// The class check returned a different logical name than requested.
    #[error("meter answered for a different object than {requested}")]
    UnexpectedObject { requested: ObisCode },

    /// A GET transaction failed; records the register and the failing step.
    #[error("{step:?} read of {obis} failed: {source}")]
    GetFailed {
        obis: ObisCode,
        step: GetStep,
        #[source]
        source: Box<DlmsError>,
    },

    /// Serial number or manufacturer could not be read.
    #[error("meter identification read failed")]
    IdentificationFailed,

    /// The caller-supplied session budget was exhausted.
    #[error("session budget exceeded")]
    SessionBudgetExceeded,

    /// A GET was attempted outside an established association.
    #[error("not associated with the meter")]
    NotAssociated,
}

impl DlmsError {
    /// True for failures the transport layer may retry on the same
    /// frame counter: timeouts and check-sequence mismatches.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DlmsError::TransportTimeout | DlmsError::Crc { .. })
    }
}
