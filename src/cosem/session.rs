//! COSEM association over an HDLC link.
//!
//! One session covers the SNRM/UA link setup, the AARQ/AARE application
//! association with a low-level (password) authentication, the GET
//! transactions issued while associated, and the DISC teardown. The
//! session owns the I-frame counter; it advances only on a verified
//! response so that retries reuse the same sequence numbers.

use crate::config::ClientConfig;
use crate::constants::{
    AARE_RESULT_PREFIX, APDU_AARE, APDU_AARQ, DISC_TIMEOUT_MS, FRAME_COUNTER_INITIAL,
    FRAME_COUNTER_MAX, FRAME_COUNTER_STEP, HANDSHAKE_PAUSE_MS, LLC_RESPONSE, MAX_RETRY_COUNT,
};
use crate::error::{DlmsError, HandshakePhase};
use crate::hdlc::frame::{Control, HdlcFrame};
use crate::hdlc::link::HdlcLink;
use crate::hdlc::serial::MeterPort;
use crate::logging::{log_error, log_warn};
use log::{debug, info};
use std::time::Duration;
use tokio::time::sleep;

/// Where the session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// UA received; data link established, no application association yet.
    LinkUp,
    /// AARE accepted; GETs may be issued.
    Associated,
    /// A GET transaction is in flight.
    Reading,
    Failed,
}

/// I-frame send/receive counter.
///
/// Starts at 0x10 and advances by 0x22 per verified request/response pair,
/// stepping N(S) and N(R) together; wraps back to 0x10 after 0xFE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounter(u8);

impl FrameCounter {
    pub fn new() -> Self {
        FrameCounter(FRAME_COUNTER_INITIAL)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn advance(&mut self) {
        if self.0 >= FRAME_COUNTER_MAX {
            self.0 = FRAME_COUNTER_INITIAL;
        } else {
            self.0 += FRAME_COUNTER_STEP;
        }
    }

    pub fn reset(&mut self) {
        self.0 = FRAME_COUNTER_INITIAL;
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// A client-side association with one meter.
pub struct Session<P: MeterPort> {
    pub(crate) link: HdlcLink<P>,
    pub(crate) config: ClientConfig,
    pub(crate) state: SessionState,
    pub(crate) counter: FrameCounter,
}

impl<P: MeterPort> Session<P> {
    pub fn new(port: P, config: ClientConfig) -> Self {
        let link = HdlcLink::new(port, &config);
        Session {
            link,
            config,
            state: SessionState::Disconnected,
            counter: FrameCounter::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Current I-frame counter byte.
    pub fn frame_counter(&self) -> u8 {
        self.counter.value()
    }

    /// Wakes the meter and runs the SNRM/UA and AARQ/AARE handshakes.
    ///
    /// Handshake failures are fatal for the session: the state moves to
    /// `Failed` and the caller must reconnect from scratch.
    pub async fn connect(&mut self) -> Result<(), DlmsError> {
        info!("connecting to meter at SAP {:#04x}", self.config.server_sap);
        self.counter.reset();
        self.link.wake().await?;

        if let Err(e) = self.exchange_snrm().await {
            log_error(&format!("SNRM failed: {e}"));
            self.state = SessionState::Failed;
            return Err(e);
        }
        sleep(Duration::from_millis(HANDSHAKE_PAUSE_MS)).await;

        if let Err(e) = self.exchange_aarq().await {
            log_error(&format!("AARQ failed: {e}"));
            self.state = SessionState::Failed;
            return Err(e);
        }
        sleep(Duration::from_millis(HANDSHAKE_PAUSE_MS)).await;

        info!("association established");
        Ok(())
    }

    async fn exchange_snrm(&mut self) -> Result<(), DlmsError> {
        let snrm = HdlcFrame::snrm(self.config.server_sap, self.config.client_sap);
        let mut last_error = String::from("no response");

        for attempt in 1..=MAX_RETRY_COUNT {
            self.link.send_frame(&snrm).await?;
            match self.link.recv_frame().await {
                Ok(frame) if frame.control == Control::Ua => {
                    debug!("UA received, link is up");
                    self.state = SessionState::LinkUp;
                    return Ok(());
                }
                Ok(frame) => {
                    // The meter answered with something other than UA;
                    // retrying will not change its mind.
                    return Err(DlmsError::HandshakeRejected {
                        phase: HandshakePhase::Snrm,
                        reason: format!("unexpected control {:?}", frame.control),
                    });
                }
                Err(e) if e.is_retryable() => {
                    log_warn(&format!("SNRM attempt {attempt} failed: {e}"));
                    last_error = e.to_string();
                }
                Err(DlmsError::Framing(reason)) => {
                    log_warn(&format!("SNRM attempt {attempt} failed: {reason}"));
                    last_error = reason;
                }
                Err(e) => return Err(e),
            }
        }

        Err(DlmsError::HandshakeRejected {
            phase: HandshakePhase::Snrm,
            reason: last_error,
        })
    }

    async fn exchange_aarq(&mut self) -> Result<(), DlmsError> {
        let aarq = build_aarq(&self.config.password);
        let mut last_error = String::from("no response");

        for attempt in 1..=MAX_RETRY_COUNT {
            self.link.send_apdu(self.counter.value(), &aarq).await?;
            match self.link.recv_frame().await {
                Ok(frame) => {
                    let result = match frame.control {
                        Control::Info(_) => {
                            let apdu = strip_llc_response(&frame.info)?;
                            aare_result(apdu)
                        }
                        other => {
                            return Err(DlmsError::HandshakeRejected {
                                phase: HandshakePhase::Aarq,
                                reason: format!("unexpected control {other:?}"),
                            })
                        }
                    };
                    return match result {
                        Some(0) => {
                            self.counter.advance();
                            self.state = SessionState::Associated;
                            debug!("AARE accepted");
                            Ok(())
                        }
                        Some(code) => Err(DlmsError::HandshakeRejected {
                            phase: HandshakePhase::Aarq,
                            reason: format!("association result {code}"),
                        }),
                        None => Err(DlmsError::HandshakeRejected {
                            phase: HandshakePhase::Aarq,
                            reason: "no association-result in AARE".into(),
                        }),
                    };
                }
                Err(e) if e.is_retryable() => {
                    log_warn(&format!("AARQ attempt {attempt} failed: {e}"));
                    last_error = e.to_string();
                }
                Err(DlmsError::Framing(reason)) => {
                    log_warn(&format!("AARQ attempt {attempt} failed: {reason}"));
                    last_error = reason;
                }
                Err(e) => return Err(e),
            }
        }

        Err(DlmsError::HandshakeRejected {
            phase: HandshakePhase::Aarq,
            reason: last_error,
        })
    }

    /// Tears the association down with a DISC, sent twice for meters that
    /// miss the first one. Best-effort: the session always ends up
    /// `Disconnected` with the counter reset, whatever the meter answers.
    pub async fn disconnect(&mut self) -> Result<(), DlmsError> {
        let disc = HdlcFrame::disc(self.config.server_sap, self.config.client_sap);
        let deadline = Duration::from_millis(DISC_TIMEOUT_MS);

        for _ in 0..2 {
            if self.link.send_frame(&disc).await.is_ok() {
                let _ = self.link.recv_frame_within(deadline).await;
            }
            sleep(Duration::from_millis(HANDSHAKE_PAUSE_MS)).await;
        }

        self.state = SessionState::Disconnected;
        self.counter.reset();
        let _ = self.link.sleep_line();
        info!("disconnected");
        Ok(())
    }
}

/// Builds the AARQ APDU: LN no-ciphering application context, low-level
/// security with the given 16-byte password, and the xDLMS conformance
/// proposing GET and GET-with-list.
pub(crate) fn build_aarq(password: &[u8; 16]) -> Vec<u8> {
    let mut apdu = Vec::with_capacity(64);
    apdu.extend_from_slice(&[APDU_AARQ, 0x3E]);
    // application-context-name: 2.16.756.5.8.1.1
    apdu.extend_from_slice(&[
        0xA1, 0x09, 0x06, 0x07, 0x60, 0x85, 0x74, 0x05, 0x08, 0x01, 0x01,
    ]);
    // sender-acse-requirements: authentication
    apdu.extend_from_slice(&[0x8A, 0x02, 0x07, 0x80]);
    // mechanism-name: 2.16.756.5.8.2.1 (COSEM low-level security)
    apdu.extend_from_slice(&[0x8B, 0x07, 0x60, 0x85, 0x74, 0x05, 0x08, 0x02, 0x01]);
    // calling-authentication-value: the password as a GraphicString
    apdu.extend_from_slice(&[0xAC, 0x12, 0x80, 0x10]);
    apdu.extend_from_slice(password);
    // user-information: InitiateRequest, conformance GET/GET-with-list
    apdu.extend_from_slice(&[
        0xBE, 0x10, 0x04, 0x0E, 0x01, 0x00, 0x00, 0x00, 0x06, 0x5F, 0x1F, 0x04, 0x00, 0x00,
        0x18, 0x1D, 0xFF, 0xFF,
    ]);
    apdu
}

/// Locates the association-result inside an AARE APDU by scanning for the
/// `A2 03 02 01 <result>` field rather than trusting a fixed offset;
/// AARE lengths vary between meters.
pub(crate) fn aare_result(apdu: &[u8]) -> Option<u8> {
    if apdu.first() != Some(&APDU_AARE) {
        return None;
    }
    apdu.windows(AARE_RESULT_PREFIX.len())
        .position(|window| window == AARE_RESULT_PREFIX)
        .and_then(|at| apdu.get(at + AARE_RESULT_PREFIX.len()))
        .copied()
}

/// Strips the response LLC header (`E6 E7 00`) off an information field.
pub(crate) fn strip_llc_response(info: &[u8]) -> Result<&[u8], DlmsError> {
    match info.strip_prefix(LLC_RESPONSE.as_slice()) {
        Some(apdu) if !apdu.is_empty() => Ok(apdu),
        _ => Err(DlmsError::Framing("missing response LLC header".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hex::hex_to_bytes;

    #[test]
    fn test_counter_sequence_and_wrap() {
        let mut counter = FrameCounter::new();
        let mut seen = vec![counter.value()];
        for _ in 0..8 {
            counter.advance();
            seen.push(counter.value());
        }
        assert_eq!(
            seen,
            vec![0x10, 0x32, 0x54, 0x76, 0x98, 0xBA, 0xDC, 0xFE, 0x10]
        );
    }

    #[test]
    fn test_counter_wraps_from_fe() {
        let mut counter = FrameCounter(0xFE);
        counter.advance();
        assert_eq!(counter.value(), 0x10);
    }

    #[test]
    fn test_aarq_matches_capture() {
        // Wire capture of the AARQ APDU for the all-ones password.
        let expected = hex_to_bytes(
            "603EA1090607608574050801018A0207808B0760857405080201AC1280\
             1031313131313131313131313131313131BE10040E01000000065F1F04\
             0000181DFFFF",
        );
        assert_eq!(build_aarq(b"1111111111111111"), expected);
    }

    #[test]
    fn test_aare_result_located_structurally() {
        // Result field buried at different depths.
        let accepted = [
            0x61, 0x29, 0xA1, 0x09, 0x06, 0x07, 0x60, 0x85, 0x74, 0x05, 0x08, 0x01, 0x01,
            0xA2, 0x03, 0x02, 0x01, 0x00, 0xA3, 0x05, 0xA1, 0x03, 0x02, 0x01, 0x00,
        ];
        assert_eq!(aare_result(&accepted), Some(0));

        let rejected = [
            0x61, 0x10, 0xA2, 0x03, 0x02, 0x01, 0x01, 0xA3, 0x05, 0xA1, 0x03, 0x02, 0x01,
            0x0D,
        ];
        assert_eq!(aare_result(&rejected), Some(1));
    }

    #[test]
    fn test_aare_result_missing_or_wrong_tag() {
        assert_eq!(aare_result(&[0x61, 0x02, 0xA1, 0x00]), None);
        // Not an AARE at all.
        assert_eq!(aare_result(&[0x60, 0x05, 0xA2, 0x03, 0x02, 0x01, 0x00]), None);
    }

    #[test]
    fn test_strip_llc_response() {
        assert_eq!(
            strip_llc_response(&[0xE6, 0xE7, 0x00, 0xC4, 0x01]).unwrap(),
            &[0xC4, 0x01]
        );
        assert!(strip_llc_response(&[0xE6, 0xE6, 0x00, 0xC4]).is_err());
        assert!(strip_llc_response(&[0xE6, 0xE7, 0x00]).is_err());
    }
}
