//! Per-register GET transactions.
//!
//! A full read of one OBIS entry is up to four attribute exchanges: the
//! logical-name check, the value, the scaler/unit (classes 3 and 4), and
//! the capture time (class 4). Timeouts and CRC failures are retried on
//! the same frame counter; the counter advances only once a response has
//! been verified. Data-level failures (non-success access results, decode
//! errors) are never retried.

use crate::constants::{
    APDU_GET_REQUEST, APDU_GET_RESPONSE, APDU_INVOKE_ID, ATTR_CAPTURE_TIME, ATTR_LOGICAL_NAME,
    ATTR_SCALER_UNIT, ATTR_VALUE,
};
use crate::cosem::axdr::{DateTime, ScalerUnit, Value};
use crate::cosem::session::{strip_llc_response, Session, SessionState};
use crate::error::{DlmsError, GetStep};
use crate::hdlc::frame::Control;
use crate::hdlc::serial::MeterPort;
use crate::logging::{log_debug, log_warn};
use crate::obis::ObisEntry;
use tokio::time::sleep;

/// Outcome of a register read: the raw decoded value, the engineering
/// value after scaler application, and the capture time when the object
/// provides one.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterValue {
    pub raw: Value,
    pub engineering: f64,
    pub scaler_unit: ScalerUnit,
    pub capture_time: Option<DateTime>,
}

impl<P: MeterPort> Session<P> {
    /// Reads a numeric register: class check, value, scaler, capture time.
    pub async fn read_register(&mut self, entry: &ObisEntry) -> Result<RegisterValue, DlmsError> {
        self.require_associated()?;
        self.state = SessionState::Reading;
        let result = self.read_register_steps(entry).await;
        self.state = SessionState::Associated;
        match &result {
            Ok(value) => log_debug(&format!(
                "{} = {} {}",
                entry.name,
                value.engineering,
                entry.unit.label()
            )),
            Err(e) => log_debug(&format!("{} failed: {e}", entry.name)),
        }
        result
    }

    /// Reads an identification object (class 1) as a string.
    pub async fn read_string(&mut self, entry: &ObisEntry) -> Result<String, DlmsError> {
        self.require_associated()?;
        self.state = SessionState::Reading;
        let result = self.read_string_steps(entry).await;
        self.state = SessionState::Associated;
        result
    }

    async fn read_register_steps(&mut self, entry: &ObisEntry) -> Result<RegisterValue, DlmsError> {
        self.class_check(entry).await?;
        self.pace().await;

        let raw = self.value_step(entry).await?;
        let mut engineering = raw.as_f64().ok_or_else(|| step_error(
            entry,
            GetStep::Value,
            DlmsError::Decode { tag: 0, offset: 0 },
        ))?;

        let mut scaler_unit = ScalerUnit::NONE;
        if entry.class.has_scaler() {
            self.pace().await;
            scaler_unit = self.scaler_step(entry).await?;
            engineering = scaler_unit.apply(engineering);
        }

        let mut capture_time = None;
        if entry.class.has_capture_time() {
            self.pace().await;
            capture_time = self.capture_time_step(entry).await?;
        }

        Ok(RegisterValue {
            raw,
            engineering,
            scaler_unit,
            capture_time,
        })
    }

    async fn read_string_steps(&mut self, entry: &ObisEntry) -> Result<String, DlmsError> {
        self.class_check(entry).await?;
        self.pace().await;

        let value = self.value_step(entry).await?;
        value.as_string().ok_or_else(|| {
            step_error(entry, GetStep::Value, DlmsError::Decode { tag: 0, offset: 0 })
        })
    }

    /// Attribute 1: confirms the meter routed us to the object we asked
    /// for. The decoded logical name must echo the requested OBIS code.
    async fn class_check(&mut self, entry: &ObisEntry) -> Result<(), DlmsError> {
        let data = self
            .get_attribute(entry, ATTR_LOGICAL_NAME)
            .await
            .map_err(|e| step_error(entry, GetStep::Class, e))?;

        match Value::decode(&data) {
            Ok(Value::OctetString(name)) if name.as_slice() == entry.code.bytes().as_slice() => {
                Ok(())
            }
            Ok(_) => Err(DlmsError::GetFailed {
                obis: entry.code,
                step: GetStep::Class,
                source: Box::new(DlmsError::UnexpectedObject {
                    requested: entry.code,
                }),
            }),
            Err(e) => Err(step_error(entry, GetStep::Class, e)),
        }
    }

    async fn value_step(&mut self, entry: &ObisEntry) -> Result<Value, DlmsError> {
        let data = self
            .get_attribute(entry, ATTR_VALUE)
            .await
            .map_err(|e| step_error(entry, GetStep::Value, e))?;
        Value::decode(&data).map_err(|e| step_error(entry, GetStep::Value, e))
    }

    /// Attribute 3. A missing scaler (non-success access result) or an
    /// unexpected shape falls back to scaler 0 with the catalogue unit;
    /// a unit that contradicts the catalogue is logged but not fatal.
    async fn scaler_step(&mut self, entry: &ObisEntry) -> Result<ScalerUnit, DlmsError> {
        let data = match self.get_attribute(entry, ATTR_SCALER_UNIT).await {
            Ok(data) => data,
            Err(DlmsError::AccessResult { code }) => {
                log_warn(&format!(
                    "{}: no scaler attribute (access result {code})",
                    entry.name
                ));
                return Ok(ScalerUnit::NONE);
            }
            Err(e) => return Err(step_error(entry, GetStep::ScalerUnit, e)),
        };

        let scaler_unit = Value::decode(&data)
            .ok()
            .as_ref()
            .and_then(ScalerUnit::from_value)
            .unwrap_or_else(|| {
                log_warn(&format!(
                    "{}: unrecognised scaler structure, assuming 0",
                    entry.name
                ));
                ScalerUnit::NONE
            });

        if !entry.unit.accepts_dlms_code(scaler_unit.unit) {
            log_warn(&format!(
                "{}: meter reports unit code {} but catalogue says {}",
                entry.name,
                scaler_unit.unit,
                entry.unit.label()
            ));
        }
        Ok(scaler_unit)
    }

    /// Attribute 5, extended registers only. Meters deliver the capture
    /// time either as a date-time or as a 12-byte octet string.
    async fn capture_time_step(&mut self, entry: &ObisEntry) -> Result<Option<DateTime>, DlmsError> {
        let data = match self.get_attribute(entry, ATTR_CAPTURE_TIME).await {
            Ok(data) => data,
            Err(DlmsError::AccessResult { code }) => {
                log_warn(&format!(
                    "{}: no capture time (access result {code})",
                    entry.name
                ));
                return Ok(None);
            }
            Err(e) => return Err(step_error(entry, GetStep::CaptureTime, e)),
        };

        match Value::decode(&data) {
            Ok(Value::DateTime(dt)) => Ok(Some(dt)),
            Ok(Value::OctetString(bytes)) if bytes.len() == 12 => {
                Ok(Some(DateTime::from_bytes(&bytes)))
            }
            _ => {
                log_warn(&format!("{}: capture time in unexpected format", entry.name));
                Ok(None)
            }
        }
    }

    /// One GET-Request/GET-Response exchange with the step retry policy:
    /// timeouts and CRC mismatches retry up to the configured limit on the
    /// same counter; a framing error retries once; everything else is
    /// returned as is. The counter advances on any verified response,
    /// including non-success access results.
    async fn get_attribute(&mut self, entry: &ObisEntry, attribute: u8) -> Result<Vec<u8>, DlmsError> {
        let apdu = encode_get_request(entry, attribute);
        let mut framing_retried = false;
        let mut attempt = 1u8;

        loop {
            self.link.send_apdu(self.counter.value(), &apdu).await?;
            match self.link.recv_frame().await {
                Ok(frame) => {
                    if !matches!(frame.control, Control::Info(_)) {
                        return Err(DlmsError::Framing(format!(
                            "expected an I-frame, got {:?}",
                            frame.control
                        )));
                    }
                    self.counter.advance();
                    let apdu = strip_llc_response(&frame.info)?;
                    return parse_get_response(apdu);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    log_warn(&format!(
                        "{} attribute {attribute} attempt {attempt} failed: {e}",
                        entry.name
                    ));
                    attempt += 1;
                }
                Err(DlmsError::Framing(reason)) if !framing_retried => {
                    log_warn(&format!(
                        "{} attribute {attribute}: {reason}, retrying once",
                        entry.name
                    ));
                    framing_retried = true;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn require_associated(&self) -> Result<(), DlmsError> {
        match self.state {
            SessionState::Associated | SessionState::Reading => Ok(()),
            _ => Err(DlmsError::NotAssociated),
        }
    }

    async fn pace(&self) {
        sleep(self.config.pacing).await;
    }
}

fn step_error(entry: &ObisEntry, step: GetStep, source: DlmsError) -> DlmsError {
    match source {
        // Already carries its context.
        DlmsError::GetFailed { .. } => source,
        source => DlmsError::GetFailed {
            obis: entry.code,
            step,
            source: Box::new(source),
        },
    }
}

/// `C0 01 C1 00 <class-id> <OBIS> <attribute> 00`: GET-Request-Normal with
/// the fixed invoke id this client uses and no access selector.
fn encode_get_request(entry: &ObisEntry, attribute: u8) -> Vec<u8> {
    let mut apdu = Vec::with_capacity(13);
    apdu.push(APDU_GET_REQUEST);
    apdu.push(0x01);
    apdu.push(APDU_INVOKE_ID);
    apdu.extend_from_slice(&entry.class.id().to_be_bytes());
    apdu.extend_from_slice(entry.code.bytes());
    apdu.push(attribute);
    apdu.push(0x00);
    apdu
}

/// Unwraps a GET-Response-Normal. The byte after the invoke id selects
/// data (0) or a data-access-result; anything non-zero is surfaced as an
/// access failure.
fn parse_get_response(apdu: &[u8]) -> Result<Vec<u8>, DlmsError> {
    if apdu.len() < 5 || apdu[0] != APDU_GET_RESPONSE || apdu[1] != 0x01 || apdu[2] != APDU_INVOKE_ID
    {
        return Err(DlmsError::Framing("not a GET response".into()));
    }
    match apdu[3] {
        0x00 => Ok(apdu[4..].to_vec()),
        0x01 => Err(DlmsError::AccessResult { code: apdu[4] }),
        code => Err(DlmsError::AccessResult { code }),
    }
}
