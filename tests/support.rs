//! Shared helpers for the integration tests: canned meter-side frames and
//! a script builder that emulates a cooperative meter on the mock port.

#![allow(dead_code)]

use dlms_rs::constants::LLC_RESPONSE;
use dlms_rs::hdlc::frame::{pack_frame, Control, HdlcFrame};
use dlms_rs::hdlc::serial_mock::{MockExchange, MockSerialPort};
use dlms_rs::obis::ObisEntry;
use dlms_rs::{DateTime, Value};

/// Control byte the emulated meter uses on its I-frames.
pub const METER_INFO_CONTROL: u8 = 0x30;

/// Packs a meter-to-client I-frame around a COSEM APDU.
pub fn meter_apdu_frame(apdu: &[u8]) -> Vec<u8> {
    let mut info = LLC_RESPONSE.to_vec();
    info.extend_from_slice(apdu);
    pack_frame(&HdlcFrame::info(0x41, 0x03, METER_INFO_CONTROL, info)).to_vec()
}

/// UA answer to SNRM or DISC.
pub fn ua_frame() -> Vec<u8> {
    pack_frame(&HdlcFrame {
        dest: 0x41,
        src: 0x03,
        control: Control::Ua,
        info: Vec::new(),
    })
    .to_vec()
}

/// DM answer, a meter refusing the link.
pub fn dm_frame() -> Vec<u8> {
    pack_frame(&HdlcFrame {
        dest: 0x41,
        src: 0x03,
        control: Control::Dm,
        info: Vec::new(),
    })
    .to_vec()
}

/// Minimal AARE with the given association result.
pub fn aare_frame(result: u8) -> Vec<u8> {
    let mut apdu = vec![
        0x61, 0x1F, // AARE
        0xA1, 0x09, 0x06, 0x07, 0x60, 0x85, 0x74, 0x05, 0x08, 0x01, 0x01,
        0xA2, 0x03, 0x02, 0x01, result, // association-result
        0xA3, 0x05, 0xA1, 0x03, 0x02, 0x01, 0x00,
        0xBE, 0x06, 0x04, 0x04, 0x08, 0x00, 0x06, 0x5F,
    ];
    apdu[1] = (apdu.len() - 2) as u8;
    meter_apdu_frame(&apdu)
}

/// Successful GET response carrying an encoded value.
pub fn get_data_frame(value: &Value) -> Vec<u8> {
    let mut apdu = vec![0xC4, 0x01, 0xC1, 0x00];
    apdu.extend_from_slice(&value.encode());
    meter_apdu_frame(&apdu)
}

/// GET response with a non-success data-access-result.
pub fn get_access_error_frame(code: u8) -> Vec<u8> {
    meter_apdu_frame(&[0xC4, 0x01, 0xC1, 0x01, code])
}

/// Scripted meter on top of the mock port. Exchanges are queued in the
/// exact order the client issues requests.
#[derive(Clone, Default)]
pub struct ScriptedMeter {
    pub port: MockSerialPort,
}

impl ScriptedMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, frame: Vec<u8>) {
        self.port.script(MockExchange::Respond(frame));
    }

    pub fn silent(&self) {
        self.port.script(MockExchange::Silent);
    }

    /// UA for the SNRM, accepting AARE for the AARQ.
    pub fn handshake(&self) {
        self.respond(ua_frame());
        self.respond(aare_frame(0x00));
    }

    fn class_check(&self, entry: &ObisEntry) {
        self.respond(get_data_frame(&Value::OctetString(
            entry.code.bytes().to_vec(),
        )));
    }

    /// Class-1 object answering with a string value.
    pub fn string_object(&self, entry: &ObisEntry, value: &str) {
        self.class_check(entry);
        self.respond(get_data_frame(&Value::OctetString(
            value.as_bytes().to_vec(),
        )));
    }

    /// Class-1 object answering with a numeric value.
    pub fn data_object(&self, entry: &ObisEntry, value: Value) {
        self.class_check(entry);
        self.respond(get_data_frame(&value));
    }

    /// Class-3 register: class check, value, scaler/unit.
    pub fn register(&self, entry: &ObisEntry, raw: Value, scaler: i8, unit: u8) {
        self.class_check(entry);
        self.respond(get_data_frame(&raw));
        self.respond(get_data_frame(&Value::Structure(vec![
            Value::Integer(scaler),
            Value::Enum(unit),
        ])));
    }

    /// Class-4 register: adds the capture time as a 12-byte octet string.
    pub fn demand(&self, entry: &ObisEntry, raw: Value, scaler: i8, unit: u8, at: DateTime) {
        self.register(entry, raw, scaler, unit);
        self.respond(get_data_frame(&Value::OctetString(at.to_bytes().to_vec())));
    }
}

/// The capture time used by the maximum-demand scenarios:
/// 2025-10-02 12:30:00.
pub fn md_capture_time() -> DateTime {
    DateTime::from_bytes(&[
        0x07, 0xE9, 0x0A, 0x02, 0x03, 0x0C, 0x1E, 0x00, 0x00, 0x50, 0x78, 0x00,
    ])
}
