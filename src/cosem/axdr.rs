//! A-XDR decoding of COSEM data.
//!
//! Covers the subset of the xDLMS common data types the register catalogue
//! needs. Integers are big-endian; strings are length-prefixed with the
//! A-XDR length convention (a first byte up to 0x80 is the length itself,
//! 0x81 introduces one length byte, 0x82 two); date-times are the fixed
//! 12-byte COSEM layout. Unknown tags surface as a decode error rather
//! than being skipped.

use crate::error::DlmsError;
use std::fmt;

/// Data type tags.
pub const TAG_STRUCTURE: u8 = 0x02;
pub const TAG_DOUBLE_LONG: u8 = 0x05;
pub const TAG_DOUBLE_LONG_UNSIGNED: u8 = 0x06;
pub const TAG_OCTET_STRING: u8 = 0x09;
pub const TAG_VISIBLE_STRING: u8 = 0x0A;
pub const TAG_INTEGER: u8 = 0x0F;
pub const TAG_LONG: u8 = 0x10;
pub const TAG_UNSIGNED: u8 = 0x11;
pub const TAG_LONG_UNSIGNED: u8 = 0x12;
pub const TAG_ENUM: u8 = 0x16;
pub const TAG_DATE_TIME: u8 = 0x19;

/// A decoded COSEM value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    DoubleLongUnsigned(u32),
    DoubleLong(i32),
    LongUnsigned(u16),
    Long(i16),
    Unsigned(u8),
    Integer(i8),
    Enum(u8),
    OctetString(Vec<u8>),
    VisibleString(String),
    Structure(Vec<Value>),
    DateTime(DateTime),
}

impl Value {
    /// Decodes one value from the start of `data`.
    pub fn decode(data: &[u8]) -> Result<Value, DlmsError> {
        let mut pos = 0;
        decode_at(data, &mut pos)
    }

    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::DoubleLongUnsigned(v) => Some(v as f64),
            Value::DoubleLong(v) => Some(v as f64),
            Value::LongUnsigned(v) => Some(v as f64),
            Value::Long(v) => Some(v as f64),
            Value::Unsigned(v) => Some(v as f64),
            Value::Integer(v) => Some(v as f64),
            Value::Enum(v) => Some(v as f64),
            _ => None,
        }
    }

    /// String view: octet strings are interpreted as UTF-8, lossily.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::OctetString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            Value::VisibleString(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Encodes the value back to A-XDR. Used to build test and replay
    /// frames; the client itself only ever decodes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Value::DoubleLongUnsigned(v) => {
                out.push(TAG_DOUBLE_LONG_UNSIGNED);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Value::DoubleLong(v) => {
                out.push(TAG_DOUBLE_LONG);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Value::LongUnsigned(v) => {
                out.push(TAG_LONG_UNSIGNED);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Value::Long(v) => {
                out.push(TAG_LONG);
                out.extend_from_slice(&v.to_be_bytes());
            }
            Value::Unsigned(v) => {
                out.push(TAG_UNSIGNED);
                out.push(*v);
            }
            Value::Integer(v) => {
                out.push(TAG_INTEGER);
                out.push(*v as u8);
            }
            Value::Enum(v) => {
                out.push(TAG_ENUM);
                out.push(*v);
            }
            Value::OctetString(bytes) => {
                out.push(TAG_OCTET_STRING);
                encode_length(bytes.len(), out);
                out.extend_from_slice(bytes);
            }
            Value::VisibleString(s) => {
                out.push(TAG_VISIBLE_STRING);
                encode_length(s.len(), out);
                out.extend_from_slice(s.as_bytes());
            }
            Value::Structure(fields) => {
                out.push(TAG_STRUCTURE);
                encode_length(fields.len(), out);
                for field in fields {
                    field.encode_into(out);
                }
            }
            Value::DateTime(dt) => {
                out.push(TAG_DATE_TIME);
                out.extend_from_slice(&dt.to_bytes());
            }
        }
    }
}

fn decode_at(data: &[u8], pos: &mut usize) -> Result<Value, DlmsError> {
    let tag_offset = *pos;
    let tag = take_byte(data, pos, 0)?;
    match tag {
        TAG_DOUBLE_LONG_UNSIGNED => Ok(Value::DoubleLongUnsigned(u32::from_be_bytes(
            take_array(data, pos, tag)?,
        ))),
        TAG_DOUBLE_LONG => Ok(Value::DoubleLong(i32::from_be_bytes(take_array(
            data, pos, tag,
        )?))),
        TAG_LONG_UNSIGNED => Ok(Value::LongUnsigned(u16::from_be_bytes(take_array(
            data, pos, tag,
        )?))),
        TAG_LONG => Ok(Value::Long(i16::from_be_bytes(take_array(data, pos, tag)?))),
        TAG_UNSIGNED => Ok(Value::Unsigned(take_byte(data, pos, tag)?)),
        TAG_INTEGER => Ok(Value::Integer(take_byte(data, pos, tag)? as i8)),
        TAG_ENUM => Ok(Value::Enum(take_byte(data, pos, tag)?)),
        TAG_OCTET_STRING => {
            let len = decode_length(data, pos, tag)?;
            Ok(Value::OctetString(take_slice(data, pos, len, tag)?.to_vec()))
        }
        TAG_VISIBLE_STRING => {
            let len = decode_length(data, pos, tag)?;
            let bytes = take_slice(data, pos, len, tag)?;
            Ok(Value::VisibleString(
                String::from_utf8_lossy(bytes).into_owned(),
            ))
        }
        TAG_STRUCTURE => {
            let count = decode_length(data, pos, tag)?;
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                fields.push(decode_at(data, pos)?);
            }
            Ok(Value::Structure(fields))
        }
        TAG_DATE_TIME => {
            let bytes = take_slice(data, pos, 12, tag)?;
            Ok(Value::DateTime(DateTime::from_bytes(bytes)))
        }
        unknown => Err(DlmsError::Decode {
            tag: unknown,
            offset: tag_offset,
        }),
    }
}

fn take_byte(data: &[u8], pos: &mut usize, tag: u8) -> Result<u8, DlmsError> {
    let byte = *data.get(*pos).ok_or(DlmsError::Decode { tag, offset: *pos })?;
    *pos += 1;
    Ok(byte)
}

fn take_slice<'a>(
    data: &'a [u8],
    pos: &mut usize,
    len: usize,
    tag: u8,
) -> Result<&'a [u8], DlmsError> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or(DlmsError::Decode { tag, offset: *pos })?;
    let slice = &data[*pos..end];
    *pos = end;
    Ok(slice)
}

fn take_array<const N: usize>(
    data: &[u8],
    pos: &mut usize,
    tag: u8,
) -> Result<[u8; N], DlmsError> {
    let slice = take_slice(data, pos, N, tag)?;
    let mut arr = [0u8; N];
    arr.copy_from_slice(slice);
    Ok(arr)
}

/// A-XDR length: one byte up to 0x80, `0x81 nn` and `0x82 nn nn` beyond.
fn decode_length(data: &[u8], pos: &mut usize, tag: u8) -> Result<usize, DlmsError> {
    let first = take_byte(data, pos, tag)?;
    match first {
        0x00..=0x80 => Ok(first as usize),
        0x81 => Ok(take_byte(data, pos, tag)? as usize),
        0x82 => {
            let hi = take_byte(data, pos, tag)?;
            let lo = take_byte(data, pos, tag)?;
            Ok(((hi as usize) << 8) | lo as usize)
        }
        _ => Err(DlmsError::Decode {
            tag,
            offset: *pos - 1,
        }),
    }
}

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len <= 0x80 {
        out.push(len as u8);
    } else if len <= 0xFF {
        out.push(0x81);
        out.push(len as u8);
    } else {
        out.push(0x82);
        out.push((len >> 8) as u8);
        out.push(len as u8);
    }
}

/// COSEM date-time, 12 bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
    /// Deviation from local time in minutes; 0x8000 means unspecified.
    pub deviation: i16,
    pub clock_status: u8,
}

impl DateTime {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        DateTime {
            year: u16::from_be_bytes([bytes[0], bytes[1]]),
            month: bytes[2],
            day: bytes[3],
            day_of_week: bytes[4],
            hour: bytes[5],
            minute: bytes[6],
            second: bytes[7],
            hundredths: bytes[8],
            deviation: i16::from_be_bytes([bytes[9], bytes[10]]),
            clock_status: bytes[11],
        }
    }

    pub fn to_bytes(self) -> [u8; 12] {
        let year = self.year.to_be_bytes();
        let deviation = self.deviation.to_be_bytes();
        [
            year[0],
            year[1],
            self.month,
            self.day,
            self.day_of_week,
            self.hour,
            self.minute,
            self.second,
            self.hundredths,
            deviation[0],
            deviation[1],
            self.clock_status,
        ]
    }
}

impl fmt::Display for DateTime {
    /// Local time as `YYYY-MM-DD HH:MM:SS`; unspecified fields (0xFFFF
    /// year, 0xFF elsewhere) render as zero. The deviation is ignored.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unspec = |v: u8| if v == 0xFF { 0 } else { v };
        let year = if self.year == 0xFFFF { 0 } else { self.year };
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            year,
            unspec(self.month),
            unspec(self.day),
            unspec(self.hour),
            unspec(self.minute),
            unspec(self.second),
        )
    }
}

/// Scaler and unit of a register, attribute 3 of classes 3 and 4.
///
/// The scaler is a two's-complement i8 used as a base-10 exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalerUnit {
    pub scaler: i8,
    pub unit: u8,
}

impl ScalerUnit {
    /// Identity scaling with the unitless code.
    pub const NONE: ScalerUnit = ScalerUnit {
        scaler: 0,
        unit: 255,
    };

    /// Extracts scaler and unit from the decoded attribute-3 structure.
    ///
    /// Returns `None` when the shape does not match; some meter variants
    /// widen the scaler to a larger integer type, which is accepted as
    /// long as the value fits an i8.
    pub fn from_value(value: &Value) -> Option<ScalerUnit> {
        let Value::Structure(fields) = value else {
            return None;
        };
        if fields.len() != 2 {
            return None;
        }
        let scaler = match fields[0] {
            Value::Integer(s) => s,
            Value::Long(s) if (i8::MIN as i16..=i8::MAX as i16).contains(&s) => s as i8,
            Value::Unsigned(s) if s <= i8::MAX as u8 => s as i8,
            _ => return None,
        };
        let unit = match fields[1] {
            Value::Enum(u) | Value::Unsigned(u) => u,
            _ => return None,
        };
        Some(ScalerUnit { scaler, unit })
    }

    /// Applies the base-10 exponent to a raw register value.
    pub fn apply(&self, raw: f64) -> f64 {
        raw * 10f64.powi(self.scaler as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_double_long_unsigned() {
        // 20000 == 0x4E20
        let value = Value::decode(&[0x06, 0x00, 0x00, 0x4E, 0x20]).unwrap();
        assert_eq!(value, Value::DoubleLongUnsigned(20_000));
        assert_eq!(value.as_f64(), Some(20_000.0));
    }

    #[test]
    fn test_decode_signed_types() {
        assert_eq!(
            Value::decode(&[0x05, 0xFF, 0xFF, 0xFF, 0xFE]).unwrap(),
            Value::DoubleLong(-2)
        );
        assert_eq!(Value::decode(&[0x10, 0xFF, 0x9C]).unwrap(), Value::Long(-100));
        assert_eq!(Value::decode(&[0x0F, 0xFE]).unwrap(), Value::Integer(-2));
    }

    #[test]
    fn test_decode_octet_string() {
        let value = Value::decode(&[0x09, 0x08, b'M', b'2', b'0', b'2', b'5', b'0', b'0', b'1'])
            .unwrap();
        assert_eq!(value.as_string().as_deref(), Some("M2025001"));
    }

    #[test]
    fn test_decode_long_length_forms() {
        let mut data = vec![0x09, 0x81, 0x90];
        data.extend(std::iter::repeat(0x41).take(0x90));
        let Value::OctetString(bytes) = Value::decode(&data).unwrap() else {
            panic!("expected octet string");
        };
        assert_eq!(bytes.len(), 0x90);

        let mut data = vec![0x09, 0x82, 0x01, 0x10];
        data.extend(std::iter::repeat(0x42).take(0x110));
        let Value::OctetString(bytes) = Value::decode(&data).unwrap() else {
            panic!("expected octet string");
        };
        assert_eq!(bytes.len(), 0x110);
    }

    #[test]
    fn test_decode_structure() {
        // { integer(-2), enum(30) }
        let value = Value::decode(&[0x02, 0x02, 0x0F, 0xFE, 0x16, 0x1E]).unwrap();
        assert_eq!(
            value,
            Value::Structure(vec![Value::Integer(-2), Value::Enum(30)])
        );
    }

    #[test]
    fn test_unknown_tag_is_reported_with_offset() {
        let err = Value::decode(&[0x02, 0x01, 0x7F, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            DlmsError::Decode {
                tag: 0x7F,
                offset: 2
            }
        ));
    }

    #[test]
    fn test_truncated_payload_is_a_decode_error() {
        assert!(Value::decode(&[0x06, 0x00, 0x00]).is_err());
        assert!(Value::decode(&[0x09, 0x05, 0x41]).is_err());
    }

    #[test]
    fn test_roundtrip_supported_tags() {
        let values = [
            Value::DoubleLongUnsigned(123_456),
            Value::DoubleLong(-77),
            Value::LongUnsigned(5_500),
            Value::Long(-1_000),
            Value::Unsigned(9),
            Value::Integer(-3),
            Value::Enum(30),
            Value::OctetString(b"M2025001".to_vec()),
            Value::VisibleString("ACME".into()),
            Value::Structure(vec![Value::Integer(-1), Value::Enum(35)]),
        ];
        for value in values {
            assert_eq!(Value::decode(&value.encode()).unwrap(), value);
        }
    }

    #[test]
    fn test_datetime_decoding() {
        let raw = [
            0x07, 0xE9, 0x0A, 0x02, 0x03, 0x0C, 0x1E, 0x00, 0x00, 0x50, 0x78, 0x00,
        ];
        let dt = DateTime::from_bytes(&raw);
        assert_eq!(dt.year, 2025);
        assert_eq!(dt.month, 10);
        assert_eq!(dt.to_string(), "2025-10-02 12:30:00");
        assert_eq!(dt.to_bytes(), raw);
    }

    #[test]
    fn test_datetime_unspecified_fields_render_as_zero() {
        let raw = [
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x0C, 0x1E, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let dt = DateTime::from_bytes(&raw);
        assert_eq!(dt.to_string(), "0000-00-00 12:30:00");
    }

    #[test]
    fn test_scaler_unit_extraction() {
        let value = Value::Structure(vec![Value::Integer(-2), Value::Enum(30)]);
        let su = ScalerUnit::from_value(&value).unwrap();
        assert_eq!(su.scaler, -2);
        assert_eq!(su.unit, 30);
        assert_eq!(su.apply(20_000.0), 200.0);
    }

    #[test]
    fn test_scaler_high_bit_is_negative() {
        // 0xFE as two's complement i8 is -2.
        let value = Value::decode(&[0x02, 0x02, 0x0F, 0xFE, 0x16, 0x1E]).unwrap();
        assert_eq!(ScalerUnit::from_value(&value).unwrap().scaler, -2);
    }

    #[test]
    fn test_scaler_roundtrip_to_identity() {
        let up = ScalerUnit { scaler: 3, unit: 30 };
        let down = ScalerUnit { scaler: -3, unit: 30 };
        let original = 123_456.0;
        let roundtrip = down.apply(up.apply(original));
        assert!((roundtrip - original).abs() < f64::EPSILON * original);
        assert_eq!(ScalerUnit::NONE.apply(original), original);
    }

    #[test]
    fn test_scaler_from_wider_integer() {
        let value = Value::Structure(vec![Value::Long(-2), Value::Enum(30)]);
        assert_eq!(ScalerUnit::from_value(&value).unwrap().scaler, -2);
        let out_of_range = Value::Structure(vec![Value::Long(300), Value::Enum(30)]);
        assert!(ScalerUnit::from_value(&out_of_range).is_none());
    }
}
