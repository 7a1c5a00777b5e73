//! HDLC framing and transport for DLMS/COSEM over serial.

pub mod crc;
pub mod frame;
pub mod link;
pub mod serial;
pub mod serial_mock;

pub use frame::{Control, HdlcFrame};
pub use link::HdlcLink;
pub use serial::MeterPort;
