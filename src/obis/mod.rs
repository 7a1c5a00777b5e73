//! OBIS identifiers and the fixed register catalogue.

pub mod catalogue;
pub mod code;

pub use code::{InterfaceClass, ObisCode, Unit};
pub use catalogue::ObisEntry;
