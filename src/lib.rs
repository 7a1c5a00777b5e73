//! # dlms-rs - DLMS/COSEM meter reading over HDLC serial links
//!
//! This crate implements a DLMS/COSEM client for reading electricity
//! meters over an asynchronous serial line, as deployed on IS 15959 /
//! IEC 62056 three-phase meters with low-level (password) security.
//!
//! ## Features
//!
//! - HDLC framing with CRC-16/X.25 header and frame check sequences
//! - SNRM/UA and AARQ/AARE association handshake, DISC teardown
//! - Per-register GET transactions with scaler application and
//!   capture-time extraction
//! - A-XDR decoding of the COSEM common data types
//! - A fixed OBIS catalogue covering identification, cumulative energy,
//!   maximum demand, instantaneous values, and time-of-day tariffs
//! - A reading assembler that produces one [`MeterReading`] per cycle
//!
//! ## Usage
//!
//! ```no_run
//! use dlms_rs::{ClientConfig, MeterReader, SystemClock};
//! use dlms_rs::hdlc::serial::open_port;
//!
//! # async fn example() -> Result<(), dlms_rs::DlmsError> {
//! let config = ClientConfig::default();
//! let port = open_port("/dev/ttyUSB0", config.baud)?;
//! let mut reader = MeterReader::new(port, config, SystemClock);
//! let reading = reader.read_cycle().await?;
//! println!("{reading}");
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod cosem;
pub mod error;
pub mod hdlc;
pub mod logging;
pub mod obis;
pub mod reader;
pub mod reading;
pub mod util;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::ClientConfig;
pub use cosem::axdr::{DateTime, ScalerUnit, Value};
pub use cosem::get::RegisterValue;
pub use cosem::session::{Session, SessionState};
pub use error::{DlmsError, GetStep, HandshakePhase};
pub use hdlc::frame::{Control, HdlcFrame};
pub use hdlc::link::HdlcLink;
pub use hdlc::serial::MeterPort;
pub use logging::{init_logger, log_debug, log_error, log_info, log_warn};
pub use obis::{InterfaceClass, ObisCode, ObisEntry, Unit};
pub use reader::MeterReader;
pub use reading::{MaximumDemand, Measurement, MeterReading, TodZone};
