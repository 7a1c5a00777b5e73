//! COSEM application layer: typed data, association, and GET transactions.

pub mod axdr;
pub mod get;
pub mod session;

pub use axdr::{DateTime, ScalerUnit, Value};
pub use get::RegisterValue;
pub use session::{Session, SessionState};
