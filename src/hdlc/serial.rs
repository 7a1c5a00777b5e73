//! Serial port seam for the HDLC link.
//!
//! The link is generic over [`MeterPort`] so the protocol stack can run
//! against a real UART or the in-memory mock. The real implementation wraps
//! `tokio_serial::SerialStream`; optical probes and RS-232 adapters both
//! present as plain serial devices.

use crate::error::DlmsError;
use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};

/// Byte-stream transport to the meter, plus the line controls the
/// protocol needs: DTR for the wake signal and an RX purge before SNRM.
#[async_trait]
pub trait MeterPort: AsyncRead + AsyncWrite + Unpin + Send {
    async fn flush_port(&mut self) -> io::Result<()>;

    /// Drives the DTR wake line. `asserted` follows protocol polarity;
    /// the adapter hardware inverts it to the active-low level.
    fn set_dtr(&mut self, asserted: bool) -> io::Result<()>;

    /// Discards any bytes already buffered on the receive side.
    fn clear_rx(&mut self) -> io::Result<()>;
}

#[async_trait]
impl MeterPort for SerialStream {
    async fn flush_port(&mut self) -> io::Result<()> {
        AsyncWriteExt::flush(self).await
    }

    fn set_dtr(&mut self, asserted: bool) -> io::Result<()> {
        self.write_data_terminal_ready(asserted)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_rx(&mut self) -> io::Result<()> {
        self.clear(tokio_serial::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}

/// Opens a serial port at 8N1 with the given rate.
pub fn open_port(path: &str, baud: u32) -> Result<SerialStream, DlmsError> {
    tokio_serial::new(path, baud)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .open_native_async()
        .map_err(|e| DlmsError::SerialPort(e.to_string()))
}
