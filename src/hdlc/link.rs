//! HDLC link: frame-level send and bounded receive over a [`MeterPort`].
//!
//! The receive loop tokenises the byte stream into flag-delimited frames:
//! bytes are discarded until an opening `0x7E`, then collected until a
//! second flag arrives with more than four bytes buffered, so that
//! back-to-back flags between frames do not terminate a frame early. Every
//! received frame is CRC-verified and address-checked before it is handed
//! to the session layer.

use crate::config::ClientConfig;
use crate::constants::{DTR_WAKE_MS, HDLC_FLAG, LLC_REQUEST, MAX_FRAME_SIZE};
use crate::error::DlmsError;
use crate::hdlc::frame::{pack_frame, parse_frame, verify_frame, HdlcFrame};
use crate::hdlc::serial::MeterPort;
use crate::logging::log_debug;
use crate::util::hex::format_hex_compact;
use log::trace;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{sleep, timeout, Instant};

/// Frame-level transport bound to one serial port.
///
/// The port is exclusively owned for the lifetime of the link; nothing else
/// may read or write it while a session is open.
pub struct HdlcLink<P: MeterPort> {
    port: P,
    client_sap: u8,
    server_sap: u8,
    frame_timeout: Duration,
}

impl<P: MeterPort> HdlcLink<P> {
    pub fn new(port: P, config: &ClientConfig) -> Self {
        HdlcLink {
            port,
            client_sap: config.client_sap,
            server_sap: config.server_sap,
            frame_timeout: config.per_frame_timeout,
        }
    }

    /// Asserts the DTR wake line, waits for the meter's optical port to
    /// come up, and purges stale receive bytes.
    pub async fn wake(&mut self) -> Result<(), DlmsError> {
        self.port
            .set_dtr(true)
            .map_err(|e| DlmsError::SerialPort(e.to_string()))?;
        sleep(Duration::from_millis(DTR_WAKE_MS)).await;
        self.clear_rx()
    }

    /// Releases the wake line so the meter can power its port down.
    pub fn sleep_line(&mut self) -> Result<(), DlmsError> {
        self.port
            .set_dtr(false)
            .map_err(|e| DlmsError::SerialPort(e.to_string()))
    }

    pub fn clear_rx(&mut self) -> Result<(), DlmsError> {
        self.port
            .clear_rx()
            .map_err(|e| DlmsError::SerialPort(e.to_string()))
    }

    /// Packs and transmits one frame.
    pub async fn send_frame(&mut self, frame: &HdlcFrame) -> Result<(), DlmsError> {
        let data = pack_frame(frame);
        log_debug(&format!("TX {}", format_hex_compact(&data)));
        self.port
            .write_all(&data)
            .await
            .map_err(|e| DlmsError::SerialPort(e.to_string()))?;
        self.port
            .flush_port()
            .await
            .map_err(|e| DlmsError::SerialPort(e.to_string()))
    }

    /// Wraps a COSEM APDU in an I-frame (LLC header prepended) and sends it.
    pub async fn send_apdu(&mut self, counter: u8, apdu: &[u8]) -> Result<(), DlmsError> {
        let mut info = Vec::with_capacity(LLC_REQUEST.len() + apdu.len());
        info.extend_from_slice(&LLC_REQUEST);
        info.extend_from_slice(apdu);
        self.send_frame(&HdlcFrame::info(
            self.server_sap,
            self.client_sap,
            counter,
            info,
        ))
        .await
    }

    /// Receives one frame within the default per-frame deadline.
    pub async fn recv_frame(&mut self) -> Result<HdlcFrame, DlmsError> {
        let deadline = self.frame_timeout;
        self.recv_frame_within(deadline).await
    }

    /// Receives one frame within an explicit deadline.
    pub async fn recv_frame_within(&mut self, deadline: Duration) -> Result<HdlcFrame, DlmsError> {
        let raw = self.recv_raw(deadline).await?;
        log_debug(&format!("RX {}", format_hex_compact(&raw)));
        verify_frame(&raw)?;
        let (_, frame) =
            parse_frame(&raw).map_err(|e| DlmsError::Framing(format!("{e:?}")))?;

        if frame.dest != self.client_sap || frame.src != self.server_sap {
            return Err(DlmsError::Framing(format!(
                "address mismatch: dest {:#04x}, src {:#04x}",
                frame.dest, frame.src
            )));
        }
        Ok(frame)
    }

    async fn recv_raw(&mut self, deadline: Duration) -> Result<Vec<u8>, DlmsError> {
        let started = Instant::now();
        let mut buf: Vec<u8> = Vec::with_capacity(MAX_FRAME_SIZE);
        let mut in_frame = false;

        loop {
            let remaining = deadline
                .checked_sub(started.elapsed())
                .ok_or(DlmsError::TransportTimeout)?;

            let mut byte = [0u8; 1];
            let n = timeout(remaining, self.port.read(&mut byte))
                .await
                .map_err(|_| DlmsError::TransportTimeout)?
                .map_err(|e| DlmsError::SerialPort(e.to_string()))?;
            if n == 0 {
                return Err(DlmsError::SerialPort("port closed".into()));
            }
            let b = byte[0];

            if !in_frame {
                if b == HDLC_FLAG {
                    in_frame = true;
                    buf.push(b);
                } else {
                    trace!("discarding leading byte {b:#04x}");
                }
                continue;
            }

            if buf.len() >= MAX_FRAME_SIZE {
                return Err(DlmsError::Framing(format!(
                    "frame exceeds {MAX_FRAME_SIZE} bytes"
                )));
            }
            buf.push(b);

            if b == HDLC_FLAG {
                if buf.len() > 4 {
                    return Ok(buf);
                }
                // A closing flag of the previous frame doubling as our
                // opening flag; start over from this byte.
                buf.clear();
                buf.push(HDLC_FLAG);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdlc::frame::Control;
    use crate::hdlc::serial_mock::MockSerialPort;

    fn link_with(port: MockSerialPort) -> HdlcLink<MockSerialPort> {
        HdlcLink::new(port, &ClientConfig::default())
    }

    fn meter_frame(info: Vec<u8>) -> HdlcFrame {
        HdlcFrame::info(0x41, 0x03, 0x30, info)
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_tokenises_consecutive_frames() {
        let port = MockSerialPort::new();
        let a = meter_frame(vec![0xE6, 0xE7, 0x00, 0x01]);
        let b = meter_frame(vec![0xE6, 0xE7, 0x00, 0x02]);
        let mut stream = pack_frame(&a).to_vec();
        stream.extend_from_slice(&pack_frame(&b));
        port.queue_rx_data(&stream);

        let mut link = link_with(port);
        assert_eq!(link.recv_frame().await.unwrap(), a);
        assert_eq!(link.recv_frame().await.unwrap(), b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_discards_leading_noise() {
        let port = MockSerialPort::new();
        let frame = meter_frame(vec![0xE6, 0xE7, 0x00, 0x55]);
        let mut stream = vec![0x00, 0xFF, 0x13];
        stream.extend_from_slice(&pack_frame(&frame));
        port.queue_rx_data(&stream);

        let mut link = link_with(port);
        assert_eq!(link.recv_frame().await.unwrap(), frame);
    }

    #[tokio::test(start_paused = true)]
    async fn test_truncated_frame_times_out() {
        let port = MockSerialPort::new();
        let frame = meter_frame(vec![0xE6, 0xE7, 0x00, 0x55]);
        let packed = pack_frame(&frame);
        // Everything except the closing flag.
        port.queue_rx_data(&packed[..packed.len() - 1]);

        let mut link = link_with(port);
        assert!(matches!(
            link.recv_frame().await,
            Err(DlmsError::TransportTimeout)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_times_out() {
        let mut link = link_with(MockSerialPort::new());
        assert!(matches!(
            link.recv_frame().await,
            Err(DlmsError::TransportTimeout)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_corrupted_frame_is_a_crc_error() {
        let port = MockSerialPort::new();
        let frame = meter_frame(vec![0xE6, 0xE7, 0x00, 0x55]);
        let mut raw = pack_frame(&frame).to_vec();
        let info_pos = raw.len() - 4;
        raw[info_pos] ^= 0x01;
        port.queue_rx_data(&raw);

        let mut link = link_with(port);
        assert!(matches!(
            link.recv_frame().await,
            Err(DlmsError::Crc { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_address_mismatch_rejected() {
        let port = MockSerialPort::new();
        // Swapped SAPs: a frame addressed to someone else.
        let frame = HdlcFrame::info(0x03, 0x41, 0x30, vec![0xE6, 0xE7, 0x00]);
        port.queue_rx_data(&pack_frame(&frame));

        let mut link = link_with(port);
        assert!(matches!(
            link.recv_frame().await,
            Err(DlmsError::Framing(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_to_back_flags_between_frames() {
        let port = MockSerialPort::new();
        let frame = meter_frame(vec![0xE6, 0xE7, 0x00, 0x42]);
        // Closing flag of a previous exchange immediately before ours.
        let mut stream = vec![HDLC_FLAG];
        stream.extend_from_slice(&pack_frame(&frame));
        port.queue_rx_data(&stream);

        let mut link = link_with(port);
        let got = link.recv_frame().await.unwrap();
        assert_eq!(got.control, Control::Info(0x30));
        assert_eq!(got, frame);
    }
}
