//! Mock serial port for testing the protocol stack without hardware.
//!
//! The mock captures everything written to it and answers from a script:
//! each write pops the next [`MockExchange`], which either queues response
//! bytes for the reader or stays silent so receive deadlines fire. Reads on
//! an empty buffer return `Poll::Pending`, letting `tokio::time::timeout`
//! drive the timeout paths deterministically under paused time.

use crate::hdlc::serial::MeterPort;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Scripted reaction to one outbound frame.
#[derive(Debug, Clone)]
pub enum MockExchange {
    /// Queue these bytes as the meter's response.
    Respond(Vec<u8>),
    /// Swallow the request; the client's receive deadline will expire.
    Silent,
}

#[derive(Default)]
struct MockState {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    script: VecDeque<MockExchange>,
    read_waker: Option<Waker>,
    dtr: bool,
}

/// In-memory [`MeterPort`] with a scripted request/response queue.
#[derive(Clone, Default)]
pub struct MockSerialPort {
    state: Arc<Mutex<MockState>>,
}

impl MockSerialPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes to be read without waiting for a write.
    pub fn queue_rx_data(&self, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.rx.extend(data);
        if let Some(waker) = state.read_waker.take() {
            waker.wake();
        }
    }

    /// Append an exchange to the script consumed by successive writes.
    pub fn script(&self, exchange: MockExchange) {
        self.state.lock().unwrap().script.push_back(exchange);
    }

    /// Everything the client has written so far.
    pub fn tx_data(&self) -> Vec<u8> {
        self.state.lock().unwrap().tx.clone()
    }

    /// Current level of the DTR wake line.
    pub fn dtr_asserted(&self) -> bool {
        self.state.lock().unwrap().dtr
    }

    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.rx.clear();
        state.tx.clear();
        state.script.clear();
    }
}

impl AsyncRead for MockSerialPort {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let mut state = self.state.lock().unwrap();
        if state.rx.is_empty() {
            state.read_waker = Some(cx.waker().clone());
            return Poll::Pending;
        }
        let available = state.rx.len().min(buf.remaining());
        let data: Vec<u8> = state.rx.drain(..available).collect();
        buf.put_slice(&data);
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockSerialPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut state = self.state.lock().unwrap();
        state.tx.extend_from_slice(buf);
        if let Some(exchange) = state.script.pop_front() {
            if let MockExchange::Respond(bytes) = exchange {
                state.rx.extend(bytes);
                if let Some(waker) = state.read_waker.take() {
                    waker.wake();
                }
            }
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl MeterPort for MockSerialPort {
    async fn flush_port(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn set_dtr(&mut self, asserted: bool) -> io::Result<()> {
        self.state.lock().unwrap().dtr = asserted;
        Ok(())
    }

    fn clear_rx(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().rx.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_queued_data_is_readable() {
        let mut port = MockSerialPort::new();
        port.queue_rx_data(&[0x7E, 0xA0]);
        let mut buf = [0u8; 2];
        port.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x7E, 0xA0]);
    }

    #[tokio::test]
    async fn test_write_pops_script() {
        use tokio::io::AsyncWriteExt;
        let mut port = MockSerialPort::new();
        port.script(MockExchange::Respond(vec![0x01]));
        port.write_all(&[0xFF, 0xFF]).await.unwrap();
        assert_eq!(port.tx_data(), vec![0xFF, 0xFF]);
        let mut buf = [0u8; 1];
        port.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x01]);
    }
}
