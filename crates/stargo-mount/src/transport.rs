//! Raw byte I/O with the mount controller
//!
//! The channel never flushes its input: the controller talks on its own, so
//! bytes that arrive between calls are kept and returned by the next
//! [`TransportChannel::receive`].

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout_at, Instant};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::trace;

use crate::error::TransportError;

/// Default baud rate of StarGo controllers
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial-like byte stream plus a buffer of bytes not yet returned
pub struct TransportChannel<T> {
    io: T,
    pending: Vec<u8>,
    max_frame_len: usize,
}

impl TransportChannel<SerialStream> {
    /// Open a serial port
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        max_frame_len: usize,
    ) -> Result<Self, tokio_serial::Error> {
        let stream = tokio_serial::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()?;
        Ok(Self::new(stream, max_frame_len))
    }
}

impl<T> TransportChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an I/O stream
    ///
    /// For tests and the virtual mount, use `DuplexStream` from
    /// `tokio::io::duplex()`.
    pub fn new(io: T, max_frame_len: usize) -> Self {
        Self {
            io,
            pending: Vec::with_capacity(max_frame_len),
            max_frame_len: max_frame_len.max(1),
        }
    }

    /// Write a command verbatim
    pub async fn transmit(&mut self, text: &str) -> Result<(), TransportError> {
        trace!("TX {:?}", text);
        self.io.write_all(text.as_bytes()).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Receive one frame ending in `terminator`, with the terminator stripped
    ///
    /// A zero `timeout` still picks up data that is already available but
    /// never waits for more. When `max_frame_len` bytes accumulate without a
    /// terminator, they are returned as they are.
    pub async fn receive(
        &mut self,
        terminator: u8,
        timeout: Duration,
    ) -> Result<String, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; 64];

        loop {
            if let Some(frame) = self.take_frame(terminator) {
                trace!("RX {:?}", frame);
                return Ok(frame);
            }

            match timeout_at(deadline, self.io.read(&mut buf)).await {
                Ok(Ok(0)) => return Err(TransportError::Closed),
                Ok(Ok(n)) => self.pending.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => return Err(TransportError::Io(e)),
                Err(_) => return Err(TransportError::Timeout),
            }
        }
    }

    /// Number of received bytes not yet returned as a frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_frame(&mut self, terminator: u8) -> Option<String> {
        let limit = self.pending.len().min(self.max_frame_len);
        if let Some(pos) = self.pending[..limit].iter().position(|&b| b == terminator) {
            let frame = String::from_utf8_lossy(&self.pending[..pos]).into_owned();
            self.pending.drain(..=pos);
            return Some(frame);
        }
        if self.pending.len() >= self.max_frame_len {
            let frame = String::from_utf8_lossy(&self.pending[..self.max_frame_len]).into_owned();
            self.pending.drain(..self.max_frame_len);
            return Some(frame);
        }
        None
    }
}
