//! Byte transport and the framed layer on top of it.

use crate::codec::{Command, FrameDecoder, Inbound};
use crate::error::{Result, SweepError};
use crate::numeric::to_string;
use log::trace;
use std::time::{Duration, Instant};

/// Byte-level link to a device.
///
/// Implementations perform no retries; retry policy belongs to the session.
pub trait Transport: Send {
    /// Waits up to `timeout` for incoming bytes and returns what arrived.
    /// Fails with [`SweepError::Timeout`] when nothing arrived.
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Discards bytes received but not yet read.
    fn clear_input(&mut self) -> Result<()>;

    /// Releases the underlying handle. Calling it again does nothing.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Transport paired with the stream decoder.
pub struct FramedTransport {
    transport: Box<dyn Transport>,
    decoder: FrameDecoder,
}

impl FramedTransport {
    pub fn new(transport: Box<dyn Transport>) -> FramedTransport {
        FramedTransport {
            transport,
            decoder: FrameDecoder::new(),
        }
    }

    /// Returns the next inbound frame. Checksum and framing errors are
    /// returned as they are found; the decoder is already resynchronized
    /// when they reach the caller.
    pub fn read_frame(&mut self, timeout: Duration) -> Result<Inbound> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(inbound) = self.decoder.next_inbound() {
                return inbound;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(SweepError::Timeout);
            }
            match self.transport.read(remaining) {
                Ok(bytes) => self.decoder.extend(&bytes),
                // the transport may give up before the deadline
                Err(SweepError::Timeout) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub fn write_frame(&mut self, command: &Command) -> Result<()> {
        let bytes = command.encode();
        trace!("Sending {:?}: {}", command, to_string(&bytes));
        self.transport.write(&bytes)
    }

    pub fn clear_input(&mut self) -> Result<()> {
        self.decoder.clear();
        self.transport.clear_input()
    }

    pub fn close(&mut self) {
        self.decoder.clear();
        self.transport.close();
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }
}
