//! Line-framed messaging over a pair of port sessions.
//!
//! A frame is any text followed by CR LF. Payloads are not escaped, so a
//! payload that itself contains CR LF ends the frame early on the receiving
//! side.
//!
//! The channel owns no ports. The controller owns both sessions and lends the
//! write side to [`MessageChannel::send`] and the read side to
//! [`MessageChannel::receive`].

use crate::port::PortError;
use crate::session::PortSession;
use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Bytes that end every frame.
pub const FRAME_TERMINATOR: &[u8; 2] = b"\r\n";

/// Capacity of each bounded read while accumulating a frame.
pub const READ_CHUNK_SIZE: usize = 255;

/// How `send` treats a short write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// One write call; a short count is logged but not retried.
    #[default]
    SingleAttempt,
    /// Keep writing until every byte of the frame has been accepted.
    WriteAll,
}

/// One received frame, verbatim: the terminator and anything read after it in
/// the same chunk are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFrame {
    raw: Vec<u8>,
}

impl LineFrame {
    /// Wire bytes for `text`: the text followed by CR LF.
    pub fn encode(text: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(text.len() + FRAME_TERMINATOR.len());
        bytes.extend_from_slice(text.as_bytes());
        bytes.extend_from_slice(FRAME_TERMINATOR);
        bytes
    }

    fn from_raw(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The whole frame as text, terminator included.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    /// Text before the first CR LF.
    pub fn payload(&self) -> Cow<'_, str> {
        let end = memmem::find(&self.raw, FRAME_TERMINATOR).unwrap_or(self.raw.len());
        String::from_utf8_lossy(&self.raw[..end])
    }
}

/// Result of a receive attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// A complete frame arrived.
    Frame(LineFrame),
    /// Nothing was pending; no read was issued.
    Empty,
}

/// Channel failures, each wrapping the port error behind it.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to send message: {0}")]
    Send(#[source] PortError),

    #[error("failed to query pending input: {0}")]
    Status(#[source] PortError),

    #[error("failed to read message: {0}")]
    Receive(#[source] PortError),

    #[error("no complete frame within {elapsed:?} ({received} bytes received)")]
    ReceiveTimeout { elapsed: Duration, received: usize },
}

impl ChannelError {
    /// The port error behind this failure, if any.
    pub fn port_error(&self) -> Option<&PortError> {
        match self {
            Self::Send(e) | Self::Status(e) | Self::Receive(e) => Some(e),
            Self::ReceiveTimeout { .. } => None,
        }
    }
}

/// Send/receive policy shared by every exchange in a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MessageChannel {
    write_mode: WriteMode,
    receive_deadline: Option<Duration>,
}

impl MessageChannel {
    /// `receive_deadline = None` lets a receive wait for the terminator
    /// indefinitely.
    pub fn new(write_mode: WriteMode, receive_deadline: Option<Duration>) -> Self {
        Self {
            write_mode,
            receive_deadline,
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    pub fn receive_deadline(&self) -> Option<Duration> {
        self.receive_deadline
    }

    /// Frame `text` and write it on `port`. Returns the bytes written.
    pub fn send(&self, port: &mut PortSession, text: &str) -> Result<usize, ChannelError> {
        let frame = LineFrame::encode(text);
        match self.write_mode {
            WriteMode::SingleAttempt => {
                let written = port.write(&frame).map_err(ChannelError::Send)?;
                if written < frame.len() {
                    warn!(
                        port = %port.id(),
                        written,
                        expected = frame.len(),
                        "short write; remaining bytes were not sent"
                    );
                }
                Ok(written)
            }
            WriteMode::WriteAll => {
                let mut written = 0;
                while written < frame.len() {
                    match port.write(&frame[written..]).map_err(ChannelError::Send)? {
                        0 => {
                            return Err(ChannelError::Send(PortError::Io(
                                std::io::ErrorKind::WriteZero.into(),
                            )))
                        }
                        n => written += n,
                    }
                }
                Ok(written)
            }
        }
    }

    /// Receive one frame from `port`.
    ///
    /// Returns [`ReceiveOutcome::Empty`] straight away when nothing is
    /// pending. Otherwise reads chunks until CR LF appears anywhere in what
    /// has been collected. Empty reads, read timeouts and transient I/O
    /// errors are logged and the loop keeps going; only the deadline (if any)
    /// or a lost handle ends it without a frame.
    pub fn receive(&self, port: &mut PortSession) -> Result<ReceiveOutcome, ChannelError> {
        let pending = port.bytes_pending().map_err(ChannelError::Status)?;
        if pending == 0 {
            return Ok(ReceiveOutcome::Empty);
        }
        debug!(port = %port.id(), pending, "receiving frame");

        let started = Instant::now();
        let mut collected: Vec<u8> = Vec::with_capacity(pending.max(READ_CHUNK_SIZE));
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            match port.read(&mut chunk) {
                Ok(0) => warn!(port = %port.id(), "read returned no data"),
                Ok(n) => {
                    // The terminator may straddle two chunks.
                    let search_from = collected.len().saturating_sub(FRAME_TERMINATOR.len() - 1);
                    collected.extend_from_slice(&chunk[..n]);
                    if memmem::find(&collected[search_from..], FRAME_TERMINATOR).is_some() {
                        return Ok(ReceiveOutcome::Frame(LineFrame::from_raw(collected)));
                    }
                }
                Err(e @ (PortError::NotOpen | PortError::Closed)) => {
                    return Err(ChannelError::Receive(e));
                }
                Err(e) if e.is_read_timeout() => {
                    debug!(port = %port.id(), received = collected.len(), "read timed out");
                }
                Err(e) => {
                    error!(port = %port.id(), os_code = ?e.os_code(), error = %e, "read failed");
                }
            }

            if let Some(limit) = self.receive_deadline {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(ChannelError::ReceiveTimeout {
                        elapsed,
                        received: collected.len(),
                    });
                }
            }
        }
    }
}
