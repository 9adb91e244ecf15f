//! Binary codec for framing CrossDesk messages on a byte stream.
//!
//! Wire format (one frame per message, no handshake, no version field):
//!
//! ```text
//! [correlation_id:4][message_type:4][payload_len:4][payload:N]
//! ```
//!
//! All three header fields are big-endian signed 32-bit integers; the header
//! is 12 bytes.
//!
//! Disconnect handling is uniform: any short read — at the header or inside
//! the payload — that ends before the expected byte count is reached yields
//! `Ok(None)` ("end of stream"), never an error.  Callers therefore have a
//! single disconnect signal for both orderly and abrupt peer closure.  A frame
//! that declares a negative payload length, or one larger than the caller's
//! maximum, is a [`ProtocolError::MalformedFrame`]: the frame is rejected
//! before any payload allocation and the connection should be closed.

use std::io::ErrorKind;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::message::Message;

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 12;

/// Default upper bound for a single frame's payload (64 MiB).
///
/// Screenshot frames are the largest legitimate traffic; anything beyond this
/// is treated as a malformed or hostile frame rather than an allocation
/// request.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The byte slice is shorter than a complete frame.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The frame header declares a payload length outside the valid range.
    #[error("malformed frame: declared payload length {declared} is outside 0..={max}")]
    MalformedFrame { declared: i64, max: usize },

    /// An I/O error other than peer disconnect occurred on the stream.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into a framed byte vector (12-byte header + payload).
///
/// Total and lossless for any correlation id, type tag, and payload that fits
/// the `i32` length field.
pub fn encode_message(message: &Message) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + message.payload.len());
    buf.extend_from_slice(&message.correlation_id.to_be_bytes());
    buf.extend_from_slice(&message.message_type.to_be_bytes());
    buf.extend_from_slice(&(message.payload.len() as i32).to_be_bytes());
    buf.extend_from_slice(&message.payload);
    buf
}

/// Writes one framed [`Message`] to `writer` and flushes it.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] when the payload does not fit
/// the `i32` length field, or [`ProtocolError::Io`] for stream failures.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    if message.payload.len() > i32::MAX as usize {
        return Err(ProtocolError::MalformedFrame {
            declared: message.payload.len() as i64,
            max: i32::MAX as usize,
        });
    }

    let frame = encode_message(message);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Reads one framed [`Message`] from `reader`.
///
/// Returns `Ok(None)` when the peer disconnects — that is, when the stream
/// ends (or resets) before a complete header-plus-payload has been read.
/// Truncation at any position is reported the same way; there is no separate
/// "partial frame" error.
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedFrame`] when the header declares a
/// negative payload length or one exceeding `max_payload`, and
/// [`ProtocolError::Io`] for stream failures that are not disconnects.
pub async fn read_message<R>(
    reader: &mut R,
    max_payload: usize,
) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    if !fill_buffer(reader, &mut header).await? {
        return Ok(None);
    }

    let correlation_id = i32::from_be_bytes([header[0], header[1], header[2], header[3]]);
    let message_type = i32::from_be_bytes([header[4], header[5], header[6], header[7]]);
    let payload_len = i32::from_be_bytes([header[8], header[9], header[10], header[11]]);

    // Validate before allocating: a hostile or corrupt header must never turn
    // into a multi-gigabyte allocation.
    if payload_len < 0 || payload_len as usize > max_payload {
        return Err(ProtocolError::MalformedFrame {
            declared: i64::from(payload_len),
            max: max_payload,
        });
    }

    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 && !fill_buffer(reader, &mut payload).await? {
        return Ok(None);
    }

    Ok(Some(Message {
        correlation_id,
        message_type,
        payload,
    }))
}

/// Decodes one frame from the beginning of an in-memory byte slice.
///
/// Returns the message and the number of bytes consumed so the caller can
/// advance a read cursor.  Used for already-buffered frames; streaming callers
/// use [`read_message`].
///
/// # Errors
///
/// Returns [`ProtocolError::InsufficientData`] when the slice is shorter than
/// the declared frame, and [`ProtocolError::MalformedFrame`] for a negative
/// declared length.
pub fn decode_message(bytes: &[u8]) -> Result<(Message, usize), ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let correlation_id = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let message_type = i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    let payload_len = i32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

    if payload_len < 0 {
        return Err(ProtocolError::MalformedFrame {
            declared: i64::from(payload_len),
            max: usize::MAX,
        });
    }

    let total = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total {
        return Err(ProtocolError::InsufficientData {
            needed: total,
            available: bytes.len(),
        });
    }

    let payload = bytes[HEADER_SIZE..total].to_vec();
    Ok((
        Message {
            correlation_id,
            message_type,
            payload,
        },
        total,
    ))
}

/// Reads from the stream until `buf` is full.
///
/// Returns `Ok(false)` when the stream ends (zero-byte read) or the peer
/// resets the connection before the buffer fills; short reads before that
/// point are retried transparently.
async fn fill_buffer<R>(reader: &mut R, buf: &mut [u8]) -> Result<bool, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(e) if is_disconnect(&e) => return Ok(false),
            Err(e) => return Err(ProtocolError::Io(e)),
        }
    }
    Ok(true)
}

/// Whether an I/O error represents the peer going away rather than a local
/// stream fault.
fn is_disconnect(error: &std::io::Error) -> bool {
    matches!(
        error.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
