//! The message model: the immutable unit exchanged over the wire.
//!
//! A [`Message`] is a caller-assigned correlation id, an application-defined
//! type tag, and an opaque payload.  The transport layer never interprets the
//! type tag or the payload; the tag only becomes meaningful once the
//! application layer converts it back into a [`MessageType`].
//!
//! Payloads for request/response bodies are UTF-8 JSON ([`Message::with_json`]
//! / [`Message::json_payload`]); screenshot data frames carry raw image bytes
//! directly.

use std::sync::atomic::{AtomicI32, Ordering};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised when converting between typed payload structs and the opaque
/// payload bytes carried by a [`Message`].
#[derive(Debug, Error)]
pub enum PayloadError {
    /// The payload struct could not be serialized to JSON.
    #[error("failed to serialize payload to JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The payload bytes could not be parsed as the requested type.
    #[error("failed to parse payload JSON: {0}")]
    Deserialize(#[source] serde_json::Error),
}

// ── Message type tags ─────────────────────────────────────────────────────────

/// Application-defined message type tags.
///
/// On the wire this is a plain `i32`; the transport core moves the raw tag
/// without interpreting it.  Requests echo their correlation id back in the
/// matching response so a caller can pair answers out of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MessageType {
    Heartbeat = 0,

    PingRequest = 1,
    PingResponse = 2,

    MachineMatrixRequest = 3,
    MachineMatrixResponse = 4,

    ScreenInfoRequest = 5,
    ScreenInfoResponse = 6,

    ScreenshotRequest = 7,
    ScreenshotStartResponse = 8,
    ScreenshotDataResponse = 9,
    ScreenshotFinishResponse = 10,
}

impl From<MessageType> for i32 {
    fn from(value: MessageType) -> Self {
        value as i32
    }
}

impl TryFrom<i32> for MessageType {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, ()> {
        match value {
            0 => Ok(MessageType::Heartbeat),
            1 => Ok(MessageType::PingRequest),
            2 => Ok(MessageType::PingResponse),
            3 => Ok(MessageType::MachineMatrixRequest),
            4 => Ok(MessageType::MachineMatrixResponse),
            5 => Ok(MessageType::ScreenInfoRequest),
            6 => Ok(MessageType::ScreenInfoResponse),
            7 => Ok(MessageType::ScreenshotRequest),
            8 => Ok(MessageType::ScreenshotStartResponse),
            9 => Ok(MessageType::ScreenshotDataResponse),
            10 => Ok(MessageType::ScreenshotFinishResponse),
            _ => Err(()),
        }
    }
}

// ── Message ───────────────────────────────────────────────────────────────────

/// The immutable unit exchanged over the wire.
///
/// `correlation_id` is caller-assigned and not required to be unique; its only
/// contract is that a response SHOULD echo the correlation id of the request
/// it answers.  An empty `payload` is encoded as payload length 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Caller-assigned id used to pair a response with its request.
    pub correlation_id: i32,
    /// Application-defined type tag, opaque to the transport.
    pub message_type: i32,
    /// Opaque payload bytes; empty means "no payload".
    pub payload: Vec<u8>,
}

impl Message {
    /// Creates a message with an empty payload.
    pub fn new(correlation_id: i32, message_type: impl Into<i32>) -> Self {
        Self {
            correlation_id,
            message_type: message_type.into(),
            payload: Vec::new(),
        }
    }

    /// Creates a message carrying raw payload bytes.
    pub fn with_payload(
        correlation_id: i32,
        message_type: impl Into<i32>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            correlation_id,
            message_type: message_type.into(),
            payload,
        }
    }

    /// Creates a message whose payload is the JSON encoding of `payload`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Serialize`] if the value cannot be encoded.
    pub fn with_json<T: Serialize>(
        correlation_id: i32,
        message_type: impl Into<i32>,
        payload: &T,
    ) -> Result<Self, PayloadError> {
        let bytes = serde_json::to_vec(payload).map_err(PayloadError::Serialize)?;
        Ok(Self::with_payload(correlation_id, message_type, bytes))
    }

    /// Parses the payload bytes as JSON into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Deserialize`] if the payload is not valid JSON
    /// for the requested type.
    pub fn json_payload<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        serde_json::from_slice(&self.payload).map_err(PayloadError::Deserialize)
    }

    /// Returns `true` when the message carries no payload bytes.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ── Correlation id source ─────────────────────────────────────────────────────

/// A thread-safe source of caller-assigned correlation ids.
///
/// Ids start at 0, increment by 1, and wrap at `i32::MAX` without panicking.
/// Uniqueness is best effort (the protocol does not enforce it); the counter
/// exists so that a single requester never reuses an id for two in-flight
/// requests.
///
/// `Ordering::Relaxed` is sufficient: correlation ids are only compared for
/// equality, never used for cross-thread memory synchronisation.
#[derive(Debug, Default)]
pub struct CorrelationSource {
    inner: AtomicI32,
}

impl CorrelationSource {
    /// Creates a new source starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next correlation id and advances the counter.
    pub fn next(&self) -> i32 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
