//! # crossdesk-core
//!
//! Shared library for CrossDesk containing the framed wire protocol, the JSON
//! payload models, and the in-process packet fan-out primitives.
//!
//! This crate is used by every CrossDesk node.  It owns no sockets: the
//! protocol module works over any `AsyncRead`/`AsyncWrite` pair, and the
//! messaging module is a pure in-process pub/sub layer.
//!
//! - **`protocol`** – How bytes travel over the network.  A message is a
//!   caller-assigned correlation id, an application-defined type tag, and an
//!   opaque payload, framed as a 12-byte big-endian header plus payload.
//!
//! - **`messaging`** – One producer, one queue, N consumers.  Every packet
//!   written to a [`messaging::PacketQueue`] is delivered to the private
//!   bounded queue of every subscribed [`messaging::PacketConsumer`], so
//!   independent subsystems can all observe the same stream without
//!   contending with one another or dropping packets.

pub mod messaging;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `crossdesk_core::Message` instead of `crossdesk_core::protocol::message::Message`.
pub use messaging::{PacketConsumer, PacketProducer, PacketQueue};
pub use protocol::codec::{
    decode_message, encode_message, read_message, write_message, ProtocolError,
    DEFAULT_MAX_PAYLOAD_BYTES, HEADER_SIZE,
};
pub use protocol::message::{CorrelationSource, Message, MessageType, PayloadError};
