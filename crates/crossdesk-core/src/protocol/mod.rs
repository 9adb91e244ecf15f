//! Protocol module containing the message model, the frame codec, and the
//! JSON payload structs exchanged between nodes.

pub mod codec;
pub mod message;
pub mod payloads;

pub use codec::{decode_message, encode_message, read_message, write_message, ProtocolError};
pub use message::{CorrelationSource, Message, MessageType, PayloadError};
