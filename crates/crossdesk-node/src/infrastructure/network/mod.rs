//! Network infrastructure: the TCP transport endpoints.
//!
//! # Sub-modules
//!
//! - **`server`** – [`ServerEndpoint`](server::ServerEndpoint): binds a
//!   listener, accepts connections, and spins up one session task per client.
//!
//! - **`session`** – [`ServerSession`](session::ServerSession): the
//!   server-side handle to one accepted connection, with a bounded outbound
//!   queue drained by a dedicated writer loop.
//!
//! - **`client`** – [`ClientEndpoint`](client::ClientEndpoint): a single
//!   outbound connection with send/receive buffers and read/wait operations.
//!
//! - **`pump`** – the shared reader/writer loops both endpoint kinds are
//!   built from.
//!
//! # Concurrency model
//!
//! Every live connection maps to exactly two tasks — one reader, one writer —
//! that share nothing but a bounded `mpsc` queue.  Every blocking boundary
//! (socket read/write, queue push/pop) is a suspension point.  Cancellation is
//! cooperative and linked: endpoints derive child tokens from the caller's
//! token, sessions derive children from their endpoint, and cancelling any
//! level tears down everything beneath it exactly once.

use std::net::SocketAddr;

use crossdesk_core::protocol::message::PayloadError;
use thiserror::Error;

pub mod client;
pub(crate) mod pump;
pub mod server;
pub mod session;

pub use client::ClientEndpoint;
pub use server::{MessageHandler, ServerEndpoint, ServerHandle};
pub use session::ServerSession;

/// Capacity of each connection's outbound send buffer.
///
/// A full buffer suspends `send_message` callers (backpressure) rather than
/// dropping frames.
pub const SEND_BUFFER_CAPACITY: usize = 64;

/// Capacity of a client endpoint's inbound receive buffer.
///
/// When the application stops reading, the buffer fills and the reader pump
/// suspends, which in turn pushes backpressure onto the peer's socket.
pub const RECEIVE_BUFFER_CAPACITY: usize = 128;

/// Errors surfaced by the transport endpoints.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The listener could not be bound.
    #[error("bind failed on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The TCP connection to the server failed.
    #[error("failed to connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The connection is gone: the pumps have stopped and any buffered
    /// inbound messages have been consumed.
    #[error("connection closed")]
    ConnectionClosed,

    /// A response payload could not be encoded or decoded.
    #[error("payload error: {0}")]
    Payload(#[from] PayloadError),
}
