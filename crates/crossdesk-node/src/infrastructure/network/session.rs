//! The server-side handle to one accepted client connection.

use std::net::SocketAddr;
use std::sync::Arc;

use crossdesk_core::protocol::codec;
use crossdesk_core::Message;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::infrastructure::network::server::MessageHandler;
use crate::infrastructure::network::{pump, NetworkError, SEND_BUFFER_CAPACITY};

/// One accepted client connection.
///
/// The session owns the connection's bounded outbound queue; a dedicated
/// writer loop drains it in FIFO order, so messages from one logical caller
/// are never reordered.  Handlers receive the session alongside each inbound
/// message and use it to reply.
pub struct ServerSession {
    id: Uuid,
    peer_addr: SocketAddr,
    outbound: mpsc::Sender<Message>,
    cancel: CancellationToken,
}

impl ServerSession {
    pub(crate) fn new(
        peer_addr: SocketAddr,
        outbound: mpsc::Sender<Message>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer_addr,
            outbound,
            cancel,
        }
    }

    /// Identifier for this session in logs and diagnostics.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Address of the connected peer.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Enqueues a message on the session's outbound queue.
    ///
    /// Suspends only while the queue is full (backpressure); order relative
    /// to other `send_message` calls from the same caller sequence is
    /// preserved.  Messages still enqueued when the session tears down are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ConnectionClosed`] once the session's writer
    /// loop has stopped.
    pub async fn send_message(&self, message: Message) -> Result<(), NetworkError> {
        self.outbound
            .send(message)
            .await
            .map_err(|_| NetworkError::ConnectionClosed)
    }

    /// Requests teardown of this session.  Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

/// Runs one accepted connection to completion.
///
/// Spawns the writer pump, then reads frames and dispatches each one to the
/// endpoint's handler in socket order.  Teardown happens exactly once, on
/// whichever comes first: peer disconnect, a malformed frame, a handler
/// error, or cancellation.
pub(crate) async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    server_name: Arc<str>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
    max_payload: usize,
) {
    // Input traffic is latency-sensitive; losing Nagle batching is fine.
    if let Err(e) = stream.set_nodelay(true) {
        debug!("server {server_name}: could not set TCP_NODELAY: {e}");
    }

    let (mut read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(SEND_BUFFER_CAPACITY);
    let session = Arc::new(ServerSession::new(peer_addr, outbound_tx, cancel.clone()));

    info!(
        "server {server_name}: session {} started for {peer_addr}",
        session.id()
    );

    let writer = tokio::spawn(pump::run_sender(write_half, outbound_rx, cancel.clone()));

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("server {server_name}: session {} cancelled", session.id());
                break;
            }
            frame = codec::read_message(&mut read_half, max_payload) => match frame {
                Ok(Some(message)) => {
                    if let Err(e) = handler.handle(session.as_ref(), message).await {
                        error!(
                            "server {server_name}: handler failed on session {}: {e:#}",
                            session.id()
                        );
                        break;
                    }
                }
                Ok(None) => {
                    info!(
                        "server {server_name}: session {} peer disconnected",
                        session.id()
                    );
                    break;
                }
                Err(e) => {
                    warn!(
                        "server {server_name}: session {} closing on protocol fault: {e}",
                        session.id()
                    );
                    break;
                }
            }
        }
    }

    // Stop the writer and release the socket; cancelling twice is harmless.
    cancel.cancel();
    let _ = writer.await;
    info!(
        "server {server_name}: session {} finished",
        session.id()
    );
}
