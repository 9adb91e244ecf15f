//! The outbound endpoint: one connection to a remote server.

use std::net::SocketAddr;

use crossdesk_core::protocol::codec::DEFAULT_MAX_PAYLOAD_BYTES;
use crossdesk_core::Message;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::infrastructure::network::{
    pump, NetworkError, RECEIVE_BUFFER_CAPACITY, SEND_BUFFER_CAPACITY,
};

/// A connected client: one TCP stream, a send buffer drained by a writer
/// pump, and a receive buffer filled by a reader pump.
///
/// `connect` makes a single connection attempt; reconnect policy belongs to
/// the caller.
pub struct ClientEndpoint {
    name: String,
    server_addr: SocketAddr,
    send_tx: mpsc::Sender<Message>,
    // Locked so that a read in progress has exclusive use of the stream of
    // inbound messages; see `wait_for_message` for the ordering consequences.
    recv_rx: Mutex<mpsc::Receiver<Message>>,
    cancel: CancellationToken,
}

impl ClientEndpoint {
    /// Connects to `server_addr` and starts the connection pumps.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ConnectFailed`] when the TCP connection cannot
    /// be established.
    pub async fn connect(
        name: impl Into<String>,
        server_addr: SocketAddr,
    ) -> Result<Self, NetworkError> {
        Self::connect_with(
            name,
            server_addr,
            DEFAULT_MAX_PAYLOAD_BYTES,
            &CancellationToken::new(),
        )
        .await
    }

    /// [`connect`](Self::connect) with an explicit payload limit and a caller
    /// cancellation token; the endpoint links its own token underneath it so
    /// either side can stop the pumps.
    pub async fn connect_with(
        name: impl Into<String>,
        server_addr: SocketAddr,
        max_payload: usize,
        shutdown: &CancellationToken,
    ) -> Result<Self, NetworkError> {
        let name = name.into();

        info!("client {name}: connecting to {server_addr}");
        let stream = TcpStream::connect(server_addr)
            .await
            .map_err(|source| NetworkError::ConnectFailed {
                addr: server_addr,
                source,
            })?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("client {name}: could not set TCP_NODELAY: {e}");
        }
        info!("client {name}: connected to {server_addr}");

        let cancel = shutdown.child_token();
        let (read_half, write_half) = stream.into_split();
        let (send_tx, send_rx) = mpsc::channel(SEND_BUFFER_CAPACITY);
        let (recv_tx, recv_rx) = mpsc::channel(RECEIVE_BUFFER_CAPACITY);

        tokio::spawn(pump::run_sender(write_half, send_rx, cancel.clone()));
        tokio::spawn(pump::run_receiver(
            read_half,
            recv_tx,
            cancel.clone(),
            max_payload,
        ));

        Ok(Self {
            name,
            server_addr,
            send_tx,
            recv_rx: Mutex::new(recv_rx),
            cancel,
        })
    }

    /// Name of this endpoint, for logs and diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the server this endpoint connected to.
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Enqueues a message on the send buffer, suspending only while the
    /// buffer is full.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ConnectionClosed`] once the writer pump has
    /// stopped.
    pub async fn send_message(&self, message: Message) -> Result<(), NetworkError> {
        self.send_tx
            .send(message)
            .await
            .map_err(|_| NetworkError::ConnectionClosed)
    }

    /// Dequeues the next inbound message in arrival order, suspending until
    /// one is available.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ConnectionClosed`] once the pumps have stopped
    /// and the receive buffer is empty; messages buffered before a disconnect
    /// are still delivered first.
    pub async fn read_message(&self) -> Result<Message, NetworkError> {
        let mut rx = self.recv_rx.lock().await;
        rx.recv().await.ok_or(NetworkError::ConnectionClosed)
    }

    /// Dequeues messages until one matches `predicate`, discarding the rest.
    ///
    /// Non-matching messages consumed while waiting are **not** requeued, so
    /// a client endpoint supports one logical in-flight waiter: concurrent
    /// waiters racing on different predicates steal each other's messages.
    /// Callers needing multiplexed request/response matching must serialize
    /// their waits or build a demultiplexer on top.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ConnectionClosed`] if the connection ends
    /// before a match arrives.
    pub async fn wait_for_message<P>(&self, predicate: P) -> Result<Message, NetworkError>
    where
        P: Fn(&Message) -> bool,
    {
        loop {
            let message = self.read_message().await?;
            if predicate(&message) {
                return Ok(message);
            }
            trace!(
                "client {}: discarding non-matching message (correlation {}, type {})",
                self.name,
                message.correlation_id,
                message.message_type
            );
        }
    }

    /// Requests teardown of the connection pumps.  Idempotent.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }
}

impl Drop for ClientEndpoint {
    fn drop(&mut self) {
        // The pumps hold clones of the token; without this they would keep
        // the socket alive until the peer closes it.
        self.cancel.cancel();
    }
}
