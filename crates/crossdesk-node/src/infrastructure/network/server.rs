//! The listening endpoint: accepts connections and supervises sessions.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use crossdesk_core::protocol::codec::DEFAULT_MAX_PAYLOAD_BYTES;
use crossdesk_core::Message;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::infrastructure::network::session::{run_session, ServerSession};
use crate::infrastructure::network::NetworkError;

/// The single registered callback a [`ServerEndpoint`] delivers inbound
/// messages to.
///
/// Invoked once per decoded message, in the order frames were read off that
/// session's socket.  Messages from different sessions are dispatched
/// concurrently with no cross-session ordering.  Returning an error
/// terminates the calling session only; other sessions and the endpoint keep
/// running.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, session: &ServerSession, message: Message) -> anyhow::Result<()>;
}

/// A TCP listener that turns each accepted connection into a
/// [`ServerSession`] driven on its own task.
///
/// The accept loop never blocks on an individual client.  Construction takes
/// the one message handler for the endpoint's whole lifetime — there is no
/// add/remove-listener registration, so dispatch order is never ambiguous.
pub struct ServerEndpoint {
    name: Arc<str>,
    bind_addr: SocketAddr,
    handler: Arc<dyn MessageHandler>,
    max_payload: usize,
}

impl ServerEndpoint {
    /// Creates an endpoint that will listen on `bind_addr` and dispatch every
    /// inbound message to `handler`.
    pub fn new(
        name: impl Into<String>,
        bind_addr: SocketAddr,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            name: Arc::from(name.into()),
            bind_addr,
            handler,
            max_payload: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }

    /// Overrides the maximum accepted frame payload size.
    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Binds the listener and starts accepting until cancelled.
    ///
    /// The endpoint derives a child token from `shutdown`, and every session
    /// derives a child from the endpoint's token: either the caller or the
    /// returned [`ServerHandle`] can stop the whole tree, and stopping twice
    /// is harmless.  Shutdown is best effort — in-flight sessions observe the
    /// cancellation at their next suspension point rather than being torn
    /// down synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::BindFailed`] when the address cannot be bound.
    pub async fn start(self, shutdown: &CancellationToken) -> Result<ServerHandle, NetworkError> {
        let listener = TcpListener::bind(self.bind_addr)
            .await
            .map_err(|source| NetworkError::BindFailed {
                addr: self.bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| NetworkError::BindFailed {
            addr: self.bind_addr,
            source,
        })?;

        info!("server {}: listening on {local_addr}", self.name);

        let cancel = shutdown.child_token();
        let task = tokio::spawn(accept_loop(
            listener,
            self.name,
            self.handler,
            cancel.clone(),
            self.max_payload,
        ));

        Ok(ServerHandle {
            local_addr,
            cancel,
            task,
        })
    }
}

/// Supervision handle for a started [`ServerEndpoint`].
pub struct ServerHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the listener actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests shutdown of the accept loop and all sessions.  Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Waits for the accept loop to finish.
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

async fn accept_loop(
    listener: TcpListener,
    name: Arc<str>,
    handler: Arc<dyn MessageHandler>,
    cancel: CancellationToken,
    max_payload: usize,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("server {name}: listener stopping");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    info!("server {name}: client connection accepted from {peer_addr}");
                    tokio::spawn(run_session(
                        stream,
                        peer_addr,
                        Arc::clone(&name),
                        Arc::clone(&handler),
                        cancel.child_token(),
                        max_payload,
                    ));
                }
                Err(e) => {
                    // Transient accept failures (e.g. EMFILE) should not kill
                    // the listener.
                    warn!("server {name}: accept failed: {e}");
                }
            }
        }
    }
}
