//! Shared connection pumps: the reader and writer loops every endpoint runs.
//!
//! A writer pump drains a bounded `mpsc` queue in FIFO order and writes one
//! frame per message.  A reader pump decodes frames and forwards them into a
//! bounded queue.  Both loops watch a cancellation token and cancel it
//! themselves when the connection dies, so whichever side fails first brings
//! the other down with it.

use crossdesk_core::protocol::codec;
use crossdesk_core::Message;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Drains `outbound` and writes each message to the socket.
///
/// Ends when the queue closes, the token cancels, or a write fails; a write
/// failure cancels the token so the companion reader stops too.
pub(crate) async fn run_sender<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<Message>,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("sender pump cancelled");
                break;
            }
            next = outbound.recv() => match next {
                Some(message) => {
                    if let Err(e) = codec::write_message(&mut writer, &message).await {
                        warn!("sender pump stopping: {e}");
                        cancel.cancel();
                        break;
                    }
                }
                // All senders dropped; nothing more to write.
                None => break,
            }
        }
    }
}

/// Reads frames from the socket and forwards them into `inbound`.
///
/// Ends on peer disconnect (logged at info), a malformed frame (logged at
/// warn, connection closed), cancellation, or the receiving side going away.
pub(crate) async fn run_receiver<R>(
    mut reader: R,
    inbound: mpsc::Sender<Message>,
    cancel: CancellationToken,
    max_payload: usize,
) where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("receiver pump cancelled");
                break;
            }
            frame = codec::read_message(&mut reader, max_payload) => match frame {
                Ok(Some(message)) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = inbound.send(message) => {
                            if sent.is_err() {
                                // Receiver dropped; no one is reading any more.
                                break;
                            }
                        }
                    }
                }
                Ok(None) => {
                    info!("peer disconnected");
                    cancel.cancel();
                    break;
                }
                Err(e) => {
                    warn!("receiver pump stopping: {e}");
                    cancel.cancel();
                    break;
                }
            }
        }
    }
}
