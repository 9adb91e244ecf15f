//! The request service: the message handler registered with the server
//! endpoint.
//!
//! Each inbound request is answered on the session it arrived on, echoing the
//! request's correlation id so the requester can pair the response.  The
//! screenshot reply is a three-frame sequence — an empty start frame, one
//! data frame carrying the encoded image bytes, and an empty finish frame.
//! A single data frame is always sent today; the start/finish framing is the
//! extension point for chunked transfers of oversized captures.
//!
//! Heartbeats carry no reply.  They are broadcast onto the service's event
//! queue instead, so any number of in-process consumers (diagnostics, idle
//! detection, …) can observe the stream without contending with the
//! transport.

use std::sync::Arc;

use async_trait::async_trait;
use crossdesk_core::protocol::payloads::{MachineMatrixResponse, ScreenInfoResponse};
use crossdesk_core::{Message, MessageType, PacketProducer, PacketQueue};
use tracing::debug;

use crate::application::providers::{MachineMatrixSource, ScreenSource};
use crate::infrastructure::network::{MessageHandler, ServerSession};

/// Answers transport requests using injected topology and screen sources.
pub struct ApiService {
    topology: Arc<dyn MachineMatrixSource>,
    screens: Arc<dyn ScreenSource>,
    events: PacketProducer<Message>,
}

impl ApiService {
    pub fn new(topology: Arc<dyn MachineMatrixSource>, screens: Arc<dyn ScreenSource>) -> Self {
        Self {
            topology,
            screens,
            events: PacketProducer::new(),
        }
    }

    /// The queue heartbeat messages are fanned out on; subscribe consumers
    /// here to observe them.
    pub fn event_queue(&self) -> &Arc<PacketQueue<Message>> {
        self.events.queue()
    }

    async fn handle_screenshot(
        &self,
        session: &ServerSession,
        request: Message,
    ) -> anyhow::Result<()> {
        let thumbnail_request = request.json_payload()?;
        let image = self.screens.render_thumbnail(&thumbnail_request)?;

        session
            .send_message(Message::new(
                request.correlation_id,
                MessageType::ScreenshotStartResponse,
            ))
            .await?;
        session
            .send_message(Message::with_payload(
                request.correlation_id,
                MessageType::ScreenshotDataResponse,
                image,
            ))
            .await?;
        session
            .send_message(Message::new(
                request.correlation_id,
                MessageType::ScreenshotFinishResponse,
            ))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MessageHandler for ApiService {
    async fn handle(&self, session: &ServerSession, message: Message) -> anyhow::Result<()> {
        let message_type = MessageType::try_from(message.message_type)
            .map_err(|_| anyhow::anyhow!("unhandled message type {}", message.message_type))?;

        match message_type {
            MessageType::Heartbeat => {
                debug!(
                    "session {}: heartbeat (correlation {})",
                    session.id(),
                    message.correlation_id
                );
                self.events.write(message).await;
            }
            MessageType::PingRequest => {
                session
                    .send_message(Message::new(
                        message.correlation_id,
                        MessageType::PingResponse,
                    ))
                    .await?;
            }
            MessageType::MachineMatrixRequest => {
                let body = MachineMatrixResponse {
                    matrix: self.topology.machine_matrix(),
                };
                session
                    .send_message(Message::with_json(
                        message.correlation_id,
                        MessageType::MachineMatrixResponse,
                        &body,
                    )?)
                    .await?;
            }
            MessageType::ScreenInfoRequest => {
                let body = ScreenInfoResponse {
                    screens: self.screens.screens(),
                };
                session
                    .send_message(Message::with_json(
                        message.correlation_id,
                        MessageType::ScreenInfoResponse,
                        &body,
                    )?)
                    .await?;
            }
            MessageType::ScreenshotRequest => {
                self.handle_screenshot(session, message).await?;
            }
            // Response tags arriving at a server are a peer defect; treat
            // them like unknown tags so the session ends.
            other => anyhow::bail!("unexpected message type {other:?} on server session"),
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
