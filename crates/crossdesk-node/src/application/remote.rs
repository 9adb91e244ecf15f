//! Correlated request/response queries against a remote node.
//!
//! [`RemoteMachine`] pairs a [`ClientEndpoint`] with a correlation-id source
//! and implements the request flow the diagnostic surfaces use: send a
//! request, then wait for the response echoing that request's correlation id.
//!
//! The underlying endpoint supports only one logical in-flight waiter, so
//! every query here takes `&mut self` — two concurrent queries on the same
//! `RemoteMachine` cannot compile, which is exactly the serialization the
//! transport contract asks callers to provide.

use std::net::SocketAddr;

use crossdesk_core::protocol::payloads::{
    MachineMatrixResponse, ScreenInfo, ScreenInfoResponse, ThumbnailRequest,
};
use crossdesk_core::{CorrelationSource, Message, MessageType};
use tracing::debug;

use crate::infrastructure::network::{ClientEndpoint, NetworkError};

/// A handle to one remote node, used to issue correlated queries.
pub struct RemoteMachine {
    endpoint: ClientEndpoint,
    correlation: CorrelationSource,
}

impl RemoteMachine {
    /// Connects to the remote node's transport port.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::ConnectFailed`] when the connection cannot be
    /// established.
    pub async fn connect(
        name: impl Into<String>,
        server_addr: SocketAddr,
    ) -> Result<Self, NetworkError> {
        let endpoint = ClientEndpoint::connect(name, server_addr).await?;
        Ok(Self::from_endpoint(endpoint))
    }

    /// Wraps an already-connected endpoint.
    pub fn from_endpoint(endpoint: ClientEndpoint) -> Self {
        Self {
            endpoint,
            correlation: CorrelationSource::new(),
        }
    }

    /// The underlying endpoint (e.g. to send fire-and-forget heartbeats).
    pub fn endpoint(&self) -> &ClientEndpoint {
        &self.endpoint
    }

    /// Round-trips an empty ping and waits for the matching response.
    pub async fn ping(&mut self) -> Result<(), NetworkError> {
        let correlation_id = self.correlation.next();
        self.endpoint
            .send_message(Message::new(correlation_id, MessageType::PingRequest))
            .await?;
        self.endpoint
            .wait_for_message(|m| {
                m.correlation_id == correlation_id
                    && m.message_type == i32::from(MessageType::PingResponse)
            })
            .await?;
        Ok(())
    }

    /// Fetches the remote node's machine matrix.
    pub async fn machine_matrix(&mut self) -> Result<Vec<String>, NetworkError> {
        let correlation_id = self.correlation.next();
        self.endpoint
            .send_message(Message::new(
                correlation_id,
                MessageType::MachineMatrixRequest,
            ))
            .await?;
        let reply = self
            .endpoint
            .wait_for_message(|m| {
                m.correlation_id == correlation_id
                    && m.message_type == i32::from(MessageType::MachineMatrixResponse)
            })
            .await?;
        let body: MachineMatrixResponse = reply.json_payload()?;
        Ok(body.matrix)
    }

    /// Enumerates the remote node's screens.
    pub async fn screens(&mut self) -> Result<Vec<ScreenInfo>, NetworkError> {
        let correlation_id = self.correlation.next();
        self.endpoint
            .send_message(Message::new(correlation_id, MessageType::ScreenInfoRequest))
            .await?;
        let reply = self
            .endpoint
            .wait_for_message(|m| {
                m.correlation_id == correlation_id
                    && m.message_type == i32::from(MessageType::ScreenInfoResponse)
            })
            .await?;
        let body: ScreenInfoResponse = reply.json_payload()?;
        Ok(body.screens)
    }

    /// Requests a thumbnail of a remote screen region and returns the encoded
    /// image bytes.
    ///
    /// The response is a start frame, one or more data frames, and a finish
    /// frame, all echoing the request's correlation id; data frame payloads
    /// are concatenated in arrival order, so a future chunking sender stays
    /// compatible.
    pub async fn thumbnail(&mut self, request: ThumbnailRequest) -> Result<Vec<u8>, NetworkError> {
        let correlation_id = self.correlation.next();
        self.endpoint
            .send_message(Message::with_json(
                correlation_id,
                MessageType::ScreenshotRequest,
                &request,
            )?)
            .await?;

        self.endpoint
            .wait_for_message(|m| {
                m.correlation_id == correlation_id
                    && m.message_type == i32::from(MessageType::ScreenshotStartResponse)
            })
            .await?;

        let mut image = Vec::new();
        loop {
            let frame = self
                .endpoint
                .wait_for_message(|m| {
                    m.correlation_id == correlation_id
                        && (m.message_type == i32::from(MessageType::ScreenshotDataResponse)
                            || m.message_type == i32::from(MessageType::ScreenshotFinishResponse))
                })
                .await?;
            if frame.message_type == i32::from(MessageType::ScreenshotFinishResponse) {
                break;
            }
            image.extend_from_slice(&frame.payload);
        }

        debug!(
            "thumbnail for screen {} received ({} bytes)",
            request.screen_id,
            image.len()
        );
        Ok(image)
    }
}
