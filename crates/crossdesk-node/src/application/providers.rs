//! Collaborator traits consumed by the request service.
//!
//! The original system reached for process-global state for both of these;
//! here they are injected dependencies so the service (and the transport
//! underneath it) can be tested against fakes.

use crossdesk_core::protocol::payloads::{ScreenInfo, ThumbnailRequest};
use thiserror::Error;

/// Errors raised by a [`ScreenSource`] when rendering a thumbnail.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThumbnailError {
    /// The requested screen id does not exist on this machine.
    #[error("screen {0} not found")]
    ScreenNotFound(i32),

    /// This screen source cannot render thumbnails.
    #[error("thumbnail capture is not supported by this screen source")]
    Unsupported,
}

/// Supplies the machine matrix: the ordered list of peer machine names this
/// node knows about.
#[cfg_attr(test, mockall::automock)]
pub trait MachineMatrixSource: Send + Sync {
    fn machine_matrix(&self) -> Vec<String>;
}

/// A fixed machine matrix, typically loaded from configuration.
pub struct StaticMachineMatrix {
    machines: Vec<String>,
}

impl StaticMachineMatrix {
    pub fn new(machines: Vec<String>) -> Self {
        Self { machines }
    }
}

impl MachineMatrixSource for StaticMachineMatrix {
    fn machine_matrix(&self) -> Vec<String> {
        // Blank entries are configuration noise, not peers.
        self.machines
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Enumerates the local screens and renders screen regions to image bytes.
///
/// Native capture implementations live outside the transport core; the
/// in-tree [`StaticScreenSource`](crate::infrastructure::screens::StaticScreenSource)
/// serves configured geometry with placeholder thumbnails.
#[cfg_attr(test, mockall::automock)]
pub trait ScreenSource: Send + Sync {
    /// All screens attached to this machine.
    fn screens(&self) -> Vec<ScreenInfo>;

    /// Renders the requested region to an encoded image (typically PNG).
    ///
    /// # Errors
    ///
    /// Returns [`ThumbnailError`] when the screen is unknown or capture is
    /// unsupported.
    fn render_thumbnail(&self, request: &ThumbnailRequest) -> Result<Vec<u8>, ThumbnailError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
