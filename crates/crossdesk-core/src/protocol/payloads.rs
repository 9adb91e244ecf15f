//! Typed payload bodies carried inside [`Message`](crate::Message) frames.
//!
//! Request/response bodies are encoded as UTF-8 JSON via
//! [`Message::with_json`](crate::Message::with_json).  Screenshot *data*
//! frames are the exception: they carry raw image bytes (typically PNG)
//! directly as the frame payload, bounded by empty start/finish frames.

use serde::{Deserialize, Serialize};

/// A rectangle in screen coordinates (pixels; origin at the primary screen's
/// top-left, offsets may be negative).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Description of one attached screen on a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfo {
    /// Zero-based screen index, stable for the lifetime of the session.
    pub id: i32,
    /// Whether this is the primary screen.
    pub primary: bool,
    /// Full display area of the screen.
    pub display_area: ScreenRect,
    /// Display area minus taskbars/docks.
    pub working_area: ScreenRect,
}

/// Body of a `MachineMatrixResponse`: the machine names this node knows about,
/// in matrix order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineMatrixResponse {
    pub matrix: Vec<String>,
}

/// Body of a `ScreenInfoResponse`: every screen attached to the answering
/// machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenInfoResponse {
    pub screens: Vec<ScreenInfo>,
}

/// Body of a `ScreenshotRequest`: render `source_*` of screen `screen_id`
/// scaled to `target_width` × `target_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailRequest {
    pub screen_id: i32,
    pub source_x: i32,
    pub source_y: i32,
    pub source_width: i32,
    pub source_height: i32,
    pub target_width: i32,
    pub target_height: i32,
}

impl ThumbnailRequest {
    /// A request covering the whole of `screen`, scaled to the target size.
    pub fn full_screen(screen: &ScreenInfo, target_width: i32, target_height: i32) -> Self {
        Self {
            screen_id: screen.id,
            source_x: screen.display_area.x,
            source_y: screen.display_area.y,
            source_width: screen.display_area.width,
            source_height: screen.display_area.height,
            target_width,
            target_height,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
