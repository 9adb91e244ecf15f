//! A screen source backed by configuration instead of a native display API.
//!
//! Native enumeration and capture are platform adapters that live outside
//! this daemon; `StaticScreenSource` stands in for them by serving the screen
//! geometry declared in the config file and a placeholder PNG for thumbnail
//! requests.  Headless deployments and tests run against it unchanged.

use crossdesk_core::protocol::payloads::{ScreenInfo, ScreenRect, ThumbnailRequest};
use tracing::debug;

use crate::application::providers::{ScreenSource, ThumbnailError};
use crate::infrastructure::storage::config::ScreenEntry;

/// A 1×1 transparent PNG served for every thumbnail request.
///
/// Stands in for a real capture pipeline so the screenshot message flow stays
/// exercisable end to end.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR length + tag
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1×1
    0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, // bit depth, colour, CRC
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, // IDAT length + tag
    0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, // zlib-deflated pixel
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, // IDAT CRC
    0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, // IEND
    0x42, 0x60, 0x82,
];

/// Serves config-declared screen geometry and placeholder thumbnails.
pub struct StaticScreenSource {
    screens: Vec<ScreenInfo>,
}

impl StaticScreenSource {
    /// Builds the source from config entries.
    ///
    /// With no entries configured, a single primary 1920×1080 screen is
    /// assumed so a bare node still answers screen-info requests sensibly.
    pub fn from_config(entries: &[ScreenEntry]) -> Self {
        let screens = if entries.is_empty() {
            vec![ScreenInfo {
                id: 0,
                primary: true,
                display_area: ScreenRect {
                    x: 0,
                    y: 0,
                    width: 1920,
                    height: 1080,
                },
                working_area: ScreenRect {
                    x: 0,
                    y: 0,
                    width: 1920,
                    height: 1080,
                },
            }]
        } else {
            entries
                .iter()
                .map(|entry| ScreenInfo {
                    id: entry.id,
                    primary: entry.primary,
                    display_area: ScreenRect {
                        x: entry.x,
                        y: entry.y,
                        width: entry.width,
                        height: entry.height,
                    },
                    working_area: ScreenRect {
                        x: entry.x,
                        y: entry.y,
                        width: entry.width,
                        height: entry.height,
                    },
                })
                .collect()
        };
        Self { screens }
    }
}

impl ScreenSource for StaticScreenSource {
    fn screens(&self) -> Vec<ScreenInfo> {
        self.screens.clone()
    }

    fn render_thumbnail(&self, request: &ThumbnailRequest) -> Result<Vec<u8>, ThumbnailError> {
        if !self.screens.iter().any(|s| s.id == request.screen_id) {
            return Err(ThumbnailError::ScreenNotFound(request.screen_id));
        }
        debug!(
            "serving placeholder thumbnail for screen {} ({}x{})",
            request.screen_id, request.target_width, request.target_height
        );
        Ok(PLACEHOLDER_PNG.to_vec())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn two_screen_config() -> Vec<ScreenEntry> {
        vec![
            ScreenEntry {
                id: 0,
                primary: true,
                x: 0,
                y: 0,
                width: 2560,
                height: 1440,
            },
            ScreenEntry {
                id: 1,
                primary: false,
                x: 2560,
                y: 0,
                width: 1920,
                height: 1080,
            },
        ]
    }

    #[test]
    fn test_empty_config_yields_single_primary_screen() {
        let source = StaticScreenSource::from_config(&[]);
        let screens = source.screens();
        assert_eq!(screens.len(), 1);
        assert!(screens[0].primary);
        assert_eq!(screens[0].display_area.width, 1920);
    }

    #[test]
    fn test_config_entries_are_mapped_in_order() {
        let source = StaticScreenSource::from_config(&two_screen_config());
        let screens = source.screens();
        assert_eq!(screens.len(), 2);
        assert_eq!(screens[1].id, 1);
        assert_eq!(screens[1].display_area.x, 2560);
        assert!(!screens[1].primary);
    }

    #[test]
    fn test_thumbnail_for_known_screen_is_valid_png() {
        let source = StaticScreenSource::from_config(&two_screen_config());
        let request = ThumbnailRequest {
            screen_id: 1,
            source_x: 2560,
            source_y: 0,
            source_width: 1920,
            source_height: 1080,
            target_width: 512,
            target_height: 288,
        };
        let bytes = source.render_thumbnail(&request).expect("thumbnail");
        assert_eq!(&bytes[0..8], &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
    }

    #[test]
    fn test_thumbnail_for_unknown_screen_is_rejected() {
        let source = StaticScreenSource::from_config(&two_screen_config());
        let request = ThumbnailRequest {
            screen_id: 9,
            source_x: 0,
            source_y: 0,
            source_width: 1,
            source_height: 1,
            target_width: 1,
            target_height: 1,
        };
        assert_eq!(
            source.render_thumbnail(&request),
            Err(ThumbnailError::ScreenNotFound(9))
        );
    }
}
