//! Layout value types: pure data in, pure geometry out.
//!
//! Serde names follow the script hook's wire shape, so these types cross
//! the Lua bridge without translation.

use crate::geometry::Rect;
use roundup::{Recording, Session, Size, VideoSegment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One participant's content, as seen by the layout engine and the script
/// hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInput {
    pub connection_id: String,
    pub connection_tag: Option<String>,
    pub client_id: String,
    pub device_id: String,
    pub user_id: String,
    pub size: Size,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub audio_disabled: bool,
    pub video_disabled: bool,
    pub audio_content: Option<String>,
    pub video_content: Option<String>,
}

impl LayoutInput {
    /// Build a layout input for a segment, resolving the owning client and
    /// connection against the session by id.
    pub fn for_segment(session: &Session, segment: &VideoSegment, recording: &Recording) -> Self {
        let connection = session.connection(&segment.connection_id);
        let client = session.client_of(&segment.connection_id);
        Self {
            connection_id: segment.connection_id.clone(),
            connection_tag: connection.and_then(|c| c.tag.clone()),
            client_id: client.map(|c| c.id.clone()).unwrap_or_default(),
            device_id: connection.map(|c| c.device_id.clone()).unwrap_or_default(),
            user_id: connection.map(|c| c.user_id.clone()).unwrap_or_default(),
            size: segment.size,
            audio_muted: recording.audio_muted,
            video_muted: recording.video_muted,
            audio_disabled: recording.audio_disabled,
            video_disabled: recording.video_disabled,
            audio_content: recording.audio_content.clone(),
            video_content: recording.video_content.clone(),
        }
    }
}

/// The target canvas a layout is computed for.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOutput {
    pub application_id: String,
    pub channel_id: String,
    pub size: Size,
    pub margin: u32,
}

/// One participant's resolved placement.
///
/// `frame` is the cell on the canvas; `bounds` is the scaled content
/// rectangle. When `cropped`, bounds covers the frame and the renderer
/// clips it back to the frame; otherwise bounds sits inside the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutView {
    pub frame: Rect,
    pub bounds: Rect,
    pub cropped: bool,
}

/// A computed layout: canvas size, margin, and per-connection views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub size: Size,
    pub margin: u32,
    pub views: BTreeMap<String, LayoutView>,
}

impl Layout {
    /// The zero-participant layout used for blank chunks.
    pub fn blank(output: &LayoutOutput) -> Self {
        Self {
            size: output.size,
            margin: output.margin,
            views: BTreeMap::new(),
        }
    }

    pub fn view(&self, connection_id: &str) -> Option<&LayoutView> {
        self.views.get(connection_id)
    }
}
