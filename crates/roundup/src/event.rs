//! Recording lifecycle events as emitted by the media server.
//!
//! Events arrive already parsed and sorted by timestamp (the caller's
//! responsibility); the aggregator consumes each one exactly once. The JSON
//! field names here mirror the media server's log format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The three lifecycle transitions a recording can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Update,
    Stop,
}

/// One lifecycle record from the media server's event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default)]
    pub application_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub connection_id: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: EventData,
}

impl Event {
    /// True when the event carries every id needed to descend the tree.
    pub fn is_routable(&self) -> bool {
        !self.channel_id.is_empty() && !self.client_id.is_empty() && !self.connection_id.is_empty()
    }
}

/// Derived media facts carried on Stop (and sometimes Update) events.
///
/// Every field is optional; the writer crashes often enough that partial
/// payloads are normal, not exceptional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventData {
    pub audio_file: Option<PathBuf>,
    pub video_file: Option<PathBuf>,
    pub audio_first_frame_timestamp: Option<DateTime<Utc>>,
    pub audio_last_frame_timestamp: Option<DateTime<Utc>>,
    pub video_first_frame_timestamp: Option<DateTime<Utc>>,
    pub video_last_frame_timestamp: Option<DateTime<Utc>>,
    /// Inter-track delay in seconds, applied to the video track. May be
    /// negative when video led audio.
    pub video_delay: Option<f64>,
    pub connection_tag: Option<String>,
    pub audio_muted: Option<bool>,
    pub video_muted: Option<bool>,
    pub audio_disabled: Option<bool>,
    pub video_disabled: Option<bool>,
    pub audio_content: Option<String>,
    pub video_content: Option<String>,
}
