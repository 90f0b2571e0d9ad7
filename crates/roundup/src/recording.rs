//! Recordings: one audio/video capture interval for a single connection.
//!
//! A recording's identity is content-addressed from its track start times
//! and connection id, so repeated runs over the same event log produce the
//! same ids. Tracks are independently nullable; a recording may carry only
//! audio or only video.

use crate::event::{Event, EventData};
use crate::id::ContentId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Pixel dimensions of a piece of video content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// What a video track is showing. Screen shares and cameras are tiled into
/// separate canvas regions when both are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Camera,
    Screen,
}

impl ContentKind {
    /// Classify a free-form content-type tag from the event payload.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(t) if t.to_ascii_lowercase().contains("screen") => ContentKind::Screen,
            _ => ContentKind::Camera,
        }
    }
}

/// A contiguous `[start, stop)` slice of one recording's video track with
/// fixed size and content attributes. Segments of one recording partition
/// its active video window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSegment {
    pub recording_id: ContentId,
    pub connection_id: String,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub size: Size,
    pub content: ContentKind,
}

impl VideoSegment {
    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }
}

/// A mid-recording change reported by an Update event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingUpdate {
    pub timestamp: DateTime<Utc>,
    pub audio_muted: Option<bool>,
    pub video_muted: Option<bool>,
    pub audio_disabled: Option<bool>,
    pub video_disabled: Option<bool>,
    pub audio_content: Option<String>,
    pub video_content: Option<String>,
    pub connection_tag: Option<String>,
}

impl RecordingUpdate {
    pub fn from_event(event: &Event) -> Self {
        Self {
            timestamp: event.timestamp,
            audio_muted: event.data.audio_muted,
            video_muted: event.data.video_muted,
            audio_disabled: event.data.audio_disabled,
            video_disabled: event.data.video_disabled,
            audio_content: event.data.audio_content.clone(),
            video_content: event.data.video_content.clone(),
            connection_tag: event.data.connection_tag.clone(),
        }
    }
}

/// One capture interval for a connection.
///
/// Owned by its connection; the back-reference is the `connection_id`
/// string, resolved against the parent's map when needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub connection_id: String,
    pub started: DateTime<Utc>,
    pub stopped: Option<DateTime<Utc>>,
    pub audio_file: Option<PathBuf>,
    pub video_file: Option<PathBuf>,
    pub audio_start: Option<DateTime<Utc>>,
    pub audio_stop: Option<DateTime<Utc>>,
    pub video_start: Option<DateTime<Utc>>,
    pub video_stop: Option<DateTime<Utc>>,
    /// Inter-track delay in seconds, already applied to the video track
    /// timestamps at finalization. Kept for introspection.
    pub video_delay: f64,
    pub updates: Vec<RecordingUpdate>,
    /// Resolved video segments. Populated externally from media probing, or
    /// synthesized in dry mode.
    pub segments: Vec<VideoSegment>,
    pub audio_muted: bool,
    pub video_muted: bool,
    pub audio_disabled: bool,
    pub video_disabled: bool,
    pub audio_content: Option<String>,
    pub video_content: Option<String>,
    pub connection_tag: Option<String>,
}

impl Recording {
    /// Open a new active recording from a Start event.
    pub fn open(event: &Event) -> Self {
        Self {
            connection_id: event.connection_id.clone(),
            started: event.timestamp,
            stopped: None,
            audio_file: None,
            video_file: None,
            audio_start: None,
            audio_stop: None,
            video_start: None,
            video_stop: None,
            video_delay: 0.0,
            updates: Vec::new(),
            segments: Vec::new(),
            audio_muted: event.data.audio_muted.unwrap_or(false),
            video_muted: event.data.video_muted.unwrap_or(false),
            audio_disabled: event.data.audio_disabled.unwrap_or(false),
            video_disabled: event.data.video_disabled.unwrap_or(false),
            audio_content: event.data.audio_content.clone(),
            video_content: event.data.video_content.clone(),
            connection_tag: event.data.connection_tag.clone(),
        }
    }

    /// Finalize from a Stop event: resolve per-track windows from the
    /// payload (falling back to the recording's own start/stop when a
    /// per-track timestamp is absent) and shift the video track by the
    /// inter-track delay.
    pub fn finalize(&mut self, stopped_at: DateTime<Utc>, data: &EventData) {
        self.stopped = Some(stopped_at);

        if data.audio_file.is_some() {
            self.audio_file = data.audio_file.clone();
        }
        if data.video_file.is_some() {
            self.video_file = data.video_file.clone();
        }
        if data.connection_tag.is_some() {
            self.connection_tag = data.connection_tag.clone();
        }
        if data.audio_content.is_some() {
            self.audio_content = data.audio_content.clone();
        }
        if data.video_content.is_some() {
            self.video_content = data.video_content.clone();
        }

        let has_audio = self.audio_file.is_some()
            || data.audio_first_frame_timestamp.is_some()
            || data.audio_last_frame_timestamp.is_some();
        let has_video = self.video_file.is_some()
            || data.video_first_frame_timestamp.is_some()
            || data.video_last_frame_timestamp.is_some();

        if has_audio {
            self.audio_start = Some(data.audio_first_frame_timestamp.unwrap_or(self.started));
            self.audio_stop = Some(data.audio_last_frame_timestamp.unwrap_or(stopped_at));
        }

        if has_video {
            self.video_delay = data.video_delay.unwrap_or(0.0);
            let delay = seconds_to_duration(self.video_delay);
            self.video_start =
                Some(data.video_first_frame_timestamp.unwrap_or(self.started) + delay);
            self.video_stop = Some(data.video_last_frame_timestamp.unwrap_or(stopped_at) + delay);
        }
    }

    /// Content-addressed audio track id, when an audio track exists.
    pub fn audio_id(&self) -> Option<ContentId> {
        self.audio_start.map(|start| {
            ContentId::from_parts([
                start.timestamp_micros().to_string().as_str(),
                self.connection_id.as_str(),
                "audio",
            ])
        })
    }

    /// Content-addressed video track id, when a video track exists.
    pub fn video_id(&self) -> Option<ContentId> {
        self.video_start.map(|start| {
            ContentId::from_parts([
                start.timestamp_micros().to_string().as_str(),
                self.connection_id.as_str(),
                "video",
            ])
        })
    }

    /// Content-addressed recording id. A missing track contributes a `-`
    /// placeholder so the id stays total and deterministic.
    pub fn id(&self) -> ContentId {
        let audio = self
            .audio_id()
            .map(ContentId::into_inner)
            .unwrap_or_else(|| "-".to_string());
        let video = self
            .video_id()
            .map(ContentId::into_inner)
            .unwrap_or_else(|| "-".to_string());
        ContentId::from_parts([audio.as_str(), video.as_str()])
    }

    /// Effective start: earliest of the present track starts.
    pub fn start(&self) -> DateTime<Utc> {
        match (self.audio_start, self.video_start) {
            (Some(a), Some(v)) => a.min(v),
            (Some(a), None) => a,
            (None, Some(v)) => v,
            (None, None) => self.started,
        }
    }

    /// Effective stop: latest of the present track stops.
    pub fn stop(&self) -> DateTime<Utc> {
        match (self.audio_stop, self.video_stop) {
            (Some(a), Some(v)) => a.max(v),
            (Some(a), None) => a,
            (None, Some(v)) => v,
            (None, None) => self.stopped.unwrap_or(self.started),
        }
    }

    /// Synthesize video segments for dry runs: one segment per
    /// update-delimited interval of the video window, or a single
    /// whole-window segment when there were no updates. Recordings without
    /// video yield nothing.
    pub fn synthesize_segments(&self, default_size: Size) -> Vec<VideoSegment> {
        let (video_start, video_stop) = match (self.video_start, self.video_stop) {
            (Some(start), Some(stop)) if stop > start => (start, stop),
            _ => return Vec::new(),
        };

        let recording_id = self.id();
        let mut segments = Vec::new();
        let mut cursor = video_start;
        let mut content = ContentKind::from_tag(self.video_content.as_deref());

        for update in &self.updates {
            if update.timestamp <= cursor || update.timestamp >= video_stop {
                continue;
            }
            segments.push(VideoSegment {
                recording_id: recording_id.clone(),
                connection_id: self.connection_id.clone(),
                start: cursor,
                stop: update.timestamp,
                size: default_size,
                content,
            });
            cursor = update.timestamp;
            if let Some(tag) = update.video_content.as_deref() {
                content = ContentKind::from_tag(Some(tag));
            }
        }

        segments.push(VideoSegment {
            recording_id,
            connection_id: self.connection_id.clone(),
            start: cursor,
            stop: video_stop,
            size: default_size,
            content,
        });
        segments
    }
}

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::microseconds((seconds * 1_000_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use pretty_assertions::assert_eq;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn start_event(at: &str) -> Event {
        Event {
            kind: EventKind::Start,
            application_id: "app".into(),
            channel_id: "chan".into(),
            client_id: "client".into(),
            connection_id: "conn".into(),
            device_id: "dev".into(),
            user_id: "user".into(),
            timestamp: ts(at),
            data: EventData::default(),
        }
    }

    #[test]
    fn finalize_falls_back_to_recording_window() {
        let mut rec = Recording::open(&start_event("2024-03-01T10:00:00Z"));
        let data = EventData {
            audio_file: Some("/rec/a.mka".into()),
            video_file: Some("/rec/v.mkv".into()),
            ..Default::default()
        };
        rec.finalize(ts("2024-03-01T10:01:00Z"), &data);

        assert_eq!(rec.audio_start, Some(ts("2024-03-01T10:00:00Z")));
        assert_eq!(rec.audio_stop, Some(ts("2024-03-01T10:01:00Z")));
        assert_eq!(rec.video_start, Some(ts("2024-03-01T10:00:00Z")));
        assert_eq!(rec.video_stop, Some(ts("2024-03-01T10:01:00Z")));
    }

    #[test]
    fn video_delay_shifts_both_video_endpoints() {
        for (delay, expected_start, expected_stop) in [
            (-1.0, "2024-03-01T09:59:59Z", "2024-03-01T10:00:59Z"),
            (0.0, "2024-03-01T10:00:00Z", "2024-03-01T10:01:00Z"),
            (1.0, "2024-03-01T10:00:01Z", "2024-03-01T10:01:01Z"),
        ] {
            let mut rec = Recording::open(&start_event("2024-03-01T10:00:00Z"));
            let data = EventData {
                audio_file: Some("/rec/a.mka".into()),
                video_file: Some("/rec/v.mkv".into()),
                video_delay: Some(delay),
                ..Default::default()
            };
            rec.finalize(ts("2024-03-01T10:01:00Z"), &data);

            assert_eq!(rec.video_start, Some(ts(expected_start)), "delay {delay}");
            assert_eq!(rec.video_stop, Some(ts(expected_stop)), "delay {delay}");
            // Effective window spans both tracks
            assert_eq!(
                rec.start(),
                ts("2024-03-01T10:00:00Z").min(ts(expected_start))
            );
            assert_eq!(rec.stop(), ts("2024-03-01T10:01:00Z").max(ts(expected_stop)));
        }
    }

    #[test]
    fn id_is_deterministic_and_track_sensitive() {
        let mut a = Recording::open(&start_event("2024-03-01T10:00:00Z"));
        a.finalize(
            ts("2024-03-01T10:01:00Z"),
            &EventData {
                audio_file: Some("/rec/a.mka".into()),
                ..Default::default()
            },
        );

        let mut b = Recording::open(&start_event("2024-03-01T10:00:00Z"));
        b.finalize(
            ts("2024-03-01T10:01:00Z"),
            &EventData {
                audio_file: Some("/rec/a.mka".into()),
                ..Default::default()
            },
        );

        assert_eq!(a.id(), b.id());
        assert!(a.video_id().is_none());

        // Adding a video track changes the recording id
        let mut c = Recording::open(&start_event("2024-03-01T10:00:00Z"));
        c.finalize(
            ts("2024-03-01T10:01:00Z"),
            &EventData {
                audio_file: Some("/rec/a.mka".into()),
                video_file: Some("/rec/v.mkv".into()),
                ..Default::default()
            },
        );
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn synthesized_segments_partition_the_video_window() {
        let mut rec = Recording::open(&start_event("2024-03-01T10:00:00Z"));
        rec.updates.push(RecordingUpdate {
            timestamp: ts("2024-03-01T10:00:20Z"),
            audio_muted: None,
            video_muted: None,
            audio_disabled: None,
            video_disabled: None,
            audio_content: None,
            video_content: Some("screen-content".into()),
            connection_tag: None,
        });
        rec.finalize(
            ts("2024-03-01T10:01:00Z"),
            &EventData {
                video_file: Some("/rec/v.mkv".into()),
                ..Default::default()
            },
        );

        let segments = rec.synthesize_segments(Size::new(640, 480));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start, ts("2024-03-01T10:00:00Z"));
        assert_eq!(segments[0].stop, ts("2024-03-01T10:00:20Z"));
        assert_eq!(segments[0].content, ContentKind::Camera);
        assert_eq!(segments[1].start, ts("2024-03-01T10:00:20Z"));
        assert_eq!(segments[1].stop, ts("2024-03-01T10:01:00Z"));
        assert_eq!(segments[1].content, ContentKind::Screen);
    }

    #[test]
    fn audio_only_recording_has_no_segments() {
        let mut rec = Recording::open(&start_event("2024-03-01T10:00:00Z"));
        rec.finalize(
            ts("2024-03-01T10:01:00Z"),
            &EventData {
                audio_file: Some("/rec/a.mka".into()),
                ..Default::default()
            },
        );
        assert!(rec.synthesize_segments(Size::new(640, 480)).is_empty());
    }

    #[test]
    fn content_kind_classification() {
        assert_eq!(
            ContentKind::from_tag(Some("screen-content")),
            ContentKind::Screen
        );
        assert_eq!(
            ContentKind::from_tag(Some("camera-content")),
            ContentKind::Camera
        );
        assert_eq!(ContentKind::from_tag(None), ContentKind::Camera);
    }
}
