//! Derived video events: the boundaries between composition chunks.
//!
//! These are never stored - they are derived from each recording's resolved
//! segments, ordered, folded into chunks, and discarded.

use chrono::{DateTime, Utc};
use roundup::{Recording, VideoSegment};

/// What happens to the active segment set at a boundary.
#[derive(Debug, Clone)]
pub enum VideoEventKind {
    /// A recording's video track begins: its first segment joins the set.
    Added(VideoSegment),
    /// A segment boundary inside a recording: the superseded segment is
    /// swapped for its replacement in place, preserving join order.
    Updated {
        from: VideoSegment,
        to: VideoSegment,
    },
    /// A recording's video track ends: its last segment leaves the set.
    Removed(VideoSegment),
}

/// One boundary in the derived event list.
#[derive(Debug, Clone)]
pub struct VideoEvent {
    pub at: DateTime<Utc>,
    pub kind: VideoEventKind,
}

impl VideoEvent {
    /// Ordering rank for same-instant events: additions register before
    /// removals, so the active set is never transiently empty when a
    /// departure and an arrival coincide.
    fn rank(&self) -> u8 {
        match self.kind {
            VideoEventKind::Added(_) => 0,
            VideoEventKind::Updated { .. } => 1,
            VideoEventKind::Removed(_) => 2,
        }
    }
}

/// Derive the sorted boundary list across a set of recordings.
pub fn derive_events<'a>(recordings: impl IntoIterator<Item = &'a Recording>) -> Vec<VideoEvent> {
    let mut events = Vec::new();

    for recording in recordings {
        let segments = &recording.segments;
        let Some(first) = segments.first() else {
            continue;
        };
        events.push(VideoEvent {
            at: first.start,
            kind: VideoEventKind::Added(first.clone()),
        });
        for pair in segments.windows(2) {
            events.push(VideoEvent {
                at: pair[1].start,
                kind: VideoEventKind::Updated {
                    from: pair[0].clone(),
                    to: pair[1].clone(),
                },
            });
        }
        if let Some(last) = segments.last() {
            events.push(VideoEvent {
                at: last.stop,
                kind: VideoEventKind::Removed(last.clone()),
            });
        }
    }

    events.sort_by_key(|e| (e.at, e.rank()));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use roundup::{ContentId, ContentKind, Size};

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn segment(conn: &str, start: &str, stop: &str) -> VideoSegment {
        VideoSegment {
            recording_id: ContentId::from_parts([conn, start]),
            connection_id: conn.to_string(),
            start: ts(start),
            stop: ts(stop),
            size: Size::new(640, 480),
            content: ContentKind::Camera,
        }
    }

    fn recording(conn: &str, segments: Vec<VideoSegment>) -> Recording {
        let start = segments.first().map(|s| s.start).unwrap_or_else(Utc::now);
        Recording {
            connection_id: conn.to_string(),
            started: start,
            stopped: segments.last().map(|s| s.stop),
            audio_file: None,
            video_file: Some("/rec/v.mkv".into()),
            audio_start: None,
            audio_stop: None,
            video_start: segments.first().map(|s| s.start),
            video_stop: segments.last().map(|s| s.stop),
            video_delay: 0.0,
            updates: Vec::new(),
            segments,
            audio_muted: false,
            video_muted: false,
            audio_disabled: false,
            video_disabled: false,
            audio_content: None,
            video_content: None,
            connection_tag: None,
        }
    }

    #[test]
    fn single_segment_yields_add_and_remove() {
        let rec = recording(
            "conn-1",
            vec![segment("conn-1", "2024-03-01T10:00:00Z", "2024-03-01T10:01:00Z")],
        );
        let events = derive_events([&rec]);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].kind, VideoEventKind::Added(_)));
        assert!(matches!(events[1].kind, VideoEventKind::Removed(_)));
    }

    #[test]
    fn interior_boundaries_become_updates() {
        let rec = recording(
            "conn-1",
            vec![
                segment("conn-1", "2024-03-01T10:00:00Z", "2024-03-01T10:00:30Z"),
                segment("conn-1", "2024-03-01T10:00:30Z", "2024-03-01T10:01:00Z"),
            ],
        );
        let events = derive_events([&rec]);
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1].kind, VideoEventKind::Updated { .. }));
        assert_eq!(events[1].at, ts("2024-03-01T10:00:30Z"));
    }

    #[test]
    fn coincident_add_sorts_before_remove() {
        // One participant leaves at the exact instant another arrives: the
        // arrival registers first.
        let a = recording(
            "conn-a",
            vec![segment("conn-a", "2024-03-01T10:00:00Z", "2024-03-01T10:01:00Z")],
        );
        let b = recording(
            "conn-b",
            vec![segment("conn-b", "2024-03-01T10:01:00Z", "2024-03-01T10:02:00Z")],
        );
        let events = derive_events([&a, &b]);
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].at, ts("2024-03-01T10:01:00Z"));
        assert!(matches!(events[1].kind, VideoEventKind::Added(_)));
        assert!(matches!(events[2].kind, VideoEventKind::Removed(_)));
    }

    #[test]
    fn recordings_without_video_contribute_nothing() {
        let rec = recording("conn-1", Vec::new());
        assert!(derive_events([&rec]).is_empty());
    }
}
