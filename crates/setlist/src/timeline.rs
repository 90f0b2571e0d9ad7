//! Folding video events into a gap-free chunk timeline.

use crate::event::{derive_events, VideoEvent, VideoEventKind};
use chrono::{DateTime, Duration, Utc};
use roundup::{ContentId, Recording, Session, VideoSegment};
use serde::{Deserialize, Serialize};
use stageplot::{Layout, LayoutEngine, LayoutError, LayoutInput, LayoutOutput};
use thiserror::Error;
use tracing::debug;

/// Chunks shorter than this are rounding noise from near-coincident
/// boundaries; their interval is folded into a neighbor instead of
/// rendered.
fn min_chunk() -> Duration {
    Duration::milliseconds(1)
}

#[derive(Debug, Error)]
pub enum TimelineError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// A time interval of the composed output with a fixed set of active
/// segments and a resolved layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoChunk {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    /// Active segments in join order. Join order is z-order downstream.
    pub segments: Vec<VideoSegment>,
    pub layout: Layout,
}

impl VideoChunk {
    pub fn duration(&self) -> Duration {
        self.stop - self.start
    }

    /// A blank chunk: nobody on screen, background only.
    pub fn is_blank(&self) -> bool {
        self.segments.is_empty()
    }
}

/// The chunk sequence for one session. Chunks partition
/// `[start, stop)` exactly: no gaps, no overlap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub session_id: ContentId,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    pub chunks: Vec<VideoChunk>,
}

impl Timeline {
    /// The interval actually showing content: first non-blank chunk start
    /// to last non-blank chunk stop. `None` for an all-blank session.
    pub fn content_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.chunks.iter().find(|c| !c.is_blank())?.start;
        let last = self.chunks.iter().rev().find(|c| !c.is_blank())?.stop;
        Some((first, last))
    }
}

/// Builds timelines from sealed sessions.
///
/// Recordings must already carry resolved segments (probed externally, or
/// synthesized for dry runs before calling this).
pub struct TimelineBuilder<'a> {
    engine: &'a LayoutEngine,
    output: LayoutOutput,
    /// When false, one session-wide layout keeps seat positions fixed
    /// across every chunk.
    dynamic: bool,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(engine: &'a LayoutEngine, output: LayoutOutput, dynamic: bool) -> Self {
        Self {
            engine,
            output,
            dynamic,
        }
    }

    pub fn build(&self, session: &Session) -> Result<Timeline, TimelineError> {
        let events = derive_events(session.recordings());
        let raw = fold_chunks(session.started, session.stopped, events);
        let raw = fold_slivers(raw, session.stopped);

        let static_layout = if self.dynamic {
            None
        } else {
            Some(self.session_layout(session)?)
        };

        let mut chunks = Vec::with_capacity(raw.len());
        for chunk in raw {
            let layout = match &static_layout {
                Some(layout) => layout.clone(),
                None if chunk.segments.is_empty() => Layout::blank(&self.output),
                None => self.chunk_layout(session, &chunk.segments)?,
            };
            chunks.push(VideoChunk {
                start: chunk.start,
                stop: chunk.stop,
                segments: chunk.segments,
                layout,
            });
        }

        debug!(
            session = %session.id,
            chunks = chunks.len(),
            blanks = chunks.iter().filter(|c| c.is_blank()).count(),
            "built timeline"
        );

        Ok(Timeline {
            session_id: session.id.clone(),
            start: session.started,
            stop: session.stopped,
            chunks,
        })
    }

    /// Dynamic mode: lay out exactly the chunk's active set.
    fn chunk_layout(
        &self,
        session: &Session,
        segments: &[VideoSegment],
    ) -> Result<Layout, TimelineError> {
        let inputs = self.inputs_for(session, segments);
        Ok(self.engine.layout(&inputs, &self.output)?)
    }

    /// Static mode: lay out the full per-connection set once, independent
    /// of which chunk is current. Each connection is represented by its
    /// first segment.
    fn session_layout(&self, session: &Session) -> Result<Layout, TimelineError> {
        let mut seen = std::collections::BTreeSet::new();
        let mut representative = Vec::new();
        for recording in session.recordings() {
            for segment in &recording.segments {
                if seen.insert(segment.connection_id.clone()) {
                    representative.push(segment.clone());
                }
            }
        }
        if representative.is_empty() {
            return Ok(Layout::blank(&self.output));
        }
        let inputs = self.inputs_for(session, &representative);
        Ok(self.engine.layout(&inputs, &self.output)?)
    }

    fn inputs_for(&self, session: &Session, segments: &[VideoSegment]) -> Vec<LayoutInput> {
        segments
            .iter()
            .map(|segment| {
                let recording = find_recording(session, &segment.recording_id);
                match recording {
                    Some(rec) => LayoutInput::for_segment(session, segment, rec),
                    None => LayoutInput {
                        connection_id: segment.connection_id.clone(),
                        connection_tag: None,
                        client_id: String::new(),
                        device_id: String::new(),
                        user_id: String::new(),
                        size: segment.size,
                        audio_muted: false,
                        video_muted: false,
                        audio_disabled: false,
                        video_disabled: false,
                        audio_content: None,
                        video_content: None,
                    },
                }
            })
            .collect()
    }
}

fn find_recording<'s>(session: &'s Session, id: &ContentId) -> Option<&'s Recording> {
    session.recordings().find(|r| &r.id() == id)
}

struct RawChunk {
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    segments: Vec<VideoSegment>,
}

impl RawChunk {
    fn duration(&self) -> Duration {
        self.stop - self.start
    }
}

/// Fold the sorted event list into raw chunks.
///
/// Every boundary closes the open chunk with the set active *before* the
/// event applies, so any maximal interval with zero active segments -
/// leading, interior, or trailing - becomes a blank chunk.
fn fold_chunks(
    start: DateTime<Utc>,
    stop: DateTime<Utc>,
    events: Vec<VideoEvent>,
) -> Vec<RawChunk> {
    let mut chunks = Vec::new();
    let mut active: Vec<VideoSegment> = Vec::new();
    let mut cursor = start;

    for event in events {
        let at = event.at.clamp(start, stop);
        if at > cursor {
            chunks.push(RawChunk {
                start: cursor,
                stop: at,
                segments: active.clone(),
            });
            cursor = at;
        }
        apply(&mut active, event.kind);
    }

    if cursor < stop || chunks.is_empty() {
        chunks.push(RawChunk {
            start: cursor,
            stop,
            segments: active.clone(),
        });
    }
    chunks
}

fn apply(active: &mut Vec<VideoSegment>, kind: VideoEventKind) {
    match kind {
        VideoEventKind::Added(segment) => active.push(segment),
        VideoEventKind::Updated { from, to } => {
            match active.iter_mut().find(|s| **s == from) {
                Some(slot) => *slot = to,
                None => active.push(to),
            }
        }
        VideoEventKind::Removed(segment) => active.retain(|s| *s != segment),
    }
}

/// Fold sub-millisecond chunks into a neighbor so the partition of the
/// session interval stays exact.
fn fold_slivers(raw: Vec<RawChunk>, session_stop: DateTime<Utc>) -> Vec<RawChunk> {
    let mut folded: Vec<RawChunk> = Vec::new();
    let mut carry: Option<DateTime<Utc>> = None;

    for mut chunk in raw {
        if let Some(start) = carry.take() {
            chunk.start = start;
        }
        if chunk.duration() < min_chunk() {
            carry = Some(chunk.start);
        } else {
            folded.push(chunk);
        }
    }

    if carry.is_some() {
        // A sub-ms tail: stretch the previous chunk over it.
        if let Some(last) = folded.last_mut() {
            last.stop = session_stop;
        }
    }
    folded
}
