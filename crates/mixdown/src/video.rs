//! Per-chunk video composition and the final concat.

use crate::filter::{FilterStage, TagPool};
use crate::fractional_seconds;
use crate::inputs::InputMap;
use crate::job::RenderSettings;
use roundup::{Recording, Session};
use setlist::{Timeline, VideoChunk};
use tracing::warn;

/// Compose each chunk onto a black canvas and concatenate the chunks.
/// Returns the final pad tag, or `None` for a timeline with no chunks.
///
/// Within a chunk, segments are overlaid in join order, so later joiners
/// sit above earlier ones wherever frames touch. A segment whose view or
/// input is unresolvable is dropped with a warning rather than failing
/// the whole composition.
pub fn build_video(
    session: &Session,
    timeline: &Timeline,
    inputs: &InputMap,
    settings: &RenderSettings,
    stages: &mut Vec<FilterStage>,
    pool: &mut TagPool,
) -> Option<String> {
    let mut chunk_tags = Vec::with_capacity(timeline.chunks.len());
    for chunk in &timeline.chunks {
        chunk_tags.push(compose_chunk(session, chunk, inputs, settings, stages, pool));
    }

    match chunk_tags.len() {
        0 => None,
        1 => Some(chunk_tags.remove(0)),
        n => {
            let out = pool.tag("vcat");
            stages.push(FilterStage::new(
                chunk_tags,
                format!("concat=n={n}:v=1:a=0"),
                out.clone(),
            ));
            Some(out)
        }
    }
}

fn compose_chunk(
    session: &Session,
    chunk: &VideoChunk,
    inputs: &InputMap,
    settings: &RenderSettings,
    stages: &mut Vec<FilterStage>,
    pool: &mut TagPool,
) -> String {
    let bg = pool.tag("bg");
    stages.push(FilterStage::source(
        format!(
            "color=c=black:size={}x{}:rate={}:duration={}",
            settings.size.width,
            settings.size.height,
            settings.frame_rate,
            fractional_seconds(chunk.duration()),
        ),
        bg.clone(),
    ));

    let mut canvas = bg;
    for segment in &chunk.segments {
        let view = match chunk.layout.view(&segment.connection_id) {
            Some(view) => *view,
            None => {
                warn!(connection = %segment.connection_id, "segment has no layout view");
                continue;
            }
        };
        let recording_id = segment.recording_id.as_str();
        let src = match inputs.video_tag(recording_id) {
            Some(tag) => tag,
            None => {
                warn!(recording = %recording_id, "segment has no video input");
                continue;
            }
        };
        let video_start = match find_recording(session, recording_id)
            .and_then(|r| r.video_start)
        {
            Some(start) => start,
            None => {
                warn!(recording = %recording_id, "segment has no video window");
                continue;
            }
        };

        // Trim offsets are source-relative: the chunk interval mapped onto
        // the recording's own clock.
        let mut chain = vec![
            format!("fps={}", settings.frame_rate),
            format!(
                "trim=start={}:end={}",
                fractional_seconds(chunk.start - video_start),
                fractional_seconds(chunk.stop - video_start),
            ),
            "setpts=PTS-STARTPTS".to_string(),
            format!("scale={}:{}", view.bounds.width(), view.bounds.height()),
        ];
        let position = if view.cropped {
            // Bounds overflow the frame; clip back to the cell.
            chain.push(format!(
                "crop={}:{}:{}:{}",
                view.frame.width(),
                view.frame.height(),
                view.frame.origin.x - view.bounds.origin.x,
                view.frame.origin.y - view.bounds.origin.y,
            ));
            view.frame.origin
        } else {
            view.bounds.origin
        };

        let seg = pool.tag("seg");
        stages.push(FilterStage::new([src], chain.join(","), seg.clone()));

        let out = pool.tag("ovl");
        stages.push(FilterStage::new(
            [canvas, seg],
            format!("overlay=x={}:y={}", position.x, position.y),
            out.clone(),
        ));
        canvas = out;
    }
    canvas
}

fn find_recording<'s>(session: &'s Session, id: &str) -> Option<&'s Recording> {
    session.recordings().find(|r| r.id().into_inner() == id)
}
