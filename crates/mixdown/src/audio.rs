//! Audio source preparation and the bounded-fan-in mix tree.

use crate::filter::{FilterStage, TagPool};
use crate::fractional_seconds;
use crate::inputs::InputMap;
use chrono::{DateTime, Utc};
use roundup::Session;
use setlist::Timeline;
use tracing::debug;

/// Upper bound on `amix` fan-in per stage. Wider mixes are split into
/// intermediate stages and re-mixed.
pub const MAX_MIX_INPUTS: usize = 32;

/// All sources are resampled to a common rate before mixing.
pub const SAMPLE_RATE: u32 = 48_000;

/// Prepare one chain per audio source and fold them into a single mixed
/// stream. Returns the final pad tag, or `None` when the session carries
/// no usable audio.
///
/// Trimming clips audio to the timeline's content window (first to last
/// non-blank chunk); each flag enables one end independently. Sources are
/// then delay-aligned against the clipped window's origin.
pub fn build_audio(
    session: &Session,
    timeline: &Timeline,
    inputs: &InputMap,
    trim_first: bool,
    trim_last: bool,
    stages: &mut Vec<FilterStage>,
    pool: &mut TagPool,
) -> Option<String> {
    let (window_start, window_stop) = clip_window(timeline, trim_first, trim_last);

    let mut sources = Vec::new();
    for recording in session.recordings() {
        if recording.audio_disabled {
            continue;
        }
        let (audio_start, audio_stop) = match (recording.audio_start, recording.audio_stop) {
            (Some(start), Some(stop)) if stop > start => (start, stop),
            _ => continue,
        };
        let src = match inputs.audio_tag(&recording.id().into_inner()) {
            Some(tag) => tag,
            None => continue,
        };
        // Entirely outside the clipped window: nothing audible remains.
        if audio_stop <= window_start || audio_start >= window_stop {
            continue;
        }

        let mut chain = vec![format!("aresample={SAMPLE_RATE}")];

        // Clip offsets are source-relative seconds.
        let clip_start = (audio_start < window_start)
            .then(|| fractional_seconds(window_start - audio_start));
        let clip_stop =
            (audio_stop > window_stop).then(|| fractional_seconds(window_stop - audio_start));
        match (clip_start, clip_stop) {
            (Some(start), Some(stop)) => {
                chain.push(format!("atrim=start={start}:end={stop}"));
                chain.push("asetpts=PTS-STARTPTS".to_string());
            }
            (Some(start), None) => {
                chain.push(format!("atrim=start={start}"));
                chain.push("asetpts=PTS-STARTPTS".to_string());
            }
            (None, Some(stop)) => {
                chain.push(format!("atrim=end={stop}"));
                chain.push("asetpts=PTS-STARTPTS".to_string());
            }
            (None, None) => {}
        }

        // Align the source against the output's time origin.
        let delay = audio_start.max(window_start) - window_start;
        let delay_ms = delay.num_milliseconds();
        if delay_ms > 0 {
            chain.push(format!("adelay={delay_ms}:all=1"));
        }

        let out = pool.tag("aud");
        stages.push(FilterStage::new([src], chain.join(","), out.clone()));
        sources.push(out);
    }

    if sources.is_empty() {
        debug!(session = %timeline.session_id, "no audio sources");
        return None;
    }
    Some(mix_tree(sources, stages, pool))
}

fn clip_window(
    timeline: &Timeline,
    trim_first: bool,
    trim_last: bool,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let content = timeline.content_window();
    let start = match (trim_first, content) {
        (true, Some((first, _))) => first,
        _ => timeline.start,
    };
    let stop = match (trim_last, content) {
        (true, Some((_, last))) => last,
        _ => timeline.stop,
    };
    (start, stop)
}

/// Fold source tags into one output tag, `MAX_MIX_INPUTS` at a time.
///
/// Each round mixes consecutive groups; a trailing singleton passes
/// through to the next round without a stage of its own. Rounds repeat
/// until one tag remains.
fn mix_tree(mut tags: Vec<String>, stages: &mut Vec<FilterStage>, pool: &mut TagPool) -> String {
    while tags.len() > 1 {
        let mut next = Vec::with_capacity(tags.len().div_ceil(MAX_MIX_INPUTS));
        for group in tags.chunks(MAX_MIX_INPUTS) {
            if group.len() == 1 {
                next.push(group[0].clone());
                continue;
            }
            let out = pool.tag("amix");
            stages.push(FilterStage::new(
                group.to_vec(),
                format!(
                    "amix=inputs={}:duration=longest:normalize=0",
                    group.len()
                ),
                out.clone(),
            ));
            next.push(out);
        }
        tags = next;
    }
    tags.remove(0)
}
