//! Composition graph building.
//!
//! Turns a sealed session and its chunk timeline into an ffmpeg
//! `-filter_complex` program and the argv of the transcode that would run
//! it. Everything here is pure data construction; process execution
//! belongs to the caller.
//!
//! The graph has three layers:
//! - per-source preparation (resample/trim/delay for audio, fps/trim/
//!   scale/crop for video),
//! - per-chunk canvas composition via `overlay`, concatenated across
//!   chunks,
//! - a bounded-fan-in `amix` tree folding all audio into one stream.

pub mod audio;
pub mod filter;
pub mod inputs;
pub mod job;
pub mod video;

pub use audio::{build_audio, MAX_MIX_INPUTS, SAMPLE_RATE};
pub use filter::{render_program, FilterStage, TagPool};
pub use inputs::InputMap;
pub use job::{build_job, RenderSettings, TranscodeJob};
pub use video::build_video;

use chrono::Duration;

/// Seconds with millisecond precision, as ffmpeg option text. Chunk
/// boundaries are already folded to >= 1ms, so nothing is lost.
pub(crate) fn fractional_seconds(d: Duration) -> String {
    let micros = d.num_microseconds().unwrap_or(0);
    format!("{:.3}", micros as f64 / 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fractional_seconds_keeps_millisecond_precision() {
        assert_eq!(fractional_seconds(Duration::seconds(60)), "60.000");
        assert_eq!(fractional_seconds(Duration::milliseconds(1500)), "1.500");
        assert_eq!(fractional_seconds(Duration::milliseconds(1)), "0.001");
    }
}
