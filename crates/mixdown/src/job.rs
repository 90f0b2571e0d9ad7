//! The transcoder hand-off: a fully-resolved ffmpeg invocation.

use crate::audio::build_audio;
use crate::filter::{render_program, TagPool};
use crate::inputs::InputMap;
use crate::video::build_video;
use barnconf::CompositionConfig;
use roundup::{Session, Size};
use serde::{Deserialize, Serialize};
use setlist::Timeline;
use std::path::PathBuf;

/// Encoder and canvas parameters for one composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    pub size: Size,
    pub frame_rate: u32,
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
    pub pixel_format: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            size: Size::new(1280, 720),
            frame_rate: 30,
            video_codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            crf: 23,
            audio_codec: "aac".to_string(),
            audio_bitrate: "192k".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn from_config(config: &CompositionConfig) -> Self {
        Self {
            size: Size::new(config.width, config.height),
            frame_rate: config.frame_rate,
            ..Self::default()
        }
    }
}

/// Everything needed to run the transcode, as data.
///
/// The job never spawns anything itself; `to_args` produces the argv for
/// whoever owns process execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeJob {
    pub inputs: Vec<PathBuf>,
    pub filtergraph: String,
    pub video_map: Option<String>,
    pub audio_map: Option<String>,
    pub settings: RenderSettings,
    pub output: PathBuf,
}

impl TranscodeJob {
    pub fn program(&self) -> &'static str {
        "ffmpeg"
    }

    /// Argument vector, excluding the program name.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string()];
        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.display().to_string());
        }
        if !self.filtergraph.is_empty() {
            args.push("-filter_complex".to_string());
            args.push(self.filtergraph.clone());
        }
        if let Some(tag) = &self.video_map {
            args.push("-map".to_string());
            args.push(format!("[{tag}]"));
            args.push("-c:v".to_string());
            args.push(self.settings.video_codec.clone());
            args.push("-preset".to_string());
            args.push(self.settings.preset.clone());
            args.push("-crf".to_string());
            args.push(self.settings.crf.to_string());
            args.push("-pix_fmt".to_string());
            args.push(self.settings.pixel_format.clone());
            args.push("-r".to_string());
            args.push(self.settings.frame_rate.to_string());
        }
        if let Some(tag) = &self.audio_map {
            args.push("-map".to_string());
            args.push(format!("[{tag}]"));
            args.push("-c:a".to_string());
            args.push(self.settings.audio_codec.clone());
            args.push("-b:a".to_string());
            args.push(self.settings.audio_bitrate.clone());
        }
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
        args.push(self.output.display().to_string());
        args
    }
}

/// Build the complete job for a session and its timeline.
///
/// Video stages come first, audio second; within each, stage order follows
/// timeline and session iteration order, so identical inputs always render
/// an identical filtergraph.
pub fn build_job(
    session: &Session,
    timeline: &Timeline,
    settings: RenderSettings,
    trim_first: bool,
    trim_last: bool,
    output: PathBuf,
) -> TranscodeJob {
    let inputs = InputMap::from_session(session);
    let mut stages = Vec::new();
    let mut pool = TagPool::new();

    let video_map = build_video(session, timeline, &inputs, &settings, &mut stages, &mut pool);
    let audio_map = build_audio(
        session, timeline, &inputs, trim_first, trim_last, &mut stages, &mut pool,
    );

    TranscodeJob {
        inputs: inputs.files().to_vec(),
        filtergraph: render_program(&stages),
        video_map,
        audio_map,
        settings,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn args_follow_ffmpeg_conventions() {
        let job = TranscodeJob {
            inputs: vec!["/rec/a.mkv".into(), "/rec/b.mkv".into()],
            filtergraph: "[0:v]fps=30[seg0]".to_string(),
            video_map: Some("seg0".to_string()),
            audio_map: Some("amix1".to_string()),
            settings: RenderSettings::default(),
            output: "/out/session.mp4".into(),
        };

        let args = job.to_args();
        assert_eq!(
            args,
            vec![
                "-y",
                "-i",
                "/rec/a.mkv",
                "-i",
                "/rec/b.mkv",
                "-filter_complex",
                "[0:v]fps=30[seg0]",
                "-map",
                "[seg0]",
                "-c:v",
                "libx264",
                "-preset",
                "veryfast",
                "-crf",
                "23",
                "-pix_fmt",
                "yuv420p",
                "-r",
                "30",
                "-map",
                "[amix1]",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-movflags",
                "+faststart",
                "/out/session.mp4",
            ]
        );
    }

    #[test]
    fn audio_only_job_omits_video_flags() {
        let job = TranscodeJob {
            inputs: vec!["/rec/a.mka".into()],
            filtergraph: "[0:a]aresample=48000[aud0]".to_string(),
            video_map: None,
            audio_map: Some("aud0".to_string()),
            settings: RenderSettings::default(),
            output: "/out/session.mp4".into(),
        };

        let args = job.to_args();
        assert!(!args.contains(&"-c:v".to_string()));
        assert!(args.contains(&"-c:a".to_string()));
    }
}
