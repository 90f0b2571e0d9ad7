//! Mapping recordings to ffmpeg input indices.

use roundup::Session;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Resolves recording tracks to `-i` argument positions.
///
/// Files are deduplicated: a recording whose audio and video live in one
/// muxed container contributes a single input, addressed through its `:a`
/// and `:v` stream specifiers. Input order follows session recording
/// order, which is itself deterministic (BTreeMap-backed aggregation).
#[derive(Debug, Clone)]
pub struct InputMap {
    files: Vec<PathBuf>,
    audio: BTreeMap<String, usize>,
    video: BTreeMap<String, usize>,
}

impl InputMap {
    pub fn from_session(session: &Session) -> Self {
        let mut files: Vec<PathBuf> = Vec::new();
        let mut audio = BTreeMap::new();
        let mut video = BTreeMap::new();

        for recording in session.recordings() {
            let id = recording.id().into_inner();
            if let Some(path) = &recording.audio_file {
                audio.insert(id.clone(), index_of(&mut files, path));
            }
            if let Some(path) = &recording.video_file {
                video.insert(id.clone(), index_of(&mut files, path));
            }
        }

        Self {
            files,
            audio,
            video,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Source pad for a recording's audio stream, e.g. `0:a`.
    pub fn audio_tag(&self, recording_id: &str) -> Option<String> {
        self.audio.get(recording_id).map(|i| format!("{i}:a"))
    }

    /// Source pad for a recording's video stream, e.g. `0:v`.
    pub fn video_tag(&self, recording_id: &str) -> Option<String> {
        self.video.get(recording_id).map(|i| format!("{i}:v"))
    }
}

fn index_of(files: &mut Vec<PathBuf>, path: &Path) -> usize {
    match files.iter().position(|f| f == path) {
        Some(i) => i,
        None => {
            files.push(path.to_path_buf());
            files.len() - 1
        }
    }
}
