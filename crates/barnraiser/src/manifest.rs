//! The metadata sidecar written next to each composed output.
//!
//! Field names follow the event log's camelCase wire shape, so consumers
//! of the sidecar and of the raw log read the same vocabulary.

use roundup::{Recording, Session};
use serde_json::{json, Value};

pub fn session_manifest(session: &Session) -> Value {
    json!({
        "sessionId": session.id,
        "applicationId": session.application_id,
        "channelId": session.channel_id,
        "started": session.started,
        "stopped": session.stopped,
        "clients": session.clients.iter().map(|client| json!({
            "clientId": client.id,
            "connections": client.connections.iter().map(|conn| json!({
                "connectionId": conn.id,
                "deviceId": conn.device_id,
                "userId": conn.user_id,
                "connectionTag": conn.tag,
                "recordings": conn.recordings.iter().map(recording_manifest).collect::<Vec<_>>(),
            })).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    })
}

fn recording_manifest(recording: &Recording) -> Value {
    json!({
        "recordingId": recording.id(),
        "audioId": recording.audio_id(),
        "videoId": recording.video_id(),
        "audioFile": recording.audio_file,
        "videoFile": recording.video_file,
        "audioStart": recording.audio_start,
        "audioStop": recording.audio_stop,
        "videoStart": recording.video_start,
        "videoStop": recording.video_stop,
        "videoDelay": recording.video_delay,
        "started": recording.started,
        "stopped": recording.stopped,
    })
}
