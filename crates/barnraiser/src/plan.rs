//! Planning one composition per sealed session.

use crate::manifest::session_manifest;
use anyhow::Context;
use barnconf::{CompositionConfig, LayoutKind};
use mixdown::{build_job, RenderSettings, TranscodeJob};
use roundup::{ContentId, Session, Size};
use setlist::{Timeline, TimelineBuilder, TimelineError};
use stageplot::{LayoutEngine, LayoutError, LayoutOutput, ScriptLayout};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error("layout is 'script' but no script source was provided")]
    MissingScript,
}

/// The full composition for one session: the chunk timeline, the transcode
/// to run, and the metadata sidecar to write next to the output.
#[derive(Debug, Clone)]
pub struct CompositionPlan {
    pub session_id: ContentId,
    pub timeline: Timeline,
    pub job: TranscodeJob,
    pub manifest: serde_json::Value,
}

/// Plan the composition of one sealed session.
///
/// In dry-run mode recordings carry no probed segments, so segments are
/// synthesized from the recording windows at the configured canvas size.
pub fn plan_session(
    session: &Session,
    config: &CompositionConfig,
    script_source: Option<&str>,
) -> Result<CompositionPlan, ComposeError> {
    let script = match (config.layout, script_source) {
        (LayoutKind::Script, Some(source)) => Some(ScriptLayout::new(source)),
        (LayoutKind::Script, None) => return Err(ComposeError::MissingScript),
        _ => None,
    };
    let engine = LayoutEngine::from_config(config, script)?;

    let session = if config.dry_run {
        synthesize(session.clone(), Size::new(config.width, config.height))
    } else {
        session.clone()
    };

    let output = LayoutOutput {
        application_id: session.application_id.clone(),
        channel_id: session.channel_id.clone(),
        size: Size::new(config.width, config.height),
        margin: config.margin,
    };
    let timeline = TimelineBuilder::new(&engine, output, config.dynamic).build(&session)?;

    let settings = RenderSettings::from_config(config);
    let out_path = PathBuf::from(format!("session-{}.mp4", session.id));
    let job = build_job(
        &session,
        &timeline,
        settings,
        config.audio_trim_first,
        config.audio_trim_last,
        out_path,
    );

    info!(
        session = %session.id,
        chunks = timeline.chunks.len(),
        inputs = job.inputs.len(),
        "planned composition"
    );

    Ok(CompositionPlan {
        session_id: session.id.clone(),
        timeline,
        manifest: session_manifest(&session),
        job,
    })
}

/// One session's failure within a batch.
#[derive(Debug)]
pub struct PlanFailure {
    pub session_id: ContentId,
    pub error: anyhow::Error,
}

/// The result of planning a batch of sessions.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub plans: Vec<CompositionPlan>,
    pub failures: Vec<PlanFailure>,
}

/// Plan every session, continuing past individual failures.
pub fn plan_all(
    sessions: &[Session],
    config: &CompositionConfig,
    script_source: Option<&str>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for session in sessions {
        match plan_session(session, config, script_source)
            .with_context(|| format!("composing session {}", session.id))
        {
            Ok(plan) => outcome.plans.push(plan),
            Err(error) => {
                error!(session = %session.id, error = %error, "composition failed");
                outcome.failures.push(PlanFailure {
                    session_id: session.id.clone(),
                    error,
                });
            }
        }
    }
    outcome
}

fn synthesize(mut session: Session, default_size: Size) -> Session {
    for client in &mut session.clients {
        for connection in &mut client.connections {
            for recording in &mut connection.recordings {
                if recording.segments.is_empty() {
                    recording.segments = recording.synthesize_segments(default_size);
                }
            }
        }
    }
    session
}
