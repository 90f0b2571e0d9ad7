//! Barnraiser: composing multi-party session recordings.
//!
//! The pipeline folds a recording-lifecycle event stream into sealed
//! sessions (roundup), builds a gap-free chunk timeline with participant
//! placement (setlist over stageplot), and emits the ffmpeg filter program
//! and transcode description for each session (mixdown). This crate ties
//! those stages together behind a planning facade; actual process
//! execution and filesystem orchestration belong to the caller.

pub mod manifest;
pub mod plan;

pub use manifest::session_manifest;
pub use plan::{plan_all, plan_session, BatchOutcome, ComposeError, CompositionPlan, PlanFailure};
