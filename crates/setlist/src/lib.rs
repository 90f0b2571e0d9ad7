//! Setlist: session timeline construction for Barnraiser.
//!
//! Turns a sealed session's recordings (with resolved video segments) into
//! a gap-free sequence of composition chunks. Every instant of
//! `[session.start, session.stop)` belongs to exactly one chunk; intervals
//! where nobody is on screen become blank chunks rather than holes.

pub mod event;
pub mod timeline;

pub use event::{derive_events, VideoEvent, VideoEventKind};
pub use timeline::{Timeline, TimelineBuilder, TimelineError, VideoChunk};
