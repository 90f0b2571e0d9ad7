//! Stageplot: participant placement geometry for Barnraiser.
//!
//! Given a set of participants (each with a content size and flags) and a
//! target canvas, computes deterministic per-participant placement: a cell
//! ("frame") on the canvas and the scaled content rectangle ("bounds")
//! inside or covering it. Built-in stack and grid tilings are pure
//! functions; the script kind delegates placement to a sandboxed Lua hook.

pub mod engine;
pub mod geometry;
pub mod script;
pub mod types;

pub use engine::LayoutEngine;
pub use geometry::{scale_bounds, Point, Rect};
pub use script::ScriptLayout;
pub use types::{Layout, LayoutInput, LayoutOutput, LayoutView};

use roundup::Size;
use thiserror::Error;

/// Layout computation failures.
///
/// Weight and empty-input violations are rejected before any placement
/// runs; geometry and script errors abort the single layout computation
/// they occur in and are never retried.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("camera and screen weights must be >= 1 (camera {camera}, screen {screen})")]
    InvalidWeight { camera: u32, screen: u32 },

    #[error("layout requires at least one input")]
    Empty,

    #[error("no scale exists from {content:?} into {frame:?}")]
    Geometry { content: Size, frame: Rect },

    #[error("layout script error: {0}")]
    Script(String),
}
