//! Rectangles and the frame/bounds scale resolution.

use crate::LayoutError;
use roundup::Size;
use serde::{Deserialize, Serialize};

/// A canvas position in pixels. May be negative: cropped content extends
/// past its frame before being clipped back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// A placed rectangle: origin plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self {
            origin: Point::default(),
            size,
        }
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Transpose x/y and width/height. Vertical tilings run the horizontal
    /// algorithm in transposed space and flip the results back.
    pub fn transposed(&self) -> Self {
        Self::new(
            self.origin.y,
            self.origin.x,
            self.size.height,
            self.size.width,
        )
    }
}

/// Resolve a content size into a frame.
///
/// When the aspect ratios differ, either shrink the content to fit entirely
/// inside the frame, centered (letterbox), or grow it to fully cover the
/// frame, centered (the caller crops back to the frame's size) - selected by
/// `crop`. A zero-width or zero-height content or frame is a fatal geometry
/// error: no sensible scale exists.
pub fn scale_bounds(content: Size, frame: Rect, crop: bool) -> Result<Rect, LayoutError> {
    if content.is_empty() || frame.size.is_empty() {
        return Err(LayoutError::Geometry { content, frame });
    }

    let sx = frame.size.width as f64 / content.width as f64;
    let sy = frame.size.height as f64 / content.height as f64;
    let scale = if crop { sx.max(sy) } else { sx.min(sy) };

    let width = (content.width as f64 * scale).round().max(1.0) as u32;
    let height = (content.height as f64 * scale).round().max(1.0) as u32;

    let x = frame.origin.x + (frame.size.width as i64 - width as i64) / 2;
    let y = frame.origin.y + (frame.size.height as i64 - height as i64) / 2;

    Ok(Rect::new(x, y, width, height))
}
