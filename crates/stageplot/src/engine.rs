//! Built-in tiling strategies and the weighted screen/camera canvas split.

use crate::geometry::{scale_bounds, Rect};
use crate::script::ScriptLayout;
use crate::types::{Layout, LayoutInput, LayoutOutput, LayoutView};
use crate::LayoutError;
use barnconf::{CompositionConfig, LayoutKind};
use roundup::{ContentKind, Size};
use std::collections::BTreeMap;

/// Computes per-participant placement for one canvas.
///
/// Pure and re-entrant: the engine holds only configuration, so one engine
/// can lay out every chunk of a session (and independent sessions
/// concurrently, if an orchestrator wants to).
pub struct LayoutEngine {
    kind: LayoutKind,
    camera_weight: u32,
    screen_weight: u32,
    crop: bool,
    script: Option<ScriptLayout>,
}

impl LayoutEngine {
    /// Validates the weights up front; everything else is checked per call.
    pub fn new(
        kind: LayoutKind,
        camera_weight: u32,
        screen_weight: u32,
        crop: bool,
    ) -> Result<Self, LayoutError> {
        if camera_weight < 1 || screen_weight < 1 {
            return Err(LayoutError::InvalidWeight {
                camera: camera_weight,
                screen: screen_weight,
            });
        }
        Ok(Self {
            kind,
            camera_weight,
            screen_weight,
            crop,
            script: None,
        })
    }

    /// Attach the Lua hook used by the script layout kind.
    pub fn with_script(mut self, script: ScriptLayout) -> Self {
        self.script = Some(script);
        self
    }

    pub fn from_config(
        config: &CompositionConfig,
        script: Option<ScriptLayout>,
    ) -> Result<Self, LayoutError> {
        let mut engine = Self::new(
            config.layout,
            config.camera_weight,
            config.screen_weight,
            config.crop,
        )?;
        engine.script = script;
        Ok(engine)
    }

    /// Compute placement for every input on the given canvas.
    pub fn layout(
        &self,
        inputs: &[LayoutInput],
        output: &LayoutOutput,
    ) -> Result<Layout, LayoutError> {
        if inputs.is_empty() {
            return Err(LayoutError::Empty);
        }

        if self.kind == LayoutKind::Script {
            return self.layout_scripted(inputs, output);
        }

        let canvas = Rect::from_size(output.size);
        let margin = output.margin;

        // Split the canvas between screen and camera content when both are
        // present, proportionally to the integer weights along the packing
        // axis; each sub-rectangle is tiled independently with the same
        // kind. Views are keyed by connection id, so re-merging preserves
        // the original input order for callers that iterate inputs.
        let screen: Vec<&LayoutInput> = inputs
            .iter()
            .filter(|i| ContentKind::from_tag(i.video_content.as_deref()) == ContentKind::Screen)
            .collect();
        let camera: Vec<&LayoutInput> = inputs
            .iter()
            .filter(|i| ContentKind::from_tag(i.video_content.as_deref()) == ContentKind::Camera)
            .collect();

        let mut views = BTreeMap::new();
        if !screen.is_empty() && !camera.is_empty() {
            let (screen_region, camera_region) = split_canvas(
                canvas,
                self.screen_weight,
                self.camera_weight,
                self.kind.is_horizontal(),
            );
            self.tile_into(&mut views, &screen, screen_region, margin)?;
            self.tile_into(&mut views, &camera, camera_region, margin)?;
        } else {
            let all: Vec<&LayoutInput> = inputs.iter().collect();
            self.tile_into(&mut views, &all, canvas, margin)?;
        }

        Ok(Layout {
            size: output.size,
            margin,
            views,
        })
    }

    fn layout_scripted(
        &self,
        inputs: &[LayoutInput],
        output: &LayoutOutput,
    ) -> Result<Layout, LayoutError> {
        let script = self
            .script
            .as_ref()
            .ok_or_else(|| LayoutError::Script("no layout script configured".to_string()))?;
        let frames = script.frames(inputs, output)?;

        let mut views = BTreeMap::new();
        for (input, frame) in inputs.iter().zip(frames) {
            views.insert(
                input.connection_id.clone(),
                LayoutView {
                    frame,
                    bounds: scale_bounds(input.size, frame, self.crop)?,
                    cropped: self.crop,
                },
            );
        }
        Ok(Layout {
            size: output.size,
            margin: output.margin,
            views,
        })
    }

    fn tile_into(
        &self,
        views: &mut BTreeMap<String, LayoutView>,
        inputs: &[&LayoutInput],
        region: Rect,
        margin: u32,
    ) -> Result<(), LayoutError> {
        let frames = match self.kind {
            LayoutKind::Hstack => stack_cells(region, inputs, margin, true)?,
            LayoutKind::Vstack => stack_cells(region, inputs, margin, false)?,
            LayoutKind::Hgrid => grid_cells(region, inputs.len(), margin, true),
            LayoutKind::Vgrid => grid_cells(region, inputs.len(), margin, false),
            LayoutKind::Script => unreachable!("script layouts never tile"),
        };

        for (input, frame) in inputs.iter().zip(frames) {
            views.insert(
                input.connection_id.clone(),
                LayoutView {
                    frame,
                    bounds: scale_bounds(input.size, frame, self.crop)?,
                    cropped: self.crop,
                },
            );
        }
        Ok(())
    }
}

/// Split a canvas into screen-leading and camera sub-rectangles along the
/// packing axis, sized by the integer weight ratio.
fn split_canvas(canvas: Rect, screen_weight: u32, camera_weight: u32, horizontal: bool) -> (Rect, Rect) {
    let total = (screen_weight + camera_weight) as u64;
    if horizontal {
        let screen_w = (canvas.width() as u64 * screen_weight as u64 / total) as u32;
        (
            Rect::new(canvas.origin.x, canvas.origin.y, screen_w, canvas.height()),
            Rect::new(
                canvas.origin.x + screen_w as i64,
                canvas.origin.y,
                canvas.width() - screen_w,
                canvas.height(),
            ),
        )
    } else {
        let screen_h = (canvas.height() as u64 * screen_weight as u64 / total) as u32;
        (
            Rect::new(canvas.origin.x, canvas.origin.y, canvas.width(), screen_h),
            Rect::new(
                canvas.origin.x,
                canvas.origin.y + screen_h as i64,
                canvas.width(),
                canvas.height() - screen_h,
            ),
        )
    }
}

/// Stack cells end-to-end along the main axis.
///
/// Each participant is first normalized so its cross-axis dimension fills
/// the region exactly, preserving its aspect ratio; if the resulting main
/// axis (plus unscaled margins) overflows, one uniform shrink factor is
/// applied to the whole stack. The block is centered in the region.
fn stack_cells(
    region: Rect,
    inputs: &[&LayoutInput],
    margin: u32,
    horizontal: bool,
) -> Result<Vec<Rect>, LayoutError> {
    if !horizontal {
        let transposed: Vec<LayoutInput> = inputs
            .iter()
            .map(|i| LayoutInput {
                size: Size::new(i.size.height, i.size.width),
                ..(**i).clone()
            })
            .collect();
        let refs: Vec<&LayoutInput> = transposed.iter().collect();
        let cells = stack_cells(region.transposed(), &refs, margin, true)?;
        return Ok(cells.iter().map(Rect::transposed).collect());
    }

    let cross = region.height() as f64;
    let mut natural_widths = Vec::with_capacity(inputs.len());
    for input in inputs {
        if input.size.is_empty() {
            return Err(LayoutError::Geometry {
                content: input.size,
                frame: region,
            });
        }
        natural_widths.push(input.size.width as f64 * cross / input.size.height as f64);
    }

    let total: f64 = natural_widths.iter().sum();
    let margins = margin as i64 * (inputs.len() as i64 - 1);
    let available = (region.width() as i64 - margins).max(1) as f64;
    let scale = (available / total).min(1.0);

    let cell_heights = (cross * scale).round().max(1.0) as u32;
    let cell_widths: Vec<u32> = natural_widths
        .iter()
        .map(|w| (w * scale).round().max(1.0) as u32)
        .collect();
    let block_width: i64 = cell_widths.iter().map(|w| *w as i64).sum::<i64>() + margins;

    let mut x = region.origin.x + (region.width() as i64 - block_width) / 2;
    let y = region.origin.y + (region.height() as i64 - cell_heights as i64) / 2;

    let mut cells = Vec::with_capacity(inputs.len());
    for width in cell_widths {
        cells.push(Rect::new(x, y, width, cell_heights));
        x += width as i64 + margin as i64;
    }
    Ok(cells)
}

/// Grid cells for `count` participants in a region.
///
/// Chooses the column count by scanning from `count` down to 1, maximizing
/// the smaller cell dimension (ties go to the last configuration scanned).
/// Cells have integer sizes; leftover pixels go one-per-leading row and
/// column. An under-populated final row is re-tiled recursively with just
/// its remaining participants. Vertical grids run transposed, which makes
/// them column-major.
fn grid_cells(region: Rect, count: usize, margin: u32, horizontal: bool) -> Vec<Rect> {
    if !horizontal {
        return grid_cells(region.transposed(), count, margin, true)
            .iter()
            .map(Rect::transposed)
            .collect();
    }
    if count == 0 {
        return Vec::new();
    }

    let width = region.width() as i64;
    let height = region.height() as i64;
    let margin = margin as i64;

    let mut best = (count, 1);
    let mut best_size = f64::MIN;
    for cols in (1..=count).rev() {
        let rows = count.div_ceil(cols);
        let cell_w = ((width - margin * (cols as i64 - 1)).max(0) as f64) / cols as f64;
        let cell_h = ((height - margin * (rows as i64 - 1)).max(0) as f64) / rows as f64;
        let size = cell_w.min(cell_h);
        if size >= best_size {
            best_size = size;
            best = (cols, rows);
        }
    }
    let (cols, rows) = best;

    let inner_height = (height - margin * (rows as i64 - 1)).max(rows as i64);
    let base_height = inner_height / rows as i64;
    let extra_rows = (inner_height % rows as i64) as usize;

    let mut cells = Vec::with_capacity(count);
    let mut y = region.origin.y;
    for row in 0..rows {
        let row_height = (base_height + i64::from(row < extra_rows)) as u32;
        let remaining = count - row * cols;
        if remaining < cols {
            // Under-populated final row: re-tile its strip with just the
            // leftovers.
            let strip = Rect::new(region.origin.x, y, region.width(), row_height);
            cells.extend(grid_cells(strip, remaining, margin as u32, true));
            break;
        }

        let inner_width = (width - margin * (cols as i64 - 1)).max(cols as i64);
        let base_width = inner_width / cols as i64;
        let extra_cols = (inner_width % cols as i64) as usize;
        let mut x = region.origin.x;
        for col in 0..cols {
            let col_width = (base_width + i64::from(col < extra_cols)) as u32;
            cells.push(Rect::new(x, y, col_width, row_height));
            x += col_width as i64 + margin;
        }
        y += row_height as i64 + margin;
    }
    cells
}
