//! Raster drawing surface
//!
//! The renderer talks to a small canvas-like interface: a current transform with a
//! save/restore stack, one path under construction, fill/stroke and rectangular clear.

use tiny_skia::*;

use crate::error::{Result, VizError};

/// Canvas-style 2D surface
pub trait Surface {
    /// Backing size in physical pixels
    fn size(&self) -> (u32, u32);

    /// Reallocate the backing store; resets the transform and the save stack
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn save(&mut self);
    /// Pop the last saved transform, or reset to identity when nothing was saved
    fn restore(&mut self);
    fn scale(&mut self, sx: f32, sy: f32);
    fn rotate(&mut self, degrees: f32);
    fn translate(&mut self, tx: f32, ty: f32);

    /// Make a rectangle (in current coordinates) fully transparent
    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    fn close_path(&mut self);
    fn fill(&mut self, color: Color);
    fn stroke(&mut self, color: Color, width: f32);
}

#[derive(Debug, Clone, Copy)]
enum PathOp {
    Move(f32, f32),
    Line(f32, f32),
    Close,
}

/// [`Surface`] backed by a tiny-skia pixmap
pub struct PixmapSurface {
    pixmap: Pixmap,
    transform: Transform,
    stack: Vec<Transform>,
    path: Vec<PathOp>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            pixmap: new_pixmap(width, height)?,
            transform: Transform::identity(),
            stack: Vec::new(),
            path: Vec::new(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn save_png(&self, path: &std::path::Path) -> Result<()> {
        self.pixmap
            .save_png(path)
            .map_err(|e| VizError::Surface(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn build_path(&self) -> Option<Path> {
        let mut pb = PathBuilder::new();
        for op in &self.path {
            match *op {
                PathOp::Move(x, y) => pb.move_to(x, y),
                PathOp::Line(x, y) => pb.line_to(x, y),
                PathOp::Close => pb.close(),
            }
        }
        pb.finish()
    }
}

fn new_pixmap(width: u32, height: u32) -> Result<Pixmap> {
    Pixmap::new(width, height)
        .ok_or_else(|| VizError::Surface(format!("Cannot allocate {}x{} pixmap", width, height)))
}

impl Surface for PixmapSurface {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.size() != (width, height) {
            self.pixmap = new_pixmap(width, height)?;
        } else {
            self.pixmap.fill(Color::TRANSPARENT);
        }
        self.transform = Transform::identity();
        self.stack.clear();
        Ok(())
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
    }

    fn restore(&mut self) {
        self.transform = self.stack.pop().unwrap_or_else(Transform::identity);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.transform = self.transform.pre_scale(sx, sy);
    }

    fn rotate(&mut self, degrees: f32) {
        self.transform = self.transform.pre_rotate(degrees);
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.transform = self.transform.pre_translate(tx, ty);
    }

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let Some(rect) = Rect::from_xywh(x, y, width, height) else {
            return;
        };

        let mut paint = Paint::default();
        paint.blend_mode = BlendMode::Clear;
        paint.anti_alias = false;

        self.pixmap.fill_rect(rect, &paint, self.transform, None);
    }

    fn begin_path(&mut self) {
        self.path.clear();
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.path.push(PathOp::Move(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.push(PathOp::Line(x, y));
    }

    fn close_path(&mut self) {
        self.path.push(PathOp::Close);
    }

    fn fill(&mut self, color: Color) {
        let Some(path) = self.build_path() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, self.transform, None);
    }

    fn stroke(&mut self, color: Color, width: f32) {
        let Some(path) = self.build_path() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Stroke::default()
        };

        self.pixmap
            .stroke_path(&path, &paint, &stroke, self.transform, None);
    }
}

/// Surface call recorded by [`RecordingSurface`]
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Resize(u32, u32),
    Save,
    Restore,
    Scale(f32, f32),
    Rotate(f32),
    Translate(f32, f32),
    ClearRect(f32, f32, f32, f32),
    BeginPath,
    MoveTo(f32, f32),
    LineTo(f32, f32),
    ClosePath,
    Fill(Color),
    Stroke(Color, f32),
}

/// Surface that only records what was asked of it
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSurface {
    pub size: (u32, u32),
    pub calls: Vec<Call>,
}

#[cfg(test)]
impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.size = (width, height);
        self.calls.push(Call::Resize(width, height));
        Ok(())
    }

    fn save(&mut self) {
        self.calls.push(Call::Save);
    }

    fn restore(&mut self) {
        self.calls.push(Call::Restore);
    }

    fn scale(&mut self, sx: f32, sy: f32) {
        self.calls.push(Call::Scale(sx, sy));
    }

    fn rotate(&mut self, degrees: f32) {
        self.calls.push(Call::Rotate(degrees));
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.calls.push(Call::Translate(tx, ty));
    }

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.calls.push(Call::ClearRect(x, y, width, height));
    }

    fn begin_path(&mut self) {
        self.calls.push(Call::BeginPath);
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.calls.push(Call::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.calls.push(Call::LineTo(x, y));
    }

    fn close_path(&mut self) {
        self.calls.push(Call::ClosePath);
    }

    fn fill(&mut self, color: Color) {
        self.calls.push(Call::Fill(color));
    }

    fn stroke(&mut self, color: Color, width: f32) {
        self.calls.push(Call::Stroke(color, width));
    }
}
