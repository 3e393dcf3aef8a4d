//! Surface-dependent radii

/// Rotation applied to the drawing frame so that angle 0 points up
pub const ROTATION_DEGREES: f32 = -90.0;

/// Upper bound for the waveform ring half height, in logical pixels
pub const MAX_WAVEFORM_HALF_HEIGHT: f32 = 50.0;

/// Layout of the polar frame, recomputed on every resize
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderGeometry {
    /// Logical width
    pub width: f32,
    /// Logical height
    pub height: f32,
    /// Physical pixels per logical pixel
    pub pixel_ratio: f32,
    pub radius_scale: f32,
    pub radius_base: f32,
    pub waveform_half_height: f32,
}

impl RenderGeometry {
    pub fn new(width: f32, height: f32, pixel_ratio: f32) -> Self {
        let width = width.max(0.0);
        let height = height.max(0.0);
        let half_extent = width.min(height) / 2.0;
        let radius_scale = half_extent / 4.0;
        let radius_base = half_extent - 0.75 * radius_scale;

        Self {
            width,
            height,
            pixel_ratio: if pixel_ratio > 0.0 { pixel_ratio } else { 1.0 },
            radius_scale,
            radius_base,
            waveform_half_height: MAX_WAVEFORM_HALF_HEIGHT.min(radius_base / 4.0),
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Backing store size for this layout
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width * self.pixel_ratio).ceil().max(1.0) as u32,
            (self.height * self.pixel_ratio).ceil().max(1.0) as u32,
        )
    }

    /// Radius around which the waveform ring and the playback marker are centered
    pub fn center_axis(&self) -> f32 {
        self.radius_base - self.waveform_half_height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}
