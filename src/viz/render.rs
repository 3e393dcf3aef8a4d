//! Radial rendering onto a [`Surface`]
//!
//! Drawing happens in a frame centered on the surface and rotated by -90 degrees, so that
//! a direction vector `(cos a, sin a)` starts at the top and runs clockwise.

use tiny_skia::Color;

use super::frequency::BandEnergy;
use super::geometry::{ROTATION_DEGREES, RenderGeometry};
use super::surface::Surface;
use crate::error::Result;
use crate::tables::{Direction, WaveformEnvelope};

/// Fraction of the ring radius added per unit of low-band energy
pub const LOW_FREQ_PULSE: f32 = 0.15;

const OVERLAY_WIDTH: f32 = 2.0;
/// Anti-aliasing spill around drawn content
const CLEAR_MARGIN: f32 = 2.0;

fn waveform_color() -> Color {
    Color::from_rgba8(255, 255, 255, 46)
}

fn hover_color() -> Color {
    Color::from_rgba8(255, 255, 255, 110)
}

/// Convert HSL (hue in degrees, saturation and lightness in 0..1) to an opaque color
pub fn hsl(hue: f32, saturation: f32, lightness: f32) -> Color {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;

    Color::from_rgba(
        (r + m).clamp(0.0, 1.0),
        (g + m).clamp(0.0, 1.0),
        (b + m).clamp(0.0, 1.0),
        1.0,
    )
    .unwrap_or(Color::WHITE)
}

/// Band ring color: fixed hue, brighter and more saturated with high-band energy
pub fn band_color(hue: f32, high_freq: f32) -> Color {
    let energy = high_freq.clamp(0.0, 1.0);
    hsl(hue, (36.0 + energy * 64.0) / 100.0, (47.0 + energy * 53.0) / 100.0)
}

/// Axis-aligned extent of drawn content in the rotated frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min_x: f32::INFINITY,
            min_y: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    fn include(&mut self, (x, y): (f32, f32)) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    fn padded(self, margin: f32) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            max_x: self.max_x + margin,
            max_y: self.max_y + margin,
        }
    }
}

/// Everything one frame needs to draw
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    /// Resampled radii, one per direction
    pub radii: &'a [f32],
    pub directions: &'a [Direction],
    pub envelope: &'a WaveformEnvelope,
    pub energy: BandEnergy,
    pub volume: f32,
    pub playback_angle: f32,
    pub hover_angle: Option<f32>,
}

/// What needs clearing before the next frame
#[derive(Debug, Clone, Copy, PartialEq)]
enum Dirty {
    /// Surface was just reconfigured
    Everything,
    Region(Bounds),
    Nothing,
}

/// Draws the band ring, waveform ring and playback overlay
#[derive(Debug)]
pub struct RadialRenderer {
    geometry: RenderGeometry,
    hue: f32,
    dirty: Dirty,
}

impl RadialRenderer {
    pub fn new(hue: f32) -> Self {
        Self {
            geometry: RenderGeometry::new(0.0, 0.0, 1.0),
            hue,
            dirty: Dirty::Everything,
        }
    }

    pub fn geometry(&self) -> &RenderGeometry {
        &self.geometry
    }

    /// Reconfigure the surface and the polar frame for a new logical size
    pub fn resize(
        &mut self,
        surface: &mut dyn Surface,
        width: f32,
        height: f32,
        pixel_ratio: f32,
    ) -> Result<()> {
        let geometry = RenderGeometry::new(width, height, pixel_ratio);
        let (physical_width, physical_height) = geometry.physical_size();
        surface.resize(physical_width, physical_height)?;

        let (cx, cy) = geometry.center();
        surface.restore();
        surface.save();
        surface.scale(geometry.pixel_ratio, geometry.pixel_ratio);
        surface.translate(cx, cy);
        surface.rotate(ROTATION_DEGREES);

        log::debug!(
            "Resized to {}x{} @{}x: radius_base={:.1}, radius_scale={:.1}",
            width,
            height,
            geometry.pixel_ratio,
            geometry.radius_base,
            geometry.radius_scale
        );

        self.geometry = geometry;
        self.dirty = Dirty::Everything;
        Ok(())
    }

    /// Draw one frame
    pub fn draw(&mut self, surface: &mut dyn Surface, frame: &FrameInput<'_>) {
        self.clear(surface);

        if self.geometry.is_empty() {
            return;
        }

        let mut bounds = Bounds::empty();
        self.draw_band_ring(surface, frame, &mut bounds);
        self.draw_waveform_ring(surface, frame, &mut bounds);
        self.draw_overlay(surface, frame, &mut bounds);

        self.dirty = if bounds.is_empty() {
            Dirty::Nothing
        } else {
            Dirty::Region(bounds.padded(OVERLAY_WIDTH + CLEAR_MARGIN))
        };
    }

    fn clear(&self, surface: &mut dyn Surface) {
        match self.dirty {
            Dirty::Everything => {
                // Rotated by -90 degrees: logical width runs along y
                let (cx, cy) = self.geometry.center();
                surface.clear_rect(-cy, -cx, self.geometry.height, self.geometry.width);
            }
            Dirty::Region(b) => {
                surface.clear_rect(b.min_x, b.min_y, b.max_x - b.min_x, b.max_y - b.min_y);
            }
            Dirty::Nothing => {}
        }
    }

    fn draw_band_ring(
        &self,
        surface: &mut dyn Surface,
        frame: &FrameInput<'_>,
        bounds: &mut Bounds,
    ) {
        let pulse = 1.0 + frame.energy.low * LOW_FREQ_PULSE;

        surface.begin_path();
        for (s, (&radius, direction)) in frame.radii.iter().zip(frame.directions).enumerate() {
            let point = direction.at(radius * pulse);
            if s == 0 {
                surface.move_to(point.0, point.1);
            } else {
                surface.line_to(point.0, point.1);
            }
            bounds.include(point);
        }
        surface.close_path();
        surface.fill(band_color(self.hue, frame.energy.high));
    }

    fn draw_waveform_ring(
        &self,
        surface: &mut dyn Surface,
        frame: &FrameInput<'_>,
        bounds: &mut Bounds,
    ) {
        let envelope = frame.envelope;
        if envelope.is_empty() {
            return;
        }

        let center_axis = self.geometry.center_axis();
        let amplitude = frame.volume * self.geometry.waveform_half_height;
        let mut point_at = |i: usize, pick_max: bool| {
            let (min, max) = envelope.pair(i)?;
            let direction = envelope.direction(i)?;
            let value = if pick_max { max } else { min };
            let point = direction.at(center_axis + value * amplitude);
            bounds.include(point);
            Some(point)
        };

        surface.begin_path();
        let mut started = false;
        let forward = (0..envelope.len()).map(|i| (i, false));
        let backward = (0..envelope.len()).rev().map(|i| (i, true));
        for (i, pick_max) in forward.chain(backward) {
            let Some((x, y)) = point_at(i, pick_max) else {
                continue;
            };
            if started {
                surface.line_to(x, y);
            } else {
                surface.move_to(x, y);
                started = true;
            }
        }
        surface.close_path();
        surface.fill(waveform_color());
    }

    fn draw_overlay(&self, surface: &mut dyn Surface, frame: &FrameInput<'_>, bounds: &mut Bounds) {
        self.draw_marker(surface, frame.volume, frame.playback_angle, Color::WHITE, bounds);
        if let Some(angle) = frame.hover_angle {
            self.draw_marker(surface, frame.volume, angle, hover_color(), bounds);
        }
    }

    fn draw_marker(
        &self,
        surface: &mut dyn Surface,
        volume: f32,
        angle: f32,
        color: Color,
        bounds: &mut Bounds,
    ) {
        let center_axis = self.geometry.center_axis();
        let reach = volume * self.geometry.waveform_half_height;
        let direction = Direction::from_angle(angle);
        let inner = direction.at(center_axis - reach);
        let outer = direction.at(center_axis + reach);

        surface.begin_path();
        surface.move_to(inner.0, inner.1);
        surface.line_to(outer.0, outer.1);
        surface.stroke(color, OVERLAY_WIDTH);

        bounds.include(inner);
        bounds.include(outer);
    }
}
