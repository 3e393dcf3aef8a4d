//! Precomputed data products consumed by the visualizer
//!
//! The constant-Q mapping, the FIR interpolation table and the waveform envelope are
//! produced elsewhere and shipped as JSON. This module only loads, validates and reads them.

mod constant_q;
mod fir;
mod waveform;

pub use constant_q::{BandKernel, ConstantQTable};
pub use fir::FirTable;
pub use waveform::WaveformEnvelope;

#[cfg(test)]
pub(crate) use constant_q::uniform_table;
#[cfg(test)]
pub(crate) use fir::{flat_table, sinc_table};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, VizError};

/// Number of angular samples around the circle
pub const CIRCLE_SAMPLES: usize = 1024;

/// Unit direction vector for one angular sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub x: f32,
    pub y: f32,
}

impl Direction {
    pub fn from_angle(theta: f32) -> Self {
        Self {
            x: theta.cos(),
            y: theta.sin(),
        }
    }

    /// Point at `radius` along this direction
    #[inline]
    pub fn at(self, radius: f32) -> (f32, f32) {
        (self.x * radius, self.y * radius)
    }
}

/// Evenly spaced directions starting at angle 0
pub fn circle_directions(count: usize) -> Vec<Direction> {
    (0..count)
        .map(|i| Direction::from_angle(std::f32::consts::TAU * i as f32 / count as f32))
        .collect()
}

/// Both asynchronously loaded tables
#[derive(Debug, Clone)]
pub struct Tables {
    pub constant_q: ConstantQTable,
    pub fir: FirTable,
}

/// Load the constant-Q and FIR tables concurrently
pub async fn load_tables(constant_q: &Path, fir: &Path) -> Result<Tables> {
    let (constant_q, fir) = tokio::try_join!(ConstantQTable::load(constant_q), FirTable::load(fir))?;
    log::info!(
        "Loaded tables: {} magnitude bins -> {} bands, FIR {}x{}",
        constant_q.num_magnitude_bins,
        constant_q.circular_band_count(),
        fir.crossing_count,
        fir.samples_per_crossing
    );
    Ok(Tables { constant_q, fir })
}

fn invalid(table: &'static str, reason: impl Into<String>) -> VizError {
    VizError::InvalidTable {
        table,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_directions_are_unit_vectors() {
        let dirs = circle_directions(CIRCLE_SAMPLES);
        assert_eq!(dirs.len(), CIRCLE_SAMPLES);
        for d in &dirs {
            assert!(((d.x * d.x + d.y * d.y) - 1.0).abs() < 1e-5);
        }
        assert_eq!(dirs[0], Direction { x: 1.0, y: 0.0 });
        assert!((dirs[CIRCLE_SAMPLES / 4].y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_direction_at_scales() {
        let (x, y) = Direction { x: 0.6, y: 0.8 }.at(10.0);
        assert!((x - 6.0).abs() < 1e-5);
        assert!((y - 8.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shipped_tables_load() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let tables = load_tables(&data.join("constant_q.json"), &data.join("fir.json"))
            .await
            .unwrap();
        assert_eq!(tables.constant_q.circular_band_count(), 128);
        assert_eq!(tables.constant_q.angle.len(), CIRCLE_SAMPLES);
        assert!(tables.fir.is_usable());
    }

    #[tokio::test]
    async fn test_load_tables_missing_file_fails() {
        let dir = std::env::temp_dir().join("radialviz-missing-tables");
        let result = load_tables(&dir.join("cq.json"), &dir.join("fir.json")).await;
        assert!(matches!(result, Err(VizError::Io(_))));
    }
}
