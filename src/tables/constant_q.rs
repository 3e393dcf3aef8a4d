//! Constant-Q frequency mapping table

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{CIRCLE_SAMPLES, Direction, invalid};
use crate::error::Result;

/// Weights of one constant-Q band over a run of magnitude bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandKernel {
    /// First magnitude bin covered by this band
    pub start: usize,
    pub weights: Vec<f32>,
}

/// Precomputed mapping from linear FFT magnitude bins to constant-Q bands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantQTable {
    pub sample_rate: f32,
    pub min_frequency: f32,
    pub max_frequency: f32,
    /// Half the analyser FFT size
    pub num_magnitude_bins: usize,
    /// Bands per channel; the full circle holds twice as many
    pub num_band_bins: usize,
    pub kernels: Vec<BandKernel>,
    /// One direction per angular sample
    pub angle: Vec<Direction>,
}

impl ConstantQTable {
    pub fn circular_band_count(&self) -> usize {
        2 * self.num_band_bins
    }

    /// Project a normalized magnitude vector onto the bands
    pub fn project(&self, magnitudes: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; self.num_band_bins];
        self.project_into(magnitudes, &mut out);
        out
    }

    /// Allocation-free projection into `out` (one slot per band)
    ///
    /// Bins missing from `magnitudes` contribute nothing.
    pub fn project_into(&self, magnitudes: &[f32], out: &mut [f32]) {
        for (band, kernel) in out.iter_mut().zip(&self.kernels) {
            *band = kernel
                .weights
                .iter()
                .enumerate()
                .map(|(k, &w)| magnitudes.get(kernel.start + k).map_or(0.0, |&m| m * w))
                .sum();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_magnitude_bins == 0 || self.num_band_bins == 0 {
            return Err(invalid("constant-Q", "bin counts must be non-zero"));
        }
        if self.sample_rate <= 0.0 {
            return Err(invalid("constant-Q", "sample rate must be positive"));
        }
        if self.kernels.len() != self.num_band_bins {
            return Err(invalid(
                "constant-Q",
                format!(
                    "expected {} band kernels, found {}",
                    self.num_band_bins,
                    self.kernels.len()
                ),
            ));
        }
        if let Some((band, _)) = self
            .kernels
            .iter()
            .enumerate()
            .find(|(_, k)| k.start + k.weights.len() > self.num_magnitude_bins)
        {
            return Err(invalid(
                "constant-Q",
                format!("kernel {} reaches past bin {}", band, self.num_magnitude_bins),
            ));
        }
        if self.angle.len() != CIRCLE_SAMPLES {
            return Err(invalid(
                "constant-Q",
                format!(
                    "expected {} angle vectors, found {}",
                    CIRCLE_SAMPLES,
                    self.angle.len()
                ),
            ));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}

/// Box-kernel table where every band averages an equal run of bins
#[cfg(test)]
pub(crate) fn uniform_table(num_magnitude_bins: usize, num_band_bins: usize) -> ConstantQTable {
    let width = num_magnitude_bins / num_band_bins;
    ConstantQTable {
        sample_rate: 44100.0,
        min_frequency: 100.0,
        max_frequency: 16000.0,
        num_magnitude_bins,
        num_band_bins,
        kernels: (0..num_band_bins)
            .map(|b| BandKernel {
                start: b * width,
                weights: vec![1.0 / width as f32; width],
            })
            .collect(),
        angle: super::circle_directions(CIRCLE_SAMPLES),
    }
}
