//! Windowed-sinc FIR interpolation table

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::invalid;
use crate::error::Result;

/// Polyphase filter coefficients with per-tap linear-interpolation deltas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirTable {
    pub coefficients: Vec<f32>,
    /// `coefficients[i + 1] - coefficients[i]`, used for sub-tap accuracy
    pub deltas: Vec<f32>,
    pub crossing_count: usize,
    pub samples_per_crossing: usize,
    pub half_crossing_count: usize,
}

impl FirTable {
    pub fn filter_size(&self) -> usize {
        self.crossing_count * self.samples_per_crossing
    }

    /// True when the resampler has something to convolve with
    pub fn is_usable(&self) -> bool {
        self.filter_size() > 0 && self.samples_per_crossing > 0 && self.half_crossing_count > 0
    }

    pub fn validate(&self) -> Result<()> {
        if self.coefficients.len() != self.deltas.len() {
            return Err(invalid(
                "FIR",
                format!(
                    "{} coefficients but {} deltas",
                    self.coefficients.len(),
                    self.deltas.len()
                ),
            ));
        }
        if self.coefficients.len() < self.filter_size() {
            return Err(invalid(
                "FIR",
                format!(
                    "filter size {} exceeds {} coefficients",
                    self.filter_size(),
                    self.coefficients.len()
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

/// Every tap carries the same weight, so each phase sums to `crossing_count * weight`
#[cfg(test)]
pub(crate) fn flat_table(crossing_count: usize, samples_per_crossing: usize, weight: f32) -> FirTable {
    let size = crossing_count * samples_per_crossing;
    FirTable {
        coefficients: vec![weight; size],
        deltas: vec![0.0; size],
        crossing_count,
        samples_per_crossing,
        half_crossing_count: crossing_count / 2,
    }
}

/// Blackman-windowed sinc with real deltas
#[cfg(test)]
pub(crate) fn sinc_table(crossing_count: usize, samples_per_crossing: usize) -> FirTable {
    use std::f64::consts::PI;

    let size = crossing_count * samples_per_crossing;
    let half = crossing_count / 2;
    let coefficients: Vec<f32> = (0..size)
        .map(|i| {
            let x = i as f64 / samples_per_crossing as f64 - half as f64;
            let sinc = if x == 0.0 { 1.0 } else { (PI * x).sin() / (PI * x) };
            let n = i as f64 / size as f64;
            let window = 0.42 - 0.5 * (2.0 * PI * n).cos() + 0.08 * (4.0 * PI * n).cos();
            (sinc * window) as f32
        })
        .collect();
    let deltas = (0..size)
        .map(|i| coefficients.get(i + 1).copied().unwrap_or(0.0) - coefficients[i])
        .collect();
    FirTable {
        coefficients,
        deltas,
        crossing_count,
        samples_per_crossing,
        half_crossing_count: half,
    }
}
