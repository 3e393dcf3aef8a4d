//! Static waveform envelope drawn beneath the live spectrum

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{Direction, circle_directions, invalid};
use crate::error::Result;

/// Interleaved (min, max) peak pairs, one per angular sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformEnvelope {
    peaks: Vec<f32>,
    #[serde(default)]
    directions: Vec<Direction>,
}

impl WaveformEnvelope {
    pub fn new(peaks: Vec<f32>) -> Result<Self> {
        let mut envelope = Self {
            peaks,
            directions: Vec::new(),
        };
        envelope.fill_directions()?;
        Ok(envelope)
    }

    /// Build an envelope by taking min/max over `points` equal slices of `samples`
    pub fn from_samples(samples: &[f32], points: usize) -> Result<Self> {
        let mut peaks = Vec::with_capacity(points * 2);
        for p in 0..points {
            let start = p * samples.len() / points;
            let end = ((p + 1) * samples.len() / points).max(start + 1).min(samples.len());
            let slice = samples.get(start..end).unwrap_or(&[]);
            let min = slice.iter().copied().fold(0.0_f32, f32::min);
            let max = slice.iter().copied().fold(0.0_f32, f32::max);
            peaks.push(min.clamp(-1.0, 1.0));
            peaks.push(max.clamp(-1.0, 1.0));
        }
        Self::new(peaks)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let mut envelope: Self = serde_json::from_str(json)?;
        envelope.fill_directions()?;
        Ok(envelope)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Flat envelope, used when no track waveform is available
    pub fn silent(points: usize) -> Self {
        Self {
            peaks: vec![0.0; points * 2],
            directions: circle_directions(points),
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (min, max) at angular sample `i`
    pub fn pair(&self, i: usize) -> Option<(f32, f32)> {
        Some((*self.peaks.get(2 * i)?, *self.peaks.get(2 * i + 1)?))
    }

    pub fn direction(&self, i: usize) -> Option<Direction> {
        self.directions.get(i).copied()
    }

    fn fill_directions(&mut self) -> Result<()> {
        if self.peaks.len() % 2 != 0 {
            return Err(invalid("waveform", "peaks must hold (min, max) pairs"));
        }
        if self.directions.is_empty() {
            self.directions = circle_directions(self.len());
        } else if self.directions.len() != self.len() {
            return Err(invalid(
                "waveform",
                format!(
                    "{} peak pairs but {} directions",
                    self.len(),
                    self.directions.len()
                ),
            ));
        }
        Ok(())
    }
}
