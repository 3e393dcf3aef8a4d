//! WAV clips and feeding them into the analysers

use anyhow::{Context, Result, anyhow};
use std::path::Path;

use crate::analysis::{AnalysisSource, FftAnalyser};

/// Decoded stereo PCM, normalized to [-1.0, 1.0]
#[derive(Debug, Clone)]
pub struct StereoClip {
    sample_rate: u32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl StereoClip {
    pub fn from_channels(sample_rate: u32, left: Vec<f32>, right: Vec<f32>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(anyhow!("Sample rate must be positive"));
        }
        if left.len() != right.len() {
            return Err(anyhow!(
                "Channel lengths differ: {} vs {}",
                left.len(),
                right.len()
            ));
        }
        Ok(Self {
            sample_rate,
            left,
            right,
        })
    }

    /// Read a WAV file; mono is duplicated to both channels, extra channels are ignored
    pub fn open(path: &Path) -> Result<Self> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 {
            return Err(anyhow!("WAV file has no channels: {}", path.display()));
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode float samples")?,
            hound::SampleFormat::Int => {
                let full_scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<std::result::Result<_, _>>()
                    .context("Failed to decode integer samples")?
            }
        };

        let right_channel = if channels > 1 { 1 } else { 0 };
        let frames = samples.chunks_exact(channels);
        let left = frames.clone().map(|f| f[0]).collect();
        let right = frames.map(|f| f[right_channel]).collect();

        log::info!(
            "Loaded {}: {} Hz, {} channel(s), {} bits",
            path.display(),
            spec.sample_rate,
            channels,
            spec.bits_per_sample
        );

        Self::from_channels(spec.sample_rate, left, right)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Seconds
    pub fn duration(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Average of both channels, for building a waveform envelope
    pub fn mixdown(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .map(|(l, r)| (l + r) / 2.0)
            .collect()
    }

    /// Frame index at `seconds`, clamped to the clip
    pub fn frame_at(&self, seconds: f32) -> usize {
        ((seconds.max(0.0) * self.sample_rate as f32) as usize).min(self.frames())
    }
}

/// Pushes clip audio into a pair of analysers as playback advances
#[derive(Debug, Default)]
pub struct ClipFeeder {
    cursor: usize,
}

impl ClipFeeder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed everything between the last fed frame and `position` seconds
    ///
    /// Only the most recent analysis window is written, so a seek or a long gap costs no
    /// more than one window.
    pub fn feed_until(
        &mut self,
        clip: &StereoClip,
        position: f32,
        left: &mut FftAnalyser,
        right: &mut FftAnalyser,
    ) {
        let target = clip.frame_at(position);
        let window = left.frequency_bin_count() * 2;
        let start = if target < self.cursor {
            target.saturating_sub(window)
        } else {
            self.cursor.max(target.saturating_sub(window))
        };

        if start < target {
            left.write_samples(&clip.left[start..target]);
            right.write_samples(&clip.right[start..target]);
        }
        self.cursor = target;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
