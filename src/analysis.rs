//! Per-channel frequency analysis
//!
//! The visualizer pulls byte-domain magnitude snapshots from an [`AnalysisSource`].
//! [`FftAnalyser`] is the built-in source: it keeps the most recent `fft_size` samples of
//! one channel and produces smoothed, decibel-scaled magnitudes on demand.

use rustfft::{Fft, FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Pull-based source of byte-domain magnitude snapshots
pub trait AnalysisSource: Send {
    /// Number of magnitude bins written by [`get_byte_frequency_data`](Self::get_byte_frequency_data)
    fn frequency_bin_count(&self) -> usize;

    /// Write the current magnitudes (0..=255) into `out`
    ///
    /// Only `min(out.len(), frequency_bin_count())` entries are written.
    fn get_byte_frequency_data(&mut self, out: &mut [u8]);
}

/// Configuration for analyser behavior
#[derive(Debug, Clone)]
pub struct AnalyserConfig {
    /// FFT window size, twice the number of magnitude bins
    pub fft_size: usize,
    /// Temporal smoothing factor (0.0-1.0, higher = more smoothing)
    pub smoothing_time_constant: f32,
    /// Decibel value mapped to byte 0
    pub min_decibels: f32,
    /// Decibel value mapped to byte 255
    pub max_decibels: f32,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// FFT analyser over a sliding window of one channel
pub struct FftAnalyser {
    config: AnalyserConfig,
    samples: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl FftAnalyser {
    pub fn new() -> Self {
        Self::with_config(AnalyserConfig::default())
    }

    pub fn with_config(config: AnalyserConfig) -> Self {
        let n = config.fft_size;
        // Blackman window to reduce spectral leakage
        let window = (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                0.42 - 0.5 * (2.0 * std::f32::consts::PI * t).cos()
                    + 0.08 * (4.0 * std::f32::consts::PI * t).cos()
            })
            .collect();
        let fft = FftPlanner::new().plan_fft_forward(n);

        Self {
            samples: vec![0.0; n],
            write_pos: 0,
            window,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
            config,
        }
    }

    /// Append mono samples to the sliding window
    pub fn write_samples(&mut self, samples: &[f32]) {
        let n = self.samples.len();
        for &sample in samples {
            self.samples[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % n;
        }
    }

    /// Recompute smoothed linear magnitudes from the current window
    fn analyse(&mut self) {
        let n = self.samples.len();
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            // Oldest sample first
            let sample = self.samples[(self.write_pos + i) % n];
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let tau = self.config.smoothing_time_constant;
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[bin].norm() / n as f32;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }
    }

    fn to_byte(&self, magnitude: f32) -> u8 {
        let db = 20.0 * magnitude.max(1e-12).log10();
        let range = self.config.max_decibels - self.config.min_decibels;
        let scaled = 255.0 * (db - self.config.min_decibels) / range;
        scaled.clamp(0.0, 255.0) as u8
    }
}

impl Default for FftAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSource for FftAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.config.fft_size / 2
    }

    fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
        self.analyse();
        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            *byte = self.to_byte(magnitude);
        }
    }
}
