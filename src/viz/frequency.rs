//! Per-channel magnitude snapshots and band-energy accumulation

use crate::analysis::AnalysisSource;
use crate::error::{Result, VizError};
use crate::tables::ConstantQTable;

/// Multiplier applied to the normalized high-band energy
pub const HIGH_FREQ_SCALE: f32 = 3.0;

/// Highest frequency considered musically relevant
const MUSICAL_CEILING_HZ: f32 = 22050.0;

/// Bin 0 is DC, so the low band needs at least one bin above it
const MIN_HIGH_PASS_BIN: usize = 2;

/// Bin thresholds derived once from the constant-Q table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandThresholds {
    pub max_bin: usize,
    pub high_pass_bin: usize,
    pub low_pass_bin: usize,
}

impl BandThresholds {
    /// Derive thresholds, rejecting tables that would divide by zero
    pub fn derive(table: &ConstantQTable) -> Result<Self> {
        let bin_for = |freq: f32| {
            (table.num_magnitude_bins as f32 * freq / (table.sample_rate / 2.0)).round() as usize
        };
        let thresholds = Self {
            max_bin: bin_for(MUSICAL_CEILING_HZ),
            high_pass_bin: bin_for(table.min_frequency),
            low_pass_bin: bin_for(table.max_frequency),
        };

        let usable = thresholds.high_pass_bin >= MIN_HIGH_PASS_BIN
            && thresholds.high_pass_bin < thresholds.max_bin
            && thresholds.max_bin <= table.num_magnitude_bins
            && thresholds.high_pass_bin < thresholds.low_pass_bin;
        if !usable {
            return Err(VizError::Thresholds {
                max_bin: thresholds.max_bin,
                high_pass_bin: thresholds.high_pass_bin,
                low_pass_bin: thresholds.low_pass_bin,
                num_magnitude_bins: table.num_magnitude_bins,
            });
        }
        Ok(thresholds)
    }
}

/// Scalar band energies for one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandEnergy {
    pub low: f32,
    pub high: f32,
}

#[derive(Debug)]
struct ChannelSnapshot {
    bytes: Vec<u8>,
    normalized: Vec<f32>,
    low_sum: f32,
    high_sum: f32,
}

impl ChannelSnapshot {
    fn new(num_bins: usize) -> Self {
        Self {
            bytes: vec![0; num_bins],
            normalized: vec![0.0; num_bins],
            low_sum: 0.0,
            high_sum: 0.0,
        }
    }

    /// Normalize bytes to 0..1 while accumulating band sums
    fn normalize(&mut self, thresholds: &BandThresholds) {
        self.low_sum = 0.0;
        self.high_sum = 0.0;
        for (i, (value, &byte)) in self.normalized.iter_mut().zip(&self.bytes).enumerate() {
            *value = byte as f32 / 255.0;
            if i < thresholds.max_bin {
                // Bin 0 carries DC
                if i > 0 && i < thresholds.high_pass_bin {
                    self.low_sum += *value;
                } else if i >= thresholds.high_pass_bin {
                    self.high_sum += *value;
                }
            }
        }
    }
}

/// Reused per-frame storage for both channels
#[derive(Debug)]
pub struct FrequencyBuffer {
    left: ChannelSnapshot,
    right: ChannelSnapshot,
    thresholds: BandThresholds,
}

impl FrequencyBuffer {
    pub fn new(num_bins: usize, thresholds: BandThresholds) -> Self {
        Self {
            left: ChannelSnapshot::new(num_bins),
            right: ChannelSnapshot::new(num_bins),
            thresholds,
        }
    }

    /// Pull fresh snapshots from both sources and derive band energy
    pub fn refresh(
        &mut self,
        left: &mut dyn AnalysisSource,
        right: &mut dyn AnalysisSource,
    ) -> BandEnergy {
        left.get_byte_frequency_data(&mut self.left.bytes);
        right.get_byte_frequency_data(&mut self.right.bytes);
        self.normalize()
    }

    /// Recompute normalized vectors and band energy from the byte snapshots
    pub fn normalize(&mut self) -> BandEnergy {
        self.left.normalize(&self.thresholds);
        self.right.normalize(&self.thresholds);

        let t = &self.thresholds;
        BandEnergy {
            low: (self.left.low_sum + self.right.low_sum) / (2 * t.high_pass_bin) as f32,
            high: HIGH_FREQ_SCALE * (self.left.high_sum + self.right.high_sum)
                / (2 * (t.max_bin - t.high_pass_bin)) as f32,
        }
    }

    pub fn left(&self) -> &[f32] {
        &self.left.normalized
    }

    pub fn right(&self) -> &[f32] {
        &self.right.normalized
    }

    pub fn thresholds(&self) -> BandThresholds {
        self.thresholds
    }

    #[cfg(test)]
    pub(crate) fn bytes_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        (&mut self.left.bytes, &mut self.right.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::uniform_table;

    struct Constant(u8);

    impl AnalysisSource for Constant {
        fn frequency_bin_count(&self) -> usize {
            512
        }

        fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
            out.fill(self.0);
        }
    }

    #[test]
    fn test_thresholds_from_table() {
        // 512 bins over 22050 Hz: 100 Hz -> 2.3, 16 kHz -> 371.5
        let t = BandThresholds::derive(&uniform_table(512, 64)).unwrap();
        assert_eq!(t.max_bin, 512);
        assert_eq!(t.high_pass_bin, 2);
        assert_eq!(t.low_pass_bin, 372);
    }

    #[test]
    fn test_thresholds_reject_zero_high_pass() {
        let mut table = uniform_table(512, 64);
        table.min_frequency = 5.0;
        assert!(matches!(
            BandThresholds::derive(&table),
            Err(VizError::Thresholds { high_pass_bin: 0, .. })
        ));
    }

    #[test]
    fn test_thresholds_reject_empty_low_band() {
        // 30 Hz rounds to bin 1, leaving nothing between DC and the high band
        let mut table = uniform_table(512, 64);
        table.min_frequency = 30.0;
        assert!(matches!(
            BandThresholds::derive(&table),
            Err(VizError::Thresholds { high_pass_bin: 1, .. })
        ));
    }

    #[test]
    fn test_thresholds_reject_low_sample_rate() {
        let mut table = uniform_table(512, 64);
        table.sample_rate = 22050.0;
        assert!(BandThresholds::derive(&table).is_err());
    }

    #[test]
    fn test_full_scale_energy() {
        let mut table = uniform_table(512, 64);
        table.min_frequency = 430.0; // high_pass_bin = 10
        let thresholds = BandThresholds::derive(&table).unwrap();
        assert_eq!(thresholds.high_pass_bin, 10);

        let mut buffer = FrequencyBuffer::new(512, thresholds);
        let energy = buffer.refresh(&mut Constant(255), &mut Constant(255));

        // Bins 1..10 per channel, normalized by 2 * 10
        assert!((energy.low - 0.9).abs() < 1e-5);
        assert!((energy.high - HIGH_FREQ_SCALE).abs() < 1e-4);
        assert!(buffer.left().iter().all(|&v| v == 1.0));
        assert_eq!(buffer.right().len(), 512);
    }

    #[test]
    fn test_silence_has_no_energy() {
        let thresholds = BandThresholds::derive(&uniform_table(512, 64)).unwrap();
        let mut buffer = FrequencyBuffer::new(512, thresholds);
        let energy = buffer.refresh(&mut Constant(0), &mut Constant(0));
        assert_eq!(energy, BandEnergy::default());
    }

    #[test]
    fn test_dc_bin_excluded_from_low_band() {
        let mut table = uniform_table(512, 64);
        table.min_frequency = 430.0;
        let mut buffer = FrequencyBuffer::new(512, BandThresholds::derive(&table).unwrap());
        let (left, right) = buffer.bytes_mut();
        left[0] = 255;
        right[0] = 255;
        let energy = buffer.normalize();
        assert_eq!(energy.low, 0.0);
        assert_eq!(buffer.left()[0], 1.0);
    }
}
