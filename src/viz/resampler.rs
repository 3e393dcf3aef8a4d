//! Band-limited circular resampling
//!
//! Converts the circular band vector (`circular_band_count` samples) into
//! [`CIRCLE_SAMPLES`] radii with a windowed-sinc FIR. The source is treated as a ring, so
//! taps that fall off either end wrap around to the other side of the circle.
//!
//! Each output sample sits at a fractional source position. The fractional part selects a
//! polyphase branch of the filter (every `samples_per_crossing`-th coefficient), and the
//! remainder below one table step is linearly interpolated with `deltas`.

use crate::tables::{CIRCLE_SAMPLES, FirTable};

/// Per-frame inputs that scale the filtered result into radii
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResampleParams {
    pub radius_base: f32,
    pub volume: f32,
    /// Pixels per unit of filtered band energy
    pub scale: f32,
}

/// Windowed-sinc interpolator with a reused output buffer
#[derive(Debug)]
pub struct BandLimitedResampler {
    output: Vec<f32>,
    warned: bool,
}

impl BandLimitedResampler {
    pub fn new() -> Self {
        Self {
            output: vec![0.0; CIRCLE_SAMPLES],
            warned: false,
        }
    }

    /// Resample `bands` onto the circle
    ///
    /// Always returns exactly [`CIRCLE_SAMPLES`] radii. An empty band vector or an unusable
    /// FIR table yields the plain `radius_base` circle.
    pub fn resample(&mut self, fir: &FirTable, bands: &[f32], params: ResampleParams) -> &[f32] {
        if bands.is_empty() || !fir.is_usable() {
            if !self.warned {
                log::warn!(
                    "Resampler degraded: {} bands, filter size {}, {} samples per crossing",
                    bands.len(),
                    fir.filter_size(),
                    fir.samples_per_crossing
                );
                self.warned = true;
            }
            self.output.fill(params.radius_base);
            return &self.output;
        }

        let len = bands.len() as isize;
        let step = bands.len() as f32 / CIRCLE_SAMPLES as f32;
        let samples_per_crossing = fir.samples_per_crossing;
        let filter_size = fir.filter_size();
        let half = fir.half_crossing_count as isize;

        let mut cursor: isize = 0;
        let mut fraction = 0.0_f32;

        for out in self.output.iter_mut() {
            let tap_index = fraction * samples_per_crossing as f32;
            let integral_tap = tap_index.floor();
            let tap_fraction = tap_index - integral_tap;

            let mut sum = 0.0_f32;
            let mut i = integral_tap as usize;
            let mut j = half;
            while i < filter_size {
                let source = (cursor + j).rem_euclid(len) as usize;
                let weight = match (fir.coefficients.get(i), fir.deltas.get(i)) {
                    (Some(&c), Some(&d)) => c + tap_fraction * d,
                    _ => 0.0,
                };
                sum += bands[source] * weight;
                i += samples_per_crossing;
                j -= 1;
            }

            *out = params.radius_base + params.volume * sum * params.scale;

            fraction += step;
            while fraction >= 1.0 {
                fraction -= 1.0;
                cursor += 1;
            }
        }

        &self.output
    }
}

impl Default for BandLimitedResampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{flat_table, sinc_table};

    const PARAMS: ResampleParams = ResampleParams {
        radius_base: 200.0,
        volume: 1.0,
        scale: 40.0,
    };

    fn test_bands(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / len as f32;
                0.5 + 0.3 * (t * 11.0).sin() + 0.2 * (t * 37.0).cos()
            })
            .collect()
    }

    fn rotated(v: &[f32], k: usize) -> Vec<f32> {
        let mut out = v.to_vec();
        out.rotate_right(k % v.len());
        out
    }

    #[test]
    fn test_silence_is_a_perfect_circle() {
        let mut resampler = BandLimitedResampler::new();
        let out = resampler.resample(&sinc_table(8, 16), &[0.0; 128], PARAMS);
        assert_eq!(out.len(), CIRCLE_SAMPLES);
        assert!(out.iter().all(|&r| r == PARAMS.radius_base));
    }

    #[test]
    fn test_full_scale_closed_form() {
        let fir = flat_table(8, 16, 0.0625);
        let mut resampler = BandLimitedResampler::new();
        let out = resampler.resample(&fir, &[1.0; 128], PARAMS);

        // One polyphase branch per output sample: crossing_count taps
        let branch_sum: f32 = fir.coefficients.iter().sum::<f32>() / fir.samples_per_crossing as f32;
        let expected = PARAMS.radius_base + PARAMS.scale * branch_sum;
        for &r in out {
            assert!((r - expected).abs() < 1e-4, "got {}, expected {}", r, expected);
        }
    }

    #[test]
    fn test_rotation_consistency() {
        let fir = sinc_table(8, 16);
        let bands = test_bands(128);
        let step = 128.0 / CIRCLE_SAMPLES as f32;

        let mut resampler = BandLimitedResampler::new();
        let reference = resampler.resample(&fir, &bands, PARAMS).to_vec();

        for k in [1, 5, 64, 127, 300] {
            let shift = (k as f32 / step).round() as usize;
            let expected = rotated(&reference, shift);
            let got = resampler.resample(&fir, &rotated(&bands, k), PARAMS);
            for (s, (a, b)) in got.iter().zip(&expected).enumerate() {
                assert!((a - b).abs() < 1e-3, "k={} sample {}: {} vs {}", k, s, a, b);
            }
        }
    }

    #[test]
    fn test_linear_in_amplitude() {
        let fir = sinc_table(8, 16);
        let bands = test_bands(128);
        let c = 2.5;
        let scaled: Vec<f32> = bands.iter().map(|v| v * c).collect();

        let mut resampler = BandLimitedResampler::new();
        let base = resampler.resample(&fir, &bands, PARAMS).to_vec();
        let out = resampler.resample(&fir, &scaled, PARAMS);

        for (a, b) in out.iter().zip(&base) {
            let expected = PARAMS.radius_base + c * (b - PARAMS.radius_base);
            assert!((a - expected).abs() < 1e-2, "{} vs {}", a, expected);
        }
    }

    #[test]
    fn test_output_length_independent_of_band_count() {
        let fir = sinc_table(8, 16);
        let mut resampler = BandLimitedResampler::new();
        for len in [1, 3, 128, 2000] {
            let out = resampler.resample(&fir, &test_bands(len), PARAMS);
            assert_eq!(out.len(), CIRCLE_SAMPLES);
            assert!(out.iter().all(|r| r.is_finite()));
        }
    }

    #[test]
    fn test_single_band_wraps_onto_itself() {
        let fir = flat_table(4, 4, 0.25);
        let mut resampler = BandLimitedResampler::new();
        let out = resampler.resample(&fir, &[0.5], PARAMS);
        // Every tap reads the only band: 4 * 0.25 * 0.5
        assert!(out.iter().all(|&r| (r - (PARAMS.radius_base + PARAMS.scale * 0.5)).abs() < 1e-4));
    }

    #[test]
    fn test_unusable_table_degrades_to_base_circle() {
        let mut fir = sinc_table(8, 16);
        fir.half_crossing_count = 0;
        let mut resampler = BandLimitedResampler::new();
        let out = resampler.resample(&fir, &test_bands(128), PARAMS);
        assert!(out.iter().all(|&r| r == PARAMS.radius_base));
        assert!(resampler.resample(&sinc_table(8, 16), &[], PARAMS).iter().all(|&r| r == 200.0));
    }

    #[test]
    fn test_truncated_coefficients_contribute_nothing() {
        let mut fir = flat_table(8, 16, 0.0625);
        fir.coefficients.truncate(64);
        let mut resampler = BandLimitedResampler::new();
        let out = resampler.resample(&fir, &[1.0; 128], PARAMS);
        assert!(out.iter().all(|&r| r < PARAMS.radius_base + PARAMS.scale * 0.5));
        assert!(out.iter().all(|&r| r > PARAMS.radius_base));
    }

    #[test]
    fn test_volume_scales_deviation() {
        let fir = flat_table(8, 16, 0.0625);
        let mut resampler = BandLimitedResampler::new();
        let quiet = ResampleParams {
            volume: 0.5,
            ..PARAMS
        };
        let out = resampler.resample(&fir, &[1.0; 128], quiet);
        assert!((out[0] - (PARAMS.radius_base + 0.5 * PARAMS.scale * 0.5)).abs() < 1e-4);
    }
}
