//! Audio-reactive radial spectrum visualizer
//!
//! Live stereo spectra are projected through a constant-Q table, resampled onto a circle
//! with a windowed-sinc filter and drawn as a polar outline around a static waveform ring,
//! with a playback head that keeps moving between position updates.

pub mod analysis;
pub mod audio;
pub mod conf;
pub mod error;
pub mod tables;
pub mod viz;

pub use error::{Result, VizError};
