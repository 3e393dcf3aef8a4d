//! The radial visualizer
//!
//! [`Visualizer`] owns the whole per-frame pipeline:
//!
//! ```text
//! analysis sources -> FrequencyBuffer -> ConstantQProjector -> BandLimitedResampler
//!                                                                      |
//!                 PlaybackState -> playback angle ----------> RadialRenderer -> Surface
//! ```
//!
//! The host calls [`Visualizer::frame`] from a [`FrameLoop`] and forwards resize,
//! visibility and playback events; the [`FrameScheduler`] decides whether a tick draws.

pub mod frame_loop;
pub mod frequency;
pub mod geometry;
pub mod playback;
pub mod projector;
pub mod render;
pub mod resampler;
pub mod scheduler;
pub mod surface;

pub use frame_loop::{FrameControl, FrameLoop};
pub use frequency::{BandEnergy, BandThresholds, FrequencyBuffer};
pub use geometry::RenderGeometry;
pub use playback::{PlaybackState, interpolated_position, playback_angle};
pub use projector::ConstantQProjector;
pub use render::{FrameInput, RadialRenderer};
pub use resampler::{BandLimitedResampler, ResampleParams};
pub use scheduler::{FrameDecision, FrameScheduler, Phase, SchedulerConfig, WakeReason};
pub use surface::{PixmapSurface, Surface};

use std::path::Path;
use std::time::Instant;

use crate::analysis::AnalysisSource;
use crate::error::Result;
use crate::tables::{Tables, WaveformEnvelope, load_tables};

/// Mount-time parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualizerOptions {
    /// Band ring hue in degrees
    pub hue: f32,
    /// Throttle frames for low-power devices
    pub constrained: bool,
    /// Logical surface width
    pub width: f32,
    /// Logical surface height
    pub height: f32,
    pub pixel_ratio: f32,
}

impl Default for VisualizerOptions {
    fn default() -> Self {
        Self {
            hue: 200.0,
            constrained: false,
            width: 800.0,
            height: 800.0,
            pixel_ratio: 1.0,
        }
    }
}

/// Everything that only exists once the tables are loaded
struct Pipeline {
    tables: Tables,
    frequency: FrequencyBuffer,
    projector: ConstantQProjector,
    resampler: BandLimitedResampler,
}

impl Pipeline {
    fn new(tables: Tables) -> Result<Self> {
        let thresholds = BandThresholds::derive(&tables.constant_q)?;
        log::debug!(
            "Band thresholds: max_bin={}, high_pass_bin={}, low_pass_bin={}",
            thresholds.max_bin,
            thresholds.high_pass_bin,
            thresholds.low_pass_bin
        );

        Ok(Self {
            frequency: FrequencyBuffer::new(tables.constant_q.num_magnitude_bins, thresholds),
            projector: ConstantQProjector::new(&tables.constant_q),
            resampler: BandLimitedResampler::new(),
            tables,
        })
    }
}

/// Audio-reactive radial visualizer bound to one surface and one stereo analysis pair
pub struct Visualizer<S: Surface, A: AnalysisSource> {
    scheduler: FrameScheduler,
    pipeline: Option<Pipeline>,
    renderer: RadialRenderer,
    surface: S,
    left: A,
    right: A,
    envelope: WaveformEnvelope,
}

impl<S: Surface, A: AnalysisSource> Visualizer<S, A> {
    /// Mount on `surface`; nothing is drawn until the tables are in place
    pub fn new(
        mut surface: S,
        left: A,
        right: A,
        envelope: WaveformEnvelope,
        options: VisualizerOptions,
    ) -> Result<Self> {
        let mut renderer = RadialRenderer::new(options.hue);
        renderer.resize(&mut surface, options.width, options.height, options.pixel_ratio)?;

        Ok(Self {
            scheduler: FrameScheduler::new(SchedulerConfig::new(options.constrained)),
            pipeline: None,
            renderer,
            surface,
            left,
            right,
            envelope,
        })
    }

    /// Load both tables and start running
    ///
    /// A load failure is logged and leaves the visualizer in [`Phase::Loading`], where it
    /// never draws.
    pub async fn start(&mut self, constant_q: &Path, fir: &Path) {
        if !self.scheduler.begin_loading() {
            log::warn!("Visualizer already started ({:?})", self.scheduler.phase());
            return;
        }

        let tables = match load_tables(constant_q, fir).await {
            Ok(tables) => tables,
            Err(e) => {
                log::error!("Failed to load visualizer tables: {}", e);
                return;
            }
        };

        if let Err(e) = self.install_tables(tables, Instant::now()) {
            log::error!("Unusable visualizer tables: {}", e);
        }
    }

    /// Install already loaded tables and start running
    pub fn install_tables(&mut self, tables: Tables, now: Instant) -> Result<()> {
        self.scheduler.begin_loading();
        let pipeline = Pipeline::new(tables)?;
        if self.scheduler.tables_ready(now) {
            self.pipeline = Some(pipeline);
        }
        Ok(())
    }

    /// Process one tick; draws when the scheduler says so
    pub fn tick(&mut self, now: Instant, playback: &PlaybackState) -> FrameDecision {
        let decision = self.scheduler.decide(now, playback.into());
        if decision == FrameDecision::Render {
            self.render(now, playback);
        }
        decision
    }

    /// [`tick`](Self::tick) mapped onto what the frame loop should do next
    pub fn frame(&mut self, now: Instant, playback: &PlaybackState) -> FrameControl {
        let decision = self.tick(now, playback);
        self.control(decision)
    }

    /// What the frame loop should do after a tick that produced `decision`
    pub fn control(&self, decision: FrameDecision) -> FrameControl {
        match decision {
            FrameDecision::Render | FrameDecision::Drop => FrameControl::Continue,
            FrameDecision::Suspend => FrameControl::Suspend,
            FrameDecision::Inactive => match self.scheduler.phase() {
                Phase::TornDown => FrameControl::Stop,
                Phase::Idle => FrameControl::Suspend,
                _ => FrameControl::Continue,
            },
        }
    }

    fn render(&mut self, now: Instant, playback: &PlaybackState) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };
        let Pipeline {
            tables,
            frequency,
            projector,
            resampler,
        } = pipeline;

        let geometry = *self.renderer.geometry();
        let volume = playback.volume.clamp(0.0, 1.0);

        let energy = frequency.refresh(&mut self.left, &mut self.right);
        let bands = projector.project(&tables.constant_q, frequency.left(), frequency.right());
        let radii = resampler.resample(
            &tables.fir,
            bands,
            ResampleParams {
                radius_base: geometry.radius_base,
                volume,
                scale: geometry.radius_scale,
            },
        );

        let input = FrameInput {
            radii,
            directions: &tables.constant_q.angle,
            envelope: &self.envelope,
            energy,
            volume,
            playback_angle: playback_angle(playback, now),
            hover_angle: playback.active_hover_angle(),
        };
        self.renderer.draw(&mut self.surface, &input);
    }

    /// Surface resized; true if an idle frame loop has to be woken
    pub fn on_resize(
        &mut self,
        width: f32,
        height: f32,
        pixel_ratio: f32,
        now: Instant,
    ) -> Result<bool> {
        self.renderer.resize(&mut self.surface, width, height, pixel_ratio)?;
        Ok(self.scheduler.wake(WakeReason::Resize, now))
    }

    /// Surface shown or hidden; true if an idle frame loop has to be woken
    pub fn on_visibility_change(&mut self, visible: bool, now: Instant) -> bool {
        if visible {
            self.scheduler.wake(WakeReason::Visible, now)
        } else {
            self.scheduler.hide();
            false
        }
    }

    /// Host reported a playback or hover change; true if an idle frame loop has to be woken
    pub fn on_playback_change(&mut self, now: Instant) -> bool {
        self.scheduler.wake(WakeReason::PlaybackChanged, now)
    }

    /// Tear down; the frame loop stops on its next tick
    pub fn stop(&mut self) {
        if self.scheduler.tear_down() {
            log::info!("Visualizer stopped");
        }
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    pub fn geometry(&self) -> &RenderGeometry {
        self.renderer.geometry()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Left and right analysis sources, for feeding audio
    pub fn sources_mut(&mut self) -> (&mut A, &mut A) {
        (&mut self.left, &mut self.right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{flat_table, sinc_table, uniform_table};
    use crate::viz::render::LOW_FREQ_PULSE;
    use crate::viz::surface::{Call, RecordingSurface};
    use std::time::Duration;

    struct Fixed(u8);

    impl AnalysisSource for Fixed {
        fn frequency_bin_count(&self) -> usize {
            512
        }

        fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
            out.fill(self.0);
        }
    }

    fn mounted(level: u8) -> Visualizer<RecordingSurface, Fixed> {
        let options = VisualizerOptions {
            width: 400.0,
            height: 400.0,
            ..VisualizerOptions::default()
        };
        Visualizer::new(
            RecordingSurface::default(),
            Fixed(level),
            Fixed(level),
            WaveformEnvelope::silent(0),
            options,
        )
        .unwrap()
    }

    fn tables(fir: crate::tables::FirTable) -> Tables {
        Tables {
            constant_q: uniform_table(512, 64),
            fir,
        }
    }

    /// Distance from the center of every band ring vertex; the ring is the first path drawn
    fn band_ring_radii(surface: &RecordingSurface) -> Vec<f32> {
        surface
            .calls
            .iter()
            .skip_while(|c| !matches!(c, Call::MoveTo(..)))
            .take_while(|c| **c != Call::ClosePath)
            .filter_map(|c| match *c {
                Call::MoveTo(x, y) | Call::LineTo(x, y) => Some(x.hypot(y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_silence_draws_base_circle() {
        let t0 = Instant::now();
        let mut viz = mounted(0);
        viz.install_tables(tables(sinc_table(8, 16)), t0).unwrap();
        viz.surface_mut().calls.clear();

        assert_eq!(viz.tick(t0, &PlaybackState::stopped(t0)), FrameDecision::Render);

        let base = viz.geometry().radius_base;
        let radii = band_ring_radii(viz.surface());
        assert_eq!(radii.len(), crate::tables::CIRCLE_SAMPLES);
        assert!(radii.iter().all(|r| (r - base).abs() < 1e-3));
    }

    #[test]
    fn test_full_scale_draws_closed_form_circle() {
        let t0 = Instant::now();
        let mut viz = mounted(255);
        viz.install_tables(tables(flat_table(8, 16, 0.0625)), t0).unwrap();
        viz.surface_mut().calls.clear();

        viz.tick(t0, &PlaybackState::stopped(t0));

        let g = *viz.geometry();
        // Each polyphase branch sums to 8 * 0.0625; bin 1 is the only low bin, so low = 0.5
        let expected = (g.radius_base + g.radius_scale * 0.5) * (1.0 + 0.5 * LOW_FREQ_PULSE);
        let radii = band_ring_radii(viz.surface());
        assert!(radii.iter().all(|r| (r - expected).abs() < 1e-3));
    }

    #[tokio::test]
    async fn test_shipped_table_has_low_band_energy() {
        let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("data");
        let tables = load_tables(&data.join("constant_q.json"), &data.join("fir.json"))
            .await
            .unwrap();
        let thresholds = BandThresholds::derive(&tables.constant_q).unwrap();
        assert!(thresholds.high_pass_bin >= 2);

        let mut buffer = FrequencyBuffer::new(512, thresholds);
        let energy = buffer.refresh(&mut Fixed(255), &mut Fixed(255));
        assert!(energy.low > 0.0);
        assert!(energy.high > 0.0);
    }

    #[tokio::test]
    async fn test_load_failure_stays_loading() {
        let t0 = Instant::now();
        let mut viz = mounted(0);
        let dir = std::env::temp_dir().join("radialviz-no-such-dir");
        viz.start(&dir.join("cq.json"), &dir.join("fir.json")).await;

        assert_eq!(viz.phase(), Phase::Loading);
        viz.surface_mut().calls.clear();
        assert_eq!(viz.tick(t0, &PlaybackState::stopped(t0)), FrameDecision::Inactive);
        assert_eq!(viz.frame(t0, &PlaybackState::stopped(t0)), FrameControl::Continue);
        assert!(viz.surface().calls.is_empty());
    }

    #[test]
    fn test_bad_thresholds_are_rejected() {
        let t0 = Instant::now();
        let mut viz = mounted(0);
        let mut tables = tables(sinc_table(8, 16));
        tables.constant_q.min_frequency = 0.0;

        assert!(viz.install_tables(tables, t0).is_err());
        assert_eq!(viz.phase(), Phase::Loading);
    }

    #[test]
    fn test_idle_then_resize_wakes() {
        let t0 = Instant::now();
        let mut viz = mounted(0);
        viz.install_tables(tables(sinc_table(8, 16)), t0).unwrap();
        let paused = PlaybackState::stopped(t0);

        assert_eq!(viz.frame(t0, &paused), FrameControl::Continue);
        let later = t0 + Duration::from_secs(4);
        assert_eq!(viz.frame(later, &paused), FrameControl::Suspend);
        assert_eq!(viz.phase(), Phase::Idle);

        assert!(viz.on_resize(300.0, 200.0, 2.0, later).unwrap());
        assert_eq!(viz.phase(), Phase::Running);
        assert_eq!(viz.surface().size, (600, 400));
        assert_eq!(viz.tick(later, &paused), FrameDecision::Render);
    }

    #[test]
    fn test_visibility_and_playback_events() {
        let t0 = Instant::now();
        let mut viz = mounted(0);
        viz.install_tables(tables(sinc_table(8, 16)), t0).unwrap();

        assert!(!viz.on_visibility_change(false, t0));
        assert_eq!(viz.phase(), Phase::Idle);
        assert_eq!(viz.frame(t0, &PlaybackState::stopped(t0)), FrameControl::Suspend);
        assert!(viz.on_playback_change(t0));
        assert!(!viz.on_visibility_change(true, t0));
        assert_eq!(viz.phase(), Phase::Running);
    }

    #[test]
    fn test_stop_is_idempotent_and_stops_loop() {
        let t0 = Instant::now();
        let mut viz = mounted(0);
        viz.install_tables(tables(sinc_table(8, 16)), t0).unwrap();

        viz.stop();
        viz.stop();
        assert_eq!(viz.phase(), Phase::TornDown);
        assert_eq!(viz.frame(t0, &PlaybackState::stopped(t0)), FrameControl::Stop);
        assert!(!viz.on_playback_change(t0));
    }
}
