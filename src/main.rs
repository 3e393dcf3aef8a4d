use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use radialviz::analysis::FftAnalyser;
use radialviz::audio::{ClipFeeder, StereoClip};
use radialviz::conf::{self, Settings};
use radialviz::tables::{CIRCLE_SAMPLES, WaveformEnvelope};
use radialviz::viz::{
    FrameControl, FrameDecision, FrameLoop, Phase, PixmapSurface, PlaybackState, Visualizer,
    interpolated_position,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type PngVisualizer = Visualizer<PixmapSurface, FftAnalyser>;

#[derive(Parser)]
#[command(name = "radialviz")]
#[command(about = "Audio-reactive radial spectrum visualizer")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a WAV file to a PNG sequence on a virtual clock
    Render {
        /// Input WAV file
        wav: PathBuf,

        /// Directory for frame_NNNNN.png files
        #[arg(long)]
        out_dir: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Play a WAV file in real time, rewriting one PNG per frame
    Live {
        /// Input WAV file
        wav: PathBuf,

        /// PNG file rewritten every frame
        #[arg(long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show the config file path and effective settings
    Config {
        /// Write the effective settings to the config file
        #[arg(long)]
        save: bool,
    },
}

/// Command-line overrides for the config file
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Logical surface size, e.g. 800x600
    #[arg(long, value_parser = parse_size)]
    size: Option<(f32, f32)>,

    /// Physical pixels per logical pixel
    #[arg(long)]
    pixel_ratio: Option<f32>,

    /// Throttle like a low-power device
    #[arg(long)]
    constrained: bool,

    /// Band ring hue in degrees
    #[arg(long)]
    hue: Option<f32>,

    /// Constant-Q table JSON
    #[arg(long)]
    constant_q: Option<PathBuf>,

    /// FIR table JSON
    #[arg(long)]
    fir: Option<PathBuf>,

    /// Waveform envelope JSON
    #[arg(long)]
    waveform: Option<PathBuf>,
}

impl Overrides {
    fn apply(self, mut settings: Settings) -> Settings {
        if let Some(fps) = self.fps {
            settings.fps = fps;
        }
        if let Some((width, height)) = self.size {
            settings.width = width;
            settings.height = height;
        }
        if let Some(ratio) = self.pixel_ratio {
            settings.pixel_ratio = ratio;
        }
        if self.constrained {
            settings.constrained_device = true;
        }
        if let Some(hue) = self.hue {
            settings.hue = hue;
        }
        if let Some(path) = self.constant_q {
            settings.constant_q_table = path;
        }
        if let Some(path) = self.fir {
            settings.fir_table = path;
        }
        if self.waveform.is_some() {
            settings.waveform = self.waveform;
        }
        settings
    }
}

fn parse_size(s: &str) -> Result<(f32, f32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("Invalid size '{}', expected WIDTHxHEIGHT", s))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .ok()
            .filter(|v| *v > 0.0)
            .ok_or_else(|| format!("Invalid size '{}', expected positive numbers", s))
    };
    Ok((parse(w)?, parse(h)?))
}

fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(1) as f64)
}

/// Mount a PNG visualizer for `clip` and load its tables
async fn mount(settings: &Settings, clip: &StereoClip) -> Result<PngVisualizer> {
    let envelope = match &settings.waveform {
        Some(path) => WaveformEnvelope::load(path)
            .with_context(|| format!("Failed to load waveform: {}", path.display()))?,
        None => WaveformEnvelope::from_samples(&clip.mixdown(), CIRCLE_SAMPLES)?,
    };

    let surface = PixmapSurface::new(1, 1)?;
    let mut viz = Visualizer::new(
        surface,
        FftAnalyser::new(),
        FftAnalyser::new(),
        envelope,
        settings.visualizer_options(),
    )?;

    let (constant_q, fir) = settings.table_paths();
    viz.start(&constant_q, &fir).await;
    if viz.phase() != Phase::Running {
        bail!(
            "Visualizer tables could not be loaded from {} and {}",
            constant_q.display(),
            fir.display()
        );
    }
    Ok(viz)
}

/// Advance playback to `now`; returns false once the clip has ended
fn advance(playback: &mut PlaybackState, now: Instant) -> bool {
    let position = interpolated_position(playback, now);
    if playback.is_playing && position >= playback.duration {
        log::info!("Playback finished at {:.2}s", position);
        *playback = PlaybackState {
            is_playing: false,
            current_position: playback.duration,
            previous_timestamp: now,
            ..*playback
        };
    }
    playback.is_playing
}

fn playing(clip: &StereoClip, now: Instant) -> PlaybackState {
    PlaybackState {
        is_playing: true,
        duration: clip.duration(),
        ..PlaybackState::stopped(now)
    }
}

async fn render(wav: &Path, out_dir: &Path, settings: Settings) -> Result<()> {
    let clip = StereoClip::open(wav)?;
    let mut viz = mount(&settings, &clip).await?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let interval = frame_interval(settings.fps);
    let start = Instant::now();
    let mut playback = playing(&clip, start);
    let mut feeder = ClipFeeder::new();
    let mut written = 0usize;

    for tick in 0u32.. {
        let now = start + interval * tick;
        let still_playing = advance(&mut playback, now);

        let (left, right) = viz.sources_mut();
        feeder.feed_until(&clip, interpolated_position(&playback, now), left, right);

        match viz.tick(now, &playback) {
            FrameDecision::Render => {
                let path = out_dir.join(format!("frame_{:05}.png", tick));
                viz.surface().save_png(&path)?;
                written += 1;
            }
            FrameDecision::Drop => {}
            FrameDecision::Suspend | FrameDecision::Inactive if !still_playing => break,
            decision => bail!("Visualizer stopped unexpectedly: {:?}", decision),
        }
    }

    viz.stop();
    println!("Wrote {} frames to {}", written, out_dir.display());
    Ok(())
}

struct LiveState {
    viz: PngVisualizer,
    clip: StereoClip,
    feeder: ClipFeeder,
    playback: PlaybackState,
    output: PathBuf,
}

impl LiveState {
    fn on_frame(&mut self, now: Instant) -> FrameControl {
        let still_playing = advance(&mut self.playback, now);
        let position = interpolated_position(&self.playback, now);
        let (left, right) = self.viz.sources_mut();
        self.feeder.feed_until(&self.clip, position, left, right);

        let decision = self.viz.tick(now, &self.playback);
        if decision == FrameDecision::Render {
            if let Err(e) = self.viz.surface().save_png(&self.output) {
                log::error!("Failed to write frame: {}", e);
                return FrameControl::Stop;
            }
        }

        match self.viz.control(decision) {
            FrameControl::Suspend if !still_playing => FrameControl::Stop,
            control => control,
        }
    }
}

async fn live(wav: &Path, output: PathBuf, settings: Settings) -> Result<()> {
    let clip = StereoClip::open(wav)?;
    let viz = mount(&settings, &clip).await?;
    let playback = playing(&clip, Instant::now());

    println!(
        "Playing {} ({:.1}s) into {}",
        wav.display(),
        clip.duration(),
        output.display()
    );

    let state = Arc::new(Mutex::new(LiveState {
        viz,
        clip,
        feeder: ClipFeeder::new(),
        playback,
        output,
    }));

    let frame_state = Arc::clone(&state);
    let mut frames = FrameLoop::spawn(frame_interval(settings.fps), move |now| {
        match frame_state.lock() {
            Ok(mut state) => state.on_frame(now),
            Err(_) => FrameControl::Stop,
        }
    });

    tokio::select! {
        _ = frames.join() => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted, stopping...");
        }
    }

    let mut state = state
        .lock()
        .map_err(|_| anyhow!("Visualizer state poisoned"))?;
    state.viz.stop();
    Ok(())
}

fn show_config(save: bool) -> Result<()> {
    let settings = Settings::load();
    match conf::config_path() {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: <unavailable>"),
    }
    match conf::data_dir() {
        Some(path) => println!("Table search dir: {}", path.display()),
        None => println!("Table search dir: <unavailable>"),
    }
    let (constant_q, fir) = settings.table_paths();
    println!("Constant-Q table: {}", constant_q.display());
    println!("FIR table: {}", fir.display());
    println!();
    print!(
        "{}",
        toml::to_string_pretty(&settings).context("Failed to serialize settings")?
    );

    if save {
        let path = settings.save()?;
        println!();
        println!("Saved to {}", path.display());
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render {
            wav,
            out_dir,
            overrides,
        } => render(&wav, &out_dir, overrides.apply(Settings::load())).await,
        Commands::Live {
            wav,
            output,
            overrides,
        } => live(&wav, output, overrides.apply(Settings::load())).await,
        Commands::Config { save } => show_config(save),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("800x600"), Ok((800.0, 600.0)));
        assert_eq!(parse_size("1024X768"), Ok((1024.0, 768.0)));
        assert!(parse_size("800").is_err());
        assert!(parse_size("0x600").is_err());
    }

    #[test]
    fn test_overrides_apply_on_top_of_settings() {
        let overrides = Overrides {
            fps: Some(24),
            size: Some((320.0, 240.0)),
            constrained: true,
            ..Overrides::default()
        };
        let settings = overrides.apply(Settings::default());
        assert_eq!(settings.fps, 24);
        assert_eq!((settings.width, settings.height), (320.0, 240.0));
        assert!(settings.constrained_device);
        assert_eq!(settings.hue, Settings::default().hue);
    }

    #[test]
    fn test_advance_stops_at_end() {
        let t0 = Instant::now();
        let mut playback = PlaybackState {
            is_playing: true,
            duration: 1.0,
            ..PlaybackState::stopped(t0)
        };
        assert!(advance(&mut playback, t0 + Duration::from_millis(500)));
        assert!(!advance(&mut playback, t0 + Duration::from_millis(1200)));
        assert_eq!(playback.current_position, 1.0);
        assert_eq!(interpolated_position(&playback, t0 + Duration::from_secs(5)), 1.0);
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(frame_interval(50), Duration::from_millis(20));
        assert_eq!(frame_interval(0), Duration::from_secs(1));
    }
}
