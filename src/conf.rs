use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::viz::VisualizerOptions;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    /// Band ring hue in degrees
    /// Default is 200 (blue)
    #[serde(default = "default_hue")]
    pub hue: f32,

    /// Throttle to ~30 fps for low-power devices
    #[serde(default)]
    pub constrained_device: bool,

    /// Constant-Q mapping table (JSON)
    #[serde(default = "default_constant_q_table")]
    pub constant_q_table: PathBuf,

    /// FIR interpolation table (JSON)
    #[serde(default = "default_fir_table")]
    pub fir_table: PathBuf,

    /// Precomputed waveform envelope (JSON)
    /// If None, the envelope is built from the audio being rendered
    #[serde(default)]
    pub waveform: Option<PathBuf>,

    /// Logical surface size
    #[serde(default = "default_size")]
    pub width: f32,
    #[serde(default = "default_size")]
    pub height: f32,

    /// Physical pixels per logical pixel
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,

    /// Frame rate for the render and live commands
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_hue() -> f32 {
    200.0
}

fn default_constant_q_table() -> PathBuf {
    PathBuf::from("data/constant_q.json")
}

fn default_fir_table() -> PathBuf {
    PathBuf::from("data/fir.json")
}

fn default_size() -> f32 {
    800.0
}

fn default_pixel_ratio() -> f32 {
    1.0
}

fn default_fps() -> u32 {
    60
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hue: default_hue(),
            constrained_device: false,
            constant_q_table: default_constant_q_table(),
            fir_table: default_fir_table(),
            waveform: None,
            width: default_size(),
            height: default_size(),
            pixel_ratio: default_pixel_ratio(),
            fps: default_fps(),
        }
    }
}

impl Settings {
    /// Load config from ~/.config/radialviz/config.toml
    /// Returns default settings if file doesn't exist or fails to parse
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            log::warn!("Could not determine config directory, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => {
                    log::info!("Loaded settings from: {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse config: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::debug!(
                    "No config file found at {}, using defaults",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Save config to ~/.config/radialviz/config.toml
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let Some(path) = config_path() else {
            anyhow::bail!("Could not determine config directory");
        };
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(self).context("Failed to serialize settings to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        log::info!("Saved settings to: {}", path.display());

        Ok(())
    }

    /// Constant-Q and FIR table paths with relative entries resolved by [`resolve_table`]
    pub fn table_paths(&self) -> (PathBuf, PathBuf) {
        (
            resolve_table(&self.constant_q_table),
            resolve_table(&self.fir_table),
        )
    }

    pub fn visualizer_options(&self) -> VisualizerOptions {
        VisualizerOptions {
            hue: self.hue,
            constrained: self.constrained_device,
            width: self.width,
            height: self.height,
            pixel_ratio: self.pixel_ratio,
        }
    }
}

/// Get the path to the config file: ~/.config/radialviz/config.toml
pub fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "radialviz").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Get the user data directory: ~/.local/share/radialviz
pub fn data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "radialviz").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Resolve a relative table path against the working directory, then the user data
/// directory, then the tables shipped in the source tree.
/// Returns `path` unchanged when no candidate exists.
pub fn resolve_table(path: &Path) -> PathBuf {
    let mut roots = Vec::with_capacity(2);
    roots.extend(data_dir());
    roots.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")));
    resolve_in(path, &roots)
}

fn resolve_in(path: &Path, roots: &[PathBuf]) -> PathBuf {
    if path.is_absolute() || path.exists() {
        return path.to_path_buf();
    }
    roots
        .iter()
        .map(|root| root.join(path))
        .find(|candidate| candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}
