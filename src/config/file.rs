//! Configuration file management for vectorglow.
//!
//! This module handles loading and validating application configuration from TOML files.
//! Configuration is stored in the user's config directory and created from an embedded
//! template on first run.

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Embedded default configuration template.
const DEFAULT_CONFIG: &str = include_str!("../../environments/vectorglow.toml");

/// Largest accepted history capacity.
pub const MAX_HISTORY_CAPACITY: usize = 262_144;

const MIN_QUEUE_FRAMES: usize = 256;
const MAX_QUEUE_FRAMES: usize = 1_048_576;

/// Where samples come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Physical input device (microphone, line in)
    #[default]
    Input,
    /// Whatever the default output device is playing
    Loopback,
    /// A WAV file replayed in real time
    File,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Loopback => write!(f, "loopback"),
            Self::File => write!(f, "file"),
        }
    }
}

/// How the trace is drawn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// A fixed number of polylines, one color each
    #[default]
    Banded,
    /// One segment per point pair, dimmed by length
    Segments,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Banded => write!(f, "banded"),
            Self::Segments => write!(f, "segments"),
        }
    }
}

/// Audio capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaptureConfig {
    #[serde(default)]
    pub source: SourceKind,
    /// Audio device to use. Options:
    /// - "default" for system default device
    /// - numeric index (0, 1, 2, etc.) from `vectorglow list-devices`
    /// - device name from `vectorglow list-devices`
    #[serde(default = "default_device")]
    pub device: String,
    /// WAV file for `source = "file"`
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub loop_file: bool,
    /// Longest wait for a packet before the capture thread re-checks for a stop
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_activation_retries")]
    pub activation_retries: u32,
    /// Frames buffered between the audio callback and the capture thread
    #[serde(default = "default_queue_frames")]
    pub queue_frames: usize,
}

fn default_device() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_activation_retries() -> u32 {
    2
}

fn default_queue_frames() -> usize {
    32_768
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            device: default_device(),
            file: None,
            loop_file: true,
            poll_interval_ms: default_poll_interval_ms(),
            activation_retries: default_activation_retries(),
            queue_frames: default_queue_frames(),
        }
    }
}

/// Trace display configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayConfig {
    /// Number of points kept in the trail
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
    /// A full-scale sample reaches `1 / scale_constant` of the shorter surface side
    #[serde(default = "default_scale_constant")]
    pub scale_constant: f64,
    /// Fraction of the distance to the target the origin moves each frame
    #[serde(default = "default_origin_smoothing")]
    pub origin_smoothing: f64,
    /// Higher values fade the trail faster
    #[serde(default = "default_brightness_exponent")]
    pub brightness_exponent: f64,
    #[serde(default = "default_exponent_step")]
    pub exponent_step: f64,
    #[serde(default)]
    pub align_vertical: bool,
    #[serde(default)]
    pub render_mode: RenderMode,
    #[serde(default = "default_bands")]
    pub bands: usize,
    /// Segment length in pixels over which brightness drops by 1/e. 0 disables.
    #[serde(default = "default_slew_damping")]
    pub slew_damping: f64,
    #[serde(default = "default_color")]
    pub color: [u8; 3],
}

fn default_history_capacity() -> usize {
    4800
}

fn default_refresh_hz() -> u32 {
    60
}

fn default_scale_constant() -> f64 {
    2.0
}

fn default_origin_smoothing() -> f64 {
    0.05
}

fn default_brightness_exponent() -> f64 {
    6.0
}

fn default_exponent_step() -> f64 {
    1.0
}

fn default_bands() -> usize {
    256
}

fn default_slew_damping() -> f64 {
    24.0
}

fn default_color() -> [u8; 3] {
    [255, 35, 200]
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            refresh_hz: default_refresh_hz(),
            scale_constant: default_scale_constant(),
            origin_smoothing: default_origin_smoothing(),
            brightness_exponent: default_brightness_exponent(),
            exponent_step: default_exponent_step(),
            align_vertical: false,
            render_mode: RenderMode::default(),
            bands: default_bands(),
            slew_damping: default_slew_damping(),
            color: default_color(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VectorglowConfig {
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl VectorglowConfig {
    /// Loads configuration from the user's config directory, writing the default
    /// template first if no file exists yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined or created
    /// - If the config file cannot be read
    /// - If the TOML is malformed or a value is out of range
    pub fn load() -> anyhow::Result<Self> {
        let config_path = config_path()?;
        if !config_path.exists() {
            write_default(&config_path)?;
        }
        Self::load_from(&config_path)
    }

    /// Loads and validates configuration from `path`.
    ///
    /// # Errors
    /// - If the file cannot be read, parsed or validated
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read {}: {e}", path.display()))?;
        Self::parse(&content).map_err(|e| anyhow!("{}: {e}", path.display()))
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// - If the TOML is malformed or a value is out of range
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: VectorglowConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every value against its accepted range.
    ///
    /// # Errors
    /// - Names the first offending key and its accepted range
    pub fn validate(&self) -> anyhow::Result<()> {
        let capture = &self.capture;
        let display = &self.display;

        if capture.source == SourceKind::File && capture.file.is_none() {
            bail!("capture.file must be set when capture.source = \"file\"");
        }
        if capture.device.trim().is_empty() {
            bail!("capture.device must not be empty (use \"default\")");
        }
        if !(1..=1000).contains(&capture.poll_interval_ms) {
            bail!(
                "capture.poll_interval_ms must be between 1 and 1000, got {}",
                capture.poll_interval_ms
            );
        }
        if capture.activation_retries > 10 {
            bail!(
                "capture.activation_retries must be at most 10, got {}",
                capture.activation_retries
            );
        }
        if !(MIN_QUEUE_FRAMES..=MAX_QUEUE_FRAMES).contains(&capture.queue_frames) {
            bail!(
                "capture.queue_frames must be between {MIN_QUEUE_FRAMES} and {MAX_QUEUE_FRAMES}, got {}",
                capture.queue_frames
            );
        }

        if !(2..=MAX_HISTORY_CAPACITY).contains(&display.history_capacity) {
            bail!(
                "display.history_capacity must be between 2 and {MAX_HISTORY_CAPACITY}, got {}",
                display.history_capacity
            );
        }
        if !(1..=240).contains(&display.refresh_hz) {
            bail!(
                "display.refresh_hz must be between 1 and 240, got {}",
                display.refresh_hz
            );
        }
        if !(display.scale_constant.is_finite() && display.scale_constant > 0.0) {
            bail!(
                "display.scale_constant must be a positive number, got {}",
                display.scale_constant
            );
        }
        if !(display.origin_smoothing > 0.0 && display.origin_smoothing <= 1.0) {
            bail!(
                "display.origin_smoothing must be in (0, 1], got {}",
                display.origin_smoothing
            );
        }
        if !(0.0..=50.0).contains(&display.brightness_exponent) {
            bail!(
                "display.brightness_exponent must be between 0 and 50, got {}",
                display.brightness_exponent
            );
        }
        if !(display.exponent_step > 0.0 && display.exponent_step <= 50.0) {
            bail!(
                "display.exponent_step must be in (0, 50], got {}",
                display.exponent_step
            );
        }
        if display.bands == 0 {
            bail!("display.bands must be at least 1");
        }
        if !(display.slew_damping.is_finite() && display.slew_damping >= 0.0) {
            bail!(
                "display.slew_damping must be 0 or positive, got {}",
                display.slew_damping
            );
        }

        Ok(())
    }
}

/// Path of the configuration file, `~/.config/vectorglow/vectorglow.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not determine home directory"))?;
    Ok(home
        .join(".config")
        .join("vectorglow")
        .join("vectorglow.toml"))
}

/// Writes the embedded default template to `path`, creating parent directories.
///
/// # Errors
/// - If the directory or file cannot be written
pub fn write_default(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow!("Failed to create config directory: {e}"))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .map_err(|e| anyhow!("Failed to write default config: {e}"))?;
    tracing::info!("Wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_template_matches_defaults() {
        let config = VectorglowConfig::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, VectorglowConfig::default());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = VectorglowConfig::parse("").unwrap();
        assert_eq!(config.display.history_capacity, 4800);
        assert_eq!(config.display.refresh_hz, 60);
        assert_eq!(config.display.render_mode, RenderMode::Banded);
        assert_eq!(config.capture.source, SourceKind::Input);
        assert_eq!(config.capture.device, "default");
        assert!(config.capture.loop_file);
    }

    #[test]
    fn test_partial_sections() {
        let config = VectorglowConfig::parse(
            r#"
            [capture]
            source = "file"
            file = "/tmp/sweep.wav"

            [display]
            render_mode = "segments"
            color = [0, 255, 0]
            "#,
        )
        .unwrap();
        assert_eq!(config.capture.source, SourceKind::File);
        assert_eq!(config.capture.file, Some(PathBuf::from("/tmp/sweep.wav")));
        assert_eq!(config.display.render_mode, RenderMode::Segments);
        assert_eq!(config.display.color, [0, 255, 0]);
        assert_eq!(config.display.bands, 256);
    }

    #[test]
    fn test_rejects_out_of_range_capacity() {
        let err = VectorglowConfig::parse("[display]\nhistory_capacity = 1")
            .unwrap_err()
            .to_string();
        assert!(err.contains("display.history_capacity"), "{err}");

        assert!(VectorglowConfig::parse("[display]\nhistory_capacity = 300000").is_err());
        assert!(VectorglowConfig::parse("[display]\nhistory_capacity = 2").is_ok());
    }

    #[test]
    fn test_queue_frames_bounds() {
        let err = VectorglowConfig::parse("[capture]\nqueue_frames = 16")
            .unwrap_err()
            .to_string();
        assert!(err.contains("capture.queue_frames"), "{err}");
        assert!(VectorglowConfig::parse("[capture]\nqueue_frames = 2000000").is_err());
        assert!(VectorglowConfig::parse("[capture]\nqueue_frames = 256").is_ok());
    }

    #[test]
    fn test_rejects_bad_display_values() {
        for toml in [
            "[display]\nrefresh_hz = 0",
            "[display]\nrefresh_hz = 241",
            "[display]\nscale_constant = 0.0",
            "[display]\norigin_smoothing = 0.0",
            "[display]\norigin_smoothing = 1.5",
            "[display]\nbrightness_exponent = 51.0",
            "[display]\nexponent_step = 0.0",
            "[display]\nbands = 0",
            "[display]\nslew_damping = -1.0",
        ] {
            assert!(VectorglowConfig::parse(toml).is_err(), "accepted: {toml}");
        }
    }

    #[test]
    fn test_file_source_requires_path() {
        let err = VectorglowConfig::parse("[capture]\nsource = \"file\"")
            .unwrap_err()
            .to_string();
        assert!(err.contains("capture.file"), "{err}");
    }

    #[test]
    fn test_unknown_mode_is_a_parse_error() {
        assert!(VectorglowConfig::parse("[display]\nrender_mode = \"sparkle\"").is_err());
        assert!(VectorglowConfig::parse("[capture]\nsource = \"bluetooth\"").is_err());
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = std::env::temp_dir().join(format!("vectorglow_config_{}", std::process::id()));
        let path = dir.join("nested").join("vectorglow.toml");
        write_default(&path).unwrap();
        let config = VectorglowConfig::load_from(&path).unwrap();
        fs::remove_dir_all(&dir).ok();
        assert_eq!(config, VectorglowConfig::default());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(SourceKind::Loopback.to_string(), "loopback");
        assert_eq!(RenderMode::Segments.to_string(), "segments");
    }
}
