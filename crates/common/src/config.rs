//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MovcapError, MovcapResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where captures are written.
    pub output_dir: PathBuf,

    /// Default capture settings.
    pub capture: CaptureDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Output video width in pixels.
    pub width: u32,

    /// Output video height in pixels.
    pub height: u32,

    /// Target frame rate; the minimum frame interval is `1/fps`.
    pub fps: u32,

    /// Audio sample rate (Hz).
    pub audio_sample_rate: u32,

    /// Audio channel count.
    pub audio_channels: u32,

    /// AAC bitrate in bits per second.
    pub audio_bitrate: u32,

    /// Frames buffered between the capture source and the encoder.
    pub queue_depth: u32,

    /// Whether the cursor is drawn into the capture.
    pub show_cursor: bool,

    /// Default recording duration (seconds).
    pub duration_secs: u64,

    /// Upper bound on the wait for the file to be finalized after stop.
    pub stop_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "movcap=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            capture: CaptureDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            audio_bitrate: 256_000,
            queue_depth: 5,
            show_cursor: true,
            duration_secs: 3600,
            stop_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> MovcapResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.capture.validate()?;
        Ok(config)
    }
}

impl CaptureDefaults {
    /// Reject values the media pipeline cannot negotiate.
    pub fn validate(&self) -> MovcapResult<()> {
        let fields = [
            ("width", self.width),
            ("height", self.height),
            ("fps", self.fps),
            ("audio_sample_rate", self.audio_sample_rate),
            ("audio_channels", self.audio_channels),
            ("audio_bitrate", self.audio_bitrate),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| *value == 0) {
            return Err(MovcapError::config(format!("{name} must be greater than 0")));
        }
        if self.stop_timeout_secs == 0 {
            return Err(MovcapError::config(
                "stop_timeout_secs must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"));
    base.join("movcap").join("config.json")
}

/// Default capture directory (`~/Movies`).
fn default_output_dir() -> PathBuf {
    home_dir().join("Movies")
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
}
