//! Configuration module for framecipher
//!
//! A run is described by a TOML file with four sections:
//!
//! ```toml
//! [input]
//! format = "raw"      # "raw" | "images"
//! path = "input.rgb"
//! width = 640
//! height = 480
//! fps = 30.0
//!
//! [output]
//! format = "raw"
//! path = "output.rgb"
//!
//! [window]
//! start_secs = 2.0
//! end_secs = 4.0
//!
//! [cipher]
//! kind = "logistic"   # "logistic" | "random"
//! r = 3.999
//! x0 = 0.5
//! ```
//!
//! Every field is optional; missing ones take the defaults shown. The
//! `cipher.seed` key is read but never written back by [`PipelineConfig::save`].
//!
//! # Example
//!
//! ```ignore
//! use framecipher::config::PipelineConfig;
//!
//! let config = PipelineConfig::load("run.toml")?;
//! let range = config.window.resolve(config.input.fps);
//! ```

use crate::error::{FrameCipherError, Result};
use crate::pipeline::IndexRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default configuration filename
pub const DEFAULT_CONFIG_FILE: &str = "framecipher.toml";

/// How frames are stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// Headerless stream of packed RGB24 frames
    #[default]
    Raw,
    /// Directory of image files, one frame per file
    Images,
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaFormat::Raw => write!(f, "raw"),
            MediaFormat::Images => write!(f, "images"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub format: MediaFormat,
    pub path: PathBuf,
    /// Frame width in pixels (raw input only)
    pub width: u32,
    /// Frame height in pixels (raw input only)
    pub height: u32,
    /// Frames per second, used to turn the time window into frame indices
    pub fps: f64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: MediaFormat::Raw,
            path: PathBuf::from("input.rgb"),
            width: 640,
            height: 480,
            fps: 30.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: MediaFormat,
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: MediaFormat::Raw,
            path: PathBuf::from("output.rgb"),
        }
    }
}

/// Which frames get encrypted.
///
/// Explicit frame bounds take precedence over the time window, bound by bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_start_secs")]
    pub start_secs: f64,

    #[serde(default = "default_end_secs")]
    pub end_secs: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<u64>,
}

fn default_start_secs() -> f64 {
    2.0
}

fn default_end_secs() -> f64 {
    4.0
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start_secs: default_start_secs(),
            end_secs: default_end_secs(),
            start_frame: None,
            end_frame: None,
        }
    }
}

impl WindowConfig {
    /// Inclusive frame range for a stream running at `fps`.
    pub fn resolve(&self, fps: f64) -> IndexRange {
        let from_secs = IndexRange::from_time_window(fps, self.start_secs, self.end_secs);
        IndexRange::new(
            self.start_frame.unwrap_or(from_secs.start),
            self.end_frame.unwrap_or(from_secs.end),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CipherKind {
    /// Logistic-map keystream, deterministic from `r` and `x0`
    #[default]
    Logistic,
    /// Seeded `StdRng` keystream
    Random,
}

impl fmt::Display for CipherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CipherKind::Logistic => write!(f, "logistic"),
            CipherKind::Random => write!(f, "random"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CipherConfig {
    #[serde(default)]
    pub kind: CipherKind,

    /// Logistic map growth rate
    #[serde(default = "default_r")]
    pub r: f32,

    /// Logistic map starting value
    #[serde(default = "default_x0")]
    pub x0: f32,

    /// Random cipher seed. Never serialized.
    #[serde(default, skip_serializing)]
    pub seed: Option<u64>,
}

fn default_r() -> f32 {
    crate::cipher::logistic::DEFAULT_R
}

fn default_x0() -> f32 {
    crate::cipher::logistic::DEFAULT_X0
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            kind: CipherKind::Logistic,
            r: default_r(),
            x0: default_x0(),
            seed: None,
        }
    }
}

/// Complete description of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub cipher: CipherConfig,
}

impl PipelineConfig {
    /// Read, parse and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            FrameCipherError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::from_toml_str(&content).map_err(|e| {
            FrameCipherError::Config(format!("Invalid config file {:?}: {}", path, e))
        })
    }

    /// Parse and validate TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| FrameCipherError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                FrameCipherError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| {
            FrameCipherError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Check value ranges that the type system does not.
    pub fn validate(&self) -> Result<()> {
        let input = &self.input;
        if !input.fps.is_finite() || input.fps <= 0.0 {
            return Err(FrameCipherError::Config(format!(
                "input.fps must be a positive number, got {}",
                input.fps
            )));
        }
        if input.format == MediaFormat::Raw && (input.width == 0 || input.height == 0) {
            return Err(FrameCipherError::Config(format!(
                "Raw input needs non-zero width and height, got {}x{}",
                input.width, input.height
            )));
        }

        let window = &self.window;
        for (name, secs) in [("start_secs", window.start_secs), ("end_secs", window.end_secs)] {
            if !secs.is_finite() || secs < 0.0 {
                return Err(FrameCipherError::Config(format!(
                    "window.{} must be a non-negative number, got {}",
                    name, secs
                )));
            }
        }

        let cipher = &self.cipher;
        if !(cipher.x0 > 0.0 && cipher.x0 < 1.0) {
            return Err(FrameCipherError::Config(format!(
                "cipher.x0 must lie strictly between 0 and 1, got {}",
                cipher.x0
            )));
        }
        if !(cipher.r > 0.0 && cipher.r <= 4.0) {
            return Err(FrameCipherError::Config(format!(
                "cipher.r must lie in (0, 4], got {}",
                cipher.r
            )));
        }

        Ok(())
    }

    /// Frame range this config selects.
    pub fn range(&self) -> IndexRange {
        self.window.resolve(self.input.fps)
    }
}
