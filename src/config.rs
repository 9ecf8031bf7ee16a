//! Configuration file support for superbook-deskew
//!
//! Supports TOML configuration files with the following search order:
//! 1. an explicitly given path ([`Config::load_from_path`])
//! 2. `./superbook-deskew.toml` - current directory
//! 3. `~/.config/superbook-deskew/config.toml` - user config
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [skew]
//! sample_count = 3000
//! angle_step = 0.01
//!
//! [preview]
//! max_side = 1024
//! max_analysis_dpi = 150.0
//!
//! [orientation]
//! enabled = true
//!
//! [performance]
//! parallel_fft = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::deskew::DeskewOptions;

/// File name looked up in the current directory
pub const LOCAL_CONFIG_FILE: &str = "superbook-deskew.toml";

/// Directory under the user config dir
pub const APP_CONFIG_DIR: &str = "superbook-deskew";

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// File not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
}

/// Skew estimator settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SkewConfig {
    /// Spectrum cells that vote for an angle
    #[serde(default)]
    pub sample_count: Option<usize>,

    /// Angle histogram bucket width (radians)
    #[serde(default)]
    pub angle_step: Option<f64>,

    /// Vote distance from a candidate line (pixels)
    #[serde(default)]
    pub line_tolerance: Option<f64>,

    /// Non-descending steps tolerated around the histogram peak
    #[serde(default)]
    pub monotone_tolerance: Option<usize>,
}

/// Analysis preview settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PreviewConfig {
    /// Largest preview side (pixels)
    #[serde(default)]
    pub max_side: Option<u32>,

    /// Resolution above which pages are downsampled (DPI)
    #[serde(default)]
    pub max_analysis_dpi: Option<f64>,
}

/// Orientation correction settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrientationConfig {
    /// Correct quarter-turn orientation
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Performance settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceConfig {
    /// Run FFT rows and angle votes on the rayon pool
    #[serde(default)]
    pub parallel_fft: Option<bool>,
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Skew estimator settings
    #[serde(default)]
    pub skew: SkewConfig,

    /// Preview settings
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Orientation settings
    #[serde(default)]
    pub orientation: OrientationConfig,

    /// Performance settings
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl Config {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the default search path
    ///
    /// Search order:
    /// 1. `./superbook-deskew.toml`
    /// 2. `~/.config/superbook-deskew/config.toml`
    /// 3. Default values (if no file found)
    pub fn load() -> Result<Self, ConfigError> {
        for path in Self::search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading configuration");
                return Self::load_from_path(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Overlay the file settings on the default options
    ///
    /// Values pass through the options builder, so out-of-range entries
    /// are normalized the same way.
    pub fn to_options(&self) -> DeskewOptions {
        let mut builder = DeskewOptions::builder();

        if let Some(count) = self.skew.sample_count {
            builder = builder.sample_count(count);
        }
        if let Some(step) = self.skew.angle_step {
            builder = builder.angle_step(step);
        }
        if let Some(distance) = self.skew.line_tolerance {
            builder = builder.line_tolerance(distance);
        }
        if let Some(steps) = self.skew.monotone_tolerance {
            builder = builder.monotone_tolerance(steps);
        }

        if let Some(side) = self.preview.max_side {
            builder = builder.preview_max_side(side);
        }
        if let Some(dpi) = self.preview.max_analysis_dpi {
            builder = builder.max_analysis_dpi(dpi);
        }

        if let Some(enabled) = self.orientation.enabled {
            builder = builder.detect_orientation(enabled);
        }
        if let Some(parallel) = self.performance.parallel_fft {
            builder = builder.parallel_fft(parallel);
        }

        builder.build()
    }

    /// Get config file search paths
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join(APP_CONFIG_DIR).join("config.toml"));
        }

        paths
    }
}
