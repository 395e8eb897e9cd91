//! Provides thumbnail configuration, loadable from JSON5 files.
//!
//! Every constant of the framing heuristic lives in [`FramingPolicy`] so the
//! policy can be tuned and tested independently of the defaults.
//!
//! # Examples
//! ```
//! use thumbframe::config::ThumbnailConfig;
//!
//! let config = ThumbnailConfig::from_json5("{ width: 128, framing: { target_fill: 0.9 } }").unwrap();
//! assert_eq!(config.width, 128);
//! assert_eq!(config.height, 256);
//! assert_eq!(config.framing.target_fill, 0.9);
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThumbnailError};

/// Top-level thumbnail configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub isolation: IsolationConfig,
    pub framing: FramingPolicy,
    /// Directory treated as the project asset tree. Thumbnails written below
    /// it are indexed and returned as assets.
    pub asset_root: Option<PathBuf>,
    pub logging: LoggingConfig,
}

/// Temporary camera settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near_clip: f32,
    pub far_clip: f32,
}

/// Temporary directional light settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub intensity: f32,
    pub color: [f32; 3],
    /// Constant ambient term added to every lit pixel.
    pub ambient: f32,
}

/// How the subject clone is separated from the rest of the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    /// Name of the render layer reserved for thumbnails.
    pub layer_name: String,
    /// World position the clone is moved to, away from other geometry.
    pub staging_offset: [f32; 3],
}

/// Camera placement and auto-framing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingPolicy {
    /// Fraction of the frame the silhouette's largest dimension should fill.
    pub target_fill: f32,
    /// A silhouette filling at least `target_fill * accept_fill_ratio` is accepted.
    pub accept_fill_ratio: f32,
    /// Largest accepted normalized offset of the silhouette center from the frame center.
    pub center_tolerance: f32,
    /// Pixels with alpha above this (0..1) belong to the silhouette.
    pub alpha_threshold: f32,
    /// Share of the subject's largest dimension used as half the visible height.
    pub distance_factor: f32,
    /// Largest dimensions at or below this are treated as degenerate.
    pub min_dimension: f32,
    /// Replacement largest dimension for degenerate bounds.
    pub fallback_dimension: f32,
    /// Extra clearance added to the near-plane safe distance.
    pub safe_margin: f32,
    /// Lower bound on the zoom factor of a correction.
    pub min_zoom: f32,
    /// Lower bound on the corrected camera distance.
    pub min_distance: f32,
    /// Re-zoom subjects whose pass-1 silhouette touches the frame border.
    pub refit_clipped: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "thumbframe=debug,warn").
    pub level: String,
    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            isolation: IsolationConfig::default(),
            framing: FramingPolicy::default(),
            asset_root: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            near_clip: 0.01,
            far_clip: 1000.0,
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            intensity: 1.5,
            color: [1.0, 1.0, 1.0],
            ambient: 0.15,
        }
    }
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            layer_name: "Thumbnail".to_string(),
            staging_offset: [0.0, -1000.0, 0.0],
        }
    }
}

impl Default for FramingPolicy {
    fn default() -> Self {
        Self {
            target_fill: 0.85,
            accept_fill_ratio: 0.8,
            center_tolerance: 0.1,
            alpha_threshold: 0.01,
            distance_factor: 0.6,
            min_dimension: 0.001,
            fallback_dimension: 0.1,
            safe_margin: 0.02,
            min_zoom: 0.1,
            min_distance: 0.15,
            refit_clipped: true,
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

impl ThumbnailConfig {
    /// Parses a configuration from JSON5 text. Missing fields take their defaults.
    ///
    /// # Errors
    /// Returns [`ThumbnailError::Config`] if the text is not valid JSON5 or has
    /// fields of the wrong type.
    ///
    /// # Examples
    /// ```
    /// use thumbframe::config::ThumbnailConfig;
    ///
    /// let config = ThumbnailConfig::from_json5("{ // defaults\n }").unwrap();
    /// assert_eq!(config, ThumbnailConfig::default());
    /// ```
    pub fn from_json5(text: &str) -> Result<Self> {
        let config: Self = json5::from_str(text)
            .map_err(|e| ThumbnailError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    ///
    /// # Examples
    /// ```
    /// use std::path::Path;
    ///
    /// use thumbframe::config::ThumbnailConfig;
    ///
    /// assert!(ThumbnailConfig::load(Path::new("does_not_exist.json5")).is_err());
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ThumbnailError::io(path, e))?;
        Self::from_json5(&text)
    }

    /// Width over height of the output image.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ThumbnailError::config("Output size must be non-zero"));
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(ThumbnailError::config(format!(
                "Field of view must be in (0, 180) degrees, got {}",
                self.camera.fov_degrees
            )));
        }
        if self.camera.near_clip <= 0.0 || self.camera.far_clip <= self.camera.near_clip {
            return Err(ThumbnailError::config(
                "Clip planes must satisfy 0 < near_clip < far_clip",
            ));
        }
        if self.framing.target_fill <= 0.0 {
            return Err(ThumbnailError::config("target_fill must be positive"));
        }
        Ok(())
    }
}
