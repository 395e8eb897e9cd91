//! Provides the crate-wide error type.
//!
//! # Examples
//! ```
//! use thumbframe::error::ThumbnailError;
//!
//! let err = ThumbnailError::MissingSubject;
//! assert_eq!(err.to_string(), "No subject selected: select an object first");
//! ```

use std::path::PathBuf;

/// Errors raised while generating a thumbnail.
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    /// No subject was given. Reported to the user before any temporary is created.
    #[error("No subject selected: select an object first")]
    MissingSubject,

    /// A node handle does not refer to a live node in the scene.
    #[error("Unknown scene node: {0}")]
    UnknownNode(usize),

    /// The offscreen render failed.
    #[error("Render error: {message}")]
    Render { message: String },

    /// PNG encoding or decoding failed.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Reading or writing a file failed.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The layer settings file could not be read or written.
    #[error("Layer registry error: {0}")]
    LayerRegistry(#[from] serde_json::Error),
}

/// Result alias using [`ThumbnailError`].
pub type Result<T> = std::result::Result<T, ThumbnailError>;

impl ThumbnailError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors caused by the caller's input rather than the pipeline.
    ///
    /// # Examples
    /// ```
    /// use thumbframe::error::ThumbnailError;
    ///
    /// assert!(ThumbnailError::MissingSubject.is_user_facing());
    /// assert!(!ThumbnailError::render("boom").is_user_facing());
    /// ```
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::MissingSubject)
    }
}
