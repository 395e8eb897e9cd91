//! Provides `thumbframe`, an auto-framing thumbnail generator for 3D scenes.
//!
//! A subject node is cloned onto an isolated render layer, a temporary camera
//! and light are placed in front of it, and the clone is rendered off-screen.
//! The rendered silhouette is measured; when it is off-center or badly sized
//! the camera is corrected and the subject rendered once more. The result is
//! written as `{name}_Thumbnail.png`.
//!
//! Models are loaded from glTF/GLB and Wavefront OBJ files and rendered by a
//! software rasterizer, so no GPU or window is required.
//!
//! # Build
//! ```text
//! cargo build --release
//! ```
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use thumbframe::{formats, ThumbnailConfig, ThumbnailGenerator};
//!
//! let mut model = formats::load_model_from_path(Path::new("crate.glb")).unwrap();
//! let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());
//! let thumbnail = generator
//!     .capture_and_save(&mut model.scene, Some(model.root), Path::new("thumbnails"))
//!     .unwrap();
//! assert!(thumbnail.is_some());
//! ```

pub mod assets;
pub mod bounds;
pub mod camera;
pub mod config;
pub mod error;
pub mod formats;
pub mod framing;
pub mod layers;
pub mod logging;
pub mod mesh;
pub mod renderer;
pub mod scene;
pub mod silhouette;
pub mod thumbnail;

pub use config::{FramingPolicy, ThumbnailConfig};
pub use error::{Result, ThumbnailError};
pub use renderer::{RenderedImage, Renderer, SoftwareRenderer};
pub use scene::{NodeId, Scene};
pub use thumbnail::{Thumbnail, ThumbnailGenerator, ThumbnailImage};
