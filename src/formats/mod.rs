//! Provides model loaders that turn files into scene subtrees.
//!
//! Each loader builds a fresh [`Scene`] with a single root node; the node
//! hierarchy and per-node surfaces follow the source file, so the thumbnail
//! pipeline sees the same structure an editor would.
//!
//! # Examples
//! ```
//! use thumbframe::formats;
//!
//! let result = formats::load_model(b"invalid", None);
//! assert!(result.is_err());
//! ```

pub mod gltf;
pub mod obj;
pub mod texture;

use std::path::Path;

use crate::scene::{NodeId, Scene};

/// A loaded model: a scene and the root node holding the model.
pub struct LoadedModel {
    pub scene: Scene,
    pub root: NodeId,
}

impl LoadedModel {
    /// Number of triangles across all surfaces.
    pub fn triangle_count(&self) -> usize {
        self.scene
            .subtree_surfaces(self.root)
            .iter()
            .map(|ws| ws.surface.mesh.triangles.len())
            .sum()
    }
}

/// The result type for format loading.
///
/// # Examples
/// ```
/// use thumbframe::formats::{LoadError, LoadResult};
///
/// let result: LoadResult = Err(LoadError::UnrecognizedFormat);
/// assert!(result.is_err());
/// ```
pub type LoadResult = Result<LoadedModel, LoadError>;

/// Errors that can occur during format loading.
///
/// # Examples
/// ```
/// use thumbframe::formats::LoadError;
///
/// let err = LoadError::NoGeometry;
/// assert_eq!(format!("{}", err), "No geometry found");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Represents invalid or corrupted file data.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Indicates the file format is not recognized.
    #[error("Unrecognized format")]
    UnrecognizedFormat,
    /// Represents an IO error reading the file.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// Indicates no geometry was found in the model.
    #[error("No geometry found")]
    NoGeometry,
}

/// A trait for format-specific model loaders.
pub trait FormatLoader: Send + Sync {
    /// Returns the human-readable name for this format.
    fn name(&self) -> &'static str;

    /// Returns the file extensions this loader handles (lowercase, without dot).
    fn extensions(&self) -> &'static [&'static str];

    /// Checks whether this loader can handle the given data.
    ///
    /// This should be a quick check (magic bytes, leading structure) without
    /// fully parsing the file.
    fn can_load(&self, data: &[u8], extension: Option<&str>) -> bool;

    /// Loads a model from raw bytes.
    ///
    /// # Errors
    /// Returns an error if the data cannot be parsed or contains no geometry.
    fn load_from_bytes(&self, data: &[u8]) -> LoadResult;

    /// Loads a model from a file path.
    ///
    /// Default implementation reads the file and calls `load_from_bytes`,
    /// but loaders can override this to resolve external resources.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    fn load_from_path(&self, path: &Path) -> LoadResult {
        let data = std::fs::read(path)?;
        self.load_from_bytes(&data)
    }
}

/// Returns all registered format loaders.
///
/// # Examples
/// ```
/// use thumbframe::formats;
///
/// assert_eq!(formats::get_loaders().len(), 2);
/// ```
pub fn get_loaders() -> Vec<Box<dyn FormatLoader>> {
    vec![Box::new(gltf::GltfLoader), Box::new(obj::ObjLoader)]
}

/// Finds a loader that can handle the given data and extension.
///
/// # Examples
/// ```
/// use thumbframe::formats;
///
/// let loader = formats::find_loader(b"glTF", Some("glb"));
/// assert_eq!(loader.unwrap().name(), "glTF");
/// ```
pub fn find_loader(data: &[u8], extension: Option<&str>) -> Option<Box<dyn FormatLoader>> {
    let mut loaders = get_loaders();

    // First, try to match by extension if provided
    if let Some(ext) = extension {
        let ext_lower = ext.to_lowercase();
        if let Some(idx) = loaders.iter().position(|loader| {
            loader.extensions().contains(&ext_lower.as_str())
                && loader.can_load(data, Some(&ext_lower))
        }) {
            return Some(loaders.swap_remove(idx));
        }
    }

    // Fall back to content-based detection
    loaders.into_iter().find(|loader| loader.can_load(data, extension))
}

/// Loads a model from bytes, auto-detecting the format.
///
/// # Errors
/// Returns an error if no loader recognizes the data or parsing fails.
///
/// # Examples
/// ```
/// use thumbframe::formats::{self, LoadError};
///
/// let result = formats::load_model(b"invalid", None);
/// assert!(matches!(result, Err(LoadError::UnrecognizedFormat)));
/// ```
pub fn load_model(data: &[u8], extension: Option<&str>) -> LoadResult {
    find_loader(data, extension)
        .ok_or(LoadError::UnrecognizedFormat)?
        .load_from_bytes(data)
}

/// Loads a model from a file path, auto-detecting the format.
///
/// The root node is named after the file stem, which names the thumbnail.
///
/// # Errors
/// Returns an error if the file cannot be read or the format is unrecognized.
///
/// # Examples
/// ```
/// use std::path::Path;
///
/// use thumbframe::formats;
///
/// let result = formats::load_model_from_path(Path::new("does_not_exist.gltf"));
/// assert!(result.is_err());
/// ```
pub fn load_model_from_path(path: &Path) -> LoadResult {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase());

    let data = std::fs::read(path)?;

    let loader = find_loader(&data, extension.as_deref()).ok_or(LoadError::UnrecognizedFormat)?;

    // Use path-based loading for formats that need external resource resolution
    let mut model = loader.load_from_path(path)?;
    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
        if let Some(root) = model.scene.node_mut(model.root) {
            root.name = stem.to_string();
        }
    }
    Ok(model)
}
