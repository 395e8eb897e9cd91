//! Provides the project asset tree: detection of paths inside it, re-indexing
//! after a thumbnail is written, and loading indexed images back.
//!
//! # Examples
//! ```
//! use std::path::Path;
//!
//! use thumbframe::assets::{default_output_dir, AssetDatabase};
//!
//! let db = AssetDatabase::new("project/Assets");
//! assert!(db.contains(Path::new("project/Assets/icons/cube.png")));
//! assert!(!db.contains(Path::new("elsewhere/cube.png")));
//! assert_eq!(
//!     db.asset_path(Path::new("project/Assets/icons/cube.png")).as_deref(),
//!     Some("Assets/icons/cube.png")
//! );
//! assert!(default_output_dir(Path::new("project/Assets")).ends_with("GeneratedImages"));
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use image::RgbaImage;

use crate::error::{Result, ThumbnailError};

/// File extensions indexed as image assets.
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Returns the directory thumbnails go to by default inside an asset tree.
pub fn default_output_dir(asset_root: &Path) -> PathBuf {
    asset_root.join("ThumbnailGenerator").join("GeneratedImages")
}

/// An index of the image files under an asset root.
#[derive(Clone, Debug)]
pub struct AssetDatabase {
    root: PathBuf,
    indexed: BTreeSet<PathBuf>,
}

impl AssetDatabase {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            indexed: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when `path` lies under the asset root.
    pub fn contains(&self, path: &Path) -> bool {
        normalize(path).starts_with(normalize(&self.root))
    }

    /// The root-relative asset path, prefixed `Assets/` with forward slashes.
    pub fn asset_path(&self, path: &Path) -> Option<String> {
        let relative = normalize(path)
            .strip_prefix(normalize(&self.root))
            .ok()?
            .to_path_buf();
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("Assets/{}", parts.join("/")))
    }

    /// Rescans the asset root and returns the number of indexed images.
    ///
    /// # Errors
    /// Returns an error if a directory under the root cannot be read.
    pub fn refresh(&mut self) -> Result<usize> {
        let mut indexed = BTreeSet::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            if !dir.is_dir() {
                continue;
            }
            let entries = std::fs::read_dir(&dir).map_err(|e| ThumbnailError::io(&dir, e))?;
            for entry in entries {
                let path = entry.map_err(|e| ThumbnailError::io(&dir, e))?.path();
                if path.is_dir() {
                    pending.push(path);
                } else if is_image(&path) {
                    indexed.insert(normalize(&path));
                }
            }
        }
        tracing::debug!(root = %self.root.display(), count = indexed.len(), "refreshed asset index");
        self.indexed = indexed;
        Ok(self.indexed.len())
    }

    pub fn is_indexed(&self, path: &Path) -> bool {
        self.indexed.contains(&normalize(path))
    }

    /// Decodes an indexed image file.
    ///
    /// # Errors
    /// Returns [`ThumbnailError::Io`] if the file is not indexed, or an image
    /// error if decoding fails.
    pub fn load_image(&self, path: &Path) -> Result<RgbaImage> {
        if !self.is_indexed(path) {
            return Err(ThumbnailError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "asset is not indexed"),
            ));
        }
        Ok(image::open(path)?.to_rgba8())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

/// Canonicalizes when the path exists, so relative and absolute spellings compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_indexes_images_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        RgbaImage::new(2, 2).save(nested.join("thumb.png")).unwrap();
        std::fs::write(root.join("notes.txt"), "ignored").unwrap();

        let mut db = AssetDatabase::new(root);
        assert!(!db.is_indexed(&nested.join("thumb.png")));
        assert_eq!(db.refresh().unwrap(), 1);
        assert!(db.is_indexed(&nested.join("thumb.png")));
        assert_eq!(db.load_image(&nested.join("thumb.png")).unwrap().dimensions(), (2, 2));
        assert!(db.load_image(&root.join("notes.txt")).is_err());
    }

    #[test]
    fn test_missing_root_refreshes_to_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let mut db = AssetDatabase::new(tmp.path().join("no-such-root"));
        assert_eq!(db.refresh().unwrap(), 0);
    }

    #[test]
    fn test_contains_handles_relative_and_absolute_spellings() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        let file = root.join("x.png");
        std::fs::write(&file, b"").unwrap();
        let db = AssetDatabase::new(root.join(".").join(""));
        assert!(db.contains(&file));
        assert_eq!(db.asset_path(&file).as_deref(), Some("Assets/x.png"));
    }
}
