//! Provides render layers, layer masks and the project layer registry.
//!
//! The registry mirrors a project settings file with 32 named layer slots.
//! Slots below [`FIRST_USER_LAYER`] are built-in; the rest can be claimed by
//! name, which is how the thumbnail isolation layer is allocated.
//!
//! # Examples
//! ```
//! use thumbframe::layers::{LayerMask, LayerRegistry};
//!
//! let mut registry = LayerRegistry::default();
//! let layer = registry.ensure_layer("Thumbnail").unwrap();
//! assert_eq!(layer, 31);
//! assert!(LayerMask::single(layer).contains(31));
//! assert!(!LayerMask::single(layer).contains(0));
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThumbnailError};

/// Number of layer slots.
pub const MAX_LAYERS: usize = 32;
/// First slot available for user-named layers.
pub const FIRST_USER_LAYER: usize = 8;
/// The layer every node starts on.
pub const DEFAULT_LAYER: u8 = 0;

const BUILTIN_LAYERS: [&str; FIRST_USER_LAYER] = [
    "Default",
    "TransparentFX",
    "Ignore Raycast",
    "",
    "Water",
    "UI",
    "",
    "",
];

/// A bit set of layers a camera renders.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Renders nothing.
    pub const NONE: LayerMask = LayerMask(0);
    /// Renders every layer.
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// A mask containing only `layer`. Out-of-range layers give [`LayerMask::NONE`].
    pub fn single(layer: u8) -> Self {
        1u32.checked_shl(layer as u32).map_or(Self::NONE, LayerMask)
    }

    pub fn contains(&self, layer: u8) -> bool {
        LayerMask::single(layer).0 & self.0 != 0
    }
}

/// Named layer slots persisted as a JSON settings file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRegistry {
    layers: Vec<String>,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        let mut layers: Vec<String> = BUILTIN_LAYERS.iter().map(|s| s.to_string()).collect();
        layers.resize(MAX_LAYERS, String::new());
        Self { layers }
    }
}

impl LayerRegistry {
    /// Loads a registry from a settings file. A missing file yields the default registry.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ThumbnailError::io(path, e))?;
        let mut registry: Self = serde_json::from_str(&text)?;
        registry.layers.resize(MAX_LAYERS, String::new());
        Ok(registry)
    }

    /// Writes the registry to a settings file.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| ThumbnailError::io(path, e))
    }

    /// Returns the slot holding `name`, if any.
    pub fn layer_index(&self, name: &str) -> Option<u8> {
        if name.is_empty() {
            return None;
        }
        self.layers.iter().position(|l| l == name).map(|i| i as u8)
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layer_index(name).is_some()
    }

    /// Returns the name stored in `slot` (empty when unused).
    pub fn name(&self, slot: u8) -> Option<&str> {
        self.layers.get(slot as usize).map(String::as_str)
    }

    /// Returns the slot for `name`, claiming the highest free user slot if needed.
    ///
    /// Returns `None` when the layer does not exist and every user slot is taken.
    pub fn ensure_layer(&mut self, name: &str) -> Option<u8> {
        if let Some(index) = self.layer_index(name) {
            return Some(index);
        }
        if name.is_empty() {
            return None;
        }
        let slot = (FIRST_USER_LAYER..MAX_LAYERS)
            .rev()
            .find(|&i| self.layers[i].is_empty())?;
        self.layers[slot] = name.to_string();
        tracing::debug!(layer = name, slot, "allocated render layer");
        Some(slot as u8)
    }
}
