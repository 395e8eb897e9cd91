//! Provides the thumbnail orchestrator.
//!
//! One capture clones the subject, isolates the clone on its own render layer
//! far from the rest of the scene, places a temporary camera and light,
//! renders, measures the silhouette, optionally corrects the camera and
//! renders once more, then writes `{name}_Thumbnail.png`.
//!
//! Temporaries are owned by a [`CaptureSession`] guard and released on every
//! exit path. Their names carry a per-capture id, and captures borrow the
//! scene mutably, so captures into the same scene are serialized while
//! captures into different scenes may run concurrently.
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use glam::Vec3;
//! use thumbframe::config::ThumbnailConfig;
//! use thumbframe::mesh::Mesh;
//! use thumbframe::scene::{Scene, Surface};
//! use thumbframe::thumbnail::ThumbnailGenerator;
//!
//! let mut scene = Scene::new();
//! let crate_node = scene.add_node("Crate", None);
//! let mesh = Arc::new(Mesh::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5), [0.8, 0.6, 0.3]));
//! scene.node_mut(crate_node).unwrap().surfaces.push(Surface::new(mesh));
//!
//! let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());
//! let thumbnail = generator
//!     .capture_and_save(&mut scene, Some(crate_node), Path::new("thumbnails"))
//!     .unwrap()
//!     .expect("thumbnail written");
//! assert!(thumbnail.path.ends_with("Crate_Thumbnail.png"));
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec3;
use image::RgbaImage;

use crate::assets::AssetDatabase;
use crate::bounds::estimate_bounds;
use crate::camera::{place_camera, Camera};
use crate::config::ThumbnailConfig;
use crate::error::{Result, ThumbnailError};
use crate::framing::{plan_correction, FramingDecision};
use crate::layers::{LayerMask, LayerRegistry};
use crate::renderer::{RenderTarget, RenderedImage, Renderer, SoftwareRenderer};
use crate::scene::{DirectionalLight, NodeId, Scene, Transform};
use crate::silhouette::{analyze, SilhouetteRect};

/// Name prefix of the temporary subject clone.
pub const CLONE_NAME_PREFIX: &str = "ThumbnailSubject#";
/// Name prefix of the temporary camera node.
pub const CAMERA_NAME_PREFIX: &str = "ThumbnailCamera#";
/// Name prefix of the temporary light node.
pub const LIGHT_NAME_PREFIX: &str = "ThumbnailLight#";

const TEMPORARY_PREFIXES: [&str; 3] = [CLONE_NAME_PREFIX, CAMERA_NAME_PREFIX, LIGHT_NAME_PREFIX];

static NEXT_CAPTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Handles to the scene nodes created for one capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporaryHandles {
    pub clone: NodeId,
    pub camera: NodeId,
    pub light: NodeId,
}

/// Destroys the temporaries named by `handles`. Safe to call more than once.
///
/// Returns the number of handles that were still live.
pub fn release_temporaries(scene: &mut Scene, handles: &TemporaryHandles) -> usize {
    [handles.light, handles.camera, handles.clone]
        .into_iter()
        .filter(|id| scene.destroy(*id))
        .count()
}

/// Destroys root nodes left over from an interrupted capture.
///
/// Matches by the temporary name prefixes, so it is idempotent and can run
/// before every capture. Returns the number of subtrees removed.
pub fn cleanup_stale_temporaries(scene: &mut Scene) -> usize {
    let stale: Vec<NodeId> = scene
        .roots()
        .into_iter()
        .filter(|id| {
            scene
                .node(*id)
                .is_some_and(|n| TEMPORARY_PREFIXES.iter().any(|p| n.name.starts_with(p)))
        })
        .collect();
    for id in &stale {
        scene.destroy(*id);
    }
    if !stale.is_empty() {
        tracing::warn!(count = stale.len(), "removed leftover thumbnail temporaries");
    }
    stale.len()
}

/// Scene temporaries and the offscreen target of one capture.
///
/// Dropping the session releases everything it created.
pub struct CaptureSession<'a> {
    scene: &'a mut Scene,
    handles: TemporaryHandles,
    target: RenderTarget,
}

impl<'a> CaptureSession<'a> {
    /// Clones `subject`, isolates the clone and creates the camera rig.
    ///
    /// # Errors
    /// Returns an error if `subject` is not a live node. Nothing is left in
    /// the scene on error.
    pub fn begin(
        scene: &'a mut Scene,
        subject: NodeId,
        config: &ThumbnailConfig,
        layer: Option<u8>,
    ) -> Result<Self> {
        let id = NEXT_CAPTURE_ID.fetch_add(1, Ordering::Relaxed);

        let clone = scene.instantiate(subject)?;
        let camera = scene.add_node(format!("{CAMERA_NAME_PREFIX}{id}"), None);
        let light = scene.add_node(format!("{LIGHT_NAME_PREFIX}{id}"), Some(camera));
        let mut session = Self {
            scene,
            handles: TemporaryHandles {
                clone,
                camera,
                light,
            },
            target: RenderTarget::new(config.width, config.height),
        };

        let node = session.scene.get_mut(clone)?;
        node.name = format!("{CLONE_NAME_PREFIX}{id}");
        node.transform.translation = Vec3::from_array(config.isolation.staging_offset);
        if let Some(layer) = layer {
            session.scene.set_layer_recursive(clone, layer);
        }

        session.scene.get_mut(light)?.light = Some(DirectionalLight {
            color: config.light.color,
            intensity: config.light.intensity,
        });

        Ok(session)
    }

    pub fn handles(&self) -> TemporaryHandles {
        self.handles
    }

    pub fn scene(&self) -> &Scene {
        &*self.scene
    }

    /// Moves the camera node (and the light parented to it) to match `camera`.
    pub fn sync_camera(&mut self, camera: &Camera) -> Result<()> {
        self.scene.get_mut(self.handles.camera)?.transform = Transform {
            translation: camera.position,
            rotation: camera.rotation(),
            scale: Vec3::ONE,
        };
        Ok(())
    }

    /// Renders the scene through `camera` into the session's target.
    pub fn render(
        &mut self,
        renderer: &dyn Renderer,
        camera: &Camera,
        mask: LayerMask,
    ) -> Result<RenderedImage> {
        self.sync_camera(camera)?;
        renderer.render(&*self.scene, camera, mask, &mut self.target)
    }
}

impl Drop for CaptureSession<'_> {
    fn drop(&mut self) {
        let released = release_temporaries(&mut *self.scene, &self.handles);
        tracing::debug!(released, "released thumbnail temporaries");
    }
}

/// What the framing pass measured and decided.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramingReport {
    pub first_pass: SilhouetteRect,
    pub decision: FramingDecision,
    /// Silhouette of the image that was written.
    pub final_silhouette: SilhouetteRect,
    /// 1 when no correction was needed, 2 otherwise.
    pub render_passes: u8,
}

/// The image handed back to the caller.
#[derive(Clone, Debug)]
pub enum ThumbnailImage {
    /// The written file, re-read from the refreshed asset index.
    Asset { asset_path: String, image: RgbaImage },
    /// The rendered image itself, for files outside the asset tree.
    Rendered(RenderedImage),
}

/// A written thumbnail.
#[derive(Clone, Debug)]
pub struct Thumbnail {
    pub path: PathBuf,
    pub image: ThumbnailImage,
    pub report: FramingReport,
}

impl Thumbnail {
    /// The thumbnail as a top-down RGBA image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        match &self.image {
            ThumbnailImage::Asset { image, .. } => image.clone(),
            ThumbnailImage::Rendered(rendered) => rendered.to_rgba_image(),
        }
    }
}

/// Renders auto-framed thumbnails of scene nodes.
pub struct ThumbnailGenerator<R: Renderer = SoftwareRenderer> {
    config: ThumbnailConfig,
    renderer: R,
    layers: LayerRegistry,
    assets: Option<AssetDatabase>,
}

impl ThumbnailGenerator<SoftwareRenderer> {
    /// Creates a generator using the software rasterizer.
    pub fn new(config: ThumbnailConfig) -> Self {
        let renderer = SoftwareRenderer {
            ambient: config.light.ambient,
        };
        Self::with_renderer(config, renderer)
    }
}

impl<R: Renderer> ThumbnailGenerator<R> {
    pub fn with_renderer(config: ThumbnailConfig, renderer: R) -> Self {
        let assets = config.asset_root.clone().map(AssetDatabase::new);
        Self {
            config,
            renderer,
            layers: LayerRegistry::default(),
            assets,
        }
    }

    /// Replaces the layer registry (e.g. one loaded from a settings file).
    pub fn with_layers(mut self, layers: LayerRegistry) -> Self {
        self.layers = layers;
        self
    }

    pub fn config(&self) -> &ThumbnailConfig {
        &self.config
    }

    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    /// Captures `subject` and writes its thumbnail into `output_dir`.
    ///
    /// Returns `Ok(None)` when the capture fails after validation; the
    /// failure is logged.
    ///
    /// # Errors
    /// Returns [`ThumbnailError::MissingSubject`] when no live subject is
    /// given. No temporary is created in that case.
    pub fn capture_and_save(
        &mut self,
        scene: &mut Scene,
        subject: Option<NodeId>,
        output_dir: &Path,
    ) -> Result<Option<Thumbnail>> {
        match self.try_capture_and_save(scene, subject, output_dir) {
            Ok(thumbnail) => Ok(Some(thumbnail)),
            Err(e) if e.is_user_facing() => Err(e),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    dir = %output_dir.display(),
                    "Failed to generate thumbnail"
                );
                Ok(None)
            }
        }
    }

    /// Like [`ThumbnailGenerator::capture_and_save`], but returns every failure.
    ///
    /// # Errors
    /// Returns an error if the subject is missing or any render, encode or
    /// write step fails.
    pub fn try_capture_and_save(
        &mut self,
        scene: &mut Scene,
        subject: Option<NodeId>,
        output_dir: &Path,
    ) -> Result<Thumbnail> {
        let subject = subject
            .filter(|id| scene.contains(*id))
            .ok_or(ThumbnailError::MissingSubject)?;
        let name = scene.get(subject)?.name.clone();
        let _span = tracing::info_span!("thumbnail", subject = %name).entered();

        cleanup_stale_temporaries(scene);
        let layer = self.prepare_isolation_layer();
        let mask = layer.map_or(LayerMask::NONE, LayerMask::single);

        let (image, report) = {
            let mut session = CaptureSession::begin(scene, subject, &self.config, layer)?;
            self.render_framed(&mut session, mask)?
        };

        let path = self.write_png(&image, &name, output_dir)?;
        let image = self.resolve_image(&path, image)?;

        Ok(Thumbnail {
            path,
            image,
            report,
        })
    }

    /// Looks up or allocates the isolation layer. A full registry is not fatal.
    fn prepare_isolation_layer(&mut self) -> Option<u8> {
        let name = &self.config.isolation.layer_name;
        let layer = self.layers.ensure_layer(name);
        if layer.is_none() {
            tracing::warn!(layer = %name, "Could not allocate a layer for thumbnail generation");
        }
        layer
    }

    fn render_framed(
        &self,
        session: &mut CaptureSession<'_>,
        mask: LayerMask,
    ) -> Result<(RenderedImage, FramingReport)> {
        let clone = session.handles().clone;
        let fallback_center = session.scene().world_position(clone)?;
        let bounds = estimate_bounds(session.scene().surface_bounds(clone), fallback_center);

        let placement = place_camera(
            &bounds,
            &self.config.camera,
            self.config.aspect(),
            &self.config.framing,
        );
        let mut camera = placement.camera;

        let mut image = session.render(&self.renderer, &camera, mask)?;
        let first_pass = analyze(&image, self.config.framing.alpha_threshold);
        tracing::debug!(?first_pass, "pass 1 silhouette");

        let decision = plan_correction(
            &first_pass,
            &camera,
            placement.distance,
            Some(&bounds),
            &self.config.framing,
        );

        let mut report = FramingReport {
            first_pass,
            decision,
            final_silhouette: first_pass,
            render_passes: 1,
        };

        if let FramingDecision::Correct(correction) = decision {
            correction.apply(&mut camera);
            image = session.render(&self.renderer, &camera, mask)?;
            report.final_silhouette = analyze(&image, self.config.framing.alpha_threshold);
            report.render_passes = 2;
            tracing::debug!(final_silhouette = ?report.final_silhouette, "pass 2 silhouette");
        }

        Ok((image, report))
    }

    fn write_png(&self, image: &RenderedImage, name: &str, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir).map_err(|e| ThumbnailError::io(output_dir, e))?;
        let path = output_dir.join(thumbnail_file_name(name));
        let bytes = image.encode_png()?;
        std::fs::write(&path, bytes).map_err(|e| ThumbnailError::io(&path, e))?;
        tracing::info!(path = %path.display(), "Thumbnail generated");
        Ok(path)
    }

    fn resolve_image(&mut self, path: &Path, rendered: RenderedImage) -> Result<ThumbnailImage> {
        match self.assets.as_mut() {
            Some(db) if db.contains(path) => {
                db.refresh()?;
                let asset_path = db
                    .asset_path(path)
                    .ok_or_else(|| ThumbnailError::io(path, std::io::ErrorKind::NotFound.into()))?;
                let image = db.load_image(path)?;
                Ok(ThumbnailImage::Asset { asset_path, image })
            }
            _ => Ok(ThumbnailImage::Rendered(rendered)),
        }
    }
}

/// File name for a subject's thumbnail. Path separators in the name are replaced.
pub fn thumbnail_file_name(subject_name: &str) -> String {
    let safe: String = subject_name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}_Thumbnail.png")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mesh::Mesh;
    use crate::scene::Surface;

    fn scene_with_cube() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let node = scene.add_node("Cube", None);
        let mesh = Arc::new(Mesh::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5), [1.0; 3]));
        scene.node_mut(node).unwrap().surfaces.push(Surface::new(mesh));
        (scene, node)
    }

    #[test]
    fn test_session_releases_temporaries_on_drop() {
        let (mut scene, subject) = scene_with_cube();
        let config = ThumbnailConfig::default();
        let handles = {
            let session = CaptureSession::begin(&mut scene, subject, &config, Some(31)).unwrap();
            let handles = session.handles();
            let clone = session.scene().get(handles.clone).unwrap();
            assert!(clone.name.starts_with(CLONE_NAME_PREFIX));
            assert_eq!(clone.layer, 31);
            assert_eq!(session.scene().world_position(handles.clone).unwrap(), Vec3::new(0.0, -1000.0, 0.0));
            assert_eq!(session.scene().lights().len(), 1);
            handles
        };
        assert!(!scene.contains(handles.clone));
        assert!(!scene.contains(handles.camera));
        assert!(!scene.contains(handles.light));
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.get(subject).unwrap().layer, 0);
        assert_eq!(release_temporaries(&mut scene, &handles), 0);
    }

    #[test]
    fn test_session_releases_on_error_path() {
        let (mut scene, subject) = scene_with_cube();
        let config = ThumbnailConfig::default();
        let result: Result<()> = (|| {
            let mut session = CaptureSession::begin(&mut scene, subject, &config, Some(31))?;
            let mut camera = Camera::new(&config.camera, 1.0);
            camera.position = Vec3::Z;
            session.render(&SoftwareRenderer::default(), &camera, LayerMask::ALL)?;
            Err(ThumbnailError::render("simulated failure"))
        })();
        assert!(result.is_err());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_cleanup_stale_temporaries_is_idempotent() {
        let (mut scene, _) = scene_with_cube();
        let cam = scene.add_node(format!("{CAMERA_NAME_PREFIX}7"), None);
        scene.add_node(format!("{LIGHT_NAME_PREFIX}7"), Some(cam));
        scene.add_node(format!("{CLONE_NAME_PREFIX}7"), None);

        assert_eq!(cleanup_stale_temporaries(&mut scene), 2);
        assert_eq!(scene.len(), 1);
        assert_eq!(cleanup_stale_temporaries(&mut scene), 0);
    }

    #[test]
    fn test_missing_subject_is_reported_without_side_effects() {
        let (mut scene, subject) = scene_with_cube();
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("never-created");
        let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());

        let err = generator.capture_and_save(&mut scene, None, &dir).unwrap_err();
        assert!(matches!(err, ThumbnailError::MissingSubject));

        scene.destroy(subject);
        let err = generator.capture_and_save(&mut scene, Some(subject), &dir).unwrap_err();
        assert!(matches!(err, ThumbnailError::MissingSubject));
        assert!(!generator.layers().has_layer("Thumbnail"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_file_name_sanitizes_separators() {
        assert_eq!(thumbnail_file_name("Hat"), "Hat_Thumbnail.png");
        assert_eq!(thumbnail_file_name("a/b\\c"), "a_b_c_Thumbnail.png");
    }
}
