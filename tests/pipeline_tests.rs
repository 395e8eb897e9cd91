//! End-to-end tests for the capture pipeline: isolation, two-pass framing,
//! PNG output and cleanup.

use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use thumbframe::assets::default_output_dir;
use thumbframe::camera::Camera;
use thumbframe::framing::{FramingDecision, SkipReason};
use thumbframe::layers::{LayerMask, LayerRegistry};
use thumbframe::mesh::Mesh;
use thumbframe::renderer::{RenderTarget, RenderedImage, Renderer};
use thumbframe::scene::{NodeId, Scene, Surface};
use thumbframe::silhouette::analyze;
use thumbframe::{Result, ThumbnailConfig, ThumbnailGenerator, ThumbnailImage};

fn add_mesh_node(scene: &mut Scene, name: &str, mesh: Mesh) -> NodeId {
    let node = scene.add_node(name, None);
    scene
        .node_mut(node)
        .unwrap()
        .surfaces
        .push(Surface::new(Arc::new(mesh)));
    node
}

fn unit_cube_scene() -> (Scene, NodeId) {
    let mut scene = Scene::new();
    let cube = add_mesh_node(
        &mut scene,
        "Cube",
        Mesh::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5), [0.8, 0.2, 0.2]),
    );
    (scene, cube)
}

fn decode(path: &Path) -> RenderedImage {
    RenderedImage::from_rgba_image(&image::open(path).unwrap().to_rgba8())
}

#[test]
fn test_unit_cube_is_refit_to_target_fill() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, cube) = unit_cube_scene();
    let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());

    let thumbnail = generator
        .capture_and_save(&mut scene, Some(cube), dir.path())
        .unwrap()
        .unwrap();

    assert_eq!(thumbnail.path, dir.path().join("Cube_Thumbnail.png"));
    assert!(thumbnail.report.first_pass.touches_border());
    assert!(matches!(thumbnail.report.decision, FramingDecision::Correct(_)));
    assert_eq!(thumbnail.report.render_passes, 2);

    let rect = thumbnail.report.final_silhouette;
    assert!((rect.max_dim() - 0.85).abs() < 0.02, "fill {}", rect.max_dim());
    assert!(rect.center_offset().x.abs() <= 0.1);
    assert!(rect.center_offset().y.abs() <= 0.1);

    // The file on disk is the image that was measured
    let written = decode(&thumbnail.path);
    assert_eq!((written.width(), written.height()), (256, 256));
    assert_eq!(analyze(&written, 0.01), rect);
}

#[test]
fn test_well_framed_subject_renders_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut scene = Scene::new();
    let card = add_mesh_node(&mut scene, "Card", Mesh::quad(1.0, 1.0, [1.0; 3]));
    let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());

    let report = generator
        .capture_and_save(&mut scene, Some(card), dir.path())
        .unwrap()
        .unwrap()
        .report;

    assert_eq!(report.decision, FramingDecision::Skip(SkipReason::WellFramed));
    assert_eq!(report.render_passes, 1);
    assert_eq!(report.final_silhouette, report.first_pass);
    assert!((report.first_pass.max_dim() - 0.833).abs() < 0.02);
}

#[test]
fn test_subject_without_enabled_surfaces_still_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, cube) = unit_cube_scene();
    scene.node_mut(cube).unwrap().surfaces[0].enabled = false;
    let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());

    let thumbnail = generator
        .capture_and_save(&mut scene, Some(cube), dir.path())
        .unwrap()
        .unwrap();

    assert_eq!(
        thumbnail.report.decision,
        FramingDecision::Skip(SkipReason::EmptySilhouette)
    );
    assert!(thumbnail.path.exists());
    assert!(decode(&thumbnail.path).pixels().iter().all(|&b| b == 0));
}

#[test]
fn test_repeated_captures_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, cube) = unit_cube_scene();
    let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());

    let first = generator
        .capture_and_save(&mut scene, Some(cube), dir.path())
        .unwrap()
        .unwrap();
    let second = generator
        .capture_and_save(&mut scene, Some(cube), dir.path())
        .unwrap()
        .unwrap();

    assert_eq!(first.report, second.report);
    assert_eq!(first.to_rgba_image(), second.to_rgba_image());
}

#[test]
fn test_scene_is_restored_after_capture() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, cube) = unit_cube_scene();
    let bystander = add_mesh_node(
        &mut scene,
        "Floor",
        Mesh::cuboid(Vec3::new(-5.0, -1.0, -5.0), Vec3::new(5.0, -0.9, 5.0), [0.5; 3]),
    );
    let before = scene.len();
    let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());

    let thumbnail = generator
        .capture_and_save(&mut scene, Some(cube), dir.path())
        .unwrap()
        .unwrap();

    assert_eq!(scene.len(), before);
    assert_eq!(scene.get(cube).unwrap().layer, 0);
    assert_eq!(scene.get(bystander).unwrap().layer, 0);
    assert_eq!(scene.world_position(cube).unwrap(), Vec3::ZERO);
    assert!(scene.lights().is_empty());
    assert_eq!(generator.layers().layer_index("Thumbnail"), Some(31));

    // The floor never shows up: only the isolated clone is on the capture layer
    let rect = thumbnail.report.final_silhouette;
    assert!(rect.max_dim() < 0.9);
}

#[test]
fn test_full_layer_registry_writes_empty_image() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, cube) = unit_cube_scene();
    let mut layers = LayerRegistry::default();
    for i in 8..32 {
        assert!(layers.ensure_layer(&format!("Taken{i}")).is_some());
    }
    let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default()).with_layers(layers);

    let thumbnail = generator
        .capture_and_save(&mut scene, Some(cube), dir.path())
        .unwrap()
        .unwrap();

    assert!(thumbnail.report.first_pass.is_empty());
    assert!(thumbnail.path.exists());
    assert!(!generator.layers().has_layer("Thumbnail"));
}

#[test]
fn test_output_inside_asset_root_is_reimported() {
    let root = tempfile::tempdir().unwrap();
    let config = ThumbnailConfig {
        asset_root: Some(root.path().to_path_buf()),
        ..ThumbnailConfig::default()
    };
    let (mut scene, cube) = unit_cube_scene();
    let mut generator = ThumbnailGenerator::new(config);

    let thumbnail = generator
        .capture_and_save(&mut scene, Some(cube), &default_output_dir(root.path()))
        .unwrap()
        .unwrap();

    match &thumbnail.image {
        ThumbnailImage::Asset { asset_path, image } => {
            assert_eq!(
                asset_path,
                "Assets/ThumbnailGenerator/GeneratedImages/Cube_Thumbnail.png"
            );
            assert_eq!(image.dimensions(), (256, 256));
        }
        ThumbnailImage::Rendered(_) => panic!("expected an indexed asset"),
    }
}

#[test]
fn test_output_outside_asset_root_returns_rendered_image() {
    let root = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let config = ThumbnailConfig {
        asset_root: Some(root.path().to_path_buf()),
        ..ThumbnailConfig::default()
    };
    let (mut scene, cube) = unit_cube_scene();
    let mut generator = ThumbnailGenerator::new(config);

    let thumbnail = generator
        .capture_and_save(&mut scene, Some(cube), elsewhere.path())
        .unwrap()
        .unwrap();
    assert!(matches!(thumbnail.image, ThumbnailImage::Rendered(_)));
}

#[test]
fn test_unwritable_output_is_logged_not_raised() {
    thumbframe::logging::init_default_logging();
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"").unwrap();
    let (mut scene, cube) = unit_cube_scene();
    let mut generator = ThumbnailGenerator::new(ThumbnailConfig::default());

    let result = generator.capture_and_save(&mut scene, Some(cube), &blocker.join("sub"));
    assert!(matches!(result, Ok(None)));
    assert_eq!(scene.len(), 1);

    let err = generator
        .try_capture_and_save(&mut scene, Some(cube), &blocker.join("sub"))
        .unwrap_err();
    assert!(!err.is_user_facing());
}

/// Reports a small blob in the top-right corner, then a centered one.
struct CornerThenCenter {
    calls: Cell<u32>,
}

impl Renderer for CornerThenCenter {
    fn render(
        &self,
        _scene: &Scene,
        _camera: &Camera,
        _mask: LayerMask,
        target: &mut RenderTarget,
    ) -> Result<RenderedImage> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        let mut image = RenderedImage::transparent(target.width(), target.height());
        let (x, y) = if call == 0 { (230, 230) } else { (128, 128) };
        image.set_pixel(x, y, [255, 255, 255, 255]);
        Ok(image)
    }
}

#[test]
fn test_off_center_silhouette_triggers_second_pass() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scene, cube) = unit_cube_scene();
    let renderer = CornerThenCenter {
        calls: Cell::new(0),
    };
    let mut generator = ThumbnailGenerator::with_renderer(ThumbnailConfig::default(), renderer);

    let report = generator
        .capture_and_save(&mut scene, Some(cube), dir.path())
        .unwrap()
        .unwrap()
        .report;

    let FramingDecision::Correct(correction) = report.decision else {
        panic!("expected a correction, got {:?}", report.decision);
    };
    assert!(correction.lateral.x > 0.0);
    assert!(correction.lateral.y > 0.0);
    assert!(correction.new_distance < correction.old_distance);
    assert_eq!(report.render_passes, 2);
    assert!(report.final_silhouette.center_offset().length() < 0.01);
}
