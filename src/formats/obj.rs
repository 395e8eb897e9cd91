//! Provides a Wavefront OBJ format loader.
//!
//! OBJ is a widely supported 3D model format. This loader handles geometry
//! (vertices and faces) with automatic polygon triangulation. Each material
//! group becomes a child node of the model root. When loaded from a file
//! path, companion .mtl materials are resolved for diffuse colors and
//! textures.

use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;

use obj::raw::material::{parse_mtl, MtlColor};
use glam::{Vec2, Vec3};
use obj::raw::object::{Polygon, RawObj};
use obj::raw::parse_obj;

use super::texture::load_texture_from_file;
use super::{FormatLoader, LoadError, LoadResult, LoadedModel};
use crate::mesh::{Mesh, TextureData, Triangle};
use crate::scene::{Scene, Surface};

/// Diffuse color for faces without a material.
const DEFAULT_COLOR: [f32; 3] = [0.85, 0.85, 0.85];

/// Node name for faces outside any material group.
const DEFAULT_GROUP: &str = "default";

/// The Wavefront OBJ format loader.
pub struct ObjLoader;

impl FormatLoader for ObjLoader {
    fn name(&self) -> &'static str {
        "Wavefront OBJ"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["obj"]
    }

    fn can_load(&self, data: &[u8], extension: Option<&str>) -> bool {
        if let Some(ext) = extension {
            if ext.to_lowercase() == "obj" {
                return true;
            }
        }

        // Content detection: look for OBJ vertex/face lines
        if let Ok(text) = std::str::from_utf8(data) {
            let sample = &text[..text.len().min(4000)];
            let mut has_vertex = false;
            let mut has_face = false;
            for line in sample.lines() {
                let trimmed = line.trim();
                if trimmed.starts_with("v ") {
                    has_vertex = true;
                }
                if trimmed.starts_with("f ") {
                    has_face = true;
                }
                if has_vertex && has_face {
                    return true;
                }
            }
        }

        false
    }

    fn load_from_bytes(&self, data: &[u8]) -> LoadResult {
        let reader = BufReader::new(Cursor::new(data));
        let raw = parse_obj(reader)
            .map_err(|e| LoadError::InvalidData(format!("Failed to parse OBJ: {}", e)))?;

        build_scene(&raw, &HashMap::new())
    }

    fn load_from_path(&self, path: &Path) -> LoadResult {
        let data = std::fs::read(path)?;
        let reader = BufReader::new(Cursor::new(&data[..]));
        let raw = parse_obj(reader)
            .map_err(|e| LoadError::InvalidData(format!("Failed to parse OBJ: {}", e)))?;

        // Load companion .mtl files
        let obj_dir = path.parent().unwrap_or(Path::new("."));
        let materials = load_mtl_materials(&raw.material_libraries, obj_dir);

        build_scene(&raw, &materials)
    }
}

/// Loaded material data from .mtl file.
struct ObjMaterial {
    color: [f32; 3],
    texture: Option<Arc<TextureData>>,
}

/// Loads materials from .mtl files referenced by the OBJ.
fn load_mtl_materials(mtl_libs: &[String], obj_dir: &Path) -> HashMap<String, ObjMaterial> {
    let mut materials = HashMap::new();

    for mtl_name in mtl_libs {
        let mtl_path = obj_dir.join(mtl_name);
        let mtl_data = match std::fs::read(&mtl_path) {
            Ok(d) => d,
            Err(_) => continue,
        };

        let reader = BufReader::new(Cursor::new(&mtl_data[..]));
        let raw_mtl = match parse_mtl(reader) {
            Ok(m) => m,
            Err(_) => continue,
        };

        let mtl_dir = mtl_path.parent().unwrap_or(obj_dir);

        for (name, mat) in &raw_mtl.materials {
            let color = mat
                .diffuse
                .as_ref()
                .map(mtl_color_to_rgb)
                .unwrap_or(DEFAULT_COLOR);

            let texture = mat.diffuse_map.as_ref().and_then(|map| {
                let tex_path = mtl_dir.join(&map.file);
                load_texture_from_file(&tex_path)
            });

            materials.insert(name.clone(), ObjMaterial { color, texture });
        }
    }

    materials
}

fn mtl_color_to_rgb(color: &MtlColor) -> [f32; 3] {
    match color {
        MtlColor::Rgb(r, g, b) => [*r, *g, *b],
        MtlColor::Xyz(x, y, z) => [*x, *y, *z],
        MtlColor::Spectral(_, _) => DEFAULT_COLOR,
    }
}

/// Extracts position index at a given slot from any polygon variant.
fn polygon_pos_at(polygon: &Polygon, i: usize) -> Option<usize> {
    match polygon {
        Polygon::P(indices) => indices.get(i).copied(),
        Polygon::PT(pairs) => pairs.get(i).map(|&(p, _)| p),
        Polygon::PN(pairs) => pairs.get(i).map(|&(p, _)| p),
        Polygon::PTN(triples) => triples.get(i).map(|&(p, _, _)| p),
    }
}

/// Returns the number of vertices in a polygon.
fn polygon_len(polygon: &Polygon) -> usize {
    match polygon {
        Polygon::P(indices) => indices.len(),
        Polygon::PT(pairs) => pairs.len(),
        Polygon::PN(pairs) => pairs.len(),
        Polygon::PTN(triples) => triples.len(),
    }
}

/// Extracts texture coordinate index at a given slot (if available).
fn polygon_tex_at(polygon: &Polygon, i: usize) -> Option<usize> {
    match polygon {
        Polygon::P(_) | Polygon::PN(_) => None,
        Polygon::PT(pairs) => pairs.get(i).map(|&(_, t)| t),
        Polygon::PTN(triples) => triples.get(i).map(|&(_, t, _)| t),
    }
}

/// Builds a scene with one child node per material group.
///
/// Polygons outside any `usemtl` group land in a `default` child. Children
/// are ordered by material name so repeated loads produce the same scene.
fn build_scene(raw: &RawObj, materials: &HashMap<String, ObjMaterial>) -> LoadResult {
    let default_uv = Vec2::ZERO;
    let positions = &raw.positions;
    let tex_coords = &raw.tex_coords;

    // Polygon index -> material name
    let mut polygon_material: Vec<Option<&str>> = vec![None; raw.polygons.len()];
    for (mat_name, group) in &raw.meshes {
        for range in &group.polygons {
            for i in range.start..range.end {
                if let Some(slot) = polygon_material.get_mut(i) {
                    *slot = Some(mat_name.as_str()).filter(|n| !n.is_empty());
                }
            }
        }
    }

    let position_at = |idx: usize| {
        positions
            .get(idx)
            .map(|&(x, y, z, _)| Vec3::new(x, y, z))
    };
    let uv_at = |polygon: &Polygon, i: usize| {
        polygon_tex_at(polygon, i)
            .and_then(|idx| tex_coords.get(idx))
            .map(|&(u, v, _)| Vec2::new(u, v))
            .unwrap_or(default_uv)
    };

    let mut groups: BTreeMap<&str, Vec<Triangle>> = BTreeMap::new();
    for (poly_idx, polygon) in raw.polygons.iter().enumerate() {
        let n = polygon_len(polygon);
        if n < 3 {
            continue;
        }

        let mat_name = polygon_material[poly_idx];
        let mat = mat_name.and_then(|name| materials.get(name));
        let color = mat.map(|m| m.color).unwrap_or(DEFAULT_COLOR);
        let texture = mat.and_then(|m| m.texture.clone());

        // Fan triangulation
        let Some(v0) = polygon_pos_at(polygon, 0).and_then(position_at) else {
            continue;
        };
        let uv0 = uv_at(polygon, 0);

        let triangles = groups.entry(mat_name.unwrap_or(DEFAULT_GROUP)).or_default();
        for i in 1..n - 1 {
            let (Some(v1), Some(v2)) = (
                polygon_pos_at(polygon, i).and_then(position_at),
                polygon_pos_at(polygon, i + 1).and_then(position_at),
            ) else {
                continue;
            };

            triangles.push(Triangle {
                verts: [v0, v1, v2],
                uvs: [uv0, uv_at(polygon, i), uv_at(polygon, i + 1)],
                color,
                texture: texture.clone(),
            });
        }
    }

    groups.retain(|_, triangles| !triangles.is_empty());
    if groups.is_empty() {
        return Err(LoadError::NoGeometry);
    }

    let mut scene = Scene::new();
    let root = scene.add_node("Model", None);
    for (name, triangles) in groups {
        let child = scene.add_node(name, Some(root));
        if let Some(node) = scene.node_mut(child) {
            node.surfaces.push(Surface::new(Arc::new(Mesh::new(triangles))));
        }
    }

    Ok(LoadedModel { scene, root })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n";

    #[test]
    fn test_can_load_by_content() {
        assert!(ObjLoader.can_load(SQUARE.as_bytes(), None));
        assert!(!ObjLoader.can_load(b"hello world", None));
    }

    #[test]
    fn test_quad_is_fan_triangulated_into_default_group() {
        let model = ObjLoader.load_from_bytes(SQUARE.as_bytes()).unwrap();
        assert_eq!(model.triangle_count(), 2);

        let children = model.scene.node(model.root).unwrap().children().to_vec();
        assert_eq!(children.len(), 1);
        assert_eq!(model.scene.node(children[0]).unwrap().name, DEFAULT_GROUP);
    }

    #[test]
    fn test_faces_without_vertices_are_no_geometry() {
        let result = ObjLoader.load_from_bytes(b"v 0 0 0\nv 1 0 0\n");
        assert!(matches!(result, Err(LoadError::NoGeometry)));
    }
}
