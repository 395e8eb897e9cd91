//! Provides a glTF/GLB format loader.
//!
//! Supports both binary GLB and JSON glTF files with embedded or external
//! resources. Every glTF node becomes a scene node with the same local
//! transform; each triangle primitive becomes one surface.
//!
//! # Examples
//! ```
//! use thumbframe::formats::{self, FormatLoader};
//!
//! let loader = formats::gltf::GltfLoader;
//! assert!(loader.extensions().contains(&"gltf"));
//! ```

use std::path::Path;
use std::sync::Arc;

use glam::{Quat, Vec2, Vec3};

use super::texture::texture_from_bytes;
use super::{FormatLoader, LoadError, LoadResult, LoadedModel};
use crate::mesh::{Mesh, TextureData, Triangle};
use crate::scene::{NodeId, Scene, Surface, Transform};

/// The glTF format loader.
pub struct GltfLoader;

impl FormatLoader for GltfLoader {
    fn name(&self) -> &'static str {
        "glTF"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["gltf", "glb"]
    }

    fn can_load(&self, data: &[u8], extension: Option<&str>) -> bool {
        if let Some(ext) = extension {
            let ext_lower = ext.to_lowercase();
            if ext_lower == "gltf" || ext_lower == "glb" {
                return true;
            }
        }

        // GLB magic bytes
        if data.len() >= 4 && &data[0..4] == b"glTF" {
            return true;
        }

        // JSON glTF structure
        if data.len() > 10 {
            let start = String::from_utf8_lossy(&data[..data.len().min(1000)]);
            if start.contains("\"asset\"")
                && (start.contains("\"scene\"") || start.contains("\"scenes\""))
            {
                return true;
            }
        }

        false
    }

    fn load_from_bytes(&self, data: &[u8]) -> LoadResult {
        // Works for GLB and fully-embedded glTF
        if let Ok((document, buffers, images)) = gltf::import_slice(data) {
            return build_scene(&document, &buffers, &images);
        }

        // Lenient parsing for JSON glTF with external references
        let gltf_data = gltf::Gltf::from_slice(data)
            .map_err(|e| LoadError::InvalidData(format!("Failed to parse glTF: {}", e)))?;
        let document = gltf_data.document;

        let buffers: Vec<gltf::buffer::Data> = document
            .buffers()
            .map(|buffer| match buffer.source() {
                gltf::buffer::Source::Bin => gltf_data.blob.clone().unwrap_or_default(),
                gltf::buffer::Source::Uri(uri) => decode_data_uri(uri).unwrap_or_default(),
            })
            .map(gltf::buffer::Data)
            .collect();

        let images: Vec<gltf::image::Data> = document
            .images()
            .map(|image| {
                let bytes = match image.source() {
                    gltf::image::Source::View { view, .. } => buffers
                        .get(view.buffer().index())
                        .and_then(|b| b.0.get(view.offset()..view.offset() + view.length()))
                        .map(<[u8]>::to_vec),
                    gltf::image::Source::Uri { uri, .. } => decode_data_uri(uri),
                };
                bytes
                    .as_deref()
                    .and_then(decode_image_data)
                    .unwrap_or_else(missing_image)
            })
            .collect();

        build_scene(&document, &buffers, &images)
    }

    fn load_from_path(&self, path: &Path) -> LoadResult {
        let (document, buffers, images) = gltf::import(path)
            .map_err(|e| LoadError::InvalidData(format!("Failed to import glTF: {}", e)))?;
        build_scene(&document, &buffers, &images)
    }
}

/// Builds a scene mirroring the document's default scene.
fn build_scene(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> LoadResult {
    let textures: Vec<Option<Arc<TextureData>>> = document
        .textures()
        .map(|tex| {
            let img = images.get(tex.source().index())?;
            if img.width == 0 || img.height == 0 {
                return None;
            }
            Some(Arc::new(TextureData {
                width: img.width,
                height: img.height,
                data: convert_to_rgba(&img.pixels, img.format),
            }))
        })
        .collect();

    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(LoadError::NoGeometry)?;

    let mut scene = Scene::new();
    let root = scene.add_node(gltf_scene.name().unwrap_or("Model"), None);
    let mut ctx = BuildContext {
        buffers,
        textures: &textures,
        triangles: 0,
    };
    for node in gltf_scene.nodes() {
        add_node(&node, &mut scene, root, &mut ctx);
    }

    if ctx.triangles == 0 {
        return Err(LoadError::NoGeometry);
    }
    Ok(LoadedModel { scene, root })
}

struct BuildContext<'a> {
    buffers: &'a [gltf::buffer::Data],
    textures: &'a [Option<Arc<TextureData>>],
    triangles: usize,
}

/// Adds a glTF node and its descendants under `parent`.
fn add_node(node: &gltf::Node, scene: &mut Scene, parent: NodeId, ctx: &mut BuildContext) {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Node{}", node.index()));
    let id = scene.add_node(name, Some(parent));

    let (translation, rotation, scale) = node.transform().decomposed();
    let surfaces: Vec<Surface> = node
        .mesh()
        .map(|mesh| {
            mesh.primitives()
                .filter_map(|primitive| read_primitive(&primitive, ctx))
                .map(|m| Surface::new(Arc::new(m)))
                .collect()
        })
        .unwrap_or_default();

    if let Some(n) = scene.node_mut(id) {
        n.transform = Transform {
            translation: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        };
        n.surfaces = surfaces;
    }

    for child in node.children() {
        add_node(&child, scene, id, ctx);
    }
}

/// Reads a triangle primitive into a local-space mesh.
fn read_primitive(primitive: &gltf::Primitive, ctx: &mut BuildContext) -> Option<Mesh> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        return None;
    }

    let reader = primitive.reader(|buffer| ctx.buffers.get(buffer.index()).map(|d| &*d.0));
    let positions: Vec<Vec3> = reader.read_positions()?.map(Vec3::from_array).collect();

    // TEXCOORD_0
    let uvs: Vec<Vec2> = reader
        .read_tex_coords(0)
        .map(|iter| iter.into_f32().map(Vec2::from_array).collect())
        .unwrap_or_default();

    let pbr = primitive.material().pbr_metallic_roughness();
    let base_factor = pbr.base_color_factor();
    let material_color = [base_factor[0], base_factor[1], base_factor[2]];
    let texture = pbr
        .base_color_texture()
        .and_then(|info| ctx.textures.get(info.texture().index()).cloned().flatten());

    let vertex_colors: Option<Vec<[f32; 4]>> = reader
        .read_colors(0)
        .map(|iter| iter.into_rgba_f32().collect());

    let indices: Vec<u32> = match reader.read_indices() {
        Some(iter) => iter.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let mut triangles = Vec::with_capacity(indices.len() / 3);
    for tri in indices.chunks_exact(3) {
        let idx = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if idx.iter().any(|&i| i >= positions.len()) {
            continue;
        }

        let color = match vertex_colors {
            Some(ref vc) => {
                let c = idx.map(|i| vc.get(i).copied().unwrap_or([1.0; 4]));
                [0, 1, 2].map(|ch| ((c[0][ch] + c[1][ch] + c[2][ch]) / 3.0) * material_color[ch])
            }
            None => material_color,
        };

        triangles.push(Triangle {
            verts: idx.map(|i| positions[i]),
            uvs: idx.map(|i| uvs.get(i).copied().unwrap_or(Vec2::ZERO)),
            color,
            texture: texture.clone(),
        });
    }

    ctx.triangles += triangles.len();
    (!triangles.is_empty()).then(|| Mesh::new(triangles))
}

/// Decodes a data: URI to raw bytes.
fn decode_data_uri(uri: &str) -> Option<Vec<u8>> {
    if !uri.starts_with("data:") {
        return None;
    }

    let comma_pos = uri.find(',')?;
    let encoded = &uri[(comma_pos + 1)..];

    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(encoded).ok()
}

/// Decodes image data (PNG, JPEG, etc.) to RGBA pixels.
fn decode_image_data(data: &[u8]) -> Option<gltf::image::Data> {
    let texture = texture_from_bytes(data)?;
    Some(gltf::image::Data {
        width: texture.width,
        height: texture.height,
        format: gltf::image::Format::R8G8B8A8,
        pixels: texture.data.clone(),
    })
}

/// Placeholder for images that could not be resolved, keeping indices aligned.
fn missing_image() -> gltf::image::Data {
    gltf::image::Data {
        width: 0,
        height: 0,
        format: gltf::image::Format::R8G8B8A8,
        pixels: Vec::new(),
    }
}

/// Converts pixel data to RGBA format if needed.
fn convert_to_rgba(pixels: &[u8], format: gltf::image::Format) -> Vec<u8> {
    use gltf::image::Format;
    match format {
        Format::R8G8B8A8 => pixels.to_vec(),
        Format::R8G8B8 => pixels
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        Format::R8 => pixels.iter().flat_map(|&g| [g, g, g, 255]).collect(),
        Format::R8G8 => pixels
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[1], 0, 255])
            .collect(),
        Format::R16 | Format::R16G16 | Format::R16G16B16 | Format::R16G16B16A16 => {
            vec![255u8; (pixels.len() / 2) * 4]
        }
        Format::R32G32B32FLOAT => vec![255u8; (pixels.len() / 12) * 4],
        Format::R32G32B32A32FLOAT => vec![255u8; (pixels.len() / 16) * 4],
    }
}
