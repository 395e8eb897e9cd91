//! Provides surface geometry: triangles, textures and primitive builders.
//!
//! Meshes are stored in the local space of the node that owns them; the
//! scene applies world transforms when rendering or measuring bounds.
//!
//! # Examples
//! ```
//! use glam::Vec3;
//! use thumbframe::mesh::Mesh;
//!
//! let cube = Mesh::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5), [1.0, 1.0, 1.0]);
//! assert_eq!(cube.triangles.len(), 12);
//! ```

use std::sync::Arc;

use glam::{Vec2, Vec3};

/// Represents loaded texture data for sampling.
///
/// # Examples
/// ```
/// use thumbframe::mesh::TextureData;
///
/// let tex = TextureData {
///     width: 1,
///     height: 1,
///     data: vec![255, 255, 255, 255],
/// };
/// assert_eq!(tex.sample(0.5, 0.5), [1.0, 1.0, 1.0, 1.0]);
/// ```
#[derive(Clone, Debug)]
pub struct TextureData {
    /// The texture width in pixels.
    pub width: u32,
    /// The texture height in pixels.
    pub height: u32,
    /// RGBA pixel data stored row-major.
    pub data: Vec<u8>,
}

impl TextureData {
    /// Samples the texture at UV coordinates (with wrapping).
    pub fn sample(&self, u: f32, v: f32) -> [f32; 4] {
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        let x = ((u * self.width as f32) as u32).min(self.width.saturating_sub(1));
        let y = ((v * self.height as f32) as u32).min(self.height.saturating_sub(1));
        let idx = ((y * self.width + x) * 4) as usize;

        match self.data.get(idx..idx + 4) {
            Some(px) => [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
                px[3] as f32 / 255.0,
            ],
            None => [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Represents a triangle with position, UV, color, and optional texture.
#[derive(Clone, Debug)]
pub struct Triangle {
    /// Vertex positions in the owning node's local space.
    pub verts: [Vec3; 3],
    /// Triangle UV coordinates.
    pub uvs: [Vec2; 3],
    /// Base RGB color.
    pub color: [f32; 3],
    /// Optional texture; texels with alpha below 0.5 are cut out.
    pub texture: Option<Arc<TextureData>>,
}

/// A triangle list shared between a surface and its clones.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

/// Corner order for [`Mesh::cuboid`]:
/// ```text
///     3-------2      Y+
///    /|      /|      |
///   7-------6 |      |
///   | |     | |      +--- X+
///   | 0-----|-1     /
///   |/      |/     Z+
///   4-------5
/// ```
const CUBOID_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1], // -Z
    [5, 6, 7, 4], // +Z
    [1, 2, 6, 5], // +X
    [4, 7, 3, 0], // -X
    [3, 7, 6, 2], // +Y
    [0, 1, 5, 4], // -Y
];

const QUAD_UVS: [Vec2; 4] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(0.0, 1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, 0.0),
];

impl Mesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Builds an axis-aligned box spanning `min..max`.
    pub fn cuboid(min: Vec3, max: Vec3, color: [f32; 3]) -> Self {
        let corners = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];

        let mut triangles = Vec::with_capacity(12);
        for face in CUBOID_FACES {
            triangles.extend(quad_to_triangles(
                face.map(|i| corners[i]),
                color,
                None,
            ));
        }
        Self { triangles }
    }

    /// Builds a quad in the XY plane centered at the origin, facing +Z.
    ///
    /// # Examples
    /// ```
    /// use thumbframe::mesh::Mesh;
    ///
    /// let quad = Mesh::quad(2.0, 1.0, [1.0, 0.0, 0.0]);
    /// assert_eq!(quad.triangles.len(), 2);
    /// ```
    pub fn quad(width: f32, height: f32, color: [f32; 3]) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        let corners = [
            Vec3::new(-hw, -hh, 0.0),
            Vec3::new(-hw, hh, 0.0),
            Vec3::new(hw, hh, 0.0),
            Vec3::new(hw, -hh, 0.0),
        ];
        Self {
            triangles: quad_to_triangles(corners, color, None).to_vec(),
        }
    }

    /// Returns the local-space (min, max) corners, or `None` for an empty mesh.
    pub fn local_extents(&self) -> Option<(Vec3, Vec3)> {
        let mut points = self.triangles.iter().flat_map(|t| t.verts);
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

/// Splits a quad into triangles (0,1,2) and (0,2,3).
fn quad_to_triangles(
    corners: [Vec3; 4],
    color: [f32; 3],
    texture: Option<Arc<TextureData>>,
) -> [Triangle; 2] {
    [
        Triangle {
            verts: [corners[0], corners[1], corners[2]],
            uvs: [QUAD_UVS[0], QUAD_UVS[1], QUAD_UVS[2]],
            color,
            texture: texture.clone(),
        },
        Triangle {
            verts: [corners[0], corners[2], corners[3]],
            uvs: [QUAD_UVS[0], QUAD_UVS[2], QUAD_UVS[3]],
            color,
            texture,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_extents() {
        let mesh = Mesh::cuboid(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 3.0, 4.0), [1.0; 3]);
        let (min, max) = mesh.local_extents().unwrap();
        assert_eq!(min, Vec3::new(-1.0, 0.0, 2.0));
        assert_eq!(max, Vec3::new(1.0, 3.0, 4.0));
    }

    #[test]
    fn test_empty_mesh_has_no_extents() {
        assert!(Mesh::default().local_extents().is_none());
    }

    #[test]
    fn test_texture_sample_wraps_negative_uvs() {
        let tex = TextureData {
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 255, 0, 0, 255, 0],
        };
        assert_eq!(tex.sample(0.25, 0.0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(tex.sample(-0.25, 0.0), [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_texture_sample_out_of_range_data_is_white() {
        let tex = TextureData {
            width: 4,
            height: 4,
            data: vec![],
        };
        assert_eq!(tex.sample(0.5, 0.5), [1.0, 1.0, 1.0, 1.0]);
    }
}
