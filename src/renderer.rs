//! Provides the offscreen renderer: a software rasterizer drawing a scene
//! from a camera into an RGBA pixel buffer.
//!
//! Only surfaces on layers in the camera mask are drawn. Pixels no surface
//! covers stay fully transparent, which is what the silhouette pass measures.
//! Rows of a [`RenderedImage`] are stored bottom-up, as a GPU readback would
//! return them; PNG encoding flips them.
//!
//! No GPU is required; it runs entirely on the CPU.
//!
//! # Examples
//! ```
//! use thumbframe::camera::Camera;
//! use thumbframe::config::CameraConfig;
//! use thumbframe::layers::LayerMask;
//! use thumbframe::renderer::{RenderTarget, Renderer, SoftwareRenderer};
//! use thumbframe::scene::Scene;
//!
//! let scene = Scene::new();
//! let camera = Camera::new(&CameraConfig::default(), 1.0);
//! let mut target = RenderTarget::new(32, 32);
//! let image = SoftwareRenderer::default()
//!     .render(&scene, &camera, LayerMask::ALL, &mut target)
//!     .unwrap();
//! assert!(image.pixels().iter().all(|&b| b == 0));
//! ```

use std::io::Cursor;

use glam::{Vec2, Vec3, Vec4};
use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};

use crate::camera::Camera;
use crate::error::{Result, ThumbnailError};
use crate::layers::LayerMask;
use crate::scene::{Scene, SceneLight};

/// An RGBA8 image with rows stored bottom-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RenderedImage {
    /// Creates a fully transparent image.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Wraps raw bottom-up RGBA bytes. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        (pixels.len() == width as usize * height as usize * 4).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// RGBA of the pixel at column `x`, row `y` counted from the bottom.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    /// Converts to a top-down [`RgbaImage`].
    pub fn to_rgba_image(&self) -> RgbaImage {
        ImageBuffer::from_fn(self.width, self.height, |x, y| {
            Rgba(self.pixel(x, self.height - 1 - y))
        })
    }

    /// Converts from a top-down [`RgbaImage`].
    pub fn from_rgba_image(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let mut out = Self::transparent(width, height);
        for (x, y, px) in image.enumerate_pixels() {
            out.set_pixel(x, height - 1 - y, px.0);
        }
        out
    }

    /// Encodes the image as PNG bytes.
    ///
    /// # Errors
    /// Returns [`ThumbnailError::Image`] if encoding fails.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.to_rgba_image().write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}

/// The offscreen color and depth buffers a render writes into.
pub struct RenderTarget {
    width: u32,
    height: u32,
    color: Vec<[f32; 4]>,
    depth: Vec<f32>,
}

impl RenderTarget {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![[0.0; 4]; len],
            depth: vec![f32::INFINITY; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Clears color to transparent black and depth to infinity.
    pub fn clear(&mut self) {
        self.color.fill([0.0; 4]);
        self.depth.fill(f32::INFINITY);
    }

    /// Copies the color buffer out as RGBA8.
    pub fn read_pixels(&self) -> RenderedImage {
        let pixels = self
            .color
            .iter()
            .flat_map(|c| c.map(|v| (v.clamp(0.0, 1.0) * 255.0) as u8))
            .collect();
        RenderedImage {
            width: self.width,
            height: self.height,
            pixels,
        }
    }
}

/// Rasterizes a scene as seen from a camera.
pub trait Renderer {
    /// Renders the surfaces visible under `mask` into `target` and returns the pixels.
    ///
    /// # Errors
    /// Returns [`ThumbnailError::Render`] if the target cannot be rendered into.
    fn render(
        &self,
        scene: &Scene,
        camera: &Camera,
        mask: LayerMask,
        target: &mut RenderTarget,
    ) -> Result<RenderedImage>;
}

/// A flat-shaded, z-buffered CPU rasterizer.
#[derive(Clone, Debug)]
pub struct SoftwareRenderer {
    /// Light added to every covered pixel regardless of scene lights.
    pub ambient: f32,
}

impl Default for SoftwareRenderer {
    fn default() -> Self {
        Self { ambient: 0.15 }
    }
}

impl Renderer for SoftwareRenderer {
    fn render(
        &self,
        scene: &Scene,
        camera: &Camera,
        mask: LayerMask,
        target: &mut RenderTarget,
    ) -> Result<RenderedImage> {
        if target.width == 0 || target.height == 0 {
            return Err(ThumbnailError::render("render target has zero size"));
        }
        target.clear();

        let view_proj = camera.view_projection();
        let lights = scene.lights();
        let width = target.width as f32;
        let height = target.height as f32;
        let w = target.width as usize;
        let h = target.height as usize;

        for ws in scene.visible_surfaces(mask) {
            for tri in &ws.surface.mesh.triangles {
                let world = tri.verts.map(|v| ws.world.transform_point3(v));

                let mut screen = [Vec3::ZERO; 3];
                let mut visible = true;
                for i in 0..3 {
                    let clip: Vec4 = view_proj * world[i].extend(1.0);
                    if clip.w <= 0.0 {
                        visible = false;
                        break;
                    }
                    let inv_w = 1.0 / clip.w;
                    screen[i] = Vec3::new(
                        (clip.x * inv_w * 0.5 + 0.5) * width,
                        (clip.y * inv_w * 0.5 + 0.5) * height,
                        clip.z * inv_w,
                    );
                }
                if !visible {
                    continue;
                }

                let shade = self.shade(world, &lights);

                // Screen-space bounding box
                let min_x = screen[0].x.min(screen[1].x).min(screen[2].x).max(0.0) as usize;
                let max_x = (screen[0].x.max(screen[1].x).max(screen[2].x).ceil().max(0.0) as usize).min(w);
                let min_y = screen[0].y.min(screen[1].y).min(screen[2].y).max(0.0) as usize;
                let max_y = (screen[0].y.max(screen[1].y).max(screen[2].y).ceil().max(0.0) as usize).min(h);

                for y in min_y..max_y {
                    for x in min_x..max_x {
                        let (u, v, t) = barycentric(screen, x as f32 + 0.5, y as f32 + 0.5);
                        if u < 0.0 || v < 0.0 || t < 0.0 {
                            continue;
                        }

                        let z = u * screen[0].z + v * screen[1].z + t * screen[2].z;
                        let idx = y * w + x;
                        if !(-1.0..=1.0).contains(&z) || z >= target.depth[idx] {
                            continue;
                        }

                        let (base, alpha) = match tri.texture {
                            Some(ref tex) => {
                                let uv: Vec2 = u * tri.uvs[0] + v * tri.uvs[1] + t * tri.uvs[2];
                                let s = tex.sample(uv.x, uv.y);
                                (
                                    [s[0] * tri.color[0], s[1] * tri.color[1], s[2] * tri.color[2]],
                                    s[3],
                                )
                            }
                            None => (tri.color, 1.0),
                        };

                        // Alpha cutoff
                        if alpha < 0.5 {
                            continue;
                        }

                        target.depth[idx] = z;
                        target.color[idx] = [
                            (base[0] * shade[0]).min(1.0),
                            (base[1] * shade[1]).min(1.0),
                            (base[2] * shade[2]).min(1.0),
                            1.0,
                        ];
                    }
                }
            }
        }

        Ok(target.read_pixels())
    }
}

impl SoftwareRenderer {
    /// Per-channel light reaching a world-space triangle (two-sided).
    fn shade(&self, verts: [Vec3; 3], lights: &[SceneLight]) -> [f32; 3] {
        let mut shade = [self.ambient; 3];
        let Some(normal) = (verts[1] - verts[0]).cross(verts[2] - verts[0]).try_normalize() else {
            return shade;
        };
        for light in lights {
            let ndl = normal.dot(-light.direction).abs();
            let energy = ndl * light.light.intensity * 0.6 + ndl.powf(32.0) * 0.1;
            for (s, c) in shade.iter_mut().zip(light.light.color) {
                *s += energy * c;
            }
        }
        shade.map(|s| s.min(1.0))
    }
}

// ===========================================================================
// Rasterization helpers
// ===========================================================================

fn barycentric(tri: [Vec3; 3], px: f32, py: f32) -> (f32, f32, f32) {
    let v0x = tri[1].x - tri[0].x;
    let v0y = tri[1].y - tri[0].y;
    let v1x = tri[2].x - tri[0].x;
    let v1y = tri[2].y - tri[0].y;
    let v2x = px - tri[0].x;
    let v2y = py - tri[0].y;

    let d00 = v0x * v0x + v0y * v0y;
    let d01 = v0x * v1x + v0y * v1y;
    let d11 = v1x * v1x + v1y * v1y;
    let d20 = v2x * v0x + v2y * v0y;
    let d21 = v2x * v1x + v2y * v1y;

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-10 {
        return (-1.0, -1.0, -1.0);
    }

    let inv = 1.0 / denom;
    let v = (d11 * d20 - d01 * d21) * inv;
    let w = (d00 * d21 - d01 * d20) * inv;
    let u = 1.0 - v - w;

    (u, v, w)
}
