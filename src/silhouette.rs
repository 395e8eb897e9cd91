//! Provides the silhouette analyzer: the normalized bounding rectangle of the
//! visible pixels of a rendered image.
//!
//! # Examples
//! ```
//! use thumbframe::renderer::RenderedImage;
//! use thumbframe::silhouette::{analyze, SilhouetteRect};
//!
//! let mut image = RenderedImage::transparent(4, 4);
//! assert_eq!(analyze(&image, 0.01), SilhouetteRect::EMPTY);
//!
//! image.set_pixel(1, 2, [255, 255, 255, 255]);
//! let rect = analyze(&image, 0.01);
//! assert_eq!((rect.x, rect.y, rect.width, rect.height), (0.25, 0.5, 0.25, 0.25));
//! ```

use glam::Vec2;

use crate::renderer::RenderedImage;

/// A rectangle in normalized image space, y growing upward.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SilhouetteRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SilhouetteRect {
    /// The rectangle reported when no pixel is visible.
    pub const EMPTY: SilhouetteRect = SilhouetteRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// True when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Offset of the center from the frame center (0.5, 0.5).
    pub fn center_offset(&self) -> Vec2 {
        self.center() - Vec2::splat(0.5)
    }

    /// The larger of width and height.
    pub fn max_dim(&self) -> f32 {
        self.width.max(self.height)
    }

    /// True when the rectangle reaches any edge of the frame.
    pub fn touches_border(&self) -> bool {
        const EPS: f32 = 1e-6;
        !self.is_empty()
            && (self.x <= EPS
                || self.y <= EPS
                || self.x + self.width >= 1.0 - EPS
                || self.y + self.height >= 1.0 - EPS)
    }
}

/// Inclusive pixel extent of the visible pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelExtent {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl PixelExtent {
    fn point(x: u32, y: u32) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Measures the tight bounding rectangle of pixels whose alpha exceeds
/// `alpha_threshold` (0..1), normalized by the image size.
///
/// Returns [`SilhouetteRect::EMPTY`] when no pixel passes. The result is a
/// pure min/max reduction, so it does not depend on scan order.
pub fn analyze(image: &RenderedImage, alpha_threshold: f32) -> SilhouetteRect {
    let (w, h) = (image.width(), image.height());
    if w == 0 || h == 0 {
        return SilhouetteRect::EMPTY;
    }

    let extent = image
        .pixels()
        .chunks_exact(w as usize * 4)
        .zip(0u32..)
        .filter_map(|(row, y)| {
            row.chunks_exact(4)
                .zip(0u32..)
                .filter(|(px, _)| px[3] as f32 / 255.0 > alpha_threshold)
                .map(|(_, x)| PixelExtent::point(x, y))
                .reduce(PixelExtent::merge)
        })
        .reduce(PixelExtent::merge);

    let Some(e) = extent else {
        return SilhouetteRect::EMPTY;
    };

    SilhouetteRect {
        x: e.min_x as f32 / w as f32,
        y: e.min_y as f32 / h as f32,
        width: (e.max_x - e.min_x + 1) as f32 / w as f32,
        height: (e.max_y - e.min_y + 1) as f32 / h as f32,
    }
}
