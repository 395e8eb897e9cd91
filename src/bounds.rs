//! Provides axis-aligned bounding boxes and the subject bounds estimator.
//!
//! # Examples
//! ```
//! use glam::Vec3;
//! use thumbframe::bounds::{estimate_bounds, Aabb, SurfaceBounds};
//!
//! let surfaces = [
//!     SurfaceBounds::new(true, Aabb::from_min_max(Vec3::ZERO, Vec3::ONE)),
//!     SurfaceBounds::new(false, Aabb::from_min_max(Vec3::splat(5.0), Vec3::splat(6.0))),
//! ];
//! let bounds = estimate_bounds(surfaces, Vec3::ZERO);
//! assert_eq!(bounds.max(), Vec3::ONE);
//! ```

use glam::{Mat4, Vec3};

/// Half-extent of the box used when a subject has no enabled surfaces.
pub const FALLBACK_HALF_EXTENT: f32 = 0.05;

/// An axis-aligned bounding box stored as center and non-negative half-extents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Aabb {
    /// Creates a box from its center and half-extents (negative extents are made positive).
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    /// Creates a box from two opposite corners in any order.
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self {
            center: (min + max) * 0.5,
            half_extents: (max - min) * 0.5,
        }
    }

    /// Returns the tightest box around `points`, or `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self::from_min_max(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    pub fn size(&self) -> Vec3 {
        self.half_extents * 2.0
    }

    /// Grows this box to also enclose `other`.
    pub fn encapsulate(&mut self, other: &Aabb) {
        *self = Self::from_min_max(self.min().min(other.min()), self.max().max(other.max()));
    }

    /// Returns true if `other` lies entirely inside this box.
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min().cmple(other.min()).all() && self.max().cmpge(other.max()).all()
    }

    /// Returns the eight corners of the box.
    pub fn corners(&self) -> [Vec3; 8] {
        let (min, max) = (self.min(), self.max());
        [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ]
    }

    /// Returns the axis-aligned box enclosing this box after `transform`.
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let corners = self.corners().map(|c| transform.transform_point3(c));
        // Eight corners are always present.
        Self::from_points(corners).unwrap_or(*self)
    }
}

/// The world-space bounds of one renderable surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceBounds {
    pub enabled: bool,
    pub bounds: Aabb,
}

impl SurfaceBounds {
    pub fn new(enabled: bool, bounds: Aabb) -> Self {
        Self { enabled, bounds }
    }
}

/// Computes the box enclosing every enabled surface.
///
/// Disabled surfaces are skipped. With no enabled surface the result is a
/// box of half-extent [`FALLBACK_HALF_EXTENT`] centered at `fallback_center`.
pub fn estimate_bounds(
    surfaces: impl IntoIterator<Item = SurfaceBounds>,
    fallback_center: Vec3,
) -> Aabb {
    surfaces
        .into_iter()
        .filter(|s| s.enabled)
        .map(|s| s.bounds)
        .reduce(|mut acc, b| {
            acc.encapsulate(&b);
            acc
        })
        .unwrap_or_else(|| Aabb::new(fallback_center, Vec3::splat(FALLBACK_HALF_EXTENT)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_at(x: f32) -> Aabb {
        Aabb::new(Vec3::new(x, 0.0, 0.0), Vec3::splat(0.5))
    }

    #[test]
    fn test_all_disabled_uses_fallback() {
        let fallback = Vec3::new(0.0, -1000.0, 0.0);
        let bounds = estimate_bounds(
            [
                SurfaceBounds::new(false, unit_at(0.0)),
                SurfaceBounds::new(false, unit_at(3.0)),
            ],
            fallback,
        );
        assert_eq!(bounds, Aabb::new(fallback, Vec3::splat(0.05)));
    }

    #[test]
    fn test_no_surfaces_uses_fallback() {
        let bounds = estimate_bounds(Vec::new(), Vec3::ONE);
        assert_eq!(bounds.center, Vec3::ONE);
        assert_eq!(bounds.size(), Vec3::splat(0.1));
    }

    #[test]
    fn test_union_of_enabled_subsets_only() {
        let boxes = [unit_at(0.0), unit_at(2.0), unit_at(-4.0)];
        for mask in 1u32..8 {
            let surfaces: Vec<_> = boxes
                .iter()
                .enumerate()
                .map(|(i, b)| SurfaceBounds::new(mask & (1 << i) != 0, *b))
                .collect();
            let bounds = estimate_bounds(surfaces.clone(), Vec3::ZERO);

            let enabled: Vec<Aabb> = surfaces.iter().filter(|s| s.enabled).map(|s| s.bounds).collect();
            let min_x = enabled.iter().map(|b| b.min().x).fold(f32::INFINITY, f32::min);
            let max_x = enabled.iter().map(|b| b.max().x).fold(f32::NEG_INFINITY, f32::max);
            assert_eq!(bounds.min().x, min_x, "mask {mask:b}");
            assert_eq!(bounds.max().x, max_x, "mask {mask:b}");
            assert_eq!(bounds.half_extents.y, 0.5);
            assert!(enabled.iter().all(|b| bounds.contains(b)));
        }
    }

    #[test]
    fn test_half_extents_never_negative() {
        let b = Aabb::new(Vec3::ZERO, Vec3::new(-1.0, 2.0, -3.0));
        assert_eq!(b.half_extents, Vec3::new(1.0, 2.0, 3.0));
        let b = Aabb::from_min_max(Vec3::ONE, Vec3::ZERO);
        assert_eq!(b.min(), Vec3::ZERO);
    }

    #[test]
    fn test_transformed_rotated_box_grows() {
        let b = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
        let rot = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let t = b.transformed(&rot);
        assert!((t.half_extents.y - 1.0).abs() < 1e-5);
        assert!(t.half_extents.x.abs() < 1e-5);
    }
}
