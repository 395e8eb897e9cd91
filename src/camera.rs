//! Provides the perspective camera and the initial placement solver.
//!
//! Placement is an analytic first estimate from the subject's bounds; the
//! framing pass later corrects it from the rendered silhouette.
//!
//! # Examples
//! ```
//! use glam::Vec3;
//! use thumbframe::bounds::Aabb;
//! use thumbframe::camera::place_camera;
//! use thumbframe::config::ThumbnailConfig;
//!
//! let config = ThumbnailConfig::default();
//! let bounds = Aabb::new(Vec3::ZERO, Vec3::splat(0.5));
//! let placement = place_camera(&bounds, &config.camera, config.aspect(), &config.framing);
//! assert!(placement.camera.position.z > 1.4);
//! assert!((placement.camera.forward - Vec3::NEG_Z).length() < 1e-6);
//! ```

use glam::{Mat3, Mat4, Quat, Vec2, Vec3};

use crate::bounds::Aabb;
use crate::config::{CameraConfig, FramingPolicy};

/// Offset direction from the subject to the camera.
pub const VIEW_AXIS: Vec3 = Vec3::Z;

/// A perspective camera with a fixed roll-free orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Width over height of the target.
    pub aspect: f32,
}

/// Orthonormal camera axes in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraBasis {
    pub right: Vec3,
    pub up: Vec3,
    pub forward: Vec3,
}

impl Camera {
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::NEG_Z,
            fov_degrees: config.fov_degrees,
            near: config.near_clip,
            far: config.far_clip,
            aspect,
        }
    }

    /// Turns the camera toward `target` without roll.
    pub fn look_at(&mut self, target: Vec3) {
        if let Some(forward) = (target - self.position).try_normalize() {
            self.forward = forward;
        }
    }

    pub fn basis(&self) -> CameraBasis {
        let up_hint = if self.forward.cross(Vec3::Y).length_squared() < 1e-8 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        let right = self.forward.cross(up_hint).normalize();
        let up = right.cross(self.forward);
        CameraBasis {
            right,
            up,
            forward: self.forward,
        }
    }

    /// Rotation taking local -Z to `forward` and local +Y to the basis up.
    pub fn rotation(&self) -> Quat {
        let b = self.basis();
        Quat::from_mat3(&Mat3::from_cols(b.right, b.up, -b.forward))
    }

    /// tan of half the vertical field of view.
    pub fn half_fov_tan(&self) -> f32 {
        (self.fov_degrees.to_radians() * 0.5).tan()
    }

    /// Visible (width, height) of the frustum cross-section at `distance`.
    pub fn visible_extents(&self, distance: f32) -> (f32, f32) {
        let height = 2.0 * distance * self.half_fov_tan();
        (height * self.aspect, height)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.basis().up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Projects a world point to normalized image coordinates, y growing upward.
    ///
    /// Returns `None` for points at or behind the camera plane.
    pub fn project(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.view_projection() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(ndc.x * 0.5 + 0.5, ndc.y * 0.5 + 0.5))
    }
}

/// The initial camera placement for a subject.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub camera: Camera,
    /// The bounds center the camera looks at.
    pub target: Vec3,
    /// Camera-to-target distance.
    pub distance: f32,
}

/// Distance at which a subject of largest dimension `max_dim` fits the frame.
///
/// Degenerate dimensions are replaced by the policy fallback, and the result
/// never drops below the near-plane safe distance.
///
/// # Examples
/// ```
/// use thumbframe::camera::framing_distance;
/// use thumbframe::config::FramingPolicy;
///
/// let policy = FramingPolicy::default();
/// let flat = framing_distance(0.0, 45.0, 0.01, &policy);
/// let clamped = framing_distance(0.1, 45.0, 0.01, &policy);
/// assert_eq!(flat, clamped);
/// ```
pub fn framing_distance(max_dim: f32, fov_degrees: f32, near: f32, policy: &FramingPolicy) -> f32 {
    let max_dim = if max_dim <= policy.min_dimension {
        policy.fallback_dimension
    } else {
        max_dim
    };
    let distance = (max_dim * policy.distance_factor) / (fov_degrees.to_radians() * 0.5).tan();
    let min_safe_distance = max_dim / 2.0 + near + policy.safe_margin;
    distance.max(min_safe_distance)
}

/// Places a camera on the +Z side of `bounds`, looking at its center.
pub fn place_camera(
    bounds: &Aabb,
    config: &CameraConfig,
    aspect: f32,
    policy: &FramingPolicy,
) -> Placement {
    let size = bounds.size();
    let max_dim = size.x.max(size.y).max(size.z);
    let distance = framing_distance(max_dim, config.fov_degrees, config.near_clip, policy);

    let mut camera = Camera::new(config, aspect);
    camera.position = bounds.center + VIEW_AXIS * distance;
    camera.look_at(bounds.center);

    tracing::debug!(max_dim, distance, "placed thumbnail camera");

    Placement {
        camera,
        target: bounds.center,
        distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_subject_distance() {
        let policy = FramingPolicy::default();
        let d = framing_distance(1.0, 45.0, 0.01, &policy);
        let expected = 0.6 / 22.5_f32.to_radians().tan();
        assert!((d - expected).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_dimensions_clamp() {
        let policy = FramingPolicy::default();
        let clamped = framing_distance(0.1, 45.0, 0.01, &policy);
        for tiny in [0.0, 1e-6, 0.001, -3.0] {
            assert_eq!(framing_distance(tiny, 45.0, 0.01, &policy), clamped);
        }
        assert!(clamped > 0.0);
    }

    #[test]
    fn test_safe_distance_wins_for_wide_fov() {
        let policy = FramingPolicy::default();
        // At 170 degrees the fov term is tiny; the near-plane guard takes over.
        let d = framing_distance(2.0, 170.0, 0.01, &policy);
        assert!((d - (1.0 + 0.01 + 0.02)).abs() < 1e-5);
    }

    #[test]
    fn test_distance_scales_linearly_for_large_subjects() {
        let policy = FramingPolicy::default();
        let a = framing_distance(100.0, 45.0, 0.01, &policy);
        let b = framing_distance(200.0, 45.0, 0.01, &policy);
        assert!((b / a - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_placement_looks_at_center_along_z() {
        let config = CameraConfig::default();
        let policy = FramingPolicy::default();
        let bounds = Aabb::new(Vec3::new(0.0, -1000.0, 0.0), Vec3::new(0.5, 1.0, 0.25));
        let placement = place_camera(&bounds, &config, 1.0, &policy);

        let offset = placement.camera.position - bounds.center;
        assert!(offset.x.abs() < 1e-4 && offset.y.abs() < 1e-3);
        assert!((offset.z - placement.distance).abs() < 1e-4);
        let basis = placement.camera.basis();
        assert!((basis.right - Vec3::X).length() < 1e-5);
        assert!((basis.up - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_project_center_and_visible_extents() {
        let mut camera = Camera::new(&CameraConfig::default(), 1.0);
        camera.position = Vec3::new(0.0, 0.0, 2.0);
        camera.look_at(Vec3::ZERO);

        let center = camera.project(Vec3::ZERO).unwrap();
        assert!((center - Vec2::splat(0.5)).length() < 1e-5);

        let (_, h) = camera.visible_extents(2.0);
        let top = camera.project(Vec3::new(0.0, h * 0.5, 0.0)).unwrap();
        assert!((top.y - 1.0).abs() < 1e-4);
        assert!(camera.project(Vec3::new(0.0, 0.0, 5.0)).is_none());
    }

    #[test]
    fn test_rotation_maps_local_axes() {
        let mut camera = Camera::new(&CameraConfig::default(), 1.0);
        camera.position = Vec3::new(3.0, 0.0, 0.0);
        camera.look_at(Vec3::ZERO);
        let rotated = camera.rotation() * Vec3::NEG_Z;
        assert!((rotated - Vec3::NEG_X).length() < 1e-5);
    }
}
