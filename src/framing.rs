//! Provides the auto-framing corrector.
//!
//! Given the silhouette of a first render, decides whether the subject is
//! already well framed and, if not, computes one corrective camera move:
//! a lateral translation that recenters the silhouette followed by a push or
//! pull along the view axis that scales it toward the target fill. The
//! correction is applied once and never iterated.
//!
//! # Examples
//! ```
//! use glam::Vec3;
//! use thumbframe::camera::Camera;
//! use thumbframe::config::{CameraConfig, FramingPolicy};
//! use thumbframe::framing::{plan_correction, FramingDecision, SkipReason};
//! use thumbframe::silhouette::SilhouetteRect;
//!
//! let mut camera = Camera::new(&CameraConfig::default(), 1.0);
//! camera.position = Vec3::new(0.0, 0.0, 2.0);
//! let policy = FramingPolicy::default();
//!
//! let centered = SilhouetteRect { x: 0.1, y: 0.1, width: 0.8, height: 0.8 };
//! let decision = plan_correction(&centered, &camera, 2.0, None, &policy);
//! assert_eq!(decision, FramingDecision::Skip(SkipReason::WellFramed));
//! ```

use glam::Vec3;

use crate::bounds::Aabb;
use crate::camera::Camera;
use crate::config::FramingPolicy;
use crate::silhouette::SilhouetteRect;

/// Why no correction was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing was visible; there is nothing to frame.
    EmptySilhouette,
    /// Fill and centering are already within tolerance.
    WellFramed,
}

/// A single corrective camera move.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramingCorrection {
    /// World-space translation along the camera's right and up axes.
    pub lateral: Vec3,
    pub zoom_factor: f32,
    pub old_distance: f32,
    pub new_distance: f32,
    /// Camera position after the lateral move and the re-distance.
    pub position: Vec3,
}

impl FramingCorrection {
    /// Moves the camera to the corrected position. Orientation is unchanged.
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position;
    }
}

/// Outcome of [`plan_correction`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FramingDecision {
    Skip(SkipReason),
    Correct(FramingCorrection),
}

/// Plans the one-shot correction for a pass-1 silhouette.
///
/// `distance` is the current camera-to-target distance. `bounds` is only
/// consulted when [`FramingPolicy::refit_clipped`] is set and the silhouette
/// touches the frame border: a clipped silhouette understates the subject, so
/// the zoom is then derived from the bounds' projected extent instead.
pub fn plan_correction(
    rect: &SilhouetteRect,
    camera: &Camera,
    distance: f32,
    bounds: Option<&Aabb>,
    policy: &FramingPolicy,
) -> FramingDecision {
    if rect.is_empty() {
        return FramingDecision::Skip(SkipReason::EmptySilhouette);
    }

    let center_offset = rect.center_offset();
    let content_max_dim = rect.max_dim();
    let clipped_bounds = bounds.filter(|_| policy.refit_clipped && rect.touches_border());

    let well_framed = content_max_dim >= policy.target_fill * policy.accept_fill_ratio
        && center_offset.x.abs() <= policy.center_tolerance
        && center_offset.y.abs() <= policy.center_tolerance;
    if well_framed && clipped_bounds.is_none() {
        return FramingDecision::Skip(SkipReason::WellFramed);
    }

    let basis = camera.basis();
    let (visible_width, visible_height) = camera.visible_extents(distance);
    let lateral = basis.right * (center_offset.x * visible_width)
        + basis.up * (center_offset.y * visible_height);

    let refit = clipped_bounds.and_then(|b| refit_clipped(b, camera, distance, policy));
    let (zoom_factor, new_distance) = refit.unwrap_or_else(|| {
        let zoom = (content_max_dim / policy.target_fill).max(policy.min_zoom);
        (zoom, (distance * zoom).max(policy.min_distance))
    });

    let position = camera.position + lateral + basis.forward * (distance - new_distance);

    FramingDecision::Correct(FramingCorrection {
        lateral,
        zoom_factor,
        old_distance: distance,
        new_distance,
        position,
    })
}

/// Zoom and distance for a subject clipped by the frame, from its bounds.
///
/// Scales the distance to the bounds' nearest face rather than to the
/// center, since the near face dominates the silhouette. Returns `None` when
/// part of the bounds is behind the camera.
fn refit_clipped(
    bounds: &Aabb,
    camera: &Camera,
    distance: f32,
    policy: &FramingPolicy,
) -> Option<(f32, f32)> {
    let corners = bounds.corners();
    let projected = corners
        .iter()
        .map(|c| camera.project(*c))
        .collect::<Option<Vec<_>>>()?;

    let (min, max) = projected
        .iter()
        .skip(1)
        .fold((projected[0], projected[0]), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    let extent = max - min;
    let projected_max_dim = extent.x.max(extent.y);

    let near_depth = corners
        .iter()
        .map(|c| (*c - camera.position).dot(camera.forward))
        .fold(f32::INFINITY, f32::min);
    let near_offset = (distance - near_depth).clamp(0.0, distance);

    let zoom = (projected_max_dim / policy.target_fill).max(policy.min_zoom);
    let new_distance = (near_offset + (distance - near_offset) * zoom).max(policy.min_distance);
    tracing::debug!(projected_max_dim, near_offset, new_distance, "refitting clipped silhouette");
    Some((zoom, new_distance))
}
