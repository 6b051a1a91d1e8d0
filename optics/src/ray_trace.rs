//! Back-projection of a focal-plane ray through the lens to the mirror.
//!
//! The target ray (position, incidence angle) is walked backwards: first over
//! the focal-plane-to-lens gap, then through the lens, then over the
//! lens-to-mirror gap. The angle left at the mirror is what the mirror must
//! produce for the ray to land on the target.

use std::f64::consts::FRAC_PI_2;

use tracing::trace;

use crate::config::OpticalConfig;
use crate::error::{OpticsError, OpticsResult};
use crate::ray_transfer::{RayState, RayTransferMatrix};

/// Every intermediate of a single-axis back-projection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayTrace {
    /// Requested ray at the focal plane
    pub target: RayState,
    /// Ray on the mirror side of the lens
    pub before_lens: RayState,
    /// Ray leaving the mirror
    pub at_mirror: RayState,
    /// Net lens transfer matrix (entry to exit)
    pub lens: RayTransferMatrix,
    /// Oblique path length from focal plane to lens
    pub focal_path_mm: f64,
    /// Oblique path length from mirror to lens
    pub mirror_path_mm: f64,
}

impl RayTrace {
    /// Forward transfer matrix from the mirror to the focal plane.
    pub fn forward_matrix(&self) -> RayTransferMatrix {
        RayTransferMatrix::propagation(self.mirror_path_mm)
            .then(self.lens)
            .then(RayTransferMatrix::propagation(self.focal_path_mm))
    }
}

/// Path length along a ray tilted by `angle` across an axial gap of `distance`.
fn oblique_path(distance: f64, angle: f64) -> OpticsResult<f64> {
    if !angle.is_finite() {
        return Err(OpticsError::Domain(format!("ray angle is not finite: {angle}")));
    }
    if angle == 0.0 {
        return Ok(distance);
    }
    if angle.abs() >= FRAC_PI_2 {
        return Err(OpticsError::Domain(format!(
            "ray at {:.3}° never crosses the {distance} mm gap",
            angle.to_degrees()
        )));
    }
    Ok(distance / angle.cos())
}

/// Net lens matrix: flat entry face, glass, curved exit face.
pub fn lens_matrix(config: &OpticalConfig) -> RayTransferMatrix {
    let entry = RayTransferMatrix::flat_refraction(config.air_index, config.lens_index);
    let glass = RayTransferMatrix::thin_slab(config.lens_thickness_mm, config.lens_index);
    let exit = RayTransferMatrix::curved_refraction(
        config.lens_radius_mm,
        config.lens_index,
        config.air_index,
    );
    entry.then(glass).then(exit)
}

/// Back-project one axis and keep every intermediate.
///
/// # Arguments
/// * `config` - Rig geometry
/// * `angle` - Incidence angle at the focal plane in radians
/// * `position` - Normalized target coordinate along the same axis
pub fn back_project(config: &OpticalConfig, angle: f64, position: f64) -> OpticsResult<RayTrace> {
    if !position.is_finite() {
        return Err(OpticsError::Domain(format!(
            "target position is not finite: {position}"
        )));
    }
    let target = RayState::new(position, angle);

    let focal_path_mm = oblique_path(config.focal_to_lens_mm, angle)?;
    let after_lens = RayTransferMatrix::propagation(focal_path_mm);
    let lens = lens_matrix(config);

    let before_lens = (lens.inverse()? * after_lens.inverse()?).apply(target);

    let mirror_path_mm = oblique_path(config.mirror_to_lens_mm, before_lens.angle)?;
    let mirror_leg = RayTransferMatrix::propagation(mirror_path_mm);
    let at_mirror = mirror_leg.inverse()?.apply(before_lens);

    trace!(
        "back_project: target={:?} before_lens={:?} at_mirror={:?}",
        target,
        before_lens,
        at_mirror
    );

    Ok(RayTrace {
        target,
        before_lens,
        at_mirror,
        lens,
        focal_path_mm,
        mirror_path_mm,
    })
}

/// Angle the ray must have when leaving the mirror to land on `position`
/// with incidence `angle` at the focal plane.
pub fn ray_trace(config: &OpticalConfig, angle: f64, position: f64) -> OpticsResult<f64> {
    back_project(config, angle, position).map(|trace| trace.at_mirror.angle)
}
