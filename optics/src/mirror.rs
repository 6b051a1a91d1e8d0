//! Mapping from a focal-plane target to mechanical mirror angles.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OpticalConfig;
use crate::error::{OpticsError, OpticsResult};
use crate::ray_trace::ray_trace;

/// A point on the focal plane, each axis normalized to [-1, 1] about the center.
///
/// Every value, deserialized ones included, goes through [`TargetPosition::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TargetCoords")]
pub struct TargetPosition {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct TargetCoords {
    x: f64,
    y: f64,
}

impl TryFrom<TargetCoords> for TargetPosition {
    type Error = OpticsError;

    fn try_from(coords: TargetCoords) -> OpticsResult<Self> {
        Self::new(coords.x, coords.y)
    }
}

impl TargetPosition {
    /// Corners visited by the reference bench run, in order.
    pub const REFERENCE_RUN: [TargetPosition; 3] = [
        TargetPosition { x: -0.7, y: 0.7 },
        TargetPosition { x: -0.7, y: -0.7 },
        TargetPosition { x: 0.7, y: -0.7 },
    ];

    /// Create a target, rejecting coordinates outside [-1, 1].
    pub fn new(x: f64, y: f64) -> OpticsResult<Self> {
        for (axis, value) in [("x", x), ("y", y)] {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(OpticsError::Domain(format!(
                    "target {axis}={value} is outside the normalized range [-1, 1]"
                )));
            }
        }
        Ok(Self { x, y })
    }

    pub fn center() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }
}

/// Mechanical rotation for each mirror axis, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MirrorCommand {
    pub x: f64,
    pub y: f64,
}

impl MirrorCommand {
    pub fn to_degrees(&self) -> (f64, f64) {
        (self.x.to_degrees(), self.y.to_degrees())
    }
}

/// Incidence angle at the focal plane for each axis of `target`.
///
/// Pure linear scaling by the rig's maximum steerable angles.
pub fn angle_to_focal_plane(config: &OpticalConfig, target: &TargetPosition) -> (f64, f64) {
    (
        target.x * config.max_x_angle_rad(),
        target.y * config.max_y_angle_rad(),
    )
}

/// Mirror rotation producing an outgoing ray at `angle_at_mirror`.
///
/// The mirror folds the beam against a reference surface tilted by
/// `reflection_reference_deg`; the mirror normal bisects the fold:
///
/// ```text
/// normal = (π/2 - reference - angle_at_mirror) / 2
/// mirror = normal + π/2
/// ```
pub fn find_mirror_angle(config: &OpticalConfig, angle_at_mirror: f64) -> f64 {
    let normal_angle = (FRAC_PI_2 - config.reflection_reference_rad() - angle_at_mirror) / 2.0;
    normal_angle + FRAC_PI_2
}

/// Solve both mirror axes for a focal-plane target.
///
/// Each axis is independent: incidence mapping, back-projection through the
/// lens, mirror solve, then removal of the mount's mechanical zero.
pub fn from_wanted_to_angle(
    config: &OpticalConfig,
    target: &TargetPosition,
) -> OpticsResult<MirrorCommand> {
    let (x_angle, y_angle) = angle_to_focal_plane(config, target);

    let angle_wanted_x = ray_trace(config, x_angle, target.x)?;
    let angle_wanted_y = ray_trace(config, y_angle, target.y)?;

    let offset = config.mechanical_offset_rad();
    let command = MirrorCommand {
        x: find_mirror_angle(config, angle_wanted_x) - offset,
        y: find_mirror_angle(config, angle_wanted_y) - offset,
    };

    debug!(
        "Target ({:.3}, {:.3}) -> mirror ({:.4}°, {:.4}°)",
        target.x,
        target.y,
        command.x.to_degrees(),
        command.y.to_degrees()
    );
    Ok(command)
}

/// Solve a list of targets in order, stopping at the first failure.
pub fn commands_for_targets(
    config: &OpticalConfig,
    targets: &[TargetPosition],
) -> OpticsResult<Vec<MirrorCommand>> {
    targets
        .iter()
        .map(|target| from_wanted_to_angle(config, target))
        .collect()
}
