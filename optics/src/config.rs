//! Optical constants describing the physical steering rig.

use serde::{Deserialize, Serialize};

use crate::error::{OpticsError, OpticsResult};

/// Geometry and materials of the mirror/lens/focal-plane rig.
///
/// Distances are in millimetres, angles in degrees. The defaults describe the
/// reference bench (Edmund plano-convex lens, AX-12 mirror mount).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalConfig {
    /// Radius of curvature of the lens' curved face
    pub lens_radius_mm: f64,
    /// Lens thickness; zero models the lens as two coincident surfaces
    pub lens_thickness_mm: f64,
    /// Distance from the focal plane to the lens
    pub focal_to_lens_mm: f64,
    /// Distance from the mirror to the lens
    pub mirror_to_lens_mm: f64,
    pub air_index: f64,
    pub lens_index: f64,
    /// Incidence angle reached at a normalized x position of 1.0
    pub max_x_angle_deg: f64,
    /// Incidence angle reached at a normalized y position of 1.0
    pub max_y_angle_deg: f64,
    /// Tilt of the fold reference surface the mirror reflects against
    pub reflection_reference_deg: f64,
    /// Mechanical zero of the mirror mount, subtracted from each solved angle
    pub mechanical_offset_deg: f64,
}

impl Default for OpticalConfig {
    fn default() -> Self {
        Self {
            lens_radius_mm: 129.20,
            lens_thickness_mm: 0.0,
            focal_to_lens_mm: 112.5,
            // The bench calibration propagates the mirror leg over the focal distance.
            mirror_to_lens_mm: 112.5,
            air_index: 1.0,
            lens_index: 1.5,
            max_x_angle_deg: 8.0,
            max_y_angle_deg: 11.0,
            reflection_reference_deg: 30.0,
            mechanical_offset_deg: 120.0,
        }
    }
}

impl OpticalConfig {
    pub fn max_x_angle_rad(&self) -> f64 {
        self.max_x_angle_deg.to_radians()
    }

    pub fn max_y_angle_rad(&self) -> f64 {
        self.max_y_angle_deg.to_radians()
    }

    pub fn reflection_reference_rad(&self) -> f64 {
        self.reflection_reference_deg.to_radians()
    }

    pub fn mechanical_offset_rad(&self) -> f64 {
        self.mechanical_offset_deg.to_radians()
    }

    /// Check that every constant describes a physically meaningful rig.
    pub fn validate(&self) -> OpticsResult<()> {
        let fields = [
            ("lens_radius_mm", self.lens_radius_mm),
            ("lens_thickness_mm", self.lens_thickness_mm),
            ("focal_to_lens_mm", self.focal_to_lens_mm),
            ("mirror_to_lens_mm", self.mirror_to_lens_mm),
            ("air_index", self.air_index),
            ("lens_index", self.lens_index),
            ("max_x_angle_deg", self.max_x_angle_deg),
            ("max_y_angle_deg", self.max_y_angle_deg),
            ("reflection_reference_deg", self.reflection_reference_deg),
            ("mechanical_offset_deg", self.mechanical_offset_deg),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(OpticsError::InvalidConfig(format!(
                "{name} must be finite, got {value}"
            )));
        }

        if self.lens_radius_mm == 0.0 {
            return Err(OpticsError::InvalidConfig(
                "lens_radius_mm cannot be zero".to_string(),
            ));
        }
        if self.air_index <= 0.0 || self.lens_index <= 0.0 {
            return Err(OpticsError::InvalidConfig(format!(
                "refractive indices must be positive (air={}, lens={})",
                self.air_index, self.lens_index
            )));
        }
        if self.focal_to_lens_mm < 0.0
            || self.mirror_to_lens_mm < 0.0
            || self.lens_thickness_mm < 0.0
        {
            return Err(OpticsError::InvalidConfig(
                "distances cannot be negative".to_string(),
            ));
        }
        if !(0.0..90.0).contains(&self.max_x_angle_deg.abs())
            || !(0.0..90.0).contains(&self.max_y_angle_deg.abs())
        {
            return Err(OpticsError::InvalidConfig(
                "maximum steering angles must be below 90 degrees".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid() {
        OpticalConfig::default().validate().unwrap();
    }

    #[test]
    fn test_max_angles_in_radians() {
        let config = OpticalConfig::default();
        assert_relative_eq!(config.max_x_angle_rad(), 8.0 * std::f64::consts::PI / 180.0);
        assert_relative_eq!(config.max_y_angle_rad(), 11.0 * std::f64::consts::PI / 180.0);
    }

    #[test]
    fn test_rejects_zero_radius() {
        let config = OpticalConfig {
            lens_radius_mm: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(OpticsError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_non_positive_index() {
        let config = OpticalConfig {
            lens_index: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_nan() {
        let config = OpticalConfig {
            focal_to_lens_mm: f64::NAN,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("focal_to_lens_mm"));
    }

    #[test]
    fn test_rejects_right_angle_steering() {
        let config = OpticalConfig {
            max_y_angle_deg: 90.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
