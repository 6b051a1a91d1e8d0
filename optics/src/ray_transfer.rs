//! 2x2 ray-transfer ("ABCD") matrices using nalgebra
//!
//! A ray is described by its height above the optical axis and its angle to
//! the axis. Each optical element maps that column vector linearly:
//!
//! ```text
//! [ A  B ]   [ position ]   [ position' ]
//! [ C  D ] × [ angle    ] = [ angle'    ]
//! ```
//!
//! Elements compose right-to-left: a ray passing through `first` and then
//! `second` sees `second * first`.

use std::ops::Mul;

use nalgebra::{Matrix2, Vector2};
use thiserror::Error;

/// Error when matrix inversion fails due to singular matrix
#[derive(Error, Debug, Clone, PartialEq)]
#[error("singular ray-transfer matrix: determinant={determinant:.6e}")]
pub struct SingularMatrixError {
    /// The determinant value (zero or near-zero)
    pub determinant: f64,
}

/// Threshold for considering a determinant as zero
const DETERMINANT_EPSILON: f64 = 1e-10;

/// Ray state at a reference plane: height and angle to the optical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayState {
    /// Height above the optical axis (mm, or normalized units at the focal plane)
    pub position: f64,
    /// Angle to the optical axis in radians
    pub angle: f64,
}

impl RayState {
    pub fn new(position: f64, angle: f64) -> Self {
        Self { position, angle }
    }

    pub fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.position, self.angle)
    }

    pub fn from_vector(v: Vector2<f64>) -> Self {
        Self {
            position: v.x,
            angle: v.y,
        }
    }
}

/// A single optical element (or a composition of elements) as a 2x2 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayTransferMatrix(Matrix2<f64>);

impl RayTransferMatrix {
    /// Wrap a raw matrix
    pub fn from_matrix(matrix: Matrix2<f64>) -> Self {
        Self(matrix)
    }

    /// Underlying nalgebra matrix
    pub fn matrix(&self) -> &Matrix2<f64> {
        &self.0
    }

    pub fn identity() -> Self {
        Self(Matrix2::identity())
    }

    /// Free-space propagation over `distance`.
    ///
    /// ```text
    /// [ 1  d ]
    /// [ 0  1 ]
    /// ```
    pub fn propagation(distance: f64) -> Self {
        Self(Matrix2::new(1.0, distance, 0.0, 1.0))
    }

    /// Refraction at a flat interface going from index `n1` into index `n2`.
    pub fn flat_refraction(n1: f64, n2: f64) -> Self {
        Self(Matrix2::new(1.0, 0.0, 0.0, n1 / n2))
    }

    /// Refraction at a curved interface of radius `radius` going from `n1` into `n2`.
    ///
    /// The rig's lens exit surface is modelled with the index ratio
    /// `n_lens / n_air` on the diagonal and `-(1 - n_lens / n_air) / R` as the
    /// power term, i.e. `n1` is the lens and `n2` the air it exits into.
    pub fn curved_refraction(radius: f64, n1: f64, n2: f64) -> Self {
        let ratio = n1 / n2;
        Self(Matrix2::new(1.0, 0.0, -(1.0 - ratio) / radius, ratio))
    }

    /// Propagation through a slab of glass, expressed as reduced distance `t / n`.
    ///
    /// A zero-thickness slab is exactly the identity.
    pub fn thin_slab(thickness: f64, index: f64) -> Self {
        if thickness == 0.0 {
            return Self::identity();
        }
        Self::propagation(thickness / index)
    }

    /// Compose: the ray passes through `self` first, then `next`.
    pub fn then(self, next: RayTransferMatrix) -> Self {
        Self(next.0 * self.0)
    }

    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    /// Invert the element, failing for singular matrices
    pub fn inverse(&self) -> Result<Self, SingularMatrixError> {
        let det = self.determinant();

        if !det.is_finite() || det.abs() < DETERMINANT_EPSILON {
            return Err(SingularMatrixError { determinant: det });
        }

        self.0
            .try_inverse()
            .map(Self)
            .ok_or(SingularMatrixError { determinant: det })
    }

    /// Map a ray state through this element
    pub fn apply(&self, ray: RayState) -> RayState {
        RayState::from_vector(self.0 * ray.as_vector())
    }
}

impl Mul for RayTransferMatrix {
    type Output = RayTransferMatrix;

    fn mul(self, rhs: RayTransferMatrix) -> RayTransferMatrix {
        RayTransferMatrix(self.0 * rhs.0)
    }
}

impl Mul<RayState> for RayTransferMatrix {
    type Output = RayState;

    fn mul(self, rhs: RayState) -> RayState {
        self.apply(rhs)
    }
}
