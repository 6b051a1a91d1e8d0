use thiserror::Error;

use crate::ray_transfer::SingularMatrixError;

/// Errors raised while solving mirror angles.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpticsError {
    /// A value left the domain where the paraxial model is defined,
    /// e.g. an oblique path at or beyond 90° or a target outside [-1, 1].
    #[error("domain error: {0}")]
    Domain(String),

    /// A ray-transfer matrix could not be inverted.
    #[error(transparent)]
    Singular(#[from] SingularMatrixError),

    /// The optical constants do not describe a usable rig.
    #[error("invalid optical config: {0}")]
    InvalidConfig(String),
}

pub type OpticsResult<T> = Result<T, OpticsError>;
