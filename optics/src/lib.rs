//! Paraxial optics for focal-plane beam steering.
//!
//! Given a normalized target on the focal plane, this crate works out the
//! mechanical angle of each axis of a two-axis steering mirror so that the
//! reflected beam, after passing a plano-convex lens, lands on the target.
//!
//! # Pipeline (per axis)
//!
//! 1. [`angle_to_focal_plane`] - scale the normalized target to an incidence angle
//! 2. [`ray_trace`] - back-project that ray through the lens to the mirror
//! 3. [`find_mirror_angle`] - convert the beam angle into a mirror rotation
//! 4. [`from_wanted_to_angle`] - run the above and remove the mount's mechanical zero
//!
//! # Example
//!
//! ```
//! use optics::{from_wanted_to_angle, OpticalConfig, TargetPosition};
//!
//! let config = OpticalConfig::default();
//! let command = from_wanted_to_angle(&config, &TargetPosition::new(0.0, 0.0)?)?;
//! assert!(command.x.abs() < 1e-12);
//! # Ok::<(), optics::OpticsError>(())
//! ```

pub mod config;
pub mod error;
pub mod mirror;
pub mod ray_trace;
pub mod ray_transfer;

pub use config::OpticalConfig;
pub use error::{OpticsError, OpticsResult};
pub use mirror::{
    angle_to_focal_plane, commands_for_targets, find_mirror_angle, from_wanted_to_angle,
    MirrorCommand, TargetPosition,
};
pub use ray_trace::{back_project, lens_matrix, ray_trace, RayTrace};
pub use ray_transfer::{RayState, RayTransferMatrix, SingularMatrixError};
