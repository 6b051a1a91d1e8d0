//! Hardware drivers for the two-axis steering mirror.
//!
//! The mirror is tilted by two Dynamixel AX-12 servos on a shared half-duplex
//! serial bus. This crate turns solved mirror angles into servo commands.
//!
//! # Modules
//!
//! - [`motor_interface`] - `MotorDriver` trait the sequencer is written against
//! - [`dynamixel`] - AX-12 protocol 1.0 framing and the serial driver
//! - [`mock`] - recording driver for tests and dry runs
//! - [`sequencer`] - angle to encoder tick conversion and open-loop sequencing
//! - [`config`] - JSON rig configuration (optics plus bus)
//! - [`targets`] - reference targets, raster paths and target parsing

pub mod config;
pub mod dynamixel;
pub mod mock;
pub mod motor_interface;
pub mod sequencer;
pub mod targets;

pub use config::{BusConfig, ConfigError, RigConfig};
pub use mock::{MockMotorDriver, MotorCall};
pub use motor_interface::{MotorDriver, MotorError, MotorResult};
pub use sequencer::{
    drive_targets, release_motors, MotorChannel, MotorSequencer, MotorStep, SequenceError,
};
