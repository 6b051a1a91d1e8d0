//! Motor driver trait for the mirror sequencer.

use thiserror::Error;

use crate::dynamixel::{ProtocolError, StatusError};

/// Errors that can occur while talking to the servo bus.
#[derive(Error, Debug)]
pub enum MotorError {
    /// Low-level I/O error (serial read/write failure).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial device could not be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A command was issued before `connect` (or after `disconnect`).
    #[error("Motor bus is not connected")]
    NotConnected,

    /// No status packet received within the timeout period.
    #[error("Timeout waiting for status from motor {id}")]
    Timeout { id: u8 },

    /// A status packet was malformed.
    #[error("Invalid status packet: {0}")]
    Protocol(#[from] ProtocolError),

    /// A status packet arrived from a different motor than addressed.
    #[error("Status packet from motor {actual}, expected {expected}")]
    UnexpectedId { expected: u8, actual: u8 },

    /// The motor flagged an error in its status packet.
    #[error("Motor {id} reported {error:?}")]
    Status { id: u8, error: StatusError },

    /// A register value outside what the motor accepts.
    #[error("{register} value {value} out of range 0..={max}")]
    ValueOutOfRange {
        register: &'static str,
        value: u16,
        max: u16,
    },
}

/// Result type for motor operations.
pub type MotorResult<T> = Result<T, MotorError>;

/// Interface for the two serial-bus servos that tilt the mirror.
///
/// Abstracts the bus hardware so sequences can run against a mock in tests.
pub trait MotorDriver {
    /// Open the bus
    fn connect(&mut self) -> MotorResult<()>;

    /// Close the bus. Calling this on a closed bus is not an error.
    fn disconnect(&mut self) -> MotorResult<()>;

    /// Set the moving speed register of motor `id` (raw units)
    fn set_moving_speed(&mut self, id: u8, speed: u16) -> MotorResult<()>;

    /// Command motor `id` to a goal position in encoder ticks
    fn set_goal_position(&mut self, id: u8, position: u16) -> MotorResult<()>;

    /// Enable or release holding torque on motor `id`
    fn set_torque_enable(&mut self, id: u8, enable: bool) -> MotorResult<()>;
}

impl<D: MotorDriver + ?Sized> MotorDriver for Box<D> {
    fn connect(&mut self) -> MotorResult<()> {
        (**self).connect()
    }

    fn disconnect(&mut self) -> MotorResult<()> {
        (**self).disconnect()
    }

    fn set_moving_speed(&mut self, id: u8, speed: u16) -> MotorResult<()> {
        (**self).set_moving_speed(id, speed)
    }

    fn set_goal_position(&mut self, id: u8, position: u16) -> MotorResult<()> {
        (**self).set_goal_position(id, position)
    }

    fn set_torque_enable(&mut self, id: u8, enable: bool) -> MotorResult<()> {
        (**self).set_torque_enable(id, enable)
    }
}
