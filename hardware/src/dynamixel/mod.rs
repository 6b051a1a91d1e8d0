//! Dynamixel AX-12 servo support (protocol 1.0)
//!
//! This module provides packet framing for the half-duplex AX-12 bus and a
//! serial driver for the two servos that tilt the steering mirror.

pub mod ax12;
pub mod protocol;

pub use ax12::{Ax12Bus, Ax12Driver, MAX_GOAL_POSITION, MAX_MOVING_SPEED};
pub use protocol::{
    compute_checksum, instruction_packet, ping_packet, register, write_packet,
    write_word_packet, Instruction, ProtocolError, StatusError, StatusPacket, BROADCAST_ID,
    MAX_SERVO_ID,
};
