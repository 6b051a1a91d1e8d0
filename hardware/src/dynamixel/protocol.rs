//! Dynamixel protocol 1.0 packet framing for AX-12 servos
//!
//! Instruction packet (host to servo):
//!
//! ```text
//! FF FF <id> <len> <instruction> <param 0> .. <param N-1> <checksum>
//! ```
//!
//! Status packet (servo to host):
//!
//! ```text
//! FF FF <id> <len> <error> <param 0> .. <param N-1> <checksum>
//! ```
//!
//! `len` counts the parameters plus two (instruction/error and checksum).
//! The checksum is the bitwise NOT of the low byte of the sum of every byte
//! from `id` up to the last parameter.

use bitflags::bitflags;
use thiserror::Error;

/// Packet preamble
pub const HEADER: [u8; 2] = [0xFF, 0xFF];

/// ID addressing every servo on the bus (servos never reply to it)
pub const BROADCAST_ID: u8 = 0xFE;

/// Highest ID a single servo can be assigned
pub const MAX_SERVO_ID: u8 = 0xFD;

/// Bytes in a status packet without parameters
pub const MIN_STATUS_LEN: usize = 6;

/// Control table addresses used by the mirror rig (AX-12 EEPROM/RAM map)
pub mod register {
    pub const TORQUE_ENABLE: u8 = 0x18;
    pub const GOAL_POSITION: u8 = 0x1E;
    pub const MOVING_SPEED: u8 = 0x20;
}

/// Instruction byte of an instruction packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    Ping = 0x01,
    Read = 0x02,
    Write = 0x03,
}

bitflags! {
    /// Error byte of a status packet
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusError: u8 {
        const INPUT_VOLTAGE = 0x01;
        const ANGLE_LIMIT = 0x02;
        const OVERHEATING = 0x04;
        const RANGE = 0x08;
        const CHECKSUM = 0x10;
        const OVERLOAD = 0x20;
        const INSTRUCTION = 0x40;
    }
}

/// Framing errors in a received status packet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("packet too short: {0} bytes")]
    TooShort(usize),

    #[error("missing FF FF header")]
    BadHeader,

    #[error("length byte says {declared} bytes follow, got {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("checksum mismatch: computed {computed:#04x}, stored {stored:#04x}")]
    Checksum { computed: u8, stored: u8 },
}

/// Compute the checksum over the bytes between the header and the checksum.
pub fn compute_checksum(body: &[u8]) -> u8 {
    !body.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Build a complete instruction packet.
pub fn instruction_packet(id: u8, instruction: Instruction, params: &[u8]) -> Vec<u8> {
    debug_assert!(params.len() <= 253, "parameter block too long");

    let mut packet = Vec::with_capacity(params.len() + 6);
    packet.extend_from_slice(&HEADER);
    packet.push(id);
    packet.push(params.len() as u8 + 2);
    packet.push(instruction as u8);
    packet.extend_from_slice(params);
    packet.push(compute_checksum(&packet[2..]));
    packet
}

/// WRITE_DATA packet storing `data` starting at control table `address`.
pub fn write_packet(id: u8, address: u8, data: &[u8]) -> Vec<u8> {
    let mut params = Vec::with_capacity(data.len() + 1);
    params.push(address);
    params.extend_from_slice(data);
    instruction_packet(id, Instruction::Write, &params)
}

/// WRITE_DATA packet storing a little-endian word at `address`.
pub fn write_word_packet(id: u8, address: u8, value: u16) -> Vec<u8> {
    write_packet(id, address, &value.to_le_bytes())
}

pub fn ping_packet(id: u8) -> Vec<u8> {
    instruction_packet(id, Instruction::Ping, &[])
}

/// A decoded status packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u8,
    pub error: StatusError,
    pub params: Vec<u8>,
}

impl StatusPacket {
    /// Parse one complete status packet.
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < MIN_STATUS_LEN {
            return Err(ProtocolError::TooShort(bytes.len()));
        }
        if bytes[..2] != HEADER {
            return Err(ProtocolError::BadHeader);
        }

        let declared = bytes[3] as usize;
        let actual = bytes.len() - 4;
        if declared != actual || declared < 2 {
            return Err(ProtocolError::LengthMismatch { declared, actual });
        }

        let last = bytes.len() - 1;
        let computed = compute_checksum(&bytes[2..last]);
        let stored = bytes[last];
        if computed != stored {
            return Err(ProtocolError::Checksum { computed, stored });
        }

        Ok(Self {
            id: bytes[2],
            error: StatusError::from_bits_retain(bytes[4]),
            params: bytes[5..last].to_vec(),
        })
    }

    /// Encode back to bytes (used to fake servo replies).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut packet = Vec::with_capacity(self.params.len() + MIN_STATUS_LEN);
        packet.extend_from_slice(&HEADER);
        packet.push(self.id);
        packet.push(self.params.len() as u8 + 2);
        packet.push(self.error.bits());
        packet.extend_from_slice(&self.params);
        packet.push(compute_checksum(&packet[2..]));
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_goal_position_manual_example() {
        // AX-12 manual: move ID 1 to position 0x200
        let packet = write_word_packet(1, register::GOAL_POSITION, 0x200);
        assert_eq!(
            packet,
            vec![0xFF, 0xFF, 0x01, 0x05, 0x03, 0x1E, 0x00, 0x02, 0xD6]
        );
    }

    #[test]
    fn test_ping_packet() {
        assert_eq!(ping_packet(1), vec![0xFF, 0xFF, 0x01, 0x02, 0x01, 0xFB]);
    }

    #[test]
    fn test_moving_speed_packet_is_little_endian() {
        let packet = write_word_packet(10, register::MOVING_SPEED, 70);
        assert_eq!(&packet[..7], &[0xFF, 0xFF, 10, 5, 0x03, 0x20, 70]);
        assert_eq!(packet[7], 0);
        assert_eq!(packet[8], compute_checksum(&packet[2..8]));
    }

    #[test]
    fn test_torque_enable_single_byte() {
        let packet = write_packet(11, register::TORQUE_ENABLE, &[0]);
        assert_eq!(packet.len(), 8);
        assert_eq!(packet[3], 4);
    }

    #[test]
    fn test_checksum_wraps() {
        assert_eq!(compute_checksum(&[0xFF, 0x02]), !0x01);
    }

    #[test]
    fn test_parse_ping_status() {
        let status = StatusPacket::parse(&[0xFF, 0xFF, 0x01, 0x02, 0x00, 0xFC]).unwrap();
        assert_eq!(status.id, 1);
        assert!(status.error.is_empty());
        assert!(status.params.is_empty());
    }

    #[test]
    fn test_parse_status_with_error_bits() {
        let reply = StatusPacket {
            id: 10,
            error: StatusError::OVERLOAD | StatusError::ANGLE_LIMIT,
            params: vec![0x20, 0x03],
        };
        let parsed = StatusPacket::parse(&reply.to_bytes()).unwrap();
        assert_eq!(parsed, reply);
        assert!(parsed.error.contains(StatusError::OVERLOAD));
    }

    #[test]
    fn test_parse_rejects_bad_checksum() {
        let err = StatusPacket::parse(&[0xFF, 0xFF, 0x01, 0x02, 0x00, 0x00]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::Checksum {
                computed: 0xFC,
                stored: 0x00
            }
        );
    }

    #[test]
    fn test_parse_rejects_framing() {
        assert_eq!(
            StatusPacket::parse(&[0xFF, 0xFF, 0x01]),
            Err(ProtocolError::TooShort(3))
        );
        assert_eq!(
            StatusPacket::parse(&[0xFF, 0x00, 0x01, 0x02, 0x00, 0xFC]),
            Err(ProtocolError::BadHeader)
        );
        assert!(matches!(
            StatusPacket::parse(&[0xFF, 0xFF, 0x01, 0x04, 0x00, 0xFA]),
            Err(ProtocolError::LengthMismatch { .. })
        ));
    }
}
