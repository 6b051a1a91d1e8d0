//! AX-12 servo bus over a serial port.
//!
//! [`Ax12Bus`] speaks the packet protocol over any `Read + Write` transport.
//! [`Ax12Driver`] owns the serial device and implements [`MotorDriver`].
//!
//! # Status return
//!
//! AX-12 servos answer every non-broadcast instruction with a status packet
//! unless their status return level says otherwise. The mirror rig runs
//! open-loop, so by default the bus only writes; with `status_return`
//! enabled every write waits for and checks the matching status packet.
//!
//! # Example
//!
//! ```no_run
//! use hardware::config::BusConfig;
//! use hardware::dynamixel::Ax12Driver;
//! use hardware::motor_interface::MotorDriver;
//!
//! let mut driver = Ax12Driver::new(&BusConfig::default());
//! driver.connect()?;
//! driver.set_moving_speed(10, 70)?;
//! driver.set_goal_position(10, 406)?;
//! driver.disconnect()?;
//! # Ok::<(), hardware::motor_interface::MotorError>(())
//! ```

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info, trace};

use super::protocol::{
    ping_packet, register, write_packet, write_word_packet, ProtocolError, StatusPacket,
    BROADCAST_ID, HEADER,
};
use crate::config::BusConfig;
use crate::motor_interface::{MotorDriver, MotorError, MotorResult};

/// Largest goal position an AX-12 accepts (300° at 0.29°/tick)
pub const MAX_GOAL_POSITION: u16 = 1023;

/// Fastest moving speed the mirror rig is driven at (the register itself takes 1023)
pub const MAX_MOVING_SPEED: u16 = 255;

/// Packet-level access to servos sharing one half-duplex bus.
pub struct Ax12Bus<P> {
    port: P,
    status_return: bool,
}

impl<P: Read + Write> Ax12Bus<P> {
    pub fn new(port: P, status_return: bool) -> Self {
        Self {
            port,
            status_return,
        }
    }

    pub fn status_return(&self) -> bool {
        self.status_return
    }

    /// Give back the transport.
    pub fn into_inner(self) -> P {
        self.port
    }

    fn transmit(&mut self, packet: &[u8]) -> MotorResult<()> {
        trace!("AX-12 send: {:02X?}", packet);
        self.port.write_all(packet)?;
        self.port.flush()?;
        Ok(())
    }

    /// Read one status packet and check that it came from `id` without errors.
    pub fn read_status(&mut self, id: u8) -> MotorResult<StatusPacket> {
        let mut head = [0u8; 4];
        self.read_exact(id, &mut head)?;
        if head[..2] != HEADER {
            return Err(ProtocolError::BadHeader.into());
        }

        let mut packet = head.to_vec();
        packet.resize(4 + head[3] as usize, 0);
        self.read_exact(id, &mut packet[4..])?;
        trace!("AX-12 recv: {:02X?}", packet);

        let status = StatusPacket::parse(&packet)?;
        if status.id != id {
            return Err(MotorError::UnexpectedId {
                expected: id,
                actual: status.id,
            });
        }
        if !status.error.is_empty() {
            return Err(MotorError::Status {
                id,
                error: status.error,
            });
        }
        Ok(status)
    }

    fn read_exact(&mut self, id: u8, buf: &mut [u8]) -> MotorResult<()> {
        match self.port.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::UnexpectedEof) => {
                Err(MotorError::Timeout { id })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn send(&mut self, id: u8, packet: &[u8]) -> MotorResult<()> {
        self.transmit(packet)?;
        if self.status_return && id != BROADCAST_ID {
            self.read_status(id)?;
        }
        Ok(())
    }

    /// Check that motor `id` is present. Always waits for the reply.
    pub fn ping(&mut self, id: u8) -> MotorResult<StatusPacket> {
        self.transmit(&ping_packet(id))?;
        self.read_status(id)
    }

    pub fn set_goal_position(&mut self, id: u8, position: u16) -> MotorResult<()> {
        check_range("goal position", position, MAX_GOAL_POSITION)?;
        debug!("Motor {id}: goal position {position}");
        self.send(id, &write_word_packet(id, register::GOAL_POSITION, position))
    }

    pub fn set_moving_speed(&mut self, id: u8, speed: u16) -> MotorResult<()> {
        check_range("moving speed", speed, MAX_MOVING_SPEED)?;
        debug!("Motor {id}: moving speed {speed}");
        self.send(id, &write_word_packet(id, register::MOVING_SPEED, speed))
    }

    pub fn set_torque_enable(&mut self, id: u8, enable: bool) -> MotorResult<()> {
        debug!("Motor {id}: torque {}", if enable { "on" } else { "off" });
        self.send(
            id,
            &write_packet(id, register::TORQUE_ENABLE, &[u8::from(enable)]),
        )
    }
}

fn check_range(register: &'static str, value: u16, max: u16) -> MotorResult<()> {
    if value > max {
        return Err(MotorError::ValueOutOfRange {
            register,
            value,
            max,
        });
    }
    Ok(())
}

/// AX-12 bus on a serial device, opened on [`connect`](MotorDriver::connect).
pub struct Ax12Driver {
    device_path: String,
    baud_rate: u32,
    timeout: Duration,
    status_return: bool,
    bus: Option<Ax12Bus<Box<dyn SerialPort>>>,
}

impl Ax12Driver {
    pub fn new(config: &BusConfig) -> Self {
        Self {
            device_path: config.device_path.clone(),
            baud_rate: config.baud_rate,
            timeout: config.read_timeout(),
            status_return: config.status_return,
            bus: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.bus.is_some()
    }

    fn bus(&mut self) -> MotorResult<&mut Ax12Bus<Box<dyn SerialPort>>> {
        self.bus.as_mut().ok_or(MotorError::NotConnected)
    }

    /// Ping motor `id` on the open bus
    pub fn ping(&mut self, id: u8) -> MotorResult<StatusPacket> {
        self.bus()?.ping(id)
    }
}

impl MotorDriver for Ax12Driver {
    fn connect(&mut self) -> MotorResult<()> {
        if self.bus.is_some() {
            return Ok(());
        }

        let port = serialport::new(&self.device_path, self.baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|e| {
                MotorError::ConnectionFailed(format!("Failed to open {}: {e}", self.device_path))
            })?;

        info!(
            "Opened AX-12 bus on {} at {} baud",
            self.device_path, self.baud_rate
        );
        self.bus = Some(Ax12Bus::new(port, self.status_return));
        Ok(())
    }

    fn disconnect(&mut self) -> MotorResult<()> {
        if let Some(bus) = self.bus.take() {
            let mut port = bus.into_inner();
            port.flush()?;
            info!("Closed AX-12 bus on {}", self.device_path);
        }
        Ok(())
    }

    fn set_moving_speed(&mut self, id: u8, speed: u16) -> MotorResult<()> {
        self.bus()?.set_moving_speed(id, speed)
    }

    fn set_goal_position(&mut self, id: u8, position: u16) -> MotorResult<()> {
        self.bus()?.set_goal_position(id, position)
    }

    fn set_torque_enable(&mut self, id: u8, enable: bool) -> MotorResult<()> {
        self.bus()?.set_torque_enable(id, enable)
    }
}
