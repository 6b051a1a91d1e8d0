//! Open-loop sequencing of mirror commands onto the two AX-12 motors.
//!
//! Each mirror command is converted to encoder ticks, and the whole list is
//! checked before anything is sent. Execution then walks the list: speed and
//! goal for motor 1, speed and goal for motor 2, then a fixed settle delay.
//! Nothing is read back; arrival is assumed from elapsed time.
//!
//! # Axis assignment
//!
//! The mount wires the axes crosswise: motor 1 turns the mirror about the
//! y axis and therefore receives the command's `y` component, motor 2
//! receives `x`.

use std::time::Duration;

use optics::{commands_for_targets, MirrorCommand, OpticalConfig, OpticsError, TargetPosition};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BusConfig;
use crate::dynamixel::MAX_GOAL_POSITION;
use crate::motor_interface::{MotorDriver, MotorError};

/// AX-12 position resolution
pub const DEGREES_PER_TICK: f64 = 0.29;

#[derive(Error, Debug)]
pub enum SequenceError {
    #[error(transparent)]
    Optics(#[from] OpticsError),

    /// The command would drive a motor outside its 0..=1023 position range.
    #[error("motor {motor_id}: {angle_deg:.3}° maps to tick {ticks}, outside 0..=1023")]
    TickOutOfRange {
        motor_id: u8,
        angle_deg: f64,
        ticks: i64,
    },

    #[error("motor {motor_id}: angle is not finite")]
    NonFiniteAngle { motor_id: u8 },

    #[error(transparent)]
    Motor(#[from] MotorError),
}

/// One motor and where its encoder sits at zero mirror rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorChannel {
    pub id: u8,
    pub offset: u16,
}

impl MotorChannel {
    pub fn new(id: u8, offset: u16) -> Self {
        Self { id, offset }
    }

    /// Encoder tick for a mirror rotation of `angle_rad`.
    ///
    /// `round(degrees / 0.29) + offset`, rejected if it leaves 0..=1023.
    pub fn ticks(&self, angle_rad: f64) -> Result<u16, SequenceError> {
        if !angle_rad.is_finite() {
            return Err(SequenceError::NonFiniteAngle { motor_id: self.id });
        }
        let angle_deg = angle_rad.to_degrees();
        let ticks = (angle_deg / DEGREES_PER_TICK).round() as i64 + i64::from(self.offset);

        u16::try_from(ticks)
            .ok()
            .filter(|t| *t <= MAX_GOAL_POSITION)
            .ok_or(SequenceError::TickOutOfRange {
                motor_id: self.id,
                angle_deg,
                ticks,
            })
    }
}

/// Goal positions for both motors for one mirror command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorStep {
    pub command: MirrorCommand,
    /// Goal for motor 1 (mirror y)
    pub motor_1_ticks: u16,
    /// Goal for motor 2 (mirror x)
    pub motor_2_ticks: u16,
}

/// Sends mirror commands to the two motors in order.
#[derive(Debug, Clone, PartialEq)]
pub struct MotorSequencer {
    pub motor_1: MotorChannel,
    pub motor_2: MotorChannel,
    pub moving_speed: u16,
    pub settle_delay: Duration,
}

impl MotorSequencer {
    pub fn from_config(config: &BusConfig) -> Self {
        Self {
            motor_1: MotorChannel::new(config.motor_id_1, config.motor_offset_1),
            motor_2: MotorChannel::new(config.motor_id_2, config.motor_offset_2),
            moving_speed: config.moving_speed,
            settle_delay: config.settle_delay(),
        }
    }

    pub fn with_settle_delay(mut self, settle_delay: Duration) -> Self {
        self.settle_delay = settle_delay;
        self
    }

    /// Convert one command to motor ticks (motor 1 gets y, motor 2 gets x).
    pub fn step(&self, command: MirrorCommand) -> Result<MotorStep, SequenceError> {
        Ok(MotorStep {
            command,
            motor_1_ticks: self.motor_1.ticks(command.y)?,
            motor_2_ticks: self.motor_2.ticks(command.x)?,
        })
    }

    /// Convert every command, failing before anything is sent if one is out of range.
    pub fn plan(&self, commands: &[MirrorCommand]) -> Result<Vec<MotorStep>, SequenceError> {
        commands.iter().map(|c| self.step(*c)).collect()
    }

    /// Send planned steps to an already connected driver.
    pub fn execute<D: MotorDriver + ?Sized>(
        &self,
        driver: &mut D,
        steps: &[MotorStep],
    ) -> Result<(), SequenceError> {
        for (index, step) in steps.iter().enumerate() {
            debug!(
                "Step {}/{}: motor {} -> {}, motor {} -> {}",
                index + 1,
                steps.len(),
                self.motor_1.id,
                step.motor_1_ticks,
                self.motor_2.id,
                step.motor_2_ticks
            );

            driver.set_moving_speed(self.motor_1.id, self.moving_speed)?;
            driver.set_goal_position(self.motor_1.id, step.motor_1_ticks)?;
            driver.set_moving_speed(self.motor_2.id, self.moving_speed)?;
            driver.set_goal_position(self.motor_2.id, step.motor_2_ticks)?;

            if !self.settle_delay.is_zero() {
                std::thread::sleep(self.settle_delay);
            }
        }
        Ok(())
    }

    /// Plan and send `commands` to a connected driver.
    pub fn run<D: MotorDriver + ?Sized>(
        &self,
        driver: &mut D,
        commands: &[MirrorCommand],
    ) -> Result<Vec<MotorStep>, SequenceError> {
        let steps = self.plan(commands)?;
        self.execute(driver, &steps)?;
        Ok(steps)
    }

    /// Release holding torque on both motors.
    pub fn release<D: MotorDriver + ?Sized>(&self, driver: &mut D) -> Result<(), SequenceError> {
        driver.set_torque_enable(self.motor_1.id, false)?;
        driver.set_torque_enable(self.motor_2.id, false)?;
        Ok(())
    }
}

/// Aim the mirror at each target in turn.
///
/// Solves and validates every target first, then connects, runs the
/// sequence and disconnects. The bus is closed even if a command fails;
/// the first error wins.
pub fn drive_targets<D: MotorDriver + ?Sized>(
    driver: &mut D,
    optics: &OpticalConfig,
    sequencer: &MotorSequencer,
    targets: &[TargetPosition],
) -> Result<Vec<MotorStep>, SequenceError> {
    let commands = commands_for_targets(optics, targets)?;
    let steps = sequencer.plan(&commands)?;

    driver.connect()?;
    info!("Driving mirror through {} targets", steps.len());

    let result = sequencer.execute(driver, &steps);
    close_after(driver, result)?;
    info!("Sequence complete");
    Ok(steps)
}

/// Connect, release holding torque on both motors, and disconnect.
///
/// The bus is closed even if the release fails; the first error wins.
pub fn release_motors<D: MotorDriver + ?Sized>(
    driver: &mut D,
    sequencer: &MotorSequencer,
) -> Result<(), SequenceError> {
    driver.connect()?;
    let result = sequencer.release(driver);
    close_after(driver, result)?;
    info!(
        "Torque released on motors {} and {}",
        sequencer.motor_1.id, sequencer.motor_2.id
    );
    Ok(())
}

fn close_after<D: MotorDriver + ?Sized>(
    driver: &mut D,
    result: Result<(), SequenceError>,
) -> Result<(), SequenceError> {
    match (result, driver.disconnect()) {
        (Err(e), Err(close_err)) => {
            warn!("Disconnect after failed command also failed: {close_err}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), Err(close_err)) => Err(close_err.into()),
        (Ok(()), Ok(())) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockMotorDriver, MotorCall};

    fn sequencer() -> MotorSequencer {
        MotorSequencer::from_config(&BusConfig::default()).with_settle_delay(Duration::ZERO)
    }

    #[test]
    fn test_zero_angle_hits_offsets() {
        let seq = sequencer();
        let step = seq.step(MirrorCommand { x: 0.0, y: 0.0 }).unwrap();
        assert_eq!(step.motor_1_ticks, 406);
        assert_eq!(step.motor_2_ticks, 842);
    }

    #[test]
    fn test_axes_are_swapped() {
        let seq = sequencer();
        let step = seq
            .step(MirrorCommand {
                x: 2.9_f64.to_radians(),
                y: -5.8_f64.to_radians(),
            })
            .unwrap();
        // y = -5.8° -> -20 ticks on motor 1; x = 2.9° -> +10 ticks on motor 2
        assert_eq!(step.motor_1_ticks, 386);
        assert_eq!(step.motor_2_ticks, 852);
    }

    #[test]
    fn test_ticks_round_to_nearest() {
        let channel = MotorChannel::new(10, 406);
        assert_eq!(channel.ticks(0.16_f64.to_radians()).unwrap(), 407);
        assert_eq!(channel.ticks(0.14_f64.to_radians()).unwrap(), 406);
        assert_eq!(channel.ticks(-0.16_f64.to_radians()).unwrap(), 405);
    }

    #[test]
    fn test_ticks_out_of_range() {
        let channel = MotorChannel::new(11, 842);
        // 60° = ~207 ticks past 842
        match channel.ticks(60.0_f64.to_radians()) {
            Err(SequenceError::TickOutOfRange {
                motor_id, ticks, ..
            }) => {
                assert_eq!(motor_id, 11);
                assert_eq!(ticks, 1049);
            }
            other => panic!("expected range error, got {other:?}"),
        }

        let low = MotorChannel::new(10, 406);
        assert!(matches!(
            low.ticks(-150.0_f64.to_radians()),
            Err(SequenceError::TickOutOfRange { .. })
        ));
    }

    #[test]
    fn test_range_edges_accepted() {
        let channel = MotorChannel::new(10, 0);
        assert_eq!(channel.ticks(0.0).unwrap(), 0);
        let top = (1023.0 * DEGREES_PER_TICK).to_radians();
        assert_eq!(channel.ticks(top).unwrap(), 1023);
    }

    #[test]
    fn test_nan_angle_rejected() {
        let channel = MotorChannel::new(10, 406);
        assert!(matches!(
            channel.ticks(f64::NAN),
            Err(SequenceError::NonFiniteAngle { motor_id: 10 })
        ));
    }

    #[test]
    fn test_plan_fails_as_a_whole() {
        let seq = sequencer();
        let commands = [
            MirrorCommand { x: 0.0, y: 0.0 },
            MirrorCommand { x: 1.5, y: 0.0 },
        ];
        assert!(seq.plan(&commands).is_err());
    }

    #[test]
    fn test_release_motors_sends_torque_off() {
        let mut mock = MockMotorDriver::new();
        release_motors(&mut mock, &sequencer()).unwrap();

        assert_eq!(
            mock.calls(),
            &[
                MotorCall::Connect,
                MotorCall::SetTorqueEnable {
                    id: 10,
                    enable: false
                },
                MotorCall::SetTorqueEnable {
                    id: 11,
                    enable: false
                },
                MotorCall::Disconnect,
            ]
        );
    }

    #[test]
    fn test_release_error_outranks_disconnect_error() {
        let mut mock = MockMotorDriver::new().failing_after(0).failing_disconnect();

        let err = release_motors(&mut mock, &sequencer()).unwrap_err();

        match err {
            SequenceError::Motor(MotorError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe)
            }
            other => panic!("expected the release failure, got {other:?}"),
        }
        assert_eq!(mock.calls(), &[MotorCall::Connect, MotorCall::Disconnect]);
    }

    #[test]
    fn test_disconnect_error_reported_after_clean_release() {
        let mut mock = MockMotorDriver::new().failing_disconnect();

        let err = release_motors(&mut mock, &sequencer()).unwrap_err();

        match err {
            SequenceError::Motor(MotorError::Io(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::NotConnected)
            }
            other => panic!("expected the disconnect failure, got {other:?}"),
        }
    }
}
