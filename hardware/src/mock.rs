//! In-memory motor driver that records every call.

use crate::motor_interface::{MotorDriver, MotorError, MotorResult};

/// A call received by [`MockMotorDriver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorCall {
    Connect,
    Disconnect,
    SetMovingSpeed { id: u8, speed: u16 },
    SetGoalPosition { id: u8, position: u16 },
    SetTorqueEnable { id: u8, enable: bool },
}

pub struct MockMotorDriver {
    calls: Vec<MotorCall>,
    connected: bool,
    fail_after: Option<usize>,
    fail_connect: bool,
    fail_disconnect: bool,
}

impl MockMotorDriver {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            connected: false,
            fail_after: None,
            fail_connect: false,
            fail_disconnect: false,
        }
    }

    /// Fail every motor command once `count` commands have succeeded.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Refuse to connect, as if the serial device were missing.
    pub fn unplugged(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    /// Report an error on disconnect, after recording it and dropping the connection.
    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn calls(&self) -> &[MotorCall] {
        &self.calls
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Goal positions in the order they were sent, as (id, position).
    pub fn goal_positions(&self) -> Vec<(u8, u16)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                MotorCall::SetGoalPosition { id, position } => Some((*id, *position)),
                _ => None,
            })
            .collect()
    }

    fn command(&mut self, call: MotorCall) -> MotorResult<()> {
        if !self.connected {
            return Err(MotorError::NotConnected);
        }
        let sent = self
            .calls
            .iter()
            .filter(|c| !matches!(c, MotorCall::Connect | MotorCall::Disconnect))
            .count();
        if self.fail_after.is_some_and(|limit| sent >= limit) {
            return Err(MotorError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock bus failure",
            )));
        }
        self.calls.push(call);
        Ok(())
    }
}

impl Default for MockMotorDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MotorDriver for MockMotorDriver {
    fn connect(&mut self) -> MotorResult<()> {
        if self.fail_connect {
            return Err(MotorError::ConnectionFailed("mock bus unplugged".to_string()));
        }
        self.connected = true;
        self.calls.push(MotorCall::Connect);
        Ok(())
    }

    fn disconnect(&mut self) -> MotorResult<()> {
        self.connected = false;
        self.calls.push(MotorCall::Disconnect);
        if self.fail_disconnect {
            return Err(MotorError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "mock port vanished on close",
            )));
        }
        Ok(())
    }

    fn set_moving_speed(&mut self, id: u8, speed: u16) -> MotorResult<()> {
        self.command(MotorCall::SetMovingSpeed { id, speed })
    }

    fn set_goal_position(&mut self, id: u8, position: u16) -> MotorResult<()> {
        self.command(MotorCall::SetGoalPosition { id, position })
    }

    fn set_torque_enable(&mut self, id: u8, enable: bool) -> MotorResult<()> {
        self.command(MotorCall::SetTorqueEnable { id, enable })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_require_connection() {
        let mut mock = MockMotorDriver::new();
        assert!(matches!(
            mock.set_goal_position(10, 1),
            Err(MotorError::NotConnected)
        ));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_records_in_order() {
        let mut mock = MockMotorDriver::new();
        mock.connect().unwrap();
        mock.set_moving_speed(10, 70).unwrap();
        mock.set_goal_position(10, 406).unwrap();
        mock.disconnect().unwrap();

        assert_eq!(
            mock.calls(),
            &[
                MotorCall::Connect,
                MotorCall::SetMovingSpeed { id: 10, speed: 70 },
                MotorCall::SetGoalPosition {
                    id: 10,
                    position: 406
                },
                MotorCall::Disconnect,
            ]
        );
        assert_eq!(mock.goal_positions(), vec![(10, 406)]);
    }

    #[test]
    fn test_failing_after() {
        let mut mock = MockMotorDriver::new().failing_after(1);
        mock.connect().unwrap();
        mock.set_moving_speed(10, 70).unwrap();
        assert!(mock.set_goal_position(10, 406).is_err());
    }
}
