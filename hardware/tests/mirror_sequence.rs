//! End-to-end: focal-plane targets through the optics solve onto a mock servo bus.

use std::time::Duration;

use hardware::targets::{raster_path, reference_targets};
use hardware::{
    drive_targets, BusConfig, MockMotorDriver, MotorCall, MotorError, MotorSequencer,
    SequenceError,
};
use optics::{from_wanted_to_angle, OpticalConfig, OpticsError, TargetPosition};

fn test_sequencer() -> MotorSequencer {
    MotorSequencer::from_config(&BusConfig::default()).with_settle_delay(Duration::ZERO)
}

#[test]
fn center_target_drives_motors_to_their_offsets() {
    let mut mock = MockMotorDriver::new();
    let optics = OpticalConfig::default();

    let steps = drive_targets(
        &mut mock,
        &optics,
        &test_sequencer(),
        &[TargetPosition::center()],
    )
    .unwrap();

    assert_eq!(steps.len(), 1);
    assert_eq!(
        mock.calls(),
        &[
            MotorCall::Connect,
            MotorCall::SetMovingSpeed { id: 10, speed: 70 },
            MotorCall::SetGoalPosition {
                id: 10,
                position: 406
            },
            MotorCall::SetMovingSpeed { id: 11, speed: 70 },
            MotorCall::SetGoalPosition {
                id: 11,
                position: 842
            },
            MotorCall::Disconnect,
        ]
    );
    assert!(!mock.is_connected());
}

#[test]
fn reference_run_sends_y_to_motor_1_and_x_to_motor_2() {
    let mut mock = MockMotorDriver::new();
    let optics = OpticalConfig::default();
    let sequencer = test_sequencer();
    let targets = reference_targets();

    let steps = drive_targets(&mut mock, &optics, &sequencer, &targets).unwrap();

    let goals = mock.goal_positions();
    assert_eq!(goals.len(), 2 * targets.len());
    for (i, target) in targets.iter().enumerate() {
        let command = from_wanted_to_angle(&optics, target).unwrap();
        let expected_1 = sequencer.motor_1.ticks(command.y).unwrap();
        let expected_2 = sequencer.motor_2.ticks(command.x).unwrap();

        assert_eq!(goals[2 * i], (10, expected_1));
        assert_eq!(goals[2 * i + 1], (11, expected_2));
        assert_eq!(steps[i].motor_1_ticks, expected_1);
    }

    // first two targets share x, so motor 2 holds still between them
    assert_eq!(goals[1], goals[3]);
    // mirror-symmetric targets land symmetrically about the offsets
    assert_eq!(
        i32::from(goals[0].1) - 406,
        406 - i32::from(goals[2].1)
    );
}

#[test]
fn out_of_range_plan_never_touches_the_bus() {
    let mut mock = MockMotorDriver::new();
    let sequencer = MotorSequencer {
        motor_1: hardware::MotorChannel::new(10, 1020),
        ..test_sequencer()
    };
    let targets = [
        TargetPosition::center(),
        TargetPosition::new(0.0, -1.0).unwrap(),
    ];

    let err = drive_targets(&mut mock, &OpticalConfig::default(), &sequencer, &targets)
        .unwrap_err();

    assert!(matches!(
        err,
        SequenceError::TickOutOfRange { motor_id: 10, .. }
    ));
    assert!(mock.calls().is_empty());
}

#[test]
fn bus_failure_still_disconnects() {
    let mut mock = MockMotorDriver::new().failing_after(3);

    let err = drive_targets(
        &mut mock,
        &OpticalConfig::default(),
        &test_sequencer(),
        &reference_targets(),
    )
    .unwrap_err();

    assert!(matches!(err, SequenceError::Motor(MotorError::Io(_))));
    assert_eq!(mock.calls().last(), Some(&MotorCall::Disconnect));
    assert_eq!(mock.goal_positions().len(), 1);
}

#[test]
fn connection_error_aborts_before_commands() {
    let mut mock = MockMotorDriver::new().unplugged();

    let err = drive_targets(
        &mut mock,
        &OpticalConfig::default(),
        &test_sequencer(),
        &reference_targets(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        SequenceError::Motor(MotorError::ConnectionFailed(_))
    ));
    assert!(mock.calls().is_empty());
}

#[test]
fn optics_domain_error_propagates() {
    let mut mock = MockMotorDriver::new();
    let optics = OpticalConfig {
        max_x_angle_deg: 120.0,
        ..Default::default()
    };

    let err = drive_targets(
        &mut mock,
        &optics,
        &test_sequencer(),
        &[TargetPosition::new(1.0, 0.0).unwrap()],
    )
    .unwrap_err();

    assert!(matches!(err, SequenceError::Optics(OpticsError::Domain(_))));
    assert!(mock.calls().is_empty());
}

#[test]
fn raster_sweep_stays_in_range() {
    let mut mock = MockMotorDriver::new();
    let targets = raster_path(20, 0.7).unwrap();

    let steps = drive_targets(
        &mut mock,
        &OpticalConfig::default(),
        &test_sequencer(),
        &targets,
    )
    .unwrap();

    assert_eq!(steps.len(), 20);
    assert_eq!(mock.goal_positions().len(), 40);
    // y alternates, so motor 1 flips between two positions
    assert_eq!(steps[0].motor_1_ticks, steps[2].motor_1_ticks);
    assert_ne!(steps[0].motor_1_ticks, steps[1].motor_1_ticks);
}
