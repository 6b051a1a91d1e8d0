//! CLI tool for aiming the two-axis steering mirror at focal-plane targets.
//!
//! Subcommands:
//! - `solve`: Print mirror angles and encoder ticks without touching hardware
//! - `run`: Drive the mirror through explicit targets (or the reference run)
//! - `sweep`: Drive the mirror through a zig-zag raster
//! - `ping`: Check both servos answer on the bus
//! - `off`: Release holding torque on both servos

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hardware::dynamixel::Ax12Driver;
use hardware::targets::{parse_target, raster_path, reference_targets};
use hardware::{
    drive_targets, release_motors, MockMotorDriver, MotorDriver, MotorSequencer, RigConfig,
};
use optics::{angle_to_focal_plane, commands_for_targets, ray_trace, TargetPosition};
use tracing::{info, warn};

/// Two-axis steering mirror control tool
#[derive(Parser, Debug)]
#[command(name = "mirror_tool")]
#[command(about = "Aim the AX-12 steering mirror at focal-plane targets")]
#[command(version)]
struct Args {
    /// Rig configuration file (JSON); defaults to the reference bench
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial device of the servo bus
    #[arg(long, global = true)]
    device: Option<String>,

    /// Serial baud rate
    #[arg(long, global = true)]
    baud: Option<u32>,

    /// Moving speed written before each goal (0-255)
    #[arg(long, global = true)]
    speed: Option<u16>,

    /// Settle delay after each target in milliseconds
    #[arg(long, global = true)]
    settle_ms: Option<u64>,

    /// Wait for and check a status packet after every write
    #[arg(long, global = true)]
    status_return: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve mirror angles and encoder ticks for targets
    Solve {
        /// Target as `x,y` in normalized focal-plane units (repeatable)
        #[arg(short, long = "target", value_parser = parse_target, allow_hyphen_values = true)]
        targets: Vec<TargetPosition>,
    },

    /// Drive the mirror through targets in order
    Run {
        /// Target as `x,y` in normalized focal-plane units (repeatable)
        #[arg(short, long = "target", value_parser = parse_target, allow_hyphen_values = true)]
        targets: Vec<TargetPosition>,

        /// Log the motor commands instead of opening the serial bus
        #[arg(long)]
        dry_run: bool,
    },

    /// Drive the mirror through a zig-zag raster
    Sweep {
        /// Number of columns in the raster
        #[arg(short, long, default_value = "20")]
        points: usize,

        /// Half-width of the raster in normalized units
        #[arg(short, long, default_value = "0.7")]
        span: f64,

        /// Log the motor commands instead of opening the serial bus
        #[arg(long)]
        dry_run: bool,
    },

    /// Ping both servos
    Ping,

    /// Release holding torque on both servos
    Off,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Solve { targets } => cmd_solve(&config, &or_reference(targets)),
        Command::Run { targets, dry_run } => cmd_run(&config, &or_reference(targets), dry_run),
        Command::Sweep {
            points,
            span,
            dry_run,
        } => {
            let targets = raster_path(points, span)?;
            cmd_run(&config, &targets, dry_run)
        }
        Command::Ping => cmd_ping(&config),
        Command::Off => cmd_off(&config),
    }
}

fn load_config(args: &Args) -> Result<RigConfig> {
    let mut config = match &args.config {
        Some(path) => RigConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => RigConfig::default(),
    };

    if let Some(device) = &args.device {
        config.bus.device_path = device.clone();
    }
    if let Some(baud) = args.baud {
        config.bus.baud_rate = baud;
    }
    if let Some(speed) = args.speed {
        config.bus.moving_speed = speed;
    }
    if let Some(settle_ms) = args.settle_ms {
        config.bus.settle_delay_seconds = settle_ms as f64 / 1000.0;
    }
    if args.status_return {
        config.bus.status_return = true;
    }

    config.validate()?;
    Ok(config)
}

fn or_reference(targets: Vec<TargetPosition>) -> Vec<TargetPosition> {
    if targets.is_empty() {
        reference_targets()
    } else {
        targets
    }
}

fn cmd_solve(config: &RigConfig, targets: &[TargetPosition]) -> Result<()> {
    let sequencer = MotorSequencer::from_config(&config.bus);
    let commands = commands_for_targets(&config.optics, targets)?;

    println!(
        "{:>7} {:>7} | {:>9} {:>9} | {:>9} {:>9} | {:>5} {:>5}",
        "x", "y", "beam_x°", "beam_y°", "mirror_x°", "mirror_y°", "m1", "m2"
    );
    for (target, command) in targets.iter().zip(&commands) {
        let (x_angle, y_angle) = angle_to_focal_plane(&config.optics, target);
        let beam_x = ray_trace(&config.optics, x_angle, target.x())?;
        let beam_y = ray_trace(&config.optics, y_angle, target.y())?;
        let (mirror_x, mirror_y) = command.to_degrees();

        let ticks = match sequencer.step(*command) {
            Ok(step) => format!("{:>5} {:>5}", step.motor_1_ticks, step.motor_2_ticks),
            Err(e) => {
                warn!("{e}");
                format!("{:>5} {:>5}", "-", "-")
            }
        };

        println!(
            "{:>7.3} {:>7.3} | {:>9.4} {:>9.4} | {:>9.4} {:>9.4} | {ticks}",
            target.x(),
            target.y(),
            beam_x.to_degrees(),
            beam_y.to_degrees(),
            mirror_x,
            mirror_y
        );
    }
    Ok(())
}

fn cmd_run(config: &RigConfig, targets: &[TargetPosition], dry_run: bool) -> Result<()> {
    let sequencer = MotorSequencer::from_config(&config.bus);

    if dry_run {
        let mut mock = MockMotorDriver::new();
        let sequencer = sequencer.with_settle_delay(Duration::ZERO);
        let steps = drive_targets(&mut mock, &config.optics, &sequencer, targets)?;
        for call in mock.calls() {
            info!("{call:?}");
        }
        info!("Dry run: {} targets planned", steps.len());
        return Ok(());
    }

    let mut driver = Ax12Driver::new(&config.bus);
    let steps = drive_targets(&mut driver, &config.optics, &sequencer, targets)
        .with_context(|| format!("Mirror run on {} failed", config.bus.device_path))?;
    info!("Visited {} targets", steps.len());
    Ok(())
}

fn cmd_ping(config: &RigConfig) -> Result<()> {
    let mut driver = Ax12Driver::new(&config.bus);
    driver.connect()?;

    let mut missing = Vec::new();
    for id in [config.bus.motor_id_1, config.bus.motor_id_2] {
        match driver.ping(id) {
            Ok(status) => info!("Motor {id}: present (error flags {:?})", status.error),
            Err(e) => {
                warn!("Motor {id}: {e}");
                missing.push(id);
            }
        }
    }
    driver.disconnect()?;

    if !missing.is_empty() {
        bail!("Motors not responding: {missing:?}");
    }
    Ok(())
}

fn cmd_off(config: &RigConfig) -> Result<()> {
    let sequencer = MotorSequencer::from_config(&config.bus);
    let mut driver = Ax12Driver::new(&config.bus);

    release_motors(&mut driver, &sequencer)
        .with_context(|| format!("Releasing torque on {} failed", config.bus.device_path))?;
    Ok(())
}
