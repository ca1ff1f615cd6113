//! [`DriveTrain`] – the four-motor mecanum drive component.
//!
//! Every command, whether it comes from a gamepad, navigation or a scripted
//! routine, is mixed into four wheel powers and sent through the
//! [`RateLimiter`] (dead zone, clamp, slew limit) before it reaches a motor.
//! The limiter's tick instant is advanced once per control tick in
//! [`Component::update`].
//!
//! A motor write failure is treated as a hardware emergency: every motor is
//! zeroed directly (bypassing the limiter), the component marks itself
//! non-operational, and the error is returned.

use serde::{Deserialize, Serialize};
use torque_hal::{
    Clock, DriveLimits, Motor, RateLimiter, Wheel, WheelPowers, ZeroPowerBehavior, bound_input,
};
use torque_kernel::{Component, DriveBase, InitContext, Telemetry};
use torque_types::{ComponentKind, GamepadState, RobotError};
use tracing::{debug, error, info, warn};

pub const DRIVE_TRAIN: &str = "Drive Train";

/// Motor names and power limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveTrainConfig {
    #[serde(default = "default_front_left")]
    pub front_left: String,
    #[serde(default = "default_back_left")]
    pub back_left: String,
    #[serde(default = "default_front_right")]
    pub front_right: String,
    #[serde(default = "default_back_right")]
    pub back_right: String,
    #[serde(flatten)]
    pub limits: DriveLimits,
}

fn default_front_left() -> String {
    "motor_front_left".to_string()
}
fn default_back_left() -> String {
    "motor_back_left".to_string()
}
fn default_front_right() -> String {
    "motor_front_right".to_string()
}
fn default_back_right() -> String {
    "motor_back_right".to_string()
}

impl Default for DriveTrainConfig {
    fn default() -> Self {
        Self {
            front_left: default_front_left(),
            back_left: default_back_left(),
            front_right: default_front_right(),
            back_right: default_back_right(),
            limits: DriveLimits::default(),
        }
    }
}

impl DriveTrainConfig {
    /// Motor names in [`Wheel::ALL`] order.
    pub fn motor_names(&self) -> [&str; 4] {
        [
            &self.front_left,
            &self.back_left,
            &self.front_right,
            &self.back_right,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveStatus {
    Uninitialized,
    Idle,
    Driving,
    Stopped,
    EmergencyStopped,
}

impl DriveStatus {
    fn as_str(&self) -> &'static str {
        match self {
            DriveStatus::Uninitialized => "uninitialized",
            DriveStatus::Idle => "idle",
            DriveStatus::Driving => "driving",
            DriveStatus::Stopped => "stopped",
            DriveStatus::EmergencyStopped => "emergency_stopped",
        }
    }
}

/// Mecanum drive base component.
pub struct DriveTrain {
    config: DriveTrainConfig,
    clock: Box<dyn Clock>,
    motors: Vec<Box<dyn Motor>>,
    limiter: RateLimiter,
    operational: bool,
    status: DriveStatus,
    zero_power: ZeroPowerBehavior,
    last_input: (f64, f64, f64),
}

impl DriveTrain {
    pub fn new(config: DriveTrainConfig, clock: Box<dyn Clock>) -> Self {
        let limiter = RateLimiter::new(config.limits);
        Self {
            config,
            clock,
            motors: Vec::with_capacity(4),
            limiter,
            operational: false,
            status: DriveStatus::Uninitialized,
            zero_power: ZeroPowerBehavior::Float,
            last_input: (0.0, 0.0, 0.0),
        }
    }

    pub fn config(&self) -> &DriveTrainConfig {
        &self.config
    }

    /// Power last sent to `wheel`.
    pub fn wheel_power(&self, wheel: Wheel) -> f64 {
        self.limiter.last_power(wheel)
    }

    /// The `(drive, strafe, rotate)` command most recently requested.
    pub fn last_input(&self) -> (f64, f64, f64) {
        self.last_input
    }

    pub fn zero_power_behavior(&self) -> ZeroPowerBehavior {
        self.zero_power
    }

    /// Brake (`true`) or coast (`false`) when power is zero.
    ///
    /// # Errors
    ///
    /// [`RobotError::HardwareFault`] if a controller rejects the setting.
    pub fn enable_brake_mode(&mut self, enabled: bool) -> Result<(), RobotError> {
        self.ensure_operational()?;
        let behavior = if enabled {
            ZeroPowerBehavior::Brake
        } else {
            ZeroPowerBehavior::Float
        };
        for motor in self.motors.iter_mut() {
            motor.set_zero_power_behavior(behavior)?;
        }
        self.zero_power = behavior;
        info!(?behavior, "drive zero-power behavior changed");
        Ok(())
    }

    fn ensure_operational(&self) -> Result<(), RobotError> {
        if self.operational {
            Ok(())
        } else {
            Err(RobotError::NotOperational(format!(
                "{DRIVE_TRAIN} is {}",
                self.status.as_str()
            )))
        }
    }

    /// Limit and write one power per wheel.
    fn apply(&mut self, powers: WheelPowers) -> Result<(), RobotError> {
        for wheel in Wheel::ALL {
            let power = self.limiter.limit(wheel, powers.get(wheel));
            if let Err(e) = self.motors[wheel.index()].set_power(power) {
                self.emergency_stop(&e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Zero every motor directly and leave the component non-operational.
    fn emergency_stop(&mut self, cause: &RobotError) {
        error!(error = %cause, "drive train emergency stop");
        self.zero_motors_directly();
        self.operational = false;
        self.status = DriveStatus::EmergencyStopped;
    }

    fn zero_motors_directly(&mut self) -> Option<RobotError> {
        let mut first_error = None;
        for motor in self.motors.iter_mut() {
            if let Err(e) = motor.set_power(0.0) {
                warn!(motor = motor.id(), error = %e, "failed to zero motor");
                first_error.get_or_insert(e);
            }
        }
        self.limiter.reset();
        first_error
    }
}

impl Component for DriveTrain {
    fn name(&self) -> &str {
        DRIVE_TRAIN
    }

    fn kind(&self) -> ComponentKind {
        ComponentKind::Drive
    }

    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), RobotError> {
        self.config.limits.validate()?;
        let mut motors = Vec::with_capacity(4);
        for name in self.config.motor_names() {
            motors.push(ctx.hardware.take_motor(name)?);
        }
        for motor in motors.iter_mut() {
            motor.set_zero_power_behavior(ZeroPowerBehavior::Float)?;
            motor.set_power(0.0)?;
        }
        self.motors = motors;

        // Seed the limiter so the first command after init ramps from zero.
        self.limiter.reset();
        self.limiter.begin_tick(self.clock.now());
        for wheel in Wheel::ALL {
            self.limiter.limit(wheel, 0.0);
        }

        self.zero_power = ZeroPowerBehavior::Float;
        self.operational = true;
        self.status = DriveStatus::Idle;
        ctx.telemetry.add(format!("{DRIVE_TRAIN}.status"), "initialized");
        info!(motors = ?self.config.motor_names(), "drive train initialized");
        Ok(())
    }

    fn update(&mut self) -> Result<(), RobotError> {
        if self.operational {
            self.limiter.begin_tick(self.clock.now());
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RobotError> {
        if self.motors.is_empty() {
            return Ok(());
        }
        let result = self.zero_motors_directly();
        self.last_input = (0.0, 0.0, 0.0);
        if self.status != DriveStatus::EmergencyStopped {
            self.status = DriveStatus::Stopped;
        }
        debug!("drive train stopped");
        match result {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_operational(&self) -> bool {
        self.operational
    }

    fn telemetry(&self) -> Telemetry {
        let mut t = Telemetry::new();
        t.insert("status".into(), self.status.as_str().into());
        t.insert("operational".into(), self.operational.into());
        t.insert("drive".into(), self.last_input.0.into());
        t.insert("strafe".into(), self.last_input.1.into());
        t.insert("rotate".into(), self.last_input.2.into());
        t.insert(
            "zero_power".into(),
            match self.zero_power {
                ZeroPowerBehavior::Brake => "brake",
                ZeroPowerBehavior::Float => "float",
            }
            .into(),
        );
        for wheel in Wheel::ALL {
            t.insert(
                format!("power.{}", wheel.as_str()),
                self.limiter.last_power(wheel).into(),
            );
        }
        t
    }

    fn as_drive_base_mut(&mut self) -> Option<&mut dyn DriveBase> {
        Some(self)
    }
}

impl DriveBase for DriveTrain {
    fn drive_with_power(&mut self, drive: f64, strafe: f64, rotate: f64) -> Result<(), RobotError> {
        self.ensure_operational()?;
        self.last_input = (drive, strafe, rotate);
        self.status = if drive == 0.0 && strafe == 0.0 && rotate == 0.0 {
            DriveStatus::Idle
        } else {
            DriveStatus::Driving
        };
        self.apply(WheelPowers::mix(drive, strafe, rotate))
    }

    fn move_forward(&mut self, power: f64) -> Result<(), RobotError> {
        self.drive_with_power(power, 0.0, 0.0)
    }

    fn move_backward(&mut self, power: f64) -> Result<(), RobotError> {
        self.drive_with_power(-power, 0.0, 0.0)
    }

    /// Left side forward, right side back.
    fn turn_right(&mut self, power: f64) -> Result<(), RobotError> {
        self.drive_with_power(0.0, 0.0, power)
    }

    fn turn_left(&mut self, power: f64) -> Result<(), RobotError> {
        self.drive_with_power(0.0, 0.0, -power)
    }

    fn drive_with_gamepad(&mut self, gamepad: &GamepadState) -> Result<(), RobotError> {
        let limits = *self.limiter.limits();
        let shape = |v: f64| bound_input(v, limits.dead_zone, limits.max_power);
        self.drive_with_power(
            shape(-gamepad.left_stick_y),
            shape(-gamepad.left_stick_x),
            shape(gamepad.right_stick_x),
        )
    }

    fn stop_motors(&mut self) -> Result<(), RobotError> {
        self.drive_with_power(0.0, 0.0, 0.0)
    }
}
