//! In-process simulation hardware for tests and headless runs.
//!
//! [`SimHardware`] builds a [`HardwareMap`] whose drivers are backed by a
//! shared [`SimPlant`]: a kinematic model of a mecanum base.  Sim motors write
//! their power into the plant; the sim odometry device integrates the plant
//! one fixed step per `update()` and reports the resulting pose.  That is
//! enough to run the drive train, odometry and navigation end to end without a
//! robot.
//!
//! # Plant model
//!
//! | Quantity | From wheel powers |
//! |---|---|
//! | forward | `(fl + bl + fr + br) / 4` |
//! | strafe (positive = left) | `(fl - bl - fr + br) / 4` |
//! | rotate (positive = heading increases) | `(fl + bl - fr - br) / 4` |
//!
//! Each is scaled by [`SimPlantConfig`] maxima (mm/s and deg/s) and
//! integrated in the field frame at the mid-step heading.
//!
//! # Example
//!
//! ```rust
//! use torque_hal::sim::{SimHardware, SimPlant, SimPlantConfig};
//!
//! let plant = SimPlant::new(SimPlantConfig::default());
//! let mut map = SimHardware::builder(&plant)
//!     .with_mecanum_base([
//!         "motor_front_left",
//!         "motor_back_left",
//!         "motor_front_right",
//!         "motor_back_right",
//!     ])
//!     .with_odometry("odo")
//!     .build();
//!
//! let mut fl = map.take_motor("motor_front_left").unwrap();
//! fl.set_power(0.5).unwrap();
//! assert_eq!(plant.powers().front_left, 0.5);
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use torque_types::{Pose, RobotError};

use crate::hardware_map::HardwareMap;
use crate::mixing::{Wheel, WheelPowers};
use crate::motor::{Motor, ZeroPowerBehavior};
use crate::odometry::OdometryDevice;

// ────────────────────────────────────────────────────────────────────────────
// Plant
// ────────────────────────────────────────────────────────────────────────────

/// Physical limits of the simulated base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimPlantConfig {
    /// Ground speed at full forward power.
    pub max_speed_mm_per_sec: f64,
    /// Yaw rate at full rotate power.
    pub max_turn_deg_per_sec: f64,
    /// Time integrated by each odometry update.
    pub step: Duration,
}

impl Default for SimPlantConfig {
    fn default() -> Self {
        Self {
            max_speed_mm_per_sec: 600.0,
            max_turn_deg_per_sec: 180.0,
            step: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Default)]
struct PlantState {
    powers: WheelPowers,
    behaviors: [ZeroPowerBehavior; 4],
    pose: Pose,
    faults: HashSet<String>,
    odometry_updates: u64,
}

/// Shared handle to the simulated base.  Clones observe the same state.
#[derive(Debug, Clone)]
pub struct SimPlant {
    config: SimPlantConfig,
    state: Rc<RefCell<PlantState>>,
}

impl SimPlant {
    pub fn new(config: SimPlantConfig) -> Self {
        Self {
            config,
            state: Rc::new(RefCell::new(PlantState::default())),
        }
    }

    pub fn config(&self) -> &SimPlantConfig {
        &self.config
    }

    /// Current wheel powers as last written by the sim motors.
    pub fn powers(&self) -> WheelPowers {
        self.state.borrow().powers
    }

    pub fn zero_power_behavior(&self, wheel: Wheel) -> ZeroPowerBehavior {
        self.state.borrow().behaviors[wheel.index()]
    }

    /// Ground-truth pose of the base.
    pub fn pose(&self) -> Pose {
        self.state.borrow().pose
    }

    pub fn set_pose(&self, pose: Pose) {
        self.state.borrow_mut().pose = pose;
    }

    /// Number of odometry samples taken so far.
    pub fn odometry_updates(&self) -> u64 {
        self.state.borrow().odometry_updates
    }

    /// Make the device named `id` fail (or recover) on its next access.
    pub fn set_fault(&self, id: &str, faulted: bool) {
        let mut state = self.state.borrow_mut();
        if faulted {
            state.faults.insert(id.to_string());
        } else {
            state.faults.remove(id);
        }
    }

    pub fn is_faulted(&self, id: &str) -> bool {
        self.state.borrow().faults.contains(id)
    }

    /// Integrate the current wheel powers over `dt`.
    pub fn step(&self, dt: Duration) {
        let mut state = self.state.borrow_mut();
        let p = state.powers;
        let forward = (p.front_left + p.back_left + p.front_right + p.back_right) / 4.0;
        let strafe = (p.front_left - p.back_left - p.front_right + p.back_right) / 4.0;
        let rotate = (p.front_left + p.back_left - p.front_right - p.back_right) / 4.0;

        let secs = dt.as_secs_f64();
        let v_forward = forward * self.config.max_speed_mm_per_sec;
        let v_left = strafe * self.config.max_speed_mm_per_sec;
        let turn = rotate * self.config.max_turn_deg_per_sec * secs;

        let pose = state.pose;
        let mid = (pose.heading() + turn / 2.0).to_radians();
        let x = pose.x() + (v_forward * mid.cos() - v_left * mid.sin()) * secs;
        let y = pose.y() + (v_forward * mid.sin() + v_left * mid.cos()) * secs;
        state.pose = Pose::new(x, y, pose.heading() + turn);
    }

    fn write_power(&self, wheel: Wheel, power: f64) {
        self.state.borrow_mut().powers.set(wheel, power);
    }

    fn write_behavior(&self, wheel: Wheel, behavior: ZeroPowerBehavior) {
        self.state.borrow_mut().behaviors[wheel.index()] = behavior;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sim drivers
// ────────────────────────────────────────────────────────────────────────────

/// A drive motor that writes into one wheel slot of the plant.
pub struct SimMotor {
    id: String,
    wheel: Wheel,
    plant: SimPlant,
}

impl SimMotor {
    pub fn new(id: impl Into<String>, wheel: Wheel, plant: &SimPlant) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            wheel,
            plant: plant.clone(),
        })
    }

    fn check_fault(&self) -> Result<(), RobotError> {
        if self.plant.is_faulted(&self.id) {
            return Err(RobotError::hardware(&self.id, "simulated motor fault"));
        }
        Ok(())
    }
}

impl Motor for SimMotor {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_power(&mut self, power: f64) -> Result<(), RobotError> {
        self.check_fault()?;
        if !(-1.0..=1.0).contains(&power) {
            return Err(RobotError::hardware(
                &self.id,
                format!("power {power} outside [-1, 1]"),
            ));
        }
        self.plant.write_power(self.wheel, power);
        Ok(())
    }

    fn power(&self) -> f64 {
        self.plant.powers().get(self.wheel)
    }

    fn set_zero_power_behavior(&mut self, behavior: ZeroPowerBehavior) -> Result<(), RobotError> {
        self.check_fault()?;
        self.plant.write_behavior(self.wheel, behavior);
        Ok(())
    }
}

/// An odometry computer that advances the plant by one fixed step per
/// update and latches the resulting pose.
pub struct SimOdometry {
    id: String,
    plant: SimPlant,
    latched: Pose,
}

impl SimOdometry {
    pub fn new(id: impl Into<String>, plant: &SimPlant) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            plant: plant.clone(),
            latched: plant.pose(),
        })
    }
}

impl OdometryDevice for SimOdometry {
    fn id(&self) -> &str {
        &self.id
    }

    fn update(&mut self) -> Result<(), RobotError> {
        if self.plant.is_faulted(&self.id) {
            return Err(RobotError::hardware(&self.id, "simulated odometry fault"));
        }
        self.plant.step(self.plant.config().step);
        self.plant.state.borrow_mut().odometry_updates += 1;
        self.latched = self.plant.pose();
        Ok(())
    }

    fn pose(&self) -> Pose {
        self.latched
    }

    fn set_pose(&mut self, pose: Pose) -> Result<(), RobotError> {
        self.plant.set_pose(pose);
        self.latched = pose;
        Ok(())
    }

    fn frequency_hz(&self) -> f64 {
        let step = self.plant.config().step.as_secs_f64();
        if step > 0.0 { 1.0 / step } else { 0.0 }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimHardware builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder that constructs a [`HardwareMap`] populated with plant-backed
/// drivers.
pub struct SimHardware {
    plant: SimPlant,
    motors: Vec<Box<dyn Motor>>,
    odometry: Vec<Box<dyn OdometryDevice>>,
}

impl SimHardware {
    pub fn builder(plant: &SimPlant) -> Self {
        Self {
            plant: plant.clone(),
            motors: Vec::new(),
            odometry: Vec::new(),
        }
    }

    /// Four wheel motors, named in front-left, back-left, front-right,
    /// back-right order.
    pub fn with_mecanum_base(mut self, names: [&str; 4]) -> Self {
        for (wheel, name) in Wheel::ALL.iter().zip(names) {
            self.motors.push(SimMotor::new(name, *wheel, &self.plant));
        }
        self
    }

    pub fn with_odometry(mut self, id: impl Into<String>) -> Self {
        self.odometry.push(SimOdometry::new(id, &self.plant));
        self
    }

    /// Register a custom motor driver, e.g. a test double.
    pub fn with_motor(mut self, motor: Box<dyn Motor>) -> Self {
        self.motors.push(motor);
        self
    }

    pub fn build(self) -> HardwareMap {
        let mut map = HardwareMap::new();
        for motor in self.motors {
            map.register_motor(motor);
        }
        for device in self.odometry {
            map.register_odometry(device);
        }
        map
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
