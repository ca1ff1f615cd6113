//! [`HardwareMap`] – named device lookup.
//!
//! The host populates the map with every configured driver before startup.
//! Components claim the devices they need during initialization with
//! [`HardwareMap::take_motor`] / [`HardwareMap::take_odometry`]; a claimed
//! device leaves the map, so two components can never drive the same motor.

use std::collections::HashMap;

use torque_types::RobotError;
use tracing::debug;

use crate::motor::Motor;
use crate::odometry::OdometryDevice;

/// Registry of unclaimed hardware drivers keyed by their identifier.
#[derive(Default)]
pub struct HardwareMap {
    motors: HashMap<String, Box<dyn Motor>>,
    odometry: HashMap<String, Box<dyn OdometryDevice>>,
}

impl HardwareMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a motor driver.  A driver with the same `id` is replaced.
    pub fn register_motor(&mut self, motor: Box<dyn Motor>) {
        debug!(id = motor.id(), "motor registered in hardware map");
        self.motors.insert(motor.id().to_string(), motor);
    }

    /// Register an odometry driver.  A driver with the same `id` is replaced.
    pub fn register_odometry(&mut self, device: Box<dyn OdometryDevice>) {
        debug!(id = device.id(), "odometry device registered in hardware map");
        self.odometry.insert(device.id().to_string(), device);
    }

    /// Claim the motor registered as `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] when no such motor is present
    /// (never registered, or already claimed).
    pub fn take_motor(&mut self, id: &str) -> Result<Box<dyn Motor>, RobotError> {
        self.motors
            .remove(id)
            .ok_or_else(|| RobotError::hardware(id, format!("motor '{id}' not found in hardware map")))
    }

    /// Claim the odometry device registered as `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] when no such device is present.
    pub fn take_odometry(&mut self, id: &str) -> Result<Box<dyn OdometryDevice>, RobotError> {
        self.odometry.remove(id).ok_or_else(|| {
            RobotError::hardware(id, format!("odometry device '{id}' not found in hardware map"))
        })
    }

    pub fn contains_motor(&self, id: &str) -> bool {
        self.motors.contains_key(id)
    }

    pub fn contains_odometry(&self, id: &str) -> bool {
        self.odometry.contains_key(id)
    }
}
