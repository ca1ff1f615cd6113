//! Generic `Motor` trait for power-controlled DC motors.
//!
//! Drivers implement this trait and are placed in a
//! [`HardwareMap`][crate::hardware_map::HardwareMap] under a stable name.
//! The drive train takes ownership of its four motors at initialization and
//! only ever talks to this trait.

use serde::{Deserialize, Serialize};
use torque_types::RobotError;

/// What the motor controller does when commanded power is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZeroPowerBehavior {
    /// Short the windings; the wheel resists rotation.
    Brake,
    /// Let the wheel coast.
    #[default]
    Float,
}

/// A DC motor driven by a normalized power in [−1, 1].
pub trait Motor {
    /// Stable identifier, e.g. `"motor_front_left"`.
    fn id(&self) -> &str;

    /// Apply `power` (−1 = full reverse, 1 = full forward).
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] when the controller rejects the
    /// command (disconnected hub, fault state, …).
    fn set_power(&mut self, power: f64) -> Result<(), RobotError>;

    /// The most recently applied power.
    fn power(&self) -> f64;

    /// Select brake or float at zero power.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] if the controller rejects it.
    fn set_zero_power_behavior(&mut self, behavior: ZeroPowerBehavior) -> Result<(), RobotError>;
}
