//! Generic `OdometryDevice` trait for pose-tracking hardware (dead-wheel
//! odometry computers, IMU fusion boards, …).

use torque_types::{Pose, RobotError};

/// An odometry computer that tracks the robot's field-frame pose.
///
/// Readings are latched: [`OdometryDevice::update`] pulls a fresh sample
/// from the device and [`OdometryDevice::pose`] returns the latched value
/// until the next update.
pub trait OdometryDevice {
    /// Stable identifier, e.g. `"odo"`.
    fn id(&self) -> &str;

    /// Pull the latest sample from the device.
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] if the device cannot be read.
    fn update(&mut self) -> Result<(), RobotError>;

    /// The most recently latched pose in millimetres / degrees.
    fn pose(&self) -> Pose;

    /// Overwrite the tracked pose (used to zero the device at startup).
    ///
    /// # Errors
    ///
    /// Returns [`RobotError::HardwareFault`] if the device rejects it.
    fn set_pose(&mut self, pose: Pose) -> Result<(), RobotError>;

    /// The device's own internal loop rate, if it reports one.
    fn frequency_hz(&self) -> f64 {
        0.0
    }
}
