//! `torque-hal` – Hardware Abstraction Layer
//!
//! The only crate that knows what a motor or an odometry pod looks like.
//! Everything above it talks to the traits defined here, so vendor drivers
//! (or the in-process simulation) can be swapped without touching the
//! control logic.
//!
//! # Modules
//!
//! - [`motor`] – [`Motor`][motor::Motor]: a power-controlled DC motor.
//! - [`odometry`] – [`OdometryDevice`][odometry::OdometryDevice]: a dead-wheel
//!   / IMU odometry computer producing a field-frame [`Pose`][torque_types::Pose].
//! - [`hardware_map`] – [`HardwareMap`][hardware_map::HardwareMap]: named device
//!   lookup handed to components at initialization.
//! - [`clock`] – [`Clock`][clock::Clock]: the tick time source.
//! - [`mixing`] – mecanum wheel mixing, dead zone and clamping.
//! - [`rate_limiter`] – [`RateLimiter`][rate_limiter::RateLimiter]: per-wheel
//!   slew limiting of commanded power.
//! - [`sim`] – [`SimHardware`][sim::SimHardware]: stub drivers backed by a
//!   kinematic mecanum plant for tests and headless runs.

pub mod clock;
pub mod hardware_map;
pub mod mixing;
pub mod motor;
pub mod odometry;
pub mod rate_limiter;
pub mod sim;

pub use clock::{Clock, ManualClock, SystemClock};
pub use hardware_map::HardwareMap;
pub use mixing::{Wheel, WheelPowers, bound_input};
pub use motor::{Motor, ZeroPowerBehavior};
pub use odometry::OdometryDevice;
pub use rate_limiter::{DriveLimits, MotorPowerState, RateLimiter};
pub use sim::{SimHardware, SimPlant, SimPlantConfig};
