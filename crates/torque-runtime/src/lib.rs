//! `torque-runtime` – Concrete Robot Subsystems
//!
//! The parts the kernel orchestrates on a real (or simulated) mecanum robot.
//!
//! # Modules
//!
//! - [`drive_train`] – [`DriveTrain`][drive_train::DriveTrain]: four-motor
//!   mecanum drive with mixing, dead zone, clamping and slew-rate limiting;
//!   stops itself on a motor fault.
//! - [`odometry`] – [`OdometryComponent`][odometry::OdometryComponent]: polls
//!   the odometry computer and serves the field pose.
//! - [`navigation`] – [`NavigationSystem`][navigation::NavigationSystem]:
//!   proportional go-to-pose controller.
//! - [`autonomous`] – [`SquarePath`][autonomous::SquarePath] timed routine and
//!   [`CourseRunner`][autonomous::CourseRunner] waypoint sequencing.
//! - [`robot`] – [`Robot`][robot::Robot]: wires the above onto an
//!   [`Orchestrator`][torque_kernel::Orchestrator].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP span export.

pub mod autonomous;
pub mod drive_train;
pub mod navigation;
pub mod odometry;
pub mod robot;
pub mod telemetry;

pub use autonomous::{CourseProgress, CourseRunner, SquarePath, SquarePathTiming};
pub use drive_train::{DriveTrain, DriveTrainConfig};
pub use navigation::{
    NavigationConfig, NavigationCourse, NavigationParams, NavigationStatus, NavigationStep,
    NavigationSystem, compute_step,
};
pub use odometry::OdometryComponent;
pub use robot::{Robot, RobotSettings};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
