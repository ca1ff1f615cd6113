//! Capability traits for everything the orchestrator manages.
//!
//! - [`Component`] – hardware-facing subsystem updated once per tick
//!   (drive train, odometry, intakes …).
//! - [`System`] – a higher-level controller that reads and commands
//!   components through the [`ComponentRegistry`] (navigation).
//! - [`DriveBase`] / [`PoseSource`] – narrow views a component can expose so
//!   systems can command it without knowing its concrete type.
//!
//! Typed lookup goes through [`AsAny`]; every `'static` type gets it for free.

use std::any::Any;
use std::collections::BTreeMap;

use torque_hal::HardwareMap;
use torque_types::{ComponentKind, GamepadState, Pose, RobotError, TelemetryValue};

use crate::registry::ComponentRegistry;
use crate::telemetry::TelemetryBatch;

/// Key/value readings, rebuilt on every call.
pub type Telemetry = BTreeMap<String, TelemetryValue>;

/// Upcast to [`Any`] for downcasting trait objects to concrete types.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Initialization context
// ────────────────────────────────────────────────────────────────────────────

/// What a component may touch while it initializes.
pub struct InitContext<'a> {
    pub hardware: &'a mut HardwareMap,
    pub telemetry: &'a mut TelemetryBatch,
}

impl<'a> InitContext<'a> {
    pub fn new(hardware: &'a mut HardwareMap, telemetry: &'a mut TelemetryBatch) -> Self {
        Self { hardware, telemetry }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Component
// ────────────────────────────────────────────────────────────────────────────

/// A hardware-facing subsystem owned by the orchestrator.
pub trait Component: AsAny {
    /// Unique name; also the telemetry prefix.
    fn name(&self) -> &str;

    fn kind(&self) -> ComponentKind;

    /// Claim hardware and bring the component to an operational state.
    ///
    /// # Errors
    ///
    /// Any [`RobotError`]; the orchestrator decides whether it is fatal.
    fn init(&mut self, ctx: &mut InitContext<'_>) -> Result<(), RobotError>;

    /// Called once per tick, in registration order.
    fn update(&mut self) -> Result<(), RobotError>;

    /// Bring hardware to a safe state.  Must be callable repeatedly.
    fn stop(&mut self) -> Result<(), RobotError>;

    fn is_operational(&self) -> bool;

    fn telemetry(&self) -> Telemetry;

    fn as_drive_base_mut(&mut self) -> Option<&mut dyn DriveBase> {
        None
    }

    fn as_pose_source(&self) -> Option<&dyn PoseSource> {
        None
    }
}

/// Motion commands understood by a holonomic drive base.
///
/// Powers are normalized; implementations apply their own dead zone, clamp
/// and slew limiting.
pub trait DriveBase {
    /// `drive` forward, `strafe` left, `rotate` toward increasing heading.
    fn drive_with_power(&mut self, drive: f64, strafe: f64, rotate: f64) -> Result<(), RobotError>;

    fn move_forward(&mut self, power: f64) -> Result<(), RobotError>;

    fn move_backward(&mut self, power: f64) -> Result<(), RobotError>;

    fn turn_right(&mut self, power: f64) -> Result<(), RobotError>;

    fn turn_left(&mut self, power: f64) -> Result<(), RobotError>;

    /// Map raw sticks to a drive command.
    fn drive_with_gamepad(&mut self, gamepad: &GamepadState) -> Result<(), RobotError>;

    fn stop_motors(&mut self) -> Result<(), RobotError>;
}

/// Field-frame pose, millimetres and degrees.
pub trait PoseSource {
    fn position(&self) -> Pose;

    fn heading(&self) -> f64 {
        self.position().heading()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// System
// ────────────────────────────────────────────────────────────────────────────

/// Named parameters handed to a [`System`] at initialization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemParams {
    values: BTreeMap<String, String>,
}

impl SystemParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// # Errors
    ///
    /// [`RobotError::InvalidParameter`] when `key` is missing or blank.
    pub fn require(&self, key: &str) -> Result<&str, RobotError> {
        match self.get(key) {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(RobotError::InvalidParameter {
                name: key.to_string(),
                details: "required parameter is missing".to_string(),
            }),
        }
    }
}

/// A controller that commands components through the registry.
pub trait System: AsAny {
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// [`RobotError::InvalidParameter`] for a bad parameter bundle.
    fn init(&mut self, params: &SystemParams) -> Result<(), RobotError>;

    /// Called once per tick after component updates and action dispatch.
    fn update(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    fn stop(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    fn telemetry(&self) -> Telemetry;
}
