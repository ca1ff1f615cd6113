//! `torque-types` – shared data model for the torque control framework.
//!
//! Everything that crosses a crate boundary lives here: the planar [`Pose`]
//! and angle helpers, the component/action tags, telemetry values, the
//! logical gamepad inputs (see [`input`]) and the [`RobotError`] taxonomy.

pub mod input;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use input::{Button, ButtonId, GamepadId, GamepadState, Gamepads};

/// Normalize an angle in degrees into the half-open range (−180°, 180°].
///
/// Computed as `((a + 180) mod 360) − 180` with a Euclidean remainder, then
/// −180 is folded onto +180.  Angles already in range are returned untouched,
/// which keeps the function exactly idempotent under floating point:
/// `normalize_degrees(normalize_degrees(a)) == normalize_degrees(a)`.
///
/// ```
/// use torque_types::normalize_degrees;
///
/// assert_eq!(normalize_degrees(270.0), -90.0);
/// assert_eq!(normalize_degrees(-180.0), 180.0);
/// ```
pub fn normalize_degrees(angle: f64) -> f64 {
    if angle > -180.0 && angle <= 180.0 {
        return angle;
    }
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 { wrapped + 360.0 } else { wrapped }
}

/// Planar robot pose in the field frame: millimetres and degrees.
///
/// The heading is normalized on construction, so every `Pose` satisfies
/// `-180 < heading <= 180`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Pose {
    x: f64,
    y: f64,
    heading: f64,
}

impl Pose {
    pub fn new(x: f64, y: f64, heading: f64) -> Self {
        Self {
            x,
            y,
            heading: normalize_degrees(heading),
        }
    }

    /// The field origin facing along +x.
    pub const fn origin() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            heading: 0.0,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    /// Straight-line distance to `other`.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Type tag carried by every registered component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    /// Drive base (motors).  Registered as the critical component.
    Drive,
    /// Inertial / odometry sensors.
    Sensor,
    /// Closed-loop navigation.
    Navigation,
    /// Anything else (intakes, lifts, lights, …).
    Auxiliary,
}

/// The two action archetypes.  Fixed for the lifetime of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Runs to self-determined completion once started.
    Continuous,
    /// Runs only while its button is physically held.
    Momentary,
}

/// Lifecycle state of an operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionState {
    Ready,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl ActionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionState::Ready => "ready",
            ActionState::Running => "running",
            ActionState::Completed => "completed",
            ActionState::Cancelled => "cancelled",
            ActionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single telemetry reading.  Components produce these; formatting for
/// display is the sink's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Bool(v) => write!(f, "{v}"),
            TelemetryValue::Integer(v) => write!(f, "{v}"),
            TelemetryValue::Number(v) => write!(f, "{v}"),
            TelemetryValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for TelemetryValue {
    fn from(v: bool) -> Self {
        TelemetryValue::Bool(v)
    }
}

impl From<i64> for TelemetryValue {
    fn from(v: i64) -> Self {
        TelemetryValue::Integer(v)
    }
}

impl From<u32> for TelemetryValue {
    fn from(v: u32) -> Self {
        TelemetryValue::Integer(i64::from(v))
    }
}

impl From<f64> for TelemetryValue {
    fn from(v: f64) -> Self {
        TelemetryValue::Number(v)
    }
}

impl From<&str> for TelemetryValue {
    fn from(v: &str) -> Self {
        TelemetryValue::Text(v.to_string())
    }
}

impl From<String> for TelemetryValue {
    fn from(v: String) -> Self {
        TelemetryValue::Text(v)
    }
}

/// Error taxonomy shared by every layer of the control stack.
///
/// `Clone` so an action can keep its most recent failure in `last_error`
/// while the same error is handed back to the dispatcher.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RobotError {
    #[error("Initialization Failed on {component}: {details}")]
    Initialization { component: String, details: String },

    #[error("Update Failed on {component}: {details}")]
    ComponentUpdate { component: String, details: String },

    #[error("Action '{action}' Failed: {details}")]
    ActionExecution { action: String, details: String },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Emergency Stop: {0}")]
    EmergencyStop(String),

    #[error("Not Operational: {0}")]
    NotOperational(String),

    #[error("Invalid Button Binding: {0}")]
    InvalidBinding(String),

    #[error("Invalid Parameter {name}: {details}")]
    InvalidParameter { name: String, details: String },
}

impl RobotError {
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        RobotError::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }

    pub fn initialization(component: impl Into<String>, details: impl Into<String>) -> Self {
        RobotError::Initialization {
            component: component.into(),
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_stays_in_half_open_range() {
        for step in -2000..=2000 {
            let angle = step as f64 * 0.77;
            let n = normalize_degrees(angle);
            assert!(n > -180.0 && n <= 180.0, "{angle} -> {n}");
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for angle in [-540.0, -180.0, -179.5, 0.0, 45.0, 180.0, 359.9, 720.0, 1e6] {
            let once = normalize_degrees(angle);
            assert_eq!(normalize_degrees(once), once);
        }
    }

    #[test]
    fn normalize_maps_boundaries_onto_positive_half_turn() {
        assert_eq!(normalize_degrees(180.0), 180.0);
        assert_eq!(normalize_degrees(-180.0), 180.0);
        assert_eq!(normalize_degrees(540.0), 180.0);
        assert_eq!(normalize_degrees(90.0), 90.0);
        assert_eq!(normalize_degrees(-90.0), -90.0);
        assert_eq!(normalize_degrees(190.0), -170.0);
    }

    #[test]
    fn pose_normalizes_heading_on_construction() {
        let pose = Pose::new(10.0, -5.0, 450.0);
        assert_eq!(pose.x(), 10.0);
        assert_eq!(pose.y(), -5.0);
        assert_eq!(pose.heading(), 90.0);
    }

    #[test]
    fn pose_distance() {
        let a = Pose::new(0.0, 0.0, 0.0);
        let b = Pose::new(30.0, 40.0, 0.0);
        assert!((a.distance_to(&b) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn telemetry_value_conversions() {
        assert_eq!(TelemetryValue::from(true), TelemetryValue::Bool(true));
        assert_eq!(TelemetryValue::from(0.5), TelemetryValue::Number(0.5));
        assert_eq!(TelemetryValue::from("moving").to_string(), "moving");
        assert_eq!(TelemetryValue::from(7u32), TelemetryValue::Integer(7));
    }

    #[test]
    fn robot_error_display() {
        let err = RobotError::hardware("motor_front_left", "overcurrent");
        assert!(err.to_string().contains("motor_front_left"));

        let err = RobotError::ActionExecution {
            action: "Lift".to_string(),
            details: "stalled".to_string(),
        };
        assert!(err.to_string().contains("Lift"));
    }

    #[test]
    fn robot_error_serializes_for_telemetry() {
        let err = RobotError::EmergencyStop("drive failure".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let back: RobotError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
