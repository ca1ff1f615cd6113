//! [`NavigationSystem`] – proportional go-to-pose controller.
//!
//! Each tick the system reads the pose source, computes a [`NavigationStep`]
//! toward the current [`NavigationCourse`], and commands the drive base:
//!
//! | Quantity | Formula |
//! |---|---|
//! | `distance` | `hypot(target.x - x, target.y - y)` |
//! | `bearing` | `atan2(dy, dx)` in degrees |
//! | `heading_error` | `normalize(bearing - heading)` |
//! | `drive_power` | `drive_gain * distance` |
//! | `rotation_power` | `rotation_gain * heading_error` |
//!
//! The course is complete once the robot is within `position_threshold` of
//! the target and within `heading_threshold` of the target heading.  The
//! controller applies no clamping of its own; the drive train's mixing and
//! limiter bound what reaches the motors.
//!
//! The system starts complete and does nothing until
//! [`NavigationSystem::set_course`] is called.

use serde::{Deserialize, Serialize};
use torque_kernel::{ComponentRegistry, System, SystemParams, Telemetry};
use torque_types::{Pose, RobotError, normalize_degrees};
use tracing::{debug, info, warn};

pub const NAVIGATION: &str = "Navigation";

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_drive_gain")]
    pub drive_gain: f64,
    #[serde(default = "default_rotation_gain")]
    pub rotation_gain: f64,
    /// Millimetres.
    #[serde(default = "default_position_threshold")]
    pub position_threshold: f64,
    /// Degrees.
    #[serde(default = "default_heading_threshold")]
    pub heading_threshold: f64,
}

fn default_drive_gain() -> f64 {
    0.05
}
fn default_rotation_gain() -> f64 {
    0.01
}
fn default_position_threshold() -> f64 {
    0.1
}
fn default_heading_threshold() -> f64 {
    1.0
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            drive_gain: default_drive_gain(),
            rotation_gain: default_rotation_gain(),
            position_threshold: default_position_threshold(),
            heading_threshold: default_heading_threshold(),
        }
    }
}

impl NavigationConfig {
    /// # Errors
    ///
    /// [`RobotError::InvalidParameter`] for a negative or non-finite value.
    pub fn validate(&self) -> Result<(), RobotError> {
        let fields = [
            ("drive_gain", self.drive_gain),
            ("rotation_gain", self.rotation_gain),
            ("position_threshold", self.position_threshold),
            ("heading_threshold", self.heading_threshold),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(RobotError::InvalidParameter {
                    name: name.to_string(),
                    details: format!("{value} must be a finite, non-negative number"),
                });
            }
        }
        Ok(())
    }

    pub fn gains(&self) -> NavigationGains {
        NavigationGains {
            drive: self.drive_gain,
            rotation: self.rotation_gain,
        }
    }

    pub fn thresholds(&self) -> NavigationThresholds {
        NavigationThresholds {
            position: self.position_threshold,
            heading: self.heading_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationGains {
    pub drive: f64,
    pub rotation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationThresholds {
    pub position: f64,
    pub heading: f64,
}

/// Where to go and how aggressively.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationCourse {
    pub target: Pose,
    pub gains: NavigationGains,
    pub thresholds: NavigationThresholds,
}

/// Registry names the system reads from and commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationParams {
    pub drive: String,
    pub pose_source: String,
}

impl From<&NavigationParams> for SystemParams {
    fn from(p: &NavigationParams) -> Self {
        SystemParams::new()
            .with("drive", p.drive.clone())
            .with("pose_source", p.pose_source.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Control law
// ────────────────────────────────────────────────────────────────────────────

/// Outcome of one controller evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NavigationStep {
    Arrived,
    Drive {
        distance: f64,
        bearing: f64,
        heading_error: f64,
        drive_power: f64,
        rotation_power: f64,
    },
}

/// Evaluate the proportional control law for `pose` against `course`.
///
/// ```rust
/// use torque_runtime::navigation::{NavigationConfig, NavigationCourse, NavigationStep, compute_step};
/// use torque_types::Pose;
///
/// let cfg = NavigationConfig::default();
/// let course = NavigationCourse {
///     target: Pose::new(0.0, 100.0, 0.0),
///     gains: cfg.gains(),
///     thresholds: cfg.thresholds(),
/// };
/// match compute_step(Pose::origin(), &course) {
///     NavigationStep::Drive { distance, bearing, .. } => {
///         assert!((distance - 100.0).abs() < 1e-9);
///         assert!((bearing - 90.0).abs() < 1e-9);
///     }
///     NavigationStep::Arrived => unreachable!(),
/// }
/// ```
pub fn compute_step(pose: Pose, course: &NavigationCourse) -> NavigationStep {
    let dx = course.target.x() - pose.x();
    let dy = course.target.y() - pose.y();
    let distance = dx.hypot(dy);
    let bearing = dy.atan2(dx).to_degrees();
    let heading_error = normalize_degrees(bearing - pose.heading());
    let final_heading_error = normalize_degrees(course.target.heading() - pose.heading());

    if distance <= course.thresholds.position
        && final_heading_error.abs() <= course.thresholds.heading
    {
        return NavigationStep::Arrived;
    }

    NavigationStep::Drive {
        distance,
        bearing,
        heading_error,
        drive_power: course.gains.drive * distance,
        rotation_power: course.gains.rotation * heading_error,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// System
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationStatus {
    Idle,
    Navigating,
    Arrived,
    /// The pose source or drive was missing or offline this tick.
    Unavailable,
}

impl NavigationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationStatus::Idle => "idle",
            NavigationStatus::Navigating => "navigating",
            NavigationStatus::Arrived => "arrived",
            NavigationStatus::Unavailable => "unavailable",
        }
    }
}

pub struct NavigationSystem {
    config: NavigationConfig,
    params: Option<NavigationParams>,
    course: Option<NavigationCourse>,
    complete: bool,
    status: NavigationStatus,
    last_step: Option<NavigationStep>,
}

impl NavigationSystem {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            config,
            params: None,
            course: None,
            complete: true,
            status: NavigationStatus::Idle,
            last_step: None,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Replace the target and start driving toward it on the next update.
    pub fn set_course(&mut self, x: f64, y: f64, heading: f64) {
        let course = NavigationCourse {
            target: Pose::new(x, y, heading),
            gains: self.config.gains(),
            thresholds: self.config.thresholds(),
        };
        info!(x, y, heading = course.target.heading(), "navigation course set");
        self.course = Some(course);
        self.complete = false;
        self.status = NavigationStatus::Navigating;
        self.last_step = None;
    }

    /// Abandon the current course.  The drive is left as last commanded.
    pub fn cancel(&mut self) {
        if !self.complete {
            debug!("navigation course cancelled");
        }
        self.complete = true;
        if self.status != NavigationStatus::Arrived {
            self.status = NavigationStatus::Idle;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn status(&self) -> NavigationStatus {
        self.status
    }

    pub fn course(&self) -> Option<&NavigationCourse> {
        self.course.as_ref()
    }

    pub fn last_step(&self) -> Option<NavigationStep> {
        self.last_step
    }
}

impl System for NavigationSystem {
    fn name(&self) -> &str {
        NAVIGATION
    }

    fn init(&mut self, params: &SystemParams) -> Result<(), RobotError> {
        self.config.validate()?;
        let parsed = NavigationParams {
            drive: params.require("drive")?.to_string(),
            pose_source: params.require("pose_source")?.to_string(),
        };
        info!(drive = %parsed.drive, pose_source = %parsed.pose_source, "navigation initialized");
        self.params = Some(parsed);
        Ok(())
    }

    fn update(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        if self.complete {
            return Ok(());
        }
        let (Some(params), Some(course)) = (self.params.as_ref(), self.course) else {
            return Ok(());
        };

        let pose = match components.get(&params.pose_source) {
            Some(c) if c.is_operational() => c.as_pose_source().map(|s| s.position()),
            _ => None,
        };
        let drive_ready = components
            .get(&params.drive)
            .is_some_and(|c| c.is_operational());
        let Some(pose) = pose.filter(|_| drive_ready) else {
            if self.status != NavigationStatus::Unavailable {
                warn!(
                    drive = %params.drive,
                    pose_source = %params.pose_source,
                    "navigation inputs unavailable; skipping"
                );
            }
            self.status = NavigationStatus::Unavailable;
            return Ok(());
        };
        let Some(drive) = components.drive_base_mut(&params.drive) else {
            self.status = NavigationStatus::Unavailable;
            return Ok(());
        };

        let step = compute_step(pose, &course);
        self.last_step = Some(step);
        match step {
            NavigationStep::Arrived => {
                drive.stop_motors()?;
                self.complete = true;
                self.status = NavigationStatus::Arrived;
                info!(x = pose.x(), y = pose.y(), heading = pose.heading(), "navigation target reached");
            }
            NavigationStep::Drive {
                drive_power,
                rotation_power,
                ..
            } => {
                self.status = NavigationStatus::Navigating;
                drive.drive_with_power(drive_power, 0.0, rotation_power)?;
            }
        }
        Ok(())
    }

    fn stop(&mut self, _components: &mut ComponentRegistry) -> Result<(), RobotError> {
        self.cancel();
        Ok(())
    }

    fn telemetry(&self) -> Telemetry {
        let mut t = Telemetry::new();
        t.insert("status".into(), self.status.as_str().into());
        t.insert("complete".into(), self.complete.into());
        if let Some(course) = &self.course {
            t.insert("target.x".into(), course.target.x().into());
            t.insert("target.y".into(), course.target.y().into());
            t.insert("target.heading".into(), course.target.heading().into());
        }
        if let Some(NavigationStep::Drive {
            distance,
            bearing,
            heading_error,
            drive_power,
            rotation_power,
        }) = self.last_step
        {
            t.insert("distance".into(), distance.into());
            t.insert("bearing".into(), bearing.into());
            t.insert("heading_error".into(), heading_error.into());
            t.insert("drive_power".into(), drive_power.into());
            t.insert("rotation_power".into(), rotation_power.into());
        }
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torque_kernel::{Component, DriveBase, InitContext, PoseSource};
    use torque_types::{ComponentKind, GamepadState, TelemetryValue};

    use std::cell::RefCell;
    use std::rc::Rc;

    type Commands = Rc<RefCell<Vec<(f64, f64, f64)>>>;

    /// Drive double that records every command.
    struct MockDrive {
        commands: Commands,
        operational: bool,
    }

    impl Component for MockDrive {
        fn name(&self) -> &str {
            "Drive Train"
        }
        fn kind(&self) -> ComponentKind {
            ComponentKind::Drive
        }
        fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), RobotError> {
            Ok(())
        }
        fn update(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn is_operational(&self) -> bool {
            self.operational
        }
        fn telemetry(&self) -> Telemetry {
            Telemetry::new()
        }
        fn as_drive_base_mut(&mut self) -> Option<&mut dyn DriveBase> {
            Some(self)
        }
    }

    impl DriveBase for MockDrive {
        fn drive_with_power(&mut self, d: f64, s: f64, r: f64) -> Result<(), RobotError> {
            self.commands.borrow_mut().push((d, s, r));
            Ok(())
        }
        fn move_forward(&mut self, p: f64) -> Result<(), RobotError> {
            self.drive_with_power(p, 0.0, 0.0)
        }
        fn move_backward(&mut self, p: f64) -> Result<(), RobotError> {
            self.drive_with_power(-p, 0.0, 0.0)
        }
        fn turn_right(&mut self, p: f64) -> Result<(), RobotError> {
            self.drive_with_power(0.0, 0.0, p)
        }
        fn turn_left(&mut self, p: f64) -> Result<(), RobotError> {
            self.drive_with_power(0.0, 0.0, -p)
        }
        fn drive_with_gamepad(&mut self, _g: &GamepadState) -> Result<(), RobotError> {
            Ok(())
        }
        fn stop_motors(&mut self) -> Result<(), RobotError> {
            self.drive_with_power(0.0, 0.0, 0.0)
        }
    }

    struct FixedPose(Pose);

    impl Component for FixedPose {
        fn name(&self) -> &str {
            "Odometry"
        }
        fn kind(&self) -> ComponentKind {
            ComponentKind::Sensor
        }
        fn init(&mut self, _ctx: &mut InitContext<'_>) -> Result<(), RobotError> {
            Ok(())
        }
        fn update(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn stop(&mut self) -> Result<(), RobotError> {
            Ok(())
        }
        fn is_operational(&self) -> bool {
            true
        }
        fn telemetry(&self) -> Telemetry {
            Telemetry::new()
        }
        fn as_pose_source(&self) -> Option<&dyn PoseSource> {
            Some(self)
        }
    }

    impl PoseSource for FixedPose {
        fn position(&self) -> Pose {
            self.0
        }
    }

    fn params() -> SystemParams {
        SystemParams::from(&NavigationParams {
            drive: "Drive Train".into(),
            pose_source: "Odometry".into(),
        })
    }

    fn registry(pose: Pose) -> (ComponentRegistry, Commands) {
        let commands = Commands::default();
        let mut reg = ComponentRegistry::new();
        reg.insert(Box::new(MockDrive {
            commands: commands.clone(),
            operational: true,
        }))
        .unwrap();
        reg.insert(Box::new(FixedPose(pose))).unwrap();
        (reg, commands)
    }

    fn nav() -> NavigationSystem {
        let mut nav = NavigationSystem::new(NavigationConfig::default());
        nav.init(&params()).unwrap();
        nav
    }

    #[test]
    fn step_toward_target_ninety_degrees_off() {
        let (mut reg, commands) = registry(Pose::origin());
        let mut nav = nav();
        nav.set_course(0.0, 100.0, 0.0);
        nav.update(&mut reg).unwrap();

        let Some(NavigationStep::Drive {
            distance,
            bearing,
            heading_error,
            drive_power,
            rotation_power,
        }) = nav.last_step()
        else {
            panic!("expected a drive step");
        };
        assert!((distance - 100.0).abs() < 1e-9);
        assert!((bearing - 90.0).abs() < 1e-9);
        assert!((heading_error - 90.0).abs() < 1e-9);
        assert!((drive_power - 5.0).abs() < 1e-9);
        assert!((rotation_power - 0.9).abs() < 1e-9);

        let cmds = commands.borrow();
        assert_eq!(cmds.len(), 1);
        assert!((cmds[0].0 - 5.0).abs() < 1e-9);
        assert_eq!(cmds[0].1, 0.0);
        assert!((cmds[0].2 - 0.9).abs() < 1e-9);
        assert!(!nav.is_complete());
    }

    #[test]
    fn course_at_current_pose_completes_and_stops() {
        let (mut reg, commands) = registry(Pose::origin());
        let mut nav = nav();
        nav.set_course(0.0, 0.0, 0.0);
        nav.update(&mut reg).unwrap();
        assert!(nav.is_complete());
        assert_eq!(nav.status(), NavigationStatus::Arrived);
        assert_eq!(*commands.borrow(), vec![(0.0, 0.0, 0.0)]);

        // Complete courses no longer command the drive.
        nav.update(&mut reg).unwrap();
        assert_eq!(commands.borrow().len(), 1);
    }

    #[test]
    fn heading_must_also_match_to_arrive() {
        let course = NavigationCourse {
            target: Pose::new(0.0, 0.0, 90.0),
            gains: NavigationConfig::default().gains(),
            thresholds: NavigationConfig::default().thresholds(),
        };
        assert!(matches!(
            compute_step(Pose::origin(), &course),
            NavigationStep::Drive { .. }
        ));
        assert_eq!(
            compute_step(Pose::new(0.05, 0.0, 89.5), &course),
            NavigationStep::Arrived
        );
    }

    #[test]
    fn heading_error_wraps_across_180() {
        let course = NavigationCourse {
            target: Pose::new(-100.0, -1.0, 0.0),
            gains: NavigationConfig::default().gains(),
            thresholds: NavigationConfig::default().thresholds(),
        };
        let NavigationStep::Drive { heading_error, .. } =
            compute_step(Pose::new(0.0, 0.0, 170.0), &course)
        else {
            panic!("expected a drive step");
        };
        assert!(heading_error > -180.0 && heading_error <= 180.0);
        assert!(heading_error.abs() < 20.0);
    }

    #[test]
    fn starts_complete_and_inert() {
        let (mut reg, commands) = registry(Pose::new(500.0, 0.0, 0.0));
        let mut nav = nav();
        assert!(nav.is_complete());
        nav.update(&mut reg).unwrap();
        assert!(commands.borrow().is_empty());
        assert_eq!(nav.status(), NavigationStatus::Idle);
    }

    #[test]
    fn cancel_marks_complete() {
        let (mut reg, commands) = registry(Pose::origin());
        let mut nav = nav();
        nav.set_course(100.0, 0.0, 0.0);
        nav.stop(&mut reg).unwrap();
        assert!(nav.is_complete());
        nav.update(&mut reg).unwrap();
        assert!(commands.borrow().is_empty());
    }

    #[test]
    fn missing_pose_source_is_unavailable() {
        let commands = Commands::default();
        let mut reg = ComponentRegistry::new();
        reg.insert(Box::new(MockDrive {
            commands: commands.clone(),
            operational: true,
        }))
        .unwrap();
        let mut nav = nav();
        nav.set_course(100.0, 0.0, 0.0);
        nav.update(&mut reg).unwrap();
        assert_eq!(nav.status(), NavigationStatus::Unavailable);
        assert!(!nav.is_complete());
        assert!(commands.borrow().is_empty());
    }

    #[test]
    fn offline_drive_is_unavailable() {
        let commands = Commands::default();
        let mut reg = ComponentRegistry::new();
        reg.insert(Box::new(MockDrive {
            commands: commands.clone(),
            operational: false,
        }))
        .unwrap();
        reg.insert(Box::new(FixedPose(Pose::origin()))).unwrap();
        let mut nav = nav();
        nav.set_course(100.0, 0.0, 0.0);
        nav.update(&mut reg).unwrap();
        assert_eq!(nav.status(), NavigationStatus::Unavailable);
        assert!(commands.borrow().is_empty());
    }

    #[test]
    fn init_requires_both_names() {
        let mut nav = NavigationSystem::new(NavigationConfig::default());
        let err = nav
            .init(&SystemParams::new().with("drive", "Drive Train"))
            .unwrap_err();
        assert!(matches!(err, RobotError::InvalidParameter { ref name, .. } if name == "pose_source"));
    }

    #[test]
    fn init_rejects_negative_gains() {
        let mut nav = NavigationSystem::new(NavigationConfig {
            rotation_gain: -0.01,
            ..NavigationConfig::default()
        });
        let err = nav.init(&params()).unwrap_err();
        assert!(matches!(err, RobotError::InvalidParameter { ref name, .. } if name == "rotation_gain"));
    }

    #[test]
    fn telemetry_reports_last_step() {
        let (mut reg, _commands) = registry(Pose::origin());
        let mut nav = nav();
        nav.set_course(0.0, 100.0, 0.0);
        nav.update(&mut reg).unwrap();
        let t = nav.telemetry();
        assert_eq!(
            t.get("status"),
            Some(&TelemetryValue::Text("navigating".into()))
        );
        assert_eq!(t.get("complete"), Some(&TelemetryValue::Bool(false)));
        assert!(t.contains_key("distance"));
        assert!(t.contains_key("target.heading"));
    }
}
