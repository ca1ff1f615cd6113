//! Scripted autonomous routines.
//!
//! - [`SquarePath`] – a timed open-loop sequence (forward, pause, turn right,
//!   pause) repeated four times.  Runs as a [`System`] so the orchestrator
//!   drives it once per tick.
//! - [`CourseRunner`] – feeds a list of waypoints to the
//!   [`NavigationSystem`], advancing each time a course completes.

use std::time::{Duration, Instant};

use torque_hal::Clock;
use torque_kernel::{ComponentRegistry, System, SystemParams, Telemetry};
use torque_types::{Pose, RobotError};
use tracing::{debug, info, warn};

use crate::navigation::{NavigationStatus, NavigationSystem};

pub const SQUARE_PATH: &str = "Square Path";

// ────────────────────────────────────────────────────────────────────────────
// Square path
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquarePathTiming {
    pub forward: Duration,
    pub pause: Duration,
    pub turn: Duration,
    pub power: f64,
    pub sides: u32,
}

impl Default for SquarePathTiming {
    fn default() -> Self {
        Self {
            forward: Duration::from_secs(5),
            pause: Duration::from_millis(500),
            turn: Duration::from_secs(1),
            power: 0.5,
            sides: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Forward,
    Stop,
    TurnRight,
}

impl Segment {
    fn as_str(&self) -> &'static str {
        match self {
            Segment::Forward => "forward",
            Segment::Stop => "stop",
            Segment::TurnRight => "turn_right",
        }
    }
}

pub struct SquarePath {
    timing: SquarePathTiming,
    clock: Box<dyn Clock>,
    drive: Option<String>,
    plan: Vec<(Segment, Duration)>,
    started_at: Option<Instant>,
    current: Option<usize>,
    finished: bool,
}

impl SquarePath {
    pub fn new(timing: SquarePathTiming, clock: Box<dyn Clock>) -> Self {
        let mut plan = Vec::with_capacity(timing.sides as usize * 4);
        for _ in 0..timing.sides {
            plan.push((Segment::Forward, timing.forward));
            plan.push((Segment::Stop, timing.pause));
            plan.push((Segment::TurnRight, timing.turn));
            plan.push((Segment::Stop, timing.pause));
        }
        Self {
            timing,
            clock,
            drive: None,
            plan,
            started_at: None,
            current: None,
            finished: false,
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.plan.iter().map(|(_, d)| *d).sum()
    }

    /// Run the sequence again from the first segment.
    pub fn restart(&mut self) {
        self.started_at = None;
        self.current = None;
        self.finished = false;
    }

    /// Abandon the sequence without touching the drive.
    pub fn cancel(&mut self) {
        if !self.finished {
            info!("square path cancelled");
        }
        self.current = None;
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The segment commanded on the last update.
    pub fn current_segment(&self) -> Option<Segment> {
        self.current.map(|i| self.plan[i].0)
    }

    fn segment_at(&self, elapsed: Duration) -> Option<usize> {
        let mut end = Duration::ZERO;
        for (i, (_, d)) in self.plan.iter().enumerate() {
            end += *d;
            if elapsed < end {
                return Some(i);
            }
        }
        None
    }
}

impl System for SquarePath {
    fn name(&self) -> &str {
        SQUARE_PATH
    }

    fn init(&mut self, params: &SystemParams) -> Result<(), RobotError> {
        if !(0.0..=1.0).contains(&self.timing.power) {
            return Err(RobotError::InvalidParameter {
                name: "power".into(),
                details: format!("{} outside [0, 1]", self.timing.power),
            });
        }
        self.drive = Some(params.require("drive")?.to_string());
        info!(sides = self.timing.sides, total = ?self.total_duration(), "square path armed");
        Ok(())
    }

    fn update(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        if self.finished {
            return Ok(());
        }
        let Some(name) = self.drive.as_deref() else {
            return Ok(());
        };
        let drive = components.drive_base_mut(name).ok_or_else(|| {
            RobotError::NotOperational(format!("square path drive '{name}' is not registered"))
        })?;

        let now = self.clock.now();
        let started_at = *self.started_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started_at);

        let Some(index) = self.segment_at(elapsed) else {
            drive.stop_motors()?;
            self.finished = true;
            self.current = None;
            info!(elapsed = ?elapsed, "square path finished");
            return Ok(());
        };

        let segment = self.plan[index].0;
        if self.current != Some(index) {
            debug!(index, segment = segment.as_str(), "square path segment");
        }
        self.current = Some(index);
        match segment {
            Segment::Forward => drive.move_forward(self.timing.power),
            Segment::Stop => drive.stop_motors(),
            Segment::TurnRight => drive.turn_right(self.timing.power),
        }
    }

    fn stop(&mut self, _components: &mut ComponentRegistry) -> Result<(), RobotError> {
        self.finished = true;
        self.current = None;
        Ok(())
    }

    fn telemetry(&self) -> Telemetry {
        let mut t = Telemetry::new();
        t.insert("finished".into(), self.finished.into());
        t.insert(
            "segment".into(),
            self.current_segment().map_or("none", |s| s.as_str()).into(),
        );
        if let Some(i) = self.current {
            t.insert("side".into(), ((i / 4) as i64 + 1).into());
        }
        t
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Course runner
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseProgress {
    /// Driving toward waypoint `n` (zero-based).
    Waypoint(usize),
    Finished,
    /// Navigation stopped without arriving.
    Aborted,
}

/// Walks the navigation system through a list of waypoints.
///
/// ```rust
/// use torque_runtime::autonomous::{CourseProgress, CourseRunner};
/// use torque_runtime::navigation::{NavigationConfig, NavigationSystem};
/// use torque_types::Pose;
///
/// let mut nav = NavigationSystem::new(NavigationConfig::default());
/// let mut runner = CourseRunner::new(vec![Pose::new(100.0, 0.0, 0.0)]);
/// assert_eq!(runner.poll(&mut nav), CourseProgress::Waypoint(0));
/// assert!(!nav.is_complete());
/// ```
#[derive(Debug, Clone)]
pub struct CourseRunner {
    waypoints: Vec<Pose>,
    next: usize,
    progress: Option<CourseProgress>,
}

impl CourseRunner {
    pub fn new(waypoints: Vec<Pose>) -> Self {
        Self {
            waypoints,
            next: 0,
            progress: None,
        }
    }

    pub fn waypoints(&self) -> &[Pose] {
        &self.waypoints
    }

    /// Check `nav` and hand it the next waypoint once the current one is
    /// reached.  Call once per tick.
    pub fn poll(&mut self, nav: &mut NavigationSystem) -> CourseProgress {
        let progress = match self.progress {
            Some(CourseProgress::Finished) => CourseProgress::Finished,
            Some(CourseProgress::Aborted) => CourseProgress::Aborted,
            Some(CourseProgress::Waypoint(i)) if !nav.is_complete() => CourseProgress::Waypoint(i),
            Some(CourseProgress::Waypoint(i)) if nav.status() != NavigationStatus::Arrived => {
                warn!(waypoint = i, "navigation stopped before reaching waypoint");
                CourseProgress::Aborted
            }
            _ => self.advance(nav),
        };
        self.progress = Some(progress);
        progress
    }

    fn advance(&mut self, nav: &mut NavigationSystem) -> CourseProgress {
        let Some(target) = self.waypoints.get(self.next).copied() else {
            info!(waypoints = self.waypoints.len(), "course finished");
            return CourseProgress::Finished;
        };
        let index = self.next;
        self.next += 1;
        info!(waypoint = index, x = target.x(), y = target.y(), "heading to waypoint");
        nav.set_course(target.x(), target.y(), target.heading());
        CourseProgress::Waypoint(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationConfig;
    use std::cell::RefCell;
    use std::rc::Rc;
    use torque_hal::ManualClock;
    use torque_kernel::{Component, DriveBase, InitContext};
    use torque_types::{ComponentKind, GamepadState, TelemetryValue};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Cmd {
        Forward(f64),
        Right(f64),
        Stop,
        Other,
    }

    struct RecordingDrive(Rc<RefCell<Vec<Cmd>>>);

    impl Component for RecordingDrive {
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
            true
        }
        fn telemetry(&self) -> Telemetry {
            Telemetry::new()
        }
        fn as_drive_base_mut(&mut self) -> Option<&mut dyn DriveBase> {
            Some(self)
        }
    }

    impl DriveBase for RecordingDrive {
        fn drive_with_power(&mut self, _d: f64, _s: f64, _r: f64) -> Result<(), RobotError> {
            self.0.borrow_mut().push(Cmd::Other);
            Ok(())
        }
        fn move_forward(&mut self, p: f64) -> Result<(), RobotError> {
            self.0.borrow_mut().push(Cmd::Forward(p));
            Ok(())
        }
        fn move_backward(&mut self, _p: f64) -> Result<(), RobotError> {
            self.0.borrow_mut().push(Cmd::Other);
            Ok(())
        }
        fn turn_right(&mut self, p: f64) -> Result<(), RobotError> {
            self.0.borrow_mut().push(Cmd::Right(p));
            Ok(())
        }
        fn turn_left(&mut self, _p: f64) -> Result<(), RobotError> {
            self.0.borrow_mut().push(Cmd::Other);
            Ok(())
        }
        fn drive_with_gamepad(&mut self, _g: &GamepadState) -> Result<(), RobotError> {
            Ok(())
        }
        fn stop_motors(&mut self) -> Result<(), RobotError> {
            self.0.borrow_mut().push(Cmd::Stop);
            Ok(())
        }
    }

    fn square() -> (SquarePath, ManualClock, ComponentRegistry, Rc<RefCell<Vec<Cmd>>>) {
        let clock = ManualClock::new();
        let mut path = SquarePath::new(SquarePathTiming::default(), Box::new(clock.clone()));
        path.init(&SystemParams::new().with("drive", "Drive Train"))
            .unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut reg = ComponentRegistry::new();
        reg.insert(Box::new(RecordingDrive(log.clone()))).unwrap();
        (path, clock, reg, log)
    }

    #[test]
    fn square_path_plan_has_sixteen_segments() {
        let (path, ..) = square();
        assert_eq!(path.plan.len(), 16);
        assert_eq!(path.total_duration(), Duration::from_secs(28));
    }

    #[test]
    fn square_path_follows_timed_segments() {
        let (mut path, clock, mut reg, log) = square();
        let mut at = |ms: u64| {
            clock.advance(Duration::from_millis(ms));
            path.update(&mut reg).unwrap();
            path.current_segment()
        };
        assert_eq!(at(0), Some(Segment::Forward));
        assert_eq!(at(4_999), Some(Segment::Forward));
        assert_eq!(at(1), Some(Segment::Stop));
        assert_eq!(at(500), Some(Segment::TurnRight));
        assert_eq!(at(1_000), Some(Segment::Stop));
        assert_eq!(at(500), Some(Segment::Forward));
        drop(at);

        let cmds = log.borrow();
        assert_eq!(cmds[0], Cmd::Forward(0.5));
        assert_eq!(cmds[2], Cmd::Stop);
        assert_eq!(cmds[3], Cmd::Right(0.5));
    }

    #[test]
    fn square_path_stops_and_finishes() {
        let (mut path, clock, mut reg, log) = square();
        path.update(&mut reg).unwrap();
        clock.advance(Duration::from_secs(28));
        path.update(&mut reg).unwrap();
        assert!(path.is_finished());
        assert_eq!(log.borrow().last(), Some(&Cmd::Stop));

        let count = log.borrow().len();
        clock.advance(Duration::from_secs(1));
        path.update(&mut reg).unwrap();
        assert_eq!(log.borrow().len(), count);
        assert_eq!(
            path.telemetry().get("finished"),
            Some(&TelemetryValue::Bool(true))
        );

        path.restart();
        path.update(&mut reg).unwrap();
        assert_eq!(path.current_segment(), Some(Segment::Forward));
    }

    #[test]
    fn square_path_without_drive_errors() {
        let (mut path, _clock, ..) = square();
        let mut empty = ComponentRegistry::new();
        assert!(matches!(
            path.update(&mut empty),
            Err(RobotError::NotOperational(_))
        ));
    }

    #[test]
    fn square_path_requires_drive_param() {
        let mut path = SquarePath::new(SquarePathTiming::default(), Box::new(ManualClock::new()));
        assert!(path.init(&SystemParams::new()).is_err());
    }

    #[test]
    fn course_runner_advances_through_waypoints() {
        let mut nav = NavigationSystem::new(NavigationConfig::default());
        let mut runner = CourseRunner::new(vec![
            Pose::new(100.0, 0.0, 0.0),
            Pose::new(100.0, 100.0, 90.0),
        ]);
        assert_eq!(runner.poll(&mut nav), CourseProgress::Waypoint(0));
        assert_eq!(runner.poll(&mut nav), CourseProgress::Waypoint(0));
        assert_eq!(nav.course().map(|c| c.target.x()), Some(100.0));
        assert!(!nav.is_complete());
    }

    #[test]
    fn course_runner_aborts_when_navigation_is_cancelled() {
        let mut nav = NavigationSystem::new(NavigationConfig::default());
        let mut runner = CourseRunner::new(vec![Pose::new(100.0, 0.0, 0.0)]);
        runner.poll(&mut nav);
        nav.cancel();
        assert_eq!(runner.poll(&mut nav), CourseProgress::Aborted);
        assert_eq!(runner.poll(&mut nav), CourseProgress::Aborted);
    }

    #[test]
    fn empty_course_finishes_immediately() {
        let mut nav = NavigationSystem::new(NavigationConfig::default());
        let mut runner = CourseRunner::new(Vec::new());
        assert_eq!(runner.poll(&mut nav), CourseProgress::Finished);
        assert!(nav.is_complete());
    }
}
