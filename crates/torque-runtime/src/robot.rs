//! [`Robot`] – assembles the standard mecanum robot on an [`Orchestrator`].
//!
//! | Name | Part | Criticality |
//! |---|---|---|
//! | `"Drive Train"` | [`DriveTrain`] | critical |
//! | `"Odometry"` | [`OdometryComponent`] | optional |
//! | `"Navigation"` | [`NavigationSystem`] | system |
//! | `"Square Path"` | [`SquarePath`] | system, registered on first use |
//!
//! Holding `gamepad1_b` engages brake mode on the drive train.
//!
//! # Example
//!
//! ```rust
//! use torque_hal::{ManualClock, SimHardware, SimPlant, SimPlantConfig};
//! use torque_kernel::MemorySink;
//! use torque_runtime::robot::{Robot, RobotSettings};
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
//! let robot = Robot::build(
//!     RobotSettings::default(),
//!     &mut map,
//!     ManualClock::new(),
//!     Box::new(MemorySink::new()),
//! )
//! .unwrap();
//! assert!(robot.orchestrator().is_operational());
//! ```

use serde::{Deserialize, Serialize};
use torque_hal::{Clock, HardwareMap};
use torque_kernel::{
    ActionBehavior, ComponentRegistry, ControlMode, Criticality, MomentaryAction, Orchestrator,
    Registration, SystemParams, TelemetrySink, TickReport,
};
use torque_types::{Gamepads, Pose, RobotError};
use tracing::info;

use crate::autonomous::{SQUARE_PATH, SquarePath, SquarePathTiming};
use crate::drive_train::{DRIVE_TRAIN, DriveTrain, DriveTrainConfig};
use crate::navigation::{NAVIGATION, NavigationConfig, NavigationParams, NavigationSystem};
use crate::odometry::{ODOMETRY, OdometryComponent};

pub const BRAKE_BUTTON: &str = "gamepad1_b";

/// Everything needed to assemble a robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSettings {
    #[serde(default)]
    pub drive: DriveTrainConfig,
    #[serde(default = "default_odometry_device")]
    pub odometry_device: String,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

fn default_odometry_device() -> String {
    "odo".to_string()
}

impl Default for RobotSettings {
    fn default() -> Self {
        Self {
            drive: DriveTrainConfig::default(),
            odometry_device: default_odometry_device(),
            navigation: NavigationConfig::default(),
        }
    }
}

pub struct Robot {
    orchestrator: Orchestrator,
    clock: Box<dyn Fn() -> Box<dyn Clock>>,
}

impl Robot {
    /// Register every part, bind the default actions and complete startup.
    ///
    /// A missing odometry device degrades the robot (navigation reports
    /// itself unavailable) but does not fail the build.
    ///
    /// # Errors
    ///
    /// - [`RobotError::Initialization`] when the drive train cannot start.
    /// - [`RobotError::InvalidParameter`] for an invalid navigation config.
    pub fn build<C>(
        settings: RobotSettings,
        hardware: &mut HardwareMap,
        clock: C,
        sink: Box<dyn TelemetrySink>,
    ) -> Result<Self, RobotError>
    where
        C: Clock + Clone + 'static,
    {
        let mut orchestrator = Orchestrator::new(sink);

        orchestrator.register(
            Box::new(DriveTrain::new(settings.drive, Box::new(clock.clone()))),
            Criticality::Critical,
            hardware,
        )?;
        orchestrator.register(
            Box::new(OdometryComponent::new(
                settings.odometry_device,
                Box::new(clock.clone()),
            )),
            Criticality::Optional,
            hardware,
        )?;

        let params = NavigationParams {
            drive: DRIVE_TRAIN.to_string(),
            pose_source: ODOMETRY.to_string(),
        };
        if let Registration::Degraded(e) = orchestrator.register_system(
            Box::new(NavigationSystem::new(settings.navigation)),
            &SystemParams::from(&params),
        ) {
            return Err(e);
        }

        orchestrator.bind(
            BRAKE_BUTTON,
            Box::new(MomentaryAction::new(
                "brake",
                "brake the drive train while held",
                BrakeWhileHeld,
            )),
        )?;

        orchestrator.complete_startup()?;
        Ok(Self {
            orchestrator,
            clock: Box::new(move || Box::new(clock.clone()) as Box<dyn Clock>),
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn orchestrator_mut(&mut self) -> &mut Orchestrator {
        &mut self.orchestrator
    }

    /// Run one control tick.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::tick`].
    pub fn tick(&mut self, gamepads: &Gamepads) -> Result<TickReport, RobotError> {
        self.orchestrator.tick(gamepads)
    }

    pub fn navigation(&self) -> Option<&NavigationSystem> {
        self.orchestrator.system::<NavigationSystem>(NAVIGATION)
    }

    pub fn navigation_mut(&mut self) -> Option<&mut NavigationSystem> {
        self.orchestrator.system_mut::<NavigationSystem>(NAVIGATION)
    }

    pub fn square_path(&self) -> Option<&SquarePath> {
        self.orchestrator.system::<SquarePath>(SQUARE_PATH)
    }

    /// Drive to `(x, y, heading)` and switch to autonomous control.
    /// A running square path is cancelled.
    ///
    /// # Errors
    ///
    /// [`RobotError::NotOperational`] when navigation is not registered.
    pub fn set_course(&mut self, x: f64, y: f64, heading: f64) -> Result<(), RobotError> {
        let nav = self
            .navigation_mut()
            .ok_or_else(|| RobotError::NotOperational(format!("{NAVIGATION} is not available")))?;
        nav.set_course(x, y, heading);
        if let Some(path) = self.orchestrator.system_mut::<SquarePath>(SQUARE_PATH) {
            path.cancel();
        }
        self.orchestrator.set_mode(ControlMode::Autonomous);
        Ok(())
    }

    /// Start (or restart) the timed square routine in autonomous mode.
    /// Any navigation course is cancelled first.
    ///
    /// # Errors
    ///
    /// The routine's initialization error if it cannot be registered.
    pub fn start_square_path(&mut self, timing: SquarePathTiming) -> Result<(), RobotError> {
        if let Some(nav) = self.navigation_mut() {
            nav.cancel();
        }
        if let Some(path) = self.orchestrator.system_mut::<SquarePath>(SQUARE_PATH) {
            path.restart();
        } else {
            let path = SquarePath::new(timing, (self.clock)());
            let params = SystemParams::new().with("drive", DRIVE_TRAIN);
            if let Registration::Degraded(e) =
                self.orchestrator.register_system(Box::new(path), &params)
            {
                return Err(e);
            }
        }
        self.orchestrator.set_mode(ControlMode::Autonomous);
        info!("square path started");
        Ok(())
    }

    /// Current pose, or the origin when odometry is unavailable.
    pub fn pose(&self) -> Pose {
        self.orchestrator
            .components()
            .pose_source(ODOMETRY)
            .map(|s| s.position())
            .unwrap_or_else(Pose::origin)
    }

    pub fn drive_train(&self) -> Option<&DriveTrain> {
        self.orchestrator.component::<DriveTrain>(DRIVE_TRAIN)
    }

    pub fn emergency_stop(&mut self, reason: &str) -> RobotError {
        self.orchestrator.emergency_stop(reason)
    }

    pub fn shutdown(&mut self) {
        self.orchestrator.shutdown();
    }
}

/// Brake mode on press, float on release.
struct BrakeWhileHeld;

impl BrakeWhileHeld {
    fn set(components: &mut ComponentRegistry, enabled: bool) -> Result<(), RobotError> {
        components
            .get_as_mut::<DriveTrain>(DRIVE_TRAIN)
            .ok_or_else(|| RobotError::NotOperational(format!("{DRIVE_TRAIN} is not registered")))?
            .enable_brake_mode(enabled)
    }
}

impl ActionBehavior for BrakeWhileHeld {
    fn on_start(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        Self::set(components, true)
    }

    fn on_update(&mut self, _components: &mut ComponentRegistry) -> Result<(), RobotError> {
        Ok(())
    }

    fn on_end(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        Self::set(components, false)
    }
}
