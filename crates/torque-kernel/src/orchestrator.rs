//! [`Orchestrator`] – startup, the per-tick pass, and emergency stop.
//!
//! # Lifecycle
//!
//! ```text
//! Starting ──complete_startup()──▶ Operational ──fatal drive-stage error──▶ EmergencyStopped
//!    │                                  │
//!    └─critical init failed──▶ StartupFailed      └──shutdown()──▶ Shutdown
//! ```
//!
//! # Tick
//!
//! 1. refuse unless [`Orchestrator::is_operational`];
//! 2. update every operational component in registration order, isolating
//!    failures, and collect each one's telemetry under its name;
//! 3. run the action dispatcher;
//! 4. drive stage: update every system, then in [`ControlMode::Teleop`] send
//!    gamepad 1 to the drive component.  Any failure here is an emergency stop;
//! 5. publish the telemetry batch.
//!
//! # Example
//!
//! ```rust
//! use torque_kernel::{Orchestrator, MemorySink};
//! use torque_types::{Gamepads, RobotError};
//!
//! let mut orchestrator = Orchestrator::new(Box::new(MemorySink::new()));
//! // No drive component was registered, so startup is refused.
//! assert!(orchestrator.complete_startup().is_err());
//! assert!(matches!(
//!     orchestrator.tick(&Gamepads::default()),
//!     Err(RobotError::NotOperational(_))
//! ));
//! ```

use serde::Serialize;
use torque_hal::HardwareMap;
use torque_types::{ComponentKind, Gamepads, RobotError};
use tracing::{debug, error, info, warn};

use crate::action::Action;
use crate::component::{Component, InitContext, System, SystemParams};
use crate::dispatcher::BindingTable;
use crate::registry::ComponentRegistry;
use crate::telemetry::{TelemetryBatch, TelemetrySink};

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Whether a component's initialization failure aborts startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    Critical,
    Optional,
}

/// Outcome of a registration that did not abort startup.
#[derive(Debug, Clone, PartialEq)]
pub enum Registration {
    Registered,
    /// Initialization failed; the robot continues without this entry.
    Degraded(RobotError),
}

/// Who commands the drive base during the drive stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ControlMode {
    /// Gamepad 1 drives after systems have run.
    #[default]
    Teleop,
    /// Only systems (navigation, routines) command the drive.
    Autonomous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleState {
    Starting,
    Operational,
    StartupFailed,
    EmergencyStopped,
    Shutdown,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Starting => "starting",
            LifecycleState::Operational => "operational",
            LifecycleState::StartupFailed => "startup_failed",
            LifecycleState::EmergencyStopped => "emergency_stopped",
            LifecycleState::Shutdown => "shutdown",
        }
    }
}

/// What happened during one successful tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub component_failures: Vec<RobotError>,
    pub action_failures: Vec<RobotError>,
    pub telemetry_entries: usize,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.component_failures.is_empty() && self.action_failures.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Owns every component, system and binding of one robot session.
pub struct Orchestrator {
    components: ComponentRegistry,
    systems: Vec<Box<dyn System>>,
    bindings: BindingTable,
    sink: Box<dyn TelemetrySink>,
    batch: TelemetryBatch,
    state: LifecycleState,
    startup_failed: bool,
    drive: Option<String>,
    mode: ControlMode,
    tick: u64,
}

impl Orchestrator {
    pub fn new(sink: Box<dyn TelemetrySink>) -> Self {
        Self {
            components: ComponentRegistry::new(),
            systems: Vec::new(),
            bindings: BindingTable::new(),
            sink,
            batch: TelemetryBatch::new(1),
            state: LifecycleState::Starting,
            startup_failed: false,
            drive: None,
            mode: ControlMode::default(),
            tick: 0,
        }
    }

    // ── Startup ─────────────────────────────────────────────────────────────

    /// Initialize `component` and, on success, take ownership of it.
    ///
    /// The first critical [`ComponentKind::Drive`] component becomes the
    /// drive base that gamepad commands and the operational check refer to.
    ///
    /// # Errors
    ///
    /// [`RobotError::Initialization`] when a critical component fails;
    /// startup can then no longer complete.  Optional failures are returned
    /// as `Ok(Registration::Degraded(..))`.
    pub fn register(
        &mut self,
        mut component: Box<dyn Component>,
        criticality: Criticality,
        hardware: &mut HardwareMap,
    ) -> Result<Registration, RobotError> {
        let name = component.name().to_string();
        if self.state != LifecycleState::Starting {
            return Err(RobotError::initialization(
                &name,
                format!("registration closed (orchestrator is {})", self.state.as_str()),
            ));
        }

        let outcome = {
            let mut ctx = InitContext::new(hardware, &mut self.batch);
            component.init(&mut ctx)
        };
        let kind = component.kind();
        let outcome = outcome.and_then(|()| self.components.insert(component));

        match (outcome, criticality) {
            (Ok(()), _) => {
                if criticality == Criticality::Critical
                    && kind == ComponentKind::Drive
                    && self.drive.is_none()
                {
                    self.drive = Some(name.clone());
                }
                info!(component = %name, ?kind, ?criticality, "component registered");
                Ok(Registration::Registered)
            }
            (Err(e), Criticality::Critical) => {
                error!(component = %name, error = %e, "critical component failed to initialize");
                self.startup_failed = true;
                Err(match e {
                    RobotError::Initialization { .. } => e,
                    other => RobotError::initialization(&name, other.to_string()),
                })
            }
            (Err(e), Criticality::Optional) => {
                warn!(component = %name, error = %e, "optional component unavailable, continuing degraded");
                Ok(Registration::Degraded(e))
            }
        }
    }

    /// Initialize `system` with `params` and, on success, take ownership.
    /// Failures degrade like optional components.
    pub fn register_system(
        &mut self,
        mut system: Box<dyn System>,
        params: &SystemParams,
    ) -> Registration {
        match system.init(params) {
            Ok(()) => {
                info!(system = system.name(), "system registered");
                self.systems.push(system);
                Registration::Registered
            }
            Err(e) => {
                warn!(system = system.name(), error = %e, "system unavailable, continuing degraded");
                Registration::Degraded(e)
            }
        }
    }

    /// Leave `Starting`.
    ///
    /// # Errors
    ///
    /// [`RobotError::Initialization`] if a critical component failed or no
    /// critical drive component was registered.
    pub fn complete_startup(&mut self) -> Result<(), RobotError> {
        if self.state != LifecycleState::Starting {
            return Err(RobotError::initialization(
                "orchestrator",
                format!("startup already finished ({})", self.state.as_str()),
            ));
        }
        let failure = if self.startup_failed {
            Some("a critical component failed to initialize")
        } else if self.drive.is_none() {
            Some("no critical drive component registered")
        } else {
            None
        };
        if let Some(details) = failure {
            self.state = LifecycleState::StartupFailed;
            error!(details, "startup failed");
            return Err(RobotError::initialization("orchestrator", details));
        }

        self.state = LifecycleState::Operational;
        info!(
            components = self.components.len(),
            systems = self.systems.len(),
            bindings = self.bindings.len(),
            "robot operational"
        );
        Ok(())
    }

    // ── Tick ────────────────────────────────────────────────────────────────

    /// Run one control tick.
    ///
    /// # Errors
    ///
    /// - [`RobotError::NotOperational`] when the robot is not operational.
    /// - [`RobotError::EmergencyStop`] when the drive stage failed; the
    ///   orchestrator is then stopped for good.
    pub fn tick(&mut self, gamepads: &Gamepads) -> Result<TickReport, RobotError> {
        if !self.is_operational() {
            return Err(RobotError::NotOperational(format!(
                "tick refused, orchestrator is {}",
                self.state.as_str()
            )));
        }
        self.tick += 1;
        self.batch.tick = self.tick;

        let mut report = TickReport {
            tick: self.tick,
            ..TickReport::default()
        };

        for component in self.components.iter_mut() {
            if component.is_operational() {
                if let Err(e) = component.update() {
                    warn!(component = component.name(), error = %e, "component update failed");
                    report.component_failures.push(RobotError::ComponentUpdate {
                        component: component.name().to_string(),
                        details: e.to_string(),
                    });
                }
            }
            self.batch.add_prefixed(component.name(), component.telemetry());
        }

        report.action_failures = self
            .bindings
            .dispatch(gamepads, &mut self.components, &mut self.batch);

        if let Err(e) = self.drive_stage(gamepads) {
            return Err(self.emergency_stop(&e.to_string()));
        }

        self.batch.add("orchestrator.tick", self.tick as i64);
        self.batch.add("orchestrator.state", self.state.as_str());
        report.telemetry_entries = self.batch.len();
        self.publish();
        debug!(tick = self.tick, clean = report.is_clean(), "tick complete");
        Ok(report)
    }

    fn drive_stage(&mut self, gamepads: &Gamepads) -> Result<(), RobotError> {
        for system in self.systems.iter_mut() {
            system.update(&mut self.components)?;
            self.batch.add_prefixed(system.name(), system.telemetry());
        }

        let drive_name = self.drive.as_deref().unwrap_or_default();
        if self.mode == ControlMode::Teleop {
            let drive = self.components.drive_base_mut(drive_name).ok_or_else(|| {
                RobotError::NotOperational(format!("'{drive_name}' has no drive capability"))
            })?;
            drive.drive_with_gamepad(&gamepads.gamepad1)?;
        }

        if !self.drive_operational() {
            return Err(RobotError::hardware(
                drive_name,
                "drive component is no longer operational",
            ));
        }
        Ok(())
    }

    fn publish(&mut self) {
        self.sink.publish(&self.batch);
        self.batch = TelemetryBatch::new(self.tick + 1);
    }

    // ── Stopping ────────────────────────────────────────────────────────────

    /// Stop everything and refuse all further ticks.  Returns the error that
    /// describes the stop so callers can propagate it.
    pub fn emergency_stop(&mut self, reason: &str) -> RobotError {
        if self.state != LifecycleState::EmergencyStopped {
            error!(reason, tick = self.tick, "EMERGENCY STOP");
            self.stop_all();
            self.state = LifecycleState::EmergencyStopped;
            self.batch.add("orchestrator.state", self.state.as_str());
            self.batch.add("orchestrator.emergency_stop", reason);
            self.publish();
        }
        RobotError::EmergencyStop(reason.to_string())
    }

    /// Orderly stop: systems first, then components in registration order.
    pub fn shutdown(&mut self) {
        if matches!(
            self.state,
            LifecycleState::Shutdown | LifecycleState::EmergencyStopped
        ) {
            return;
        }
        self.stop_all();
        self.state = LifecycleState::Shutdown;
        info!(ticks = self.tick, "robot shut down");
    }

    fn stop_all(&mut self) {
        for system in self.systems.iter_mut() {
            if let Err(e) = system.stop(&mut self.components) {
                warn!(system = system.name(), error = %e, "system stop failed");
            }
        }
        for component in self.components.iter_mut() {
            if let Err(e) = component.stop() {
                warn!(component = component.name(), error = %e, "component stop failed");
            }
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Startup completed, not stopped, and the drive component is present
    /// and operational.
    pub fn is_operational(&self) -> bool {
        self.state == LifecycleState::Operational && self.drive_operational()
    }

    fn drive_operational(&self) -> bool {
        self.drive
            .as_deref()
            .and_then(|name| self.components.get(name))
            .is_some_and(|c| c.is_operational())
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ControlMode) {
        info!(?mode, "control mode changed");
        self.mode = mode;
    }

    pub fn drive_name(&self) -> Option<&str> {
        self.drive.as_deref()
    }

    pub fn component<T: Component>(&self, name: &str) -> Option<&T> {
        self.components.get_as::<T>(name)
    }

    pub fn component_mut<T: Component>(&mut self, name: &str) -> Option<&mut T> {
        self.components.get_as_mut::<T>(name)
    }

    pub fn system<T: System>(&self, name: &str) -> Option<&T> {
        self.systems
            .iter()
            .find(|s| s.name() == name)
            .and_then(|s| s.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn system_mut<T: System>(&mut self, name: &str) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find(|s| s.name() == name)
            .and_then(|s| s.as_mut().as_any_mut().downcast_mut::<T>())
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    /// Bind an action to a button spelled like `"gamepad1_a"`.
    ///
    /// # Errors
    ///
    /// [`RobotError::InvalidBinding`] for an empty or unknown identifier.
    pub fn bind(&mut self, button: &str, action: Box<dyn Action>) -> Result<(), RobotError> {
        self.bindings.bind(button, action)
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingTable {
        &mut self.bindings
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
