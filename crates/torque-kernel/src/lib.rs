//! `torque-kernel` – Orchestration & Operator Input
//!
//! Owns the robot's components for one session, runs the control tick, and
//! turns gamepad buttons into action state transitions.  It does not know
//! what a drive train or a navigation controller is; it only knows the
//! capability traits those implement.
//!
//! # Modules
//!
//! - [`component`] – [`Component`][component::Component],
//!   [`System`][component::System] and the [`DriveBase`][component::DriveBase] /
//!   [`PoseSource`][component::PoseSource] views systems use to command them.
//! - [`registry`] – [`ComponentRegistry`][registry::ComponentRegistry]:
//!   registration-ordered, typed lookup by name.
//! - [`orchestrator`] – [`Orchestrator`][orchestrator::Orchestrator]: startup
//!   with critical/optional failure handling, the per-tick pass, emergency stop.
//! - [`action`] – [`ContinuousAction`][action::ContinuousAction] and
//!   [`MomentaryAction`][action::MomentaryAction] state machines.
//! - [`dispatcher`] – [`BindingTable`][dispatcher::BindingTable]: button
//!   bindings and the per-tick dispatch pass.
//! - [`telemetry`] – [`TelemetryBatch`][telemetry::TelemetryBatch] and the
//!   [`TelemetrySink`][telemetry::TelemetrySink] it is published to.

pub mod action;
pub mod component;
pub mod dispatcher;
pub mod orchestrator;
pub mod registry;
pub mod telemetry;

pub use action::{Action, ActionBehavior, ContinuousAction, MomentaryAction};
pub use component::{
    AsAny, Component, DriveBase, InitContext, PoseSource, System, SystemParams, Telemetry,
};
pub use dispatcher::BindingTable;
pub use orchestrator::{
    ControlMode, Criticality, LifecycleState, Orchestrator, Registration, TickReport,
};
pub use registry::ComponentRegistry;
pub use telemetry::{LogSink, MemorySink, TelemetryBatch, TelemetrySink};
