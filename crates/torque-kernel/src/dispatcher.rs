//! [`BindingTable`] – button → action bindings and the per-tick dispatch pass.
//!
//! Each tick the orchestrator calls [`BindingTable::dispatch`], which walks
//! the twenty logical buttons in [`ButtonId::all`] order and drives the bound
//! action according to its kind:
//!
//! | Kind | Button held | Button released |
//! |---|---|---|
//! | `Continuous` | `start()` if Ready, then `update()` if Running | nothing |
//! | `Momentary`  | `start()` if Ready, else `update()` if Running | `end()` if Running |
//!
//! Unbound buttons, non-operational actions and `Failed` actions are skipped.
//! Action errors are logged and collected; they never stop the pass.
//!
//! # Example
//!
//! ```rust
//! use torque_kernel::action::{ActionBehavior, MomentaryAction};
//! use torque_kernel::{BindingTable, ComponentRegistry, TelemetryBatch};
//! use torque_types::{Button, ButtonId, GamepadId, Gamepads, RobotError};
//!
//! struct Noop;
//! impl ActionBehavior for Noop {
//!     fn on_start(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> { Ok(()) }
//!     fn on_update(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> { Ok(()) }
//!     fn on_end(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> { Ok(()) }
//! }
//!
//! let mut table = BindingTable::new();
//! table.bind("gamepad1_a", Box::new(MomentaryAction::new("noop", "", Noop))).unwrap();
//! assert!(table.bind("gamepad3_a", Box::new(MomentaryAction::new("noop", "", Noop))).is_err());
//!
//! let a = ButtonId::new(GamepadId::One, Button::A);
//! let mut components = ComponentRegistry::new();
//! let mut batch = TelemetryBatch::new(0);
//! let errors = table.dispatch(&Gamepads::with_pressed(&[a]), &mut components, &mut batch);
//! assert!(errors.is_empty());
//! ```

use std::collections::HashMap;

use torque_types::{ActionKind, ActionState, ButtonId, Gamepads, RobotError};
use tracing::{debug, info, warn};

use crate::action::Action;
use crate::registry::ComponentRegistry;
use crate::telemetry::TelemetryBatch;

/// At most one action per logical button.
#[derive(Default)]
pub struct BindingTable {
    bindings: HashMap<ButtonId, Box<dyn Action>>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `action` to the button spelled `button` (e.g. `"gamepad2_x"`).
    ///
    /// # Errors
    ///
    /// [`RobotError::InvalidBinding`] for an empty or unknown identifier.
    pub fn bind(&mut self, button: &str, action: Box<dyn Action>) -> Result<(), RobotError> {
        let id: ButtonId = button.parse()?;
        self.bind_button(id, action);
        Ok(())
    }

    /// Bind `action` to `id`, returning whatever was bound there before.
    pub fn bind_button(&mut self, id: ButtonId, action: Box<dyn Action>) -> Option<Box<dyn Action>> {
        info!(button = %id, action = action.name(), "action bound");
        self.bindings.insert(id, action)
    }

    pub fn unbind(&mut self, id: ButtonId) -> Option<Box<dyn Action>> {
        self.bindings.remove(&id)
    }

    pub fn get(&self, id: ButtonId) -> Option<&dyn Action> {
        self.bindings.get(&id).map(|a| a.as_ref())
    }

    pub fn get_mut(&mut self, id: ButtonId) -> Option<&mut dyn Action> {
        match self.bindings.get_mut(&id) {
            Some(action) => Some(action.as_mut()),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// One dispatch pass.  Returns every action error raised during it.
    pub fn dispatch(
        &mut self,
        gamepads: &Gamepads,
        components: &mut ComponentRegistry,
        telemetry: &mut TelemetryBatch,
    ) -> Vec<RobotError> {
        let mut errors = Vec::new();

        for id in ButtonId::all() {
            let Some(action) = self.bindings.get_mut(&id) else {
                continue;
            };
            if !action.is_operational() || action.state() == ActionState::Failed {
                continue;
            }

            let pressed = gamepads.is_pressed(id);
            if let Err(e) = drive_action(action.as_mut(), pressed, components) {
                warn!(
                    button = %id,
                    action = action.name(),
                    error = %e,
                    cause = ?action.last_error(),
                    "action execution failed"
                );
                errors.push(e);
            }
            telemetry.add(format!("actions.{id}"), action.state().as_str());
        }

        errors
    }
}

fn drive_action(
    action: &mut dyn Action,
    pressed: bool,
    components: &mut ComponentRegistry,
) -> Result<(), RobotError> {
    match action.kind() {
        ActionKind::Continuous => {
            if pressed && action.state() == ActionState::Ready {
                debug!(action = action.name(), "starting continuous action");
                action.start(components)?;
            }
            if pressed && action.state() == ActionState::Running {
                action.update(components)?;
            }
        }
        ActionKind::Momentary => {
            if pressed {
                match action.state() {
                    ActionState::Ready => {
                        debug!(action = action.name(), "starting momentary action");
                        action.start(components)?;
                    }
                    ActionState::Running => action.update(components)?,
                    _ => {}
                }
            } else if action.state() == ActionState::Running {
                debug!(action = action.name(), "button released, ending momentary action");
                action.end(components)?;
            }
        }
    }
    Ok(())
}
