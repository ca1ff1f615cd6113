//! Operator actions and their state machines.
//!
//! An action's *behavior* ([`ActionBehavior`]) supplies the hooks; the
//! wrapper type fixes the [`ActionKind`] and owns the transitions:
//!
//! | Wrapper | Kind | Runs until |
//! |---|---|---|
//! | [`ContinuousAction`] | `Continuous` | its completion predicate holds, or `end()` |
//! | [`MomentaryAction`]  | `Momentary`  | the button is released |
//!
//! Transitions are driven by hook return values.  A failing hook moves the
//! action to `Failed`, stores the hook's error in [`Action::last_error`], runs
//! cleanup, and returns a [`RobotError::ActionExecution`] to the caller.
//!
//! # Example
//!
//! ```rust
//! use torque_kernel::action::{Action, ActionBehavior, ContinuousAction};
//! use torque_kernel::ComponentRegistry;
//! use torque_types::{ActionState, RobotError};
//!
//! struct Count(u32);
//!
//! impl ActionBehavior for Count {
//!     fn on_start(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> { Ok(()) }
//!     fn on_update(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> {
//!         self.0 += 1;
//!         Ok(())
//!     }
//!     fn on_end(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> { Ok(()) }
//!     fn is_complete(&self) -> bool { self.0 >= 2 }
//! }
//!
//! let mut components = ComponentRegistry::new();
//! let mut action = ContinuousAction::new("count", "counts to two", Count(0));
//! action.start(&mut components).unwrap();
//! action.update(&mut components).unwrap();
//! assert_eq!(action.state(), ActionState::Running);
//! action.update(&mut components).unwrap();
//! assert_eq!(action.state(), ActionState::Completed);
//! ```

use torque_types::{ActionKind, ActionState, RobotError};
use tracing::warn;

use crate::registry::ComponentRegistry;

/// Action-specific hooks.  Each receives the registry so it can command
/// components.
pub trait ActionBehavior {
    fn on_start(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    fn on_update(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    /// Cleanup; runs on completion, cancellation, release and failure.
    fn on_end(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    /// Completion predicate.  Only consulted by [`ContinuousAction`].
    fn is_complete(&self) -> bool {
        false
    }
}

/// The capability the dispatcher drives.
pub trait Action {
    fn kind(&self) -> ActionKind;

    fn state(&self) -> ActionState;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// # Errors
    ///
    /// [`RobotError::ActionExecution`] when the start hook fails.
    fn start(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    /// # Errors
    ///
    /// [`RobotError::ActionExecution`] when the update (or completion
    /// cleanup) hook fails.
    fn update(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    /// # Errors
    ///
    /// [`RobotError::ActionExecution`] when the end hook fails.
    fn end(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError>;

    fn is_complete(&self) -> bool;

    fn is_operational(&self) -> bool;

    fn set_operational(&mut self, operational: bool);

    /// The error the most recent failing hook returned.
    fn last_error(&self) -> Option<&RobotError>;

    /// Re-arm: back to `Ready` with no recorded error.
    fn reset(&mut self);
}

// ────────────────────────────────────────────────────────────────────────────
// Shared bookkeeping
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct ActionCore {
    name: String,
    description: String,
    state: ActionState,
    operational: bool,
    last_error: Option<RobotError>,
}

impl ActionCore {
    fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            state: ActionState::Ready,
            operational: true,
            last_error: None,
        }
    }

    fn can_start(&self) -> bool {
        self.state == ActionState::Ready && self.operational
    }

    fn can_update(&self) -> bool {
        self.state == ActionState::Running && self.operational
    }

    /// Record `err` as the action's failure and wrap it for the caller.
    fn fail(&mut self, err: RobotError) -> RobotError {
        self.state = ActionState::Failed;
        self.record(err)
    }

    /// Keep `err` in `last_error` without touching the state.
    fn record(&mut self, err: RobotError) -> RobotError {
        let wrapped = RobotError::ActionExecution {
            action: self.name.clone(),
            details: err.to_string(),
        };
        self.last_error = Some(err);
        wrapped
    }

    fn reset(&mut self) {
        self.state = ActionState::Ready;
        self.last_error = None;
    }
}

/// Run the cleanup hook after a failure.  A second failure is logged; the
/// first error stays the recorded one.
fn cleanup_after_failure<B: ActionBehavior>(
    core: &ActionCore,
    behavior: &mut B,
    components: &mut ComponentRegistry,
) {
    if let Err(e) = behavior.on_end(components) {
        warn!(action = %core.name, error = %e, "cleanup after failure also failed");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Continuous
// ────────────────────────────────────────────────────────────────────────────

/// Runs to self-determined completion once started.
pub struct ContinuousAction<B> {
    core: ActionCore,
    behavior: B,
}

impl<B: ActionBehavior> ContinuousAction<B> {
    pub fn new(name: impl Into<String>, description: impl Into<String>, behavior: B) -> Self {
        Self {
            core: ActionCore::new(name, description),
            behavior,
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// `end()` without the error wrapping, shared by completion and failure
    /// paths.
    fn finish(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        if self.core.state == ActionState::Running {
            self.core.state = ActionState::Cancelled;
        }
        self.behavior.on_end(components).map_err(|e| self.core.fail(e))
    }
}

impl<B: ActionBehavior> Action for ContinuousAction<B> {
    fn kind(&self) -> ActionKind {
        ActionKind::Continuous
    }

    fn state(&self) -> ActionState {
        self.core.state
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn description(&self) -> &str {
        &self.core.description
    }

    fn start(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        if !self.core.can_start() {
            return Ok(());
        }
        self.core.state = ActionState::Running;
        if let Err(e) = self.behavior.on_start(components) {
            let wrapped = self.core.fail(e);
            cleanup_after_failure(&self.core, &mut self.behavior, components);
            return Err(wrapped);
        }
        Ok(())
    }

    fn update(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        if !self.core.can_update() {
            return Ok(());
        }
        if let Err(e) = self.behavior.on_update(components) {
            let wrapped = self.core.fail(e);
            cleanup_after_failure(&self.core, &mut self.behavior, components);
            return Err(wrapped);
        }
        if self.behavior.is_complete() {
            self.core.state = ActionState::Completed;
            self.finish(components)?;
        }
        Ok(())
    }

    fn end(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        self.finish(components)
    }

    fn is_complete(&self) -> bool {
        self.behavior.is_complete()
    }

    fn is_operational(&self) -> bool {
        self.core.operational
    }

    fn set_operational(&mut self, operational: bool) {
        self.core.operational = operational;
    }

    fn last_error(&self) -> Option<&RobotError> {
        self.core.last_error.as_ref()
    }

    fn reset(&mut self) {
        self.core.reset();
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Momentary
// ────────────────────────────────────────────────────────────────────────────

/// Runs only while its button is held; re-armed by every `end()`.
pub struct MomentaryAction<B> {
    core: ActionCore,
    behavior: B,
}

impl<B: ActionBehavior> MomentaryAction<B> {
    pub fn new(name: impl Into<String>, description: impl Into<String>, behavior: B) -> Self {
        Self {
            core: ActionCore::new(name, description),
            behavior,
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }
}

impl<B: ActionBehavior> Action for MomentaryAction<B> {
    fn kind(&self) -> ActionKind {
        ActionKind::Momentary
    }

    fn state(&self) -> ActionState {
        self.core.state
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn description(&self) -> &str {
        &self.core.description
    }

    fn start(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        if !self.core.can_start() {
            return Ok(());
        }
        self.core.state = ActionState::Running;
        if let Err(e) = self.behavior.on_start(components) {
            let wrapped = self.core.fail(e);
            cleanup_after_failure(&self.core, &mut self.behavior, components);
            return Err(wrapped);
        }
        Ok(())
    }

    fn update(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        if !self.core.can_update() {
            return Ok(());
        }
        if let Err(e) = self.behavior.on_update(components) {
            let wrapped = self.core.record(e);
            // Re-armed; the failure stays in last_error.
            self.core.state = ActionState::Ready;
            cleanup_after_failure(&self.core, &mut self.behavior, components);
            return Err(wrapped);
        }
        Ok(())
    }

    fn end(&mut self, components: &mut ComponentRegistry) -> Result<(), RobotError> {
        self.core.state = ActionState::Ready;
        self.behavior.on_end(components).map_err(|e| self.core.record(e))
    }

    fn is_complete(&self) -> bool {
        false
    }

    fn is_operational(&self) -> bool {
        self.core.operational
    }

    fn set_operational(&mut self, operational: bool) {
        self.core.operational = operational;
    }

    fn last_error(&self) -> Option<&RobotError> {
        self.core.last_error.as_ref()
    }

    fn reset(&mut self) {
        self.core.reset();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records hook calls into a shared log and fails on request.
    #[derive(Default, Clone)]
    pub(crate) struct Script {
        pub log: Rc<RefCell<Vec<&'static str>>>,
        pub complete_after: Option<u32>,
        pub fail_start: bool,
        pub fail_update: bool,
        pub fail_end: bool,
        pub updates: u32,
    }

    impl Script {
        pub fn calls(&self) -> Vec<&'static str> {
            self.log.borrow().clone()
        }
    }

    fn hook_error(hook: &str) -> RobotError {
        RobotError::hardware("intake", format!("{hook} hook failed"))
    }

    impl ActionBehavior for Script {
        fn on_start(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> {
            self.log.borrow_mut().push("start");
            if self.fail_start { Err(hook_error("start")) } else { Ok(()) }
        }

        fn on_update(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> {
            self.log.borrow_mut().push("update");
            self.updates += 1;
            if self.fail_update { Err(hook_error("update")) } else { Ok(()) }
        }

        fn on_end(&mut self, _: &mut ComponentRegistry) -> Result<(), RobotError> {
            self.log.borrow_mut().push("end");
            if self.fail_end { Err(hook_error("end")) } else { Ok(()) }
        }

        fn is_complete(&self) -> bool {
            self.complete_after.is_some_and(|n| self.updates >= n)
        }
    }

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new()
    }

    // ── Continuous ──────────────────────────────────────────────────────────

    #[test]
    fn continuous_runs_to_completion() {
        let mut reg = registry();
        let script = Script {
            complete_after: Some(2),
            ..Script::default()
        };
        let mut action = ContinuousAction::new("spin", "spin twice", script.clone());
        assert_eq!(action.kind(), ActionKind::Continuous);
        assert_eq!(action.state(), ActionState::Ready);

        action.start(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Running);
        action.update(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Running);
        action.update(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Completed);
        assert!(action.is_complete());
        assert_eq!(script.calls(), ["start", "update", "update", "end"]);

        // Completed is terminal until reset.
        action.start(&mut reg).unwrap();
        action.update(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Completed);
        assert_eq!(script.calls().len(), 4);
    }

    #[test]
    fn continuous_end_cancels_running_action() {
        let mut reg = registry();
        let script = Script::default();
        let mut action = ContinuousAction::new("spin", "", script.clone());
        action.start(&mut reg).unwrap();
        action.end(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Cancelled);
        assert_eq!(script.calls(), ["start", "end"]);
    }

    #[test]
    fn continuous_start_requires_ready_and_operational() {
        let mut reg = registry();
        let script = Script::default();
        let mut action = ContinuousAction::new("spin", "", script.clone());
        action.set_operational(false);
        action.start(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Ready);
        assert!(script.calls().is_empty());

        action.set_operational(true);
        action.start(&mut reg).unwrap();
        action.start(&mut reg).unwrap();
        assert_eq!(script.calls(), ["start"]);
    }

    #[test]
    fn continuous_update_ignored_unless_running() {
        let mut reg = registry();
        let script = Script::default();
        let mut action = ContinuousAction::new("spin", "", script.clone());
        action.update(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Ready);
        assert!(script.calls().is_empty());
    }

    #[test]
    fn continuous_update_failure_captures_error_and_cleans_up() {
        let mut reg = registry();
        let script = Script {
            fail_update: true,
            ..Script::default()
        };
        let mut action = ContinuousAction::new("spin", "", script.clone());
        action.start(&mut reg).unwrap();

        let err = action.update(&mut reg).unwrap_err();
        assert!(matches!(err, RobotError::ActionExecution { ref action, .. } if action == "spin"));
        assert_eq!(action.state(), ActionState::Failed);
        assert_eq!(action.last_error(), Some(&hook_error("update")));
        assert_eq!(script.calls(), ["start", "update", "end"]);
    }

    #[test]
    fn continuous_start_failure_runs_cleanup() {
        let mut reg = registry();
        let script = Script {
            fail_start: true,
            ..Script::default()
        };
        let mut action = ContinuousAction::new("spin", "", script.clone());
        assert!(action.start(&mut reg).is_err());
        assert_eq!(action.state(), ActionState::Failed);
        assert_eq!(action.last_error(), Some(&hook_error("start")));
        assert_eq!(script.calls(), ["start", "end"]);
    }

    #[test]
    fn continuous_end_failure_is_captured() {
        let mut reg = registry();
        let script = Script {
            fail_end: true,
            ..Script::default()
        };
        let mut action = ContinuousAction::new("spin", "", script.clone());
        action.start(&mut reg).unwrap();
        assert!(action.end(&mut reg).is_err());
        assert_eq!(action.state(), ActionState::Failed);
        assert_eq!(action.last_error(), Some(&hook_error("end")));
    }

    #[test]
    fn reset_rearms_failed_action() {
        let mut reg = registry();
        let script = Script {
            fail_start: true,
            ..Script::default()
        };
        let mut action = ContinuousAction::new("spin", "", script);
        let _ = action.start(&mut reg);
        action.reset();
        assert_eq!(action.state(), ActionState::Ready);
        assert!(action.last_error().is_none());
    }

    // ── Momentary ───────────────────────────────────────────────────────────

    #[test]
    fn momentary_never_self_completes_and_end_rearms() {
        let mut reg = registry();
        let script = Script {
            complete_after: Some(1),
            ..Script::default()
        };
        let mut action = MomentaryAction::new("intake", "run intake", script.clone());
        assert_eq!(action.kind(), ActionKind::Momentary);

        action.start(&mut reg).unwrap();
        action.update(&mut reg).unwrap();
        action.update(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Running);
        assert!(!action.is_complete());

        action.end(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Ready);
        assert_eq!(script.calls(), ["start", "update", "update", "end"]);
    }

    #[test]
    fn momentary_end_resets_from_any_state() {
        let mut reg = registry();
        let mut action = MomentaryAction::new("intake", "", Script::default());
        action.end(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Ready);
    }

    #[test]
    fn momentary_update_failure_rearms_but_keeps_error() {
        let mut reg = registry();
        let script = Script {
            fail_update: true,
            ..Script::default()
        };
        let mut action = MomentaryAction::new("intake", "", script.clone());
        action.start(&mut reg).unwrap();

        let err = action.update(&mut reg).unwrap_err();
        assert!(matches!(err, RobotError::ActionExecution { .. }));
        assert_eq!(action.state(), ActionState::Ready);
        assert_eq!(action.last_error(), Some(&hook_error("update")));
        assert_eq!(script.calls(), ["start", "update", "end"]);
    }

    #[test]
    fn momentary_end_failure_still_rearms() {
        let mut reg = registry();
        let script = Script {
            fail_end: true,
            ..Script::default()
        };
        let mut action = MomentaryAction::new("intake", "", script.clone());
        action.start(&mut reg).unwrap();

        let err = action.end(&mut reg).unwrap_err();
        assert!(matches!(err, RobotError::ActionExecution { .. }));
        assert_eq!(action.state(), ActionState::Ready);
        assert_eq!(action.last_error(), Some(&hook_error("end")));

        // The binding keeps working on the next press.
        action.start(&mut reg).unwrap();
        assert_eq!(action.state(), ActionState::Running);
        assert_eq!(script.calls(), ["start", "end", "start"]);
    }

    #[test]
    fn momentary_start_failure_stays_failed() {
        let mut reg = registry();
        let script = Script {
            fail_start: true,
            ..Script::default()
        };
        let mut action = MomentaryAction::new("intake", "", script.clone());
        assert!(action.start(&mut reg).is_err());
        assert_eq!(action.state(), ActionState::Failed);
        assert_eq!(script.calls(), ["start", "end"]);
    }
}
