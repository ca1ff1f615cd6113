//! Logical operator inputs.
//!
//! The host polls its gamepads once per tick and hands the snapshot to the
//! orchestrator as [`Gamepads`].  Actions are bound to [`ButtonId`]s, the
//! closed set of twenty logical buttons spelled `gamepad1_a`,
//! `gamepad2_dpad_left`, and so on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RobotError;

/// Which of the two driver-station gamepads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GamepadId {
    One,
    Two,
}

impl GamepadId {
    fn prefix(&self) -> &'static str {
        match self {
            GamepadId::One => "gamepad1",
            GamepadId::Two => "gamepad2",
        }
    }
}

/// Buttons that can carry an action binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
}

impl Button {
    pub const ALL: [Button; 10] = [
        Button::A,
        Button::B,
        Button::X,
        Button::Y,
        Button::LeftBumper,
        Button::RightBumper,
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            Button::A => "a",
            Button::B => "b",
            Button::X => "x",
            Button::Y => "y",
            Button::LeftBumper => "left_bumper",
            Button::RightBumper => "right_bumper",
            Button::DpadUp => "dpad_up",
            Button::DpadDown => "dpad_down",
            Button::DpadLeft => "dpad_left",
            Button::DpadRight => "dpad_right",
        }
    }
}

/// A logical button identifier: one button on one gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ButtonId {
    pub gamepad: GamepadId,
    pub button: Button,
}

impl ButtonId {
    pub const fn new(gamepad: GamepadId, button: Button) -> Self {
        Self { gamepad, button }
    }

    /// Every identifier in dispatch order: gamepad 1 first, then gamepad 2,
    /// each in [`Button::ALL`] order.
    pub fn all() -> impl Iterator<Item = ButtonId> {
        [GamepadId::One, GamepadId::Two]
            .into_iter()
            .flat_map(|pad| Button::ALL.into_iter().map(move |b| ButtonId::new(pad, b)))
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.gamepad.prefix(), self.button.suffix())
    }
}

impl FromStr for ButtonId {
    type Err = RobotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RobotError::InvalidBinding(
                "button identifier cannot be empty".to_string(),
            ));
        }
        ButtonId::all()
            .find(|id| id.to_string() == trimmed)
            .ok_or_else(|| RobotError::InvalidBinding(format!("unknown button '{trimmed}'")))
    }
}

/// One polled gamepad.  Sticks are in [−1, 1] with +y pointing *down*, as
/// the driver-station reports them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GamepadState {
    pub left_stick_x: f64,
    pub left_stick_y: f64,
    pub right_stick_x: f64,
    pub right_stick_y: f64,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub left_bumper: bool,
    pub right_bumper: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
}

impl GamepadState {
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.a,
            Button::B => self.b,
            Button::X => self.x,
            Button::Y => self.y,
            Button::LeftBumper => self.left_bumper,
            Button::RightBumper => self.right_bumper,
            Button::DpadUp => self.dpad_up,
            Button::DpadDown => self.dpad_down,
            Button::DpadLeft => self.dpad_left,
            Button::DpadRight => self.dpad_right,
        }
    }

    pub fn set_pressed(&mut self, button: Button, pressed: bool) {
        let slot = match button {
            Button::A => &mut self.a,
            Button::B => &mut self.b,
            Button::X => &mut self.x,
            Button::Y => &mut self.y,
            Button::LeftBumper => &mut self.left_bumper,
            Button::RightBumper => &mut self.right_bumper,
            Button::DpadUp => &mut self.dpad_up,
            Button::DpadDown => &mut self.dpad_down,
            Button::DpadLeft => &mut self.dpad_left,
            Button::DpadRight => &mut self.dpad_right,
        };
        *slot = pressed;
    }
}

/// Snapshot of both gamepads for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gamepads {
    pub gamepad1: GamepadState,
    pub gamepad2: GamepadState,
}

impl Gamepads {
    pub fn gamepad(&self, id: GamepadId) -> &GamepadState {
        match id {
            GamepadId::One => &self.gamepad1,
            GamepadId::Two => &self.gamepad2,
        }
    }

    pub fn is_pressed(&self, id: ButtonId) -> bool {
        self.gamepad(id.gamepad).is_pressed(id.button)
    }

    /// Convenience for tests and scripted input: a snapshot with exactly the
    /// given buttons held.
    pub fn with_pressed(buttons: &[ButtonId]) -> Self {
        let mut pads = Gamepads::default();
        for id in buttons {
            let pad = match id.gamepad {
                GamepadId::One => &mut pads.gamepad1,
                GamepadId::Two => &mut pads.gamepad2,
            };
            pad.set_pressed(id.button, true);
        }
        pads
    }
}
