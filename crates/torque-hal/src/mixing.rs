//! Mecanum wheel mixing, dead zone and clamping.
//!
//! A holonomic command `(drive, strafe, rotate)` is turned into four wheel
//! powers:
//!
//! | Wheel | Power |
//! |---|---|
//! | front-left  | `drive + strafe + rotate` |
//! | back-left   | `drive - strafe + rotate` |
//! | front-right | `drive - strafe - rotate` |
//! | back-right  | `drive + strafe - rotate` |
//!
//! When any magnitude exceeds 1 all four are divided by the largest, which
//! keeps the ratio between wheels and puts the result back in [−1, 1].
//!
//! # Example
//!
//! ```rust
//! use torque_hal::mixing::WheelPowers;
//!
//! let powers = WheelPowers::mix(1.0, 0.0, 1.0);
//! assert_eq!(powers.front_left, 1.0);
//! assert_eq!(powers.front_right, 0.0);
//! assert!(powers.max_magnitude() <= 1.0);
//! ```

use serde::{Deserialize, Serialize};

/// Input magnitude below which a power or stick reading counts as zero.
pub const DEFAULT_DEAD_ZONE: f64 = 0.05;

/// Largest power magnitude ever sent to a motor.
pub const MAX_POWER: f64 = 1.0;

/// The four wheels, in mixing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wheel {
    FrontLeft,
    BackLeft,
    FrontRight,
    BackRight,
}

impl Wheel {
    pub const ALL: [Wheel; 4] = [
        Wheel::FrontLeft,
        Wheel::BackLeft,
        Wheel::FrontRight,
        Wheel::BackRight,
    ];

    pub fn index(&self) -> usize {
        match self {
            Wheel::FrontLeft => 0,
            Wheel::BackLeft => 1,
            Wheel::FrontRight => 2,
            Wheel::BackRight => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Wheel::FrontLeft => "front_left",
            Wheel::BackLeft => "back_left",
            Wheel::FrontRight => "front_right",
            Wheel::BackRight => "back_right",
        }
    }
}

/// One power per wheel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelPowers {
    pub front_left: f64,
    pub back_left: f64,
    pub front_right: f64,
    pub back_right: f64,
}

impl WheelPowers {
    /// Mix a holonomic command, normalizing so no wheel exceeds 1.
    pub fn mix(drive: f64, strafe: f64, rotate: f64) -> Self {
        let raw = Self {
            front_left: drive + strafe + rotate,
            back_left: drive - strafe + rotate,
            front_right: drive - strafe - rotate,
            back_right: drive + strafe - rotate,
        };
        let max = raw.max_magnitude();
        if max > MAX_POWER { raw.scaled(1.0 / max) } else { raw }
    }

    /// The same power on every wheel (straight line).
    pub fn uniform(power: f64) -> Self {
        Self {
            front_left: power,
            back_left: power,
            front_right: power,
            back_right: power,
        }
    }

    /// Spin in place: left side `power`, right side `-power`.
    pub fn spin(power: f64) -> Self {
        Self {
            front_left: power,
            back_left: power,
            front_right: -power,
            back_right: -power,
        }
    }

    pub fn get(&self, wheel: Wheel) -> f64 {
        match wheel {
            Wheel::FrontLeft => self.front_left,
            Wheel::BackLeft => self.back_left,
            Wheel::FrontRight => self.front_right,
            Wheel::BackRight => self.back_right,
        }
    }

    pub fn set(&mut self, wheel: Wheel, power: f64) {
        match wheel {
            Wheel::FrontLeft => self.front_left = power,
            Wheel::BackLeft => self.back_left = power,
            Wheel::FrontRight => self.front_right = power,
            Wheel::BackRight => self.back_right = power,
        }
    }

    pub fn max_magnitude(&self) -> f64 {
        Wheel::ALL
            .iter()
            .map(|w| self.get(*w).abs())
            .fold(0.0, f64::max)
    }

    fn scaled(self, factor: f64) -> Self {
        Self {
            front_left: self.front_left * factor,
            back_left: self.back_left * factor,
            front_right: self.front_right * factor,
            back_right: self.back_right * factor,
        }
    }
}

/// Force `value` to zero when its magnitude is below `threshold`.
pub fn apply_dead_zone(value: f64, threshold: f64) -> f64 {
    if value.abs() < threshold { 0.0 } else { value }
}

/// Dead zone then clamp to `[-max, max]`.  Non-finite input is treated as
/// zero so a NaN can never reach a motor.
pub fn bound_input(value: f64, dead_zone: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    apply_dead_zone(value, dead_zone).clamp(-max, max)
}
