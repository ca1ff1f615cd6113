//! [`RateLimiter`] – per-wheel power shaping.
//!
//! Every power headed for a drive motor passes through the same pipeline:
//!
//! 1. dead zone: `|p| < dead_zone` becomes 0;
//! 2. clamp to `[-max_power, max_power]`;
//! 3. slew limit: the change from the wheel's previous power is capped at
//!    `slew_rate_per_sec · Δt`, where Δt is the time between the wheel's last
//!    update and the current tick instant.
//!
//! The owner calls [`RateLimiter::begin_tick`] once per control tick.  All
//! wheels commanded during that tick are limited against the same instant, so
//! a second command to one wheel in the same tick sees Δt = 0 and holds the
//! previous power.  A wheel's first command after [`RateLimiter::new`] or
//! [`RateLimiter::reset`] is not slew limited.
//!
//! # Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use torque_hal::mixing::Wheel;
//! use torque_hal::rate_limiter::{DriveLimits, RateLimiter};
//!
//! let mut limiter = RateLimiter::new(DriveLimits::default());
//! let t0 = Instant::now();
//!
//! limiter.begin_tick(t0);
//! assert_eq!(limiter.limit(Wheel::FrontLeft, 0.2), 0.2);
//!
//! // 100 ms later the wheel may move at most 0.5 * 0.1 = 0.05.
//! limiter.begin_tick(t0 + Duration::from_millis(100));
//! let p = limiter.limit(Wheel::FrontLeft, 1.0);
//! assert!((p - 0.25).abs() < 1e-9);
//! ```

use std::time::Instant;

use serde::{Deserialize, Serialize};
use torque_types::RobotError;

use crate::mixing::{DEFAULT_DEAD_ZONE, MAX_POWER, Wheel, bound_input};

/// Tunables for the power pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriveLimits {
    #[serde(default = "default_dead_zone")]
    pub dead_zone: f64,
    #[serde(default = "default_max_power")]
    pub max_power: f64,
    /// Largest power change per second of elapsed time.
    #[serde(default = "default_slew_rate")]
    pub slew_rate_per_sec: f64,
}

fn default_dead_zone() -> f64 {
    DEFAULT_DEAD_ZONE
}

fn default_max_power() -> f64 {
    MAX_POWER
}

fn default_slew_rate() -> f64 {
    0.5
}

impl Default for DriveLimits {
    fn default() -> Self {
        Self {
            dead_zone: default_dead_zone(),
            max_power: default_max_power(),
            slew_rate_per_sec: default_slew_rate(),
        }
    }
}

impl DriveLimits {
    /// Reject limits the pipeline cannot run with: non-finite values, a
    /// negative dead zone or slew rate, or `max_power` outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), RobotError> {
        let invalid = |name: &str, details: String| RobotError::InvalidParameter {
            name: name.to_string(),
            details,
        };
        let fields = [
            ("dead_zone", self.dead_zone),
            ("slew_rate_per_sec", self.slew_rate_per_sec),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(
                    name,
                    format!("{value} must be a finite, non-negative number"),
                ));
            }
        }
        if !self.max_power.is_finite() || self.max_power <= 0.0 || self.max_power > MAX_POWER {
            return Err(invalid(
                "max_power",
                format!("{} must lie in (0, {MAX_POWER}]", self.max_power),
            ));
        }
        Ok(())
    }
}

/// Last commanded power of one wheel and when it was written.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotorPowerState {
    pub power: f64,
    pub updated_at: Option<Instant>,
}

/// Stateful dead zone / clamp / slew limiter for the four drive wheels.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limits: DriveLimits,
    tick: Option<Instant>,
    wheels: [MotorPowerState; 4],
}

impl RateLimiter {
    pub fn new(limits: DriveLimits) -> Self {
        Self {
            limits,
            tick: None,
            wheels: [MotorPowerState::default(); 4],
        }
    }

    pub fn limits(&self) -> &DriveLimits {
        &self.limits
    }

    /// Latch the instant every command of the current tick is limited against.
    pub fn begin_tick(&mut self, now: Instant) {
        self.tick = Some(now);
    }

    /// Shape `requested` for `wheel` and remember the result.
    pub fn limit(&mut self, wheel: Wheel, requested: f64) -> f64 {
        let target = bound_input(requested, self.limits.dead_zone, self.limits.max_power);
        let state = &mut self.wheels[wheel.index()];

        let power = match (state.updated_at, self.tick) {
            (Some(last), Some(now)) => {
                let dt = now.saturating_duration_since(last).as_secs_f64();
                let max_change = self.limits.slew_rate_per_sec * dt;
                let delta = (target - state.power).clamp(-max_change, max_change);
                state.power + delta
            }
            _ => target,
        };

        state.power = power;
        state.updated_at = self.tick;
        power
    }

    pub fn last_power(&self, wheel: Wheel) -> f64 {
        self.wheels[wheel.index()].power
    }

    pub fn state(&self, wheel: Wheel) -> MotorPowerState {
        self.wheels[wheel.index()]
    }

    /// Forget history: every wheel is back at zero and its next command is
    /// unconstrained.
    pub fn reset(&mut self) {
        self.wheels = [MotorPowerState::default(); 4];
    }
}
