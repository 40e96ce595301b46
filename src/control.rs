// ==============================================================================
// control.rs — CONTROL SIGNAL CONTRACT + HUMAN INPUT ADAPTER
// ------------------------------------------------------------------------------
// The drivetrain only ever sees a ControlSignal. Who produced it (a player
// holding keys, or the navigation controller chasing a target) is invisible
// to it, which keeps player and AI vehicles driving identically.
//
// HumanInput latches raw axis values between fixed ticks (input arrives at
// frame rate, the drivetrain runs at the fixed rate) and hands out a fresh
// ControlSignal on demand.
// ==============================================================================

use serde::{Deserialize, Serialize};

/// Normalized driver intent for a single fixed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSignal {
    pub throttle: f32, // -1..1 (negative = reverse intent)
    pub steer: f32,    // -1..1 (positive = yaw toward +X)
    pub brake: bool,   // explicit brake, only honored while throttle is idle
}

impl ControlSignal {
    pub const NEUTRAL: ControlSignal = ControlSignal {
        throttle: 0.0,
        steer: 0.0,
        brake: false,
    };

    /// Builds a signal, clamping both axes into [-1, 1]. NaN collapses to 0.
    pub fn new(throttle: f32, steer: f32) -> Self {
        Self {
            throttle: clamp_axis(throttle),
            steer: clamp_axis(steer),
            brake: false,
        }
    }

    pub fn with_brake(mut self, brake: bool) -> Self {
        self.brake = brake;
        self
    }
}

#[inline]
fn clamp_axis(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) }
}

// ==============================================================================
// Human input adapter
// ==============================================================================

/// Raw axis latch for a human driver.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanInput {
    vertical: f32,   // raw move axis
    horizontal: f32, // raw steer axis
    brake_held: bool,
    deadzone: f32,
}

impl HumanInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadzone(deadzone: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 0.99),
            ..Self::default()
        }
    }

    /// Latch the latest raw axes. Called at input rate, read at tick rate.
    pub fn set_axes(&mut self, vertical: f32, horizontal: f32) {
        self.vertical = vertical;
        self.horizontal = horizontal;
    }

    pub fn set_brake(&mut self, held: bool) {
        self.brake_held = held;
    }

    pub fn signal(&self) -> ControlSignal {
        ControlSignal::new(
            apply_deadzone(self.vertical, self.deadzone),
            apply_deadzone(self.horizontal, self.deadzone),
        )
        .with_brake(self.brake_held)
    }
}

// Rescales so output still reaches ±1 at full deflection.
fn apply_deadzone(v: f32, deadzone: f32) -> f32 {
    if deadzone <= 0.0 {
        return v;
    }
    let a = v.abs();
    if a <= deadzone {
        0.0
    } else {
        v.signum() * ((a - deadzone) / (1.0 - deadzone)).min(1.0)
    }
}
