//! Core shared types for the drivetrain (engine-agnostic).
// drivetrain/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

// ----- tiny scalar helpers (shared by throttle/steering/sensor/nav) -----

/// Sign with `sign(0) == 0`. A zero value never counts as a direction.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[inline] pub fn clamp01(x: f32) -> f32 { x.clamp(0.0, 1.0) }
#[inline] pub fn lerp(a: f32, b: f32, t: f32) -> f32 { a + (b - a) * t }

/// Bounded linear approach: steps at most `max_delta` toward `target`.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + sign(delta) * max_delta
    }
}

// ============================================
// Wheel identification
// ============================================

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Axle {
    Front,
    Rear,
}

impl Axle {
    pub fn is_front(&self) -> bool {
        matches!(self, Axle::Front)
    }
}

impl fmt::Display for Axle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Axle::Front => "front",
            Axle::Rear => "rear",
        };
        write!(f, "{s}")
    }
}

/// Static description of one wheel. Configured once at vehicle setup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WheelSpec {
    pub name: String,               // "FL", "FR", "RL", "RR", ...
    pub axle: Axle,
    pub driven: bool,               // receives motor torque
    pub rotation_offset: [f32; 3],  // visual mesh Euler offset (degrees)
    pub inverted_rotation: bool,    // mesh authored facing backwards
    pub slot: usize,                // actuator slot inside the physics rig
}

impl WheelSpec {
    pub fn new(name: &str, axle: Axle, driven: bool, slot: usize) -> Self {
        Self {
            name: name.to_string(),
            axle,
            driven,
            rotation_offset: [0.0; 3],
            inverted_rotation: false,
            slot,
        }
    }

    /// Front-steer, rear-drive four wheel layout (slots 0..4 in FL, FR, RL, RR order).
    pub fn rear_drive_four() -> Vec<WheelSpec> {
        vec![
            WheelSpec::new("FL", Axle::Front, false, 0),
            WheelSpec::new("FR", Axle::Front, false, 1),
            WheelSpec::new("RL", Axle::Rear, true, 2),
            WheelSpec::new("RR", Axle::Rear, true, 3),
        ]
    }
}

// ============================================
// ----- tuning -------------------------------
// ============================================

/// Immutable-during-run drivetrain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleTuning {
    pub max_motor_torque: f32,                 // N·m at full throttle
    pub max_brake_torque: f32,                 // N·m
    pub accel_response: f32,                   // throttle units / s while building up
    pub decel_response: f32,                   // throttle units / s while backing off
    pub turn_sensitivity: f32,                 // scales steer input
    pub max_steering_angle: f32,               // degrees
    pub brake_on_reverse_input: bool,          // brake when commanded against motion
    pub min_speed_for_steer_attenuation: f32,  // speed where steering authority bottoms out
    pub center_of_mass: [f32; 3],              // chassis-local COM override (m)
}

impl Default for VehicleTuning {
    fn default() -> Self {
        Self {
            max_motor_torque: 1500.0,
            max_brake_torque: 8000.0,
            accel_response: 6.0,
            decel_response: 12.0,
            turn_sensitivity: 1.0,
            max_steering_angle: 30.0,
            brake_on_reverse_input: true,
            min_speed_for_steer_attenuation: 30.0,
            center_of_mass: [0.0, 0.0, 0.0],
        }
    }
}

// ============================================
// ----- per-tick inputs / outputs ------------
// ============================================

/// Chassis motion as seen by the drivetrain this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChassisMotion {
    pub forward_speed: f32, // m/s along heading (negative = rolling backwards)
    pub speed: f32,         // |linear velocity|
}

impl ChassisMotion {
    pub fn new(forward_speed: f32, speed: f32) -> Self {
        Self { forward_speed, speed }
    }

    /// Straight-line motion along the heading.
    pub fn along_heading(forward_speed: f32) -> Self {
        Self { forward_speed, speed: forward_speed.abs() }
    }
}

/// What the drivetrain wants one wheel to do this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelCommand {
    pub motor_torque: f32,        // N·m
    pub brake_torque: f32,        // N·m
    pub steer_angle: Option<f32>, // degrees; None leaves the actuator untouched
}
