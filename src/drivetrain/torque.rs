// ==============================================================================
// torque.rs — MOTOR / BRAKE DISTRIBUTION
// ==============================================================================
// Evaluated after throttle smoothing. Three outcomes per tick:
//
//   Drive        |throttle| > ACTIVE_EPS, moving with (or slower than 0.5 m/s
//                against) the commanded direction. Driven wheels get
//                throttle * max_motor_torque, the rest roll free.
//   BrakeAgainst |throttle| > ACTIVE_EPS but the chassis is moving the
//                other way faster than REVERSE_SPEED_EPS. Every wheel gets
//                full brake, motors off, throttle killed so the motor never
//                fights the brake on the following tick.
//   Idle         explicit brake => full brake on every wheel (throttle
//                killed); otherwise coast.
// ==============================================================================

use serde::Serialize;

use crate::drivetrain::throttle::ThrottleState;
use crate::drivetrain::types::{sign, VehicleTuning, WheelSpec};

pub const ACTIVE_EPS: f32 = 0.001;
pub const REVERSE_SPEED_EPS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TorqueMode {
    Drive,
    BrakeAgainstMotion,
    ExplicitBrake,
    Coast,
}

/// (motor, brake) for one wheel.
pub type TorquePair = (f32, f32);

/// Decide the torque mode for this tick. May kill the throttle.
pub fn select_mode(
    tuning: &VehicleTuning,
    throttle: &mut ThrottleState,
    forward_speed: f32,
    explicit_brake: bool,
) -> TorqueMode {
    let current = throttle.current();

    if current.abs() > ACTIVE_EPS {
        let against_motion = tuning.brake_on_reverse_input
            && sign(current) != sign(forward_speed)
            && forward_speed.abs() > REVERSE_SPEED_EPS;

        if against_motion {
            throttle.kill();
            TorqueMode::BrakeAgainstMotion
        } else {
            TorqueMode::Drive
        }
    } else if explicit_brake {
        throttle.kill();
        TorqueMode::ExplicitBrake
    } else {
        TorqueMode::Coast
    }
}

/// Per-wheel (motor, brake) for the chosen mode. `throttle` is the value
/// before any kill performed by `select_mode`.
pub fn wheel_torque(tuning: &VehicleTuning, wheel: &WheelSpec, mode: TorqueMode, throttle: f32) -> TorquePair {
    match mode {
        TorqueMode::Drive if wheel.driven => (throttle * tuning.max_motor_torque, 0.0),
        TorqueMode::Drive => (0.0, 0.0),
        TorqueMode::BrakeAgainstMotion | TorqueMode::ExplicitBrake => (0.0, tuning.max_brake_torque),
        TorqueMode::Coast => (0.0, 0.0),
    }
}
