// ==============================================================================
// model.rs — DRIVETRAIN MODEL (one instance per vehicle)
// ------------------------------------------------------------------------------
// tick(signal, motion, dt):
//   1) throttle smoothing            (throttle.rs)
//   2) torque mode + per-wheel split (torque.rs)
//   3) front axle steering           (steering.rs)
//
// Pure with respect to the outside world: no physics, no clock, no input
// polling. Output is one WheelCommand per configured wheel, in wheel order.
// ==============================================================================

use log::trace;

use crate::control::ControlSignal;
use crate::drivetrain::steering::{target_angle, SteeringState};
use crate::drivetrain::throttle::ThrottleState;
use crate::drivetrain::torque::{select_mode, wheel_torque, TorqueMode};
use crate::drivetrain::types::{ChassisMotion, VehicleTuning, WheelCommand, WheelSpec};

#[derive(Debug, Clone)]
pub struct DrivetrainModel {
    tuning: VehicleTuning,
    wheels: Vec<WheelSpec>,
    throttle: ThrottleState,
    steering: SteeringState,
    last_mode: TorqueMode,
}

impl DrivetrainModel {
    pub fn new(tuning: VehicleTuning, wheels: Vec<WheelSpec>) -> Self {
        Self {
            tuning,
            wheels,
            throttle: ThrottleState::default(),
            steering: SteeringState::default(),
            last_mode: TorqueMode::Coast,
        }
    }

    pub fn tuning(&self) -> &VehicleTuning {
        &self.tuning
    }

    pub fn wheels(&self) -> &[WheelSpec] {
        &self.wheels
    }

    /// Smoothed throttle after the last tick.
    pub fn throttle(&self) -> f32 {
        self.throttle.current()
    }

    /// Last commanded front wheel angle (degrees).
    pub fn steer_angle(&self) -> f32 {
        self.steering.angle
    }

    pub fn last_mode(&self) -> TorqueMode {
        self.last_mode
    }

    /// Advance one fixed tick.
    pub fn tick(&mut self, signal: ControlSignal, motion: ChassisMotion, dt: f32) -> Vec<WheelCommand> {
        let VehicleTuning { accel_response, decel_response, .. } = self.tuning;

        // 1) smoothing
        let throttle = self.throttle.advance(signal.throttle, accel_response, decel_response, dt);

        // 2) torque mode (may kill the smoothed throttle)
        let mode = select_mode(&self.tuning, &mut self.throttle, motion.forward_speed, signal.brake);
        self.last_mode = mode;

        // 3) steering, smoothed once per tick and shared by every front wheel
        let has_front = self.wheels.iter().any(|w| w.axle.is_front());
        let front_angle = if has_front {
            let target = target_angle(&self.tuning, signal.steer, motion.speed);
            Some(self.steering.step(target))
        } else {
            None
        };

        trace!(
            "drivetrain: throttle={:+.3} mode={:?} steer={:?} fwd={:+.2}",
            self.throttle.current(),
            mode,
            front_angle,
            motion.forward_speed
        );

        self.wheels
            .iter()
            .map(|wheel| {
                let (motor_torque, brake_torque) = wheel_torque(&self.tuning, wheel, mode, throttle);
                WheelCommand {
                    motor_torque,
                    brake_torque,
                    steer_angle: if wheel.axle.is_front() { front_angle } else { None },
                }
            })
            .collect()
    }
}
