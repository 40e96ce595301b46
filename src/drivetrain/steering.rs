// ==============================================================================
// steering.rs — SPEED-SENSITIVE FRONT AXLE STEERING
// ==============================================================================
// Responsibilities:
// - Convert driver steer intent into a target wheel angle (degrees)
// - Attenuate steering authority with speed
// - Smooth the commanded wheel angle so it never jumps between ticks
// ------------------------------------------------------------------------------
//
//   θ_target = steer * turn_sensitivity * max_steering_angle * k(v)
//   k(v)     = lerp(1.0, MIN_STEER_FACTOR, clamp01(v / v_att))
//   θ_wheel  = lerp(θ_wheel_prev, θ_target, STEER_BLEND)
//
// where:
//        v     = chassis speed (m/s)
//        v_att = min_speed_for_steer_attenuation (30 by default)
//
// Only Front axle wheels steer. Rear wheels are never written.
// ==============================================================================

use crate::drivetrain::types::{clamp01, lerp, VehicleTuning};

/// Steering authority left at and above the attenuation speed.
pub const MIN_STEER_FACTOR: f32 = 0.25;

/// Fraction of the remaining gap closed per tick.
pub const STEER_BLEND: f32 = 0.6;

/// Steering authority multiplier for a given speed, in [MIN_STEER_FACTOR, 1].
pub fn attenuation_factor(speed: f32, attenuation_speed: f32) -> f32 {
    if !(attenuation_speed > 0.0) || speed.is_nan() {
        return 1.0;
    }
    let t = clamp01(speed.abs() / attenuation_speed);
    lerp(1.0, MIN_STEER_FACTOR, t)
}

/// Target wheel angle (degrees) before smoothing.
pub fn target_angle(tuning: &VehicleTuning, steer: f32, speed: f32) -> f32 {
    let raw = steer.clamp(-1.0, 1.0) * tuning.turn_sensitivity * tuning.max_steering_angle;
    let angle = raw * attenuation_factor(speed, tuning.min_speed_for_steer_attenuation);
    if angle.is_finite() { angle } else { 0.0 }
}

/// Front axle steering state. Holds the last commanded wheel angle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringState {
    pub angle: f32, // degrees, last value written to front wheels
}

impl SteeringState {
    pub fn step(&mut self, target: f32) -> f32 {
        self.angle = lerp(self.angle, target, STEER_BLEND);
        self.angle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn attenuation_endpoints() {
        assert_relative_eq!(attenuation_factor(0.0, 30.0), 1.0);
        assert_relative_eq!(attenuation_factor(15.0, 30.0), 0.625);
        assert_relative_eq!(attenuation_factor(30.0, 30.0), 0.25);
        assert_relative_eq!(attenuation_factor(120.0, 30.0), 0.25);
    }

    #[test]
    fn attenuation_is_monotone_and_bounded() {
        let mut prev = attenuation_factor(0.0, 30.0);
        let mut v = 0.0;
        while v <= 45.0 {
            let k = attenuation_factor(v, 30.0);
            assert!(k <= prev + 1e-6);
            assert!((MIN_STEER_FACTOR..=1.0).contains(&k));
            prev = k;
            v += 0.25;
        }
    }

    #[test]
    fn degenerate_attenuation_speed_disables_attenuation() {
        assert_eq!(attenuation_factor(10.0, 0.0), 1.0);
        assert_eq!(attenuation_factor(10.0, -5.0), 1.0);
    }

    #[test]
    fn zero_max_angle_is_a_no_op() {
        let tuning = VehicleTuning { max_steering_angle: 0.0, ..VehicleTuning::default() };
        assert_eq!(target_angle(&tuning, 1.0, 0.0), 0.0);
    }

    #[test]
    fn smoothing_closes_sixty_percent_per_tick() {
        let mut s = SteeringState::default();
        assert_relative_eq!(s.step(30.0), 18.0, epsilon = 1e-5);
        assert_relative_eq!(s.step(30.0), 25.2, epsilon = 1e-4);
    }
}
