// ==============================================================================
// throttle.rs — RATE-LIMITED THROTTLE SMOOTHING
// ==============================================================================
// Rules, applied once per fixed tick:
// - Direction reversal (target and current point opposite ways, neither is
//   zero) snaps current to 0. The next tick starts building in the new
//   direction from rest, so current never crosses zero continuously.
// - |target| < IDLE_EPS decays toward exactly 0 at decel_response.
// - Otherwise approach target at accel_response when asking for more
//   throttle than we have, decel_response when asking for less.
// ==============================================================================

use crate::drivetrain::types::{move_towards, sign};

/// Targets below this magnitude count as "no input".
pub const IDLE_EPS: f32 = 0.01;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrottleState {
    current: f32, // -1..1
}

impl ThrottleState {
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Hard stop of the smoothing (brake against motion, explicit brake).
    pub fn kill(&mut self) {
        self.current = 0.0;
    }

    /// Advance one tick toward `target`. Returns the new current value.
    pub fn advance(&mut self, target: f32, accel_response: f32, decel_response: f32, dt: f32) -> f32 {
        if !(dt.is_finite() && dt > 0.0) || target.is_nan() {
            return self.current;
        }
        let target = target.clamp(-1.0, 1.0);

        let reversed = sign(target) != 0.0
            && sign(self.current) != 0.0
            && sign(target) != sign(self.current);
        if reversed {
            self.current = 0.0;
            return self.current;
        }

        self.current = if target.abs() < IDLE_EPS {
            move_towards(self.current, 0.0, decel_response.max(0.0) * dt)
        } else {
            let rate = if target.abs() > self.current.abs() {
                accel_response
            } else {
                decel_response
            };
            move_towards(self.current, target, rate.max(0.0) * dt)
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const ACCEL: f32 = 6.0;
    const DECEL: f32 = 12.0;
    const DT: f32 = 0.02;

    #[test]
    fn first_tick_from_rest() {
        let mut t = ThrottleState::default();
        assert_relative_eq!(t.advance(1.0, ACCEL, DECEL, DT), 0.12, epsilon = 1e-6);
    }

    #[test]
    fn reversal_snaps_to_zero_then_builds_other_way() {
        let mut t = ThrottleState::default();
        for _ in 0..10 {
            t.advance(1.0, ACCEL, DECEL, DT);
        }
        assert!(t.current() > 0.9);

        assert_eq!(t.advance(-1.0, ACCEL, DECEL, DT), 0.0);
        assert_relative_eq!(t.advance(-1.0, ACCEL, DECEL, DT), -0.12, epsilon = 1e-6);
    }

    #[test]
    fn idle_target_decays_at_decel_rate() {
        let mut t = ThrottleState::default();
        for _ in 0..3 {
            t.advance(0.5, ACCEL, DECEL, DT);
        }
        let before = t.current();
        let after = t.advance(0.005, ACCEL, DECEL, DT);
        assert_relative_eq!(before - after, DECEL * DT, epsilon = 1e-6);
        for _ in 0..10 {
            t.advance(0.0, ACCEL, DECEL, DT);
        }
        assert_eq!(t.current(), 0.0);
    }

    #[test]
    fn bad_dt_is_ignored() {
        let mut t = ThrottleState::default();
        t.advance(1.0, ACCEL, DECEL, 0.0);
        t.advance(1.0, ACCEL, DECEL, f32::NAN);
        t.advance(1.0, ACCEL, DECEL, -0.1);
        assert_eq!(t.current(), 0.0);
    }

    #[test]
    fn sign_change_always_passes_through_zero() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut t = ThrottleState::default();
        let mut prev = t.current();
        for _ in 0..5_000 {
            let target: f32 = rng.gen_range(-1.0..=1.0);
            let next = t.advance(target, ACCEL, DECEL, DT);
            assert!(
                prev * next >= 0.0,
                "crossed zero in one tick: {prev} -> {next}"
            );
            prev = next;
        }
    }

    #[test]
    fn constant_target_converges_monotonically_without_overshoot() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let start: f32 = rng.gen_range(-1.0..=1.0);
            let target: f32 = rng.gen_range(-1.0..=1.0);
            let goal = if target.abs() < IDLE_EPS { 0.0 } else { target };

            let mut t = ThrottleState::default();
            for _ in 0..100 {
                t.advance(start, ACCEL, DECEL, DT);
            }

            // A reversal may snap to zero first; distance to goal still shrinks
            // and the value never ends up on the far side of the goal.
            let mut prev = t.current();
            for _ in 0..200 {
                let v = t.advance(target, ACCEL, DECEL, DT);
                assert!((v - goal).abs() <= (prev - goal).abs() + 1e-6, "diverged: {v} goal {goal}");
                assert!(
                    (prev - goal) * (v - goal) >= 0.0,
                    "overshot: {prev} -> {v} goal {goal}"
                );
                prev = v;
            }
            assert_relative_eq!(t.current(), goal, epsilon = 1e-5);
        }
    }
}
