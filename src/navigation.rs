// ==============================================================================
// navigation.rs — AUTONOMOUS NAVIGATION CONTROLLER
// ------------------------------------------------------------------------------
// tick(pose, goal, reading, speed, max_steering_angle) -> NavOutput
//
//   pursuit:    angle   = atan2(local.x, local.z)            (deg, target in
//                                                             chassis frame)
//               pursuit = clamp(angle / max_steer * sens, -1, 1)
//
//   avoidance:  strength > 0.1 (and enabled)
//                   steer     = lerp(pursuit, bias, priority)
//
//   speed:      outside stopping distance
//                   throttle = speed < max_speed ? 1 : 0
//                   |angle| > sharp_turn_angle  => throttle *= sharp mult
//                   avoiding                    => throttle *= 1 - strength * 0.5
//                   speed < min_speed           => throttle  = 1
//               inside stopping distance
//                   throttle = -1
//
// Stateless between ticks. The controller never issues an explicit brake;
// slowing down is left to the drivetrain's brake-against-motion rule.
// ==============================================================================

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::control::ControlSignal;
use crate::drivetrain::types::lerp;
use crate::pose::Pose;
use crate::sensor::{ObstacleReading, DETECTION_THRESHOLD};

/// Throttle kept while swerving at full obstacle strength.
const AVOID_THROTTLE_CUT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavGoal {
    pub target: Option<Point3<f32>>,
    pub stopping_distance: f32, // m
    pub sharp_turn_angle: f32,  // deg
}

impl Default for NavGoal {
    fn default() -> Self {
        Self {
            target: None,
            stopping_distance: 5.0,
            sharp_turn_angle: 45.0,
        }
    }
}

impl NavGoal {
    pub fn towards(target: Point3<f32>) -> Self {
        Self { target: Some(target), ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavTuning {
    pub max_speed: f32,                  // m/s
    pub min_speed: f32,                  // m/s, below this always full throttle
    pub steering_sensitivity: f32,
    pub sharp_turn_speed_multiplier: f32,
    pub avoidance_priority: f32,         // 0 = pure pursuit, 1 = pure avoidance
    pub avoidance_enabled: bool,
}

impl Default for NavTuning {
    fn default() -> Self {
        Self {
            max_speed: 20.0,
            min_speed: 5.0,
            steering_sensitivity: 1.5,
            sharp_turn_speed_multiplier: 0.5,
            avoidance_priority: 0.9,
            avoidance_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NavOutput {
    pub signal: ControlSignal,
    pub avoiding: bool,
    pub angle_to_target: f32,    // deg, 0 when there is no target
    pub distance_to_target: f32, // m, 0 when there is no target
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationController {
    tuning: NavTuning,
}

impl NavigationController {
    pub fn new(tuning: NavTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &NavTuning {
        &self.tuning
    }

    pub fn tick(
        &self,
        pose: &Pose,
        goal: &NavGoal,
        reading: ObstacleReading,
        speed: f32,
        max_steering_angle: f32,
    ) -> NavOutput {
        let Some(target) = goal.target else {
            return NavOutput::default();
        };
        let t = &self.tuning;

        let local = pose.inverse_transform_point(&target);
        let angle = local.x.atan2(local.z).to_degrees();
        let distance = (target - pose.position).norm();

        let pursuit = if max_steering_angle > 0.0 {
            (angle / max_steering_angle * t.steering_sensitivity).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let avoiding = t.avoidance_enabled && reading.strength > DETECTION_THRESHOLD;
        let steer = if avoiding {
            lerp(pursuit, reading.steer_bias, t.avoidance_priority)
        } else {
            pursuit
        };

        let throttle = if distance > goal.stopping_distance {
            let mut th = if speed < t.max_speed { 1.0 } else { 0.0 };
            if angle.abs() > goal.sharp_turn_angle {
                th *= t.sharp_turn_speed_multiplier;
            }
            if avoiding {
                th *= 1.0 - reading.strength * AVOID_THROTTLE_CUT;
            }
            // Crawling always gets full throttle, obstacles or not.
            if speed < t.min_speed {
                th = 1.0;
            }
            th
        } else {
            -1.0
        };

        NavOutput {
            signal: ControlSignal::new(throttle, steer),
            avoiding,
            angle_to_target: angle,
            distance_to_target: distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MAX_STEER: f32 = 30.0;

    fn ctl() -> NavigationController {
        NavigationController::new(NavTuning::default())
    }

    fn at_origin() -> Pose {
        Pose::identity()
    }

    fn obstacle(bias: f32, strength: f32) -> ObstacleReading {
        ObstacleReading { steer_bias: bias, strength }
    }

    #[test]
    fn no_target_is_neutral() {
        let out = ctl().tick(&at_origin(), &NavGoal::default(), obstacle(-0.9, 0.9), 3.0, MAX_STEER);
        assert_eq!(out.signal, ControlSignal::NEUTRAL);
        assert!(!out.avoiding);
    }

    #[test]
    fn straight_ahead_slow_goes_full_throttle() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 50.0));
        let out = ctl().tick(&at_origin(), &goal, ObstacleReading::CLEAR, 2.0, MAX_STEER);
        assert_eq!(out.signal.throttle, 1.0);
        assert_relative_eq!(out.signal.steer, 0.0, epsilon = 1e-6);
        assert_relative_eq!(out.distance_to_target, 50.0, epsilon = 1e-4);
    }

    #[test]
    fn at_max_speed_throttle_drops_to_zero() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 50.0));
        let out = ctl().tick(&at_origin(), &goal, ObstacleReading::CLEAR, 25.0, MAX_STEER);
        assert_eq!(out.signal.throttle, 0.0);
    }

    #[test]
    fn sharp_turn_halves_throttle_unless_crawling() {
        // Target 90° to the right.
        let goal = NavGoal::towards(Point3::new(20.0, 0.0, 0.0));
        let cruising = ctl().tick(&at_origin(), &goal, ObstacleReading::CLEAR, 10.0, MAX_STEER);
        assert_relative_eq!(cruising.angle_to_target, 90.0, epsilon = 1e-3);
        assert_eq!(cruising.signal.throttle, 0.5);
        assert_eq!(cruising.signal.steer, 1.0);

        let crawling = ctl().tick(&at_origin(), &goal, ObstacleReading::CLEAR, 1.0, MAX_STEER);
        assert_eq!(crawling.signal.throttle, 1.0);
    }

    #[test]
    fn inside_stopping_distance_reverses_regardless_of_obstacles() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 3.0));
        let clear = ctl().tick(&at_origin(), &goal, ObstacleReading::CLEAR, 8.0, MAX_STEER);
        assert_eq!(clear.signal.throttle, -1.0);

        let blocked = ctl().tick(&at_origin(), &goal, obstacle(0.7, 0.7), 8.0, MAX_STEER);
        assert_eq!(blocked.signal.throttle, -1.0);
        assert!(blocked.avoiding);
    }

    #[test]
    fn avoidance_blends_steer_and_eases_throttle() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 50.0));
        let out = ctl().tick(&at_origin(), &goal, obstacle(-0.6, 0.6), 10.0, MAX_STEER);
        assert!(out.avoiding);
        assert_relative_eq!(out.signal.steer, -0.54, epsilon = 1e-5);
        assert_relative_eq!(out.signal.throttle, 0.7, epsilon = 1e-5);
    }

    #[test]
    fn crawling_keeps_full_throttle_while_avoiding() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 50.0));
        let out = ctl().tick(&at_origin(), &goal, obstacle(-0.6, 0.6), 2.0, MAX_STEER);
        assert!(out.avoiding);
        assert_relative_eq!(out.signal.steer, -0.54, epsilon = 1e-5);
        assert_eq!(out.signal.throttle, 1.0);
    }

    #[test]
    fn weak_reading_or_disabled_avoidance_is_pure_pursuit() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 50.0));
        let weak = ctl().tick(&at_origin(), &goal, obstacle(-1.0, 0.05), 2.0, MAX_STEER);
        assert!(!weak.avoiding);
        assert_eq!(weak.signal.steer, 0.0);

        let off = NavigationController::new(NavTuning { avoidance_enabled: false, ..NavTuning::default() });
        let out = off.tick(&at_origin(), &goal, obstacle(-0.6, 0.6), 2.0, MAX_STEER);
        assert!(!out.avoiding);
        assert_eq!(out.signal.throttle, 1.0);
    }

    #[test]
    fn pursuit_follows_chassis_heading() {
        // Chassis yawed 90° already faces the target on +X.
        let pose = Pose::from_yaw(Point3::origin(), 90.0);
        let goal = NavGoal::towards(Point3::new(30.0, 0.0, 0.0));
        let out = ctl().tick(&pose, &goal, ObstacleReading::CLEAR, 2.0, MAX_STEER);
        assert_relative_eq!(out.angle_to_target, 0.0, epsilon = 1e-3);

        // 10° left => -10/30*1.5 = -0.5
        let left = Point3::new(-(10f32.to_radians().sin()), 0.0, 10f32.to_radians().cos()) * 40.0;
        let out = ctl().tick(&at_origin(), &NavGoal::towards(left), ObstacleReading::CLEAR, 2.0, MAX_STEER);
        assert_relative_eq!(out.signal.steer, -0.5, epsilon = 1e-4);
    }

    #[test]
    fn no_steering_authority_means_no_pursuit() {
        let goal = NavGoal::towards(Point3::new(20.0, 0.0, 0.0));
        let out = ctl().tick(&at_origin(), &goal, ObstacleReading::CLEAR, 2.0, 0.0);
        assert_eq!(out.signal.steer, 0.0);
    }
}
