// ==============================================================================
// diagnostics.rs — PER-VEHICLE DEBUG OUTPUT
// ------------------------------------------------------------------------------
// Serializable snapshot of what a vehicle decided this tick:
// - avoidance flag + obstacle reading
// - sensor rays (DebugRay, colored by per-ray strength)
// - drivetrain state (smoothed throttle, front steer angle, torque mode)
//
// Produced for logging and gizmo drawing only. Control code never reads it.
// ==============================================================================

use serde::Serialize;

use crate::drivetrain::types::{clamp01, lerp};
use crate::drivetrain::TorqueMode;
use crate::sensor::{ObstacleReading, SensorRay};

const CLEAR_COLOR: [f32; 3] = [0.2, 0.9, 0.2];
const HIT_COLOR: [f32; 3] = [1.0, 0.15, 0.1];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DebugRay {
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub length: f32,
    pub hit: Option<[f32; 3]>,
    pub color: [f32; 3],
}

impl From<&SensorRay> for DebugRay {
    fn from(ray: &SensorRay) -> Self {
        let [ox, oy, oz] = ray.origin;
        let [dx, dy, dz] = ray.direction;
        let hit = ray.hit_distance.map(|d| [ox + dx * d, oy + dy * d, oz + dz * d]);

        let color = if hit.is_some() {
            let t = clamp01(ray.strength);
            std::array::from_fn(|i| lerp(CLEAR_COLOR[i], HIT_COLOR[i], t))
        } else {
            CLEAR_COLOR
        };

        Self {
            origin: ray.origin,
            direction: ray.direction,
            length: ray.length,
            hit,
            color,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub avoiding: bool,
    pub reading: ObstacleReading,
    pub rays: Vec<DebugRay>,
    pub throttle: f32,
    pub steer_angle: f32,
    pub mode: Option<TorqueMode>,
}

impl Diagnostics {
    pub fn clear(&mut self) {
        self.avoiding = false;
        self.reading = ObstacleReading::CLEAR;
        self.rays.clear();
    }

    pub fn set_rays(&mut self, rays: &[SensorRay]) {
        self.rays.clear();
        self.rays.extend(rays.iter().map(DebugRay::from));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_color(actual: [f32; 3], expected: [f32; 3]) {
        for (a, e) in actual.iter().zip(expected) {
            assert_relative_eq!(*a, e, epsilon = 1e-5);
        }
    }

    fn ray(hit_distance: Option<f32>, strength: f32) -> SensorRay {
        SensorRay {
            angle: 0.0,
            origin: [0.0, 0.5, 0.0],
            direction: [0.0, 0.0, 1.0],
            length: hit_distance.unwrap_or(15.0),
            hit_distance,
            strength,
        }
    }

    #[test]
    fn missed_ray_is_drawn_clear_at_full_length() {
        let d = DebugRay::from(&ray(None, 0.0));
        assert_eq!(d.hit, None);
        assert_eq!(d.length, 15.0);
        assert_eq!(d.color, CLEAR_COLOR);
    }

    #[test]
    fn hit_ray_marks_point_and_turns_red_with_strength() {
        let d = DebugRay::from(&ray(Some(4.0), 1.0));
        assert_eq!(d.hit, Some([0.0, 0.5, 4.0]));
        assert_color(d.color, HIT_COLOR);
    }

    #[test]
    fn half_strength_hit_is_halfway_between_colors() {
        let d = DebugRay::from(&ray(Some(8.0), 0.5));
        assert_color(d.color, [0.6, 0.525, 0.15]);
    }

    #[test]
    fn clear_resets_sensor_fields() {
        let mut diag = Diagnostics::default();
        diag.avoiding = true;
        diag.set_rays(&[ray(Some(2.0), 0.5), ray(None, 0.0)]);
        assert_eq!(diag.rays.len(), 2);

        diag.clear();
        assert!(!diag.avoiding);
        assert!(diag.rays.is_empty());
    }
}
