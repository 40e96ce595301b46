// ==============================================================================
// sensor.rs — FORWARD RAY FAN OBSTACLE SENSOR
// ==============================================================================
// Casts num_rays horizontal rays evenly spread over [-spread, +spread] around
// the chassis forward vector and folds the hits into one ObstacleReading:
//
//   distance_factor = 1 - d / max_distance
//   angle_factor    = 1 - |angle| / spread
//   ray_strength    = distance_factor * angle_factor
//
//   strength = max(ray_strength)                 (worst case, not a sum)
//   vote     = Σ -sign(angle) * ray_strength     (steer away from the side)
//
//   strength > DETECTION_THRESHOLD  =>  steer_bias = sign(vote) * strength
//   otherwise                           strength = steer_bias = 0
//
// A hit dead ahead (angle = 0) raises strength but casts no direction vote,
// so a lone head-on obstacle produces strength with a zero bias.
//
// Stateless: nothing carries over between calls.
// ==============================================================================

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::drivetrain::types::{clamp01, lerp, sign};
use crate::pose::yaw;

/// Readings at or below this strength count as "nothing there".
pub const DETECTION_THRESHOLD: f32 = 0.1;

/// Upper bound accepted by config validation.
pub const MAX_RAYS: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    pub fn contains(&self, layer_bits: u32) -> bool {
        self.0 & layer_bits != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub point: Point3<f32>,
    /// Hit belongs to the casting vehicle (chassis or anything attached to it).
    pub is_self: bool,
}

/// Synchronous ray queries against the physics collaborator's current state.
pub trait RayCaster {
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub num_rays: u32,
    pub spread_angle: f32,   // degrees to each side of forward
    pub max_distance: f32,   // m
    pub layer_mask: LayerMask,
    pub origin_height: f32,  // m above the chassis origin
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            num_rays: 9,
            spread_angle: 70.0,
            max_distance: 15.0,
            layer_mask: LayerMask::ALL,
            origin_height: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ObstacleReading {
    pub steer_bias: f32, // -1..1
    pub strength: f32,   // 0..1
}

impl ObstacleReading {
    pub const CLEAR: ObstacleReading = ObstacleReading { steer_bias: 0.0, strength: 0.0 };

    pub fn detected(&self) -> bool {
        self.strength > DETECTION_THRESHOLD
    }
}

/// One ray of the last scan, for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorRay {
    pub angle: f32,                 // degrees
    pub origin: [f32; 3],
    pub direction: [f32; 3],
    pub length: f32,
    pub hit_distance: Option<f32>,
    pub strength: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SensorScan {
    pub reading: ObstacleReading,
    pub rays: Vec<SensorRay>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObstacleSensor {
    config: SensorConfig,
}

impl ObstacleSensor {
    pub fn new(config: SensorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Ray angles (degrees) for the configured fan.
    pub fn ray_angles(&self) -> Vec<f32> {
        let n = self.config.num_rays;
        let spread = self.config.spread_angle;
        (0..n)
            .map(|i| {
                let t = if n > 1 { i as f32 / (n - 1) as f32 } else { 0.5 };
                lerp(-spread, spread, t)
            })
            .collect()
    }

    pub fn sense<C: RayCaster + ?Sized>(&self, caster: &C, origin: Point3<f32>, forward: Vector3<f32>) -> ObstacleReading {
        self.run(caster, origin, forward, None)
    }

    /// Same as `sense`, also returning every ray for debug drawing.
    pub fn scan<C: RayCaster + ?Sized>(&self, caster: &C, origin: Point3<f32>, forward: Vector3<f32>) -> SensorScan {
        let mut rays = Vec::with_capacity(self.config.num_rays as usize);
        let reading = self.run(caster, origin, forward, Some(&mut rays));
        SensorScan { reading, rays }
    }

    fn run<C: RayCaster + ?Sized>(
        &self,
        caster: &C,
        chassis_origin: Point3<f32>,
        forward: Vector3<f32>,
        mut rays: Option<&mut Vec<SensorRay>>,
    ) -> ObstacleReading {
        let SensorConfig { spread_angle, max_distance, layer_mask, origin_height, .. } = self.config;

        if !(max_distance > 0.0) || self.config.num_rays == 0 {
            return ObstacleReading::CLEAR;
        }
        let Some(forward) = flat_forward(forward) else {
            return ObstacleReading::CLEAR;
        };
        let origin = chassis_origin + Vector3::y() * origin_height;

        let mut strength = 0.0_f32;
        let mut vote = 0.0_f32;

        for angle in self.ray_angles() {
            let direction = yaw(angle) * forward;
            let hit = caster
                .cast_ray(origin, direction, max_distance, layer_mask)
                .filter(|h| !h.is_self && h.distance <= max_distance);

            let mut ray_strength = 0.0;
            if let Some(hit) = hit {
                let distance_factor = clamp01(1.0 - hit.distance / max_distance);
                let angle_factor = if spread_angle > 0.0 {
                    clamp01(1.0 - angle.abs() / spread_angle)
                } else {
                    1.0
                };
                ray_strength = distance_factor * angle_factor;

                strength = strength.max(ray_strength);
                vote += -sign(angle) * ray_strength;
            }

            if let Some(rays) = rays.as_deref_mut() {
                rays.push(SensorRay {
                    angle,
                    origin: origin.coords.into(),
                    direction: direction.into(),
                    length: hit.map(|h| h.distance).unwrap_or(max_distance),
                    hit_distance: hit.map(|h| h.distance),
                    strength: ray_strength,
                });
            }
        }

        if strength > DETECTION_THRESHOLD {
            ObstacleReading {
                steer_bias: (sign(vote) * clamp01(strength)).clamp(-1.0, 1.0),
                strength: clamp01(strength),
            }
        } else {
            ObstacleReading::CLEAR
        }
    }
}

// Horizontal component of the chassis forward, normalized.
fn flat_forward(forward: Vector3<f32>) -> Option<Vector3<f32>> {
    let flat = Vector3::new(forward.x, 0.0, forward.z);
    let n = flat.norm();
    if n > 1e-6 && n.is_finite() { Some(flat / n) } else { None }
}
