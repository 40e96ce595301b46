// ==============================================================================
// config.rs — VEHICLE CONFIGURATION (JSON on disk, presets in code)
// ------------------------------------------------------------------------------
// One VehicleConfig describes everything a vehicle needs at construction:
// - drivetrain tuning + wheel layout (WheelSpec) and per-wheel rapier mount
// - chassis body (mass, extents, damping)
// - autopilot tuning (NavTuning, SensorConfig)
// - collision damage (HealthConfig)
//
// Every section is #[serde(default)], so a JSON file only needs the fields it
// overrides. validate() runs once at load/spawn time; tick code never fails.
// ==============================================================================

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::drivetrain::{Axle, VehicleTuning, WheelSpec};
use crate::health::HealthConfig;
use crate::navigation::NavTuning;
use crate::physics::{GROUP_CHASSIS, GROUP_OBSTACLE};
use crate::sensor::{LayerMask, SensorConfig, MAX_RAYS};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

// ----------------------------------------------------------------------------
// Physical mount of one raycast wheel (consumed by the rapier binding only)
// ----------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelMount {
    pub offset: [f32; 3],          // chassis-local hard point
    pub radius: f32,               // m
    pub rest_length: f32,          // suspension neutral length
    pub max_travel: f32,           // m
    pub stiffness: f32,            // per unit chassis mass
    pub damping: f32,
    pub friction_slip: f32,
    pub max_suspension_force: f32, // N
}

impl Default for WheelMount {
    fn default() -> Self {
        Self {
            offset: [0.0, -0.3, 0.0],
            radius: 0.35,
            rest_length: 0.5,
            max_travel: 0.4,
            stiffness: 60.0,
            damping: 6.0,
            friction_slip: 2.0,
            max_suspension_force: 30_000.0,
        }
    }
}

impl WheelMount {
    pub fn at(offset: [f32; 3]) -> Self {
        Self { offset, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    pub spec: WheelSpec,
    #[serde(default)]
    pub mount: WheelMount,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisConfig {
    pub mass: f32,                // kg
    pub half_extents: [f32; 3],   // [hx, hy, hz] meters
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl Default for ChassisConfig {
    fn default() -> Self {
        Self {
            mass: 1350.0,
            half_extents: [1.0, 0.35, 2.1],
            linear_damping: 0.08,
            angular_damping: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub tuning: VehicleTuning,
    pub wheels: Vec<WheelConfig>,
    pub chassis: ChassisConfig,
    pub nav: NavTuning,
    pub sensor: SensorConfig,
    pub health: HealthConfig,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self::player()
    }
}

/// FL, FR steer; RL, RR drive. Hard points match a ~2.5 m wheelbase hatchback.
fn rear_drive_layout() -> Vec<WheelConfig> {
    let mounts = [
        [-0.8, -0.3, 1.5],
        [0.8, -0.3, 1.5],
        [-0.8, -0.3, -1.5],
        [0.8, -0.3, -1.5],
    ];
    WheelSpec::rear_drive_four()
        .into_iter()
        .zip(mounts)
        .map(|(spec, offset)| WheelConfig { spec, mount: WheelMount::at(offset) })
        .collect()
}

impl VehicleConfig {
    /// Player car.
    pub fn player() -> Self {
        Self {
            tuning: VehicleTuning {
                center_of_mass: [0.0, -0.15, 0.0],
                ..VehicleTuning::default()
            },
            wheels: rear_drive_layout(),
            chassis: ChassisConfig::default(),
            nav: NavTuning::default(),
            sensor: SensorConfig::default(),
            health: HealthConfig {
                damage_layer_mask: LayerMask(GROUP_CHASSIS.bits() | GROUP_OBSTACLE.bits()),
                ..HealthConfig::default()
            },
        }
    }

    /// AI pursuer. Same drivetrain, sensor only sees obstacles and other cars.
    pub fn pursuer() -> Self {
        let mut cfg = Self::player();
        cfg.sensor.layer_mask = LayerMask(GROUP_CHASSIS.bits() | GROUP_OBSTACLE.bits());
        cfg
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        debug!("loaded vehicle config from {}", path.display());
        Ok(cfg)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn wheel_specs(&self) -> Vec<WheelSpec> {
        self.wheels.iter().map(|w| w.spec.clone()).collect()
    }

    /// Rejects values tick code would turn into nonsense. Layout gaps only warn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tuning;
        non_negative("max_motor_torque", t.max_motor_torque)?;
        non_negative("max_brake_torque", t.max_brake_torque)?;
        non_negative("accel_response", t.accel_response)?;
        non_negative("decel_response", t.decel_response)?;
        non_negative("max_steering_angle", t.max_steering_angle)?;
        finite("turn_sensitivity", t.turn_sensitivity)?;
        finite("min_speed_for_steer_attenuation", t.min_speed_for_steer_attenuation)?;
        for (axis, v) in t.center_of_mass.iter().enumerate() {
            finite(&format!("center_of_mass[{axis}]"), *v)?;
        }

        let s = &self.sensor;
        if s.num_rays > MAX_RAYS {
            return Err(ConfigError::Invalid(format!(
                "sensor.num_rays = {} exceeds {MAX_RAYS}",
                s.num_rays
            )));
        }
        non_negative("sensor.spread_angle", s.spread_angle)?;
        non_negative("sensor.max_distance", s.max_distance)?;
        finite("sensor.origin_height", s.origin_height)?;

        let n = &self.nav;
        non_negative("nav.max_speed", n.max_speed)?;
        non_negative("nav.min_speed", n.min_speed)?;
        finite("nav.steering_sensitivity", n.steering_sensitivity)?;
        non_negative("nav.sharp_turn_speed_multiplier", n.sharp_turn_speed_multiplier)?;
        if !(0.0..=1.0).contains(&n.avoidance_priority) {
            return Err(ConfigError::Invalid(format!(
                "nav.avoidance_priority = {} must be within [0, 1]",
                n.avoidance_priority
            )));
        }

        if !(self.chassis.mass > 0.0) || !self.chassis.mass.is_finite() {
            return Err(ConfigError::Invalid(format!("chassis.mass = {} must be positive", self.chassis.mass)));
        }
        if self.chassis.half_extents.iter().any(|h| !(*h > 0.0)) {
            return Err(ConfigError::Invalid("chassis.half_extents must be positive".into()));
        }

        let h = &self.health;
        non_negative("health.max_health", h.max_health)?;
        non_negative("health.damage_scale", h.damage_scale)?;
        non_negative("health.invulnerability", h.invulnerability)?;

        let mut slots = HashSet::new();
        for w in &self.wheels {
            if !slots.insert(w.spec.slot) {
                return Err(ConfigError::Invalid(format!(
                    "wheel {} reuses actuator slot {}",
                    w.spec.name, w.spec.slot
                )));
            }
            if !(w.mount.radius > 0.0) {
                return Err(ConfigError::Invalid(format!("wheel {} radius must be positive", w.spec.name)));
            }
            non_negative(&format!("wheel {} rest_length", w.spec.name), w.mount.rest_length)?;
        }

        if !self.wheels.iter().any(|w| w.spec.driven) {
            warn!("⚠️ vehicle config has no driven wheel; it will never accelerate");
        }
        if !self.wheels.iter().any(|w| w.spec.axle == Axle::Front) {
            warn!("⚠️ vehicle config has no front wheel; steering input is ignored");
        }

        Ok(())
    }
}

fn finite(name: &str, v: f32) -> Result<(), ConfigError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} = {v} is not finite")))
    }
}

fn non_negative(name: &str, v: f32) -> Result<(), ConfigError> {
    finite(name, v)?;
    if v < 0.0 {
        return Err(ConfigError::Invalid(format!("{name} = {v} must not be negative")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("drive-core-{}-{name}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn presets_validate() {
        assert!(VehicleConfig::player().validate().is_ok());
        assert!(VehicleConfig::pursuer().validate().is_ok());
        assert_eq!(VehicleConfig::player().wheels.len(), 4);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let path = temp_path("roundtrip");
        let mut cfg = VehicleConfig::pursuer();
        cfg.tuning.max_motor_torque = 2100.0;
        cfg.save(&path).unwrap();

        let loaded = VehicleConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let path = temp_path("partial");
        fs::write(&path, r#"{ "tuning": { "max_steering_angle": 25.0 }, "sensor": { "num_rays": 5 } }"#).unwrap();

        let cfg = VehicleConfig::load(&path).unwrap();
        assert_eq!(cfg.tuning.max_steering_angle, 25.0);
        assert_eq!(cfg.tuning.max_motor_torque, 1500.0);
        assert_eq!(cfg.sensor.num_rays, 5);
        assert_eq!(cfg.sensor.spread_angle, 70.0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_and_bad_json_are_distinct_errors() {
        let missing = VehicleConfig::load(temp_path("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));

        let path = temp_path("garbage");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(VehicleConfig::load(&path), Err(ConfigError::Parse { .. })));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn too_many_rays_is_rejected() {
        let mut cfg = VehicleConfig::player();
        cfg.sensor.num_rays = 65;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn duplicate_slots_are_rejected() {
        let mut cfg = VehicleConfig::player();
        cfg.wheels[3].spec.slot = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("slot 0"));
    }

    #[test]
    fn negative_or_nan_tuning_is_rejected() {
        let mut cfg = VehicleConfig::player();
        cfg.tuning.max_brake_torque = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = VehicleConfig::player();
        cfg.tuning.accel_response = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_driven_wheel_only_warns() {
        let mut cfg = VehicleConfig::player();
        for w in &mut cfg.wheels {
            w.spec.driven = false;
        }
        assert!(cfg.validate().is_ok());
    }
}
