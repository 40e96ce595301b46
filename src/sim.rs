// ==============================================================================
// sim.rs — FIXED-TICK SIMULATION (vehicles + rapier world + time scale)
// ------------------------------------------------------------------------------
// tick():
//   1) every vehicle: Vehicle::tick against its RapierHost
//   2) PhysicsWorld::step(fixed_dt)
//   3) impacts -> VehicleHealth
//   4) every vehicle: sync_visuals
//   5) time scale counts down in real (unscaled) time
//
// snapshot(): serializable view of the world for logging/clients.
// ==============================================================================

use log::{info, warn};
use nalgebra::Point3;
use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigError, VehicleConfig};
use crate::control::ControlSignal;
use crate::health::HealthEvent;
use crate::physics::{PhysicsWorld, VehicleId};
use crate::time_scale::{TimeScale, TimeScaleConfig};
use crate::vehicle::{ChassisState, Driver, Vehicle};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("unknown vehicle {0}")]
    UnknownVehicle(VehicleId),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub name: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4], // quaternion (x, y, z, w)
    pub forward_speed: f32,
    pub health: f32,
    pub destroyed: bool,
    pub signal: ControlSignal,
    pub throttle: f32,
    pub steer_angle: f32,
    pub avoiding: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    pub time: f64,
    pub time_scale: f32,
    pub vehicles: Vec<VehicleSnapshot>,
}

pub struct Simulation {
    world: PhysicsWorld,
    vehicles: Vec<(VehicleId, Vehicle)>,
    time_scale: TimeScale,
    tick: u64,
    time: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(TimeScaleConfig::default())
    }
}

impl Simulation {
    pub fn new(time_scale: TimeScaleConfig) -> Self {
        Self {
            world: PhysicsWorld::new(),
            vehicles: Vec::new(),
            time_scale: TimeScale::new(time_scale),
            tick: 0,
            time: 0.0,
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn time_scale(&self) -> &TimeScale {
        &self.time_scale
    }

    pub fn time_scale_mut(&mut self) -> &mut TimeScale {
        &mut self.time_scale
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn spawn(
        &mut self,
        name: &str,
        config: &VehicleConfig,
        driver: Driver,
        position: [f32; 3],
        yaw_deg: f32,
    ) -> Result<VehicleId, SimError> {
        let id = self.world.spawn_vehicle(config, position, yaw_deg)?;
        self.vehicles.push((id, Vehicle::new(name, config, driver, Vec::new())));
        Ok(id)
    }

    pub fn despawn(&mut self, id: VehicleId) -> Result<(), SimError> {
        let index = self
            .vehicles
            .iter()
            .position(|(v, _)| *v == id)
            .ok_or(SimError::UnknownVehicle(id))?;
        self.vehicles.remove(index);
        self.world.remove_vehicle(id);
        Ok(())
    }

    pub fn vehicle(&self, id: VehicleId) -> Result<&Vehicle, SimError> {
        self.vehicles
            .iter()
            .find(|(v, _)| *v == id)
            .map(|(_, vehicle)| vehicle)
            .ok_or(SimError::UnknownVehicle(id))
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Result<&mut Vehicle, SimError> {
        self.vehicles
            .iter_mut()
            .find(|(v, _)| *v == id)
            .map(|(_, vehicle)| vehicle)
            .ok_or(SimError::UnknownVehicle(id))
    }

    pub fn chassis(&self, id: VehicleId) -> Result<ChassisState, SimError> {
        self.world.chassis_state(id).ok_or(SimError::UnknownVehicle(id))
    }

    pub fn set_human_input(&mut self, id: VehicleId, vertical: f32, horizontal: f32, brake: bool) -> Result<(), SimError> {
        self.vehicle_mut(id)?.set_human_input(vertical, horizontal, brake);
        Ok(())
    }

    pub fn set_target(&mut self, id: VehicleId, target: Option<Point3<f32>>) -> Result<(), SimError> {
        self.vehicle_mut(id)?.set_target(target);
        Ok(())
    }

    /// Advance one fixed tick. Returns health events raised by this tick's impacts.
    pub fn tick(&mut self) -> Vec<(VehicleId, HealthEvent)> {
        let dt = self.time_scale.fixed_dt();

        // 1) vehicles write their wheel commands
        for (id, vehicle) in &mut self.vehicles {
            match self.world.host(*id) {
                Some(mut host) => {
                    vehicle.tick(&mut host, dt);
                }
                None => warn!("⚠️ {}: no physics rig, tick skipped", vehicle.name()),
            }
        }

        // 2) physics
        let impacts = self.world.step(dt);
        self.time += dt as f64;

        // 3) damage
        let mut events = Vec::new();
        for impact in impacts {
            let Some((_, vehicle)) = self.vehicles.iter_mut().find(|(v, _)| *v == impact.vehicle) else {
                continue;
            };
            if let Some(event) = vehicle.on_impact(impact.relative_speed, impact.layer_bits, self.time) {
                if event == HealthEvent::Destroyed {
                    info!("💀 {} destroyed at tick {}", vehicle.name(), self.tick);
                }
                events.push((impact.vehicle, event));
            }
        }

        // 4) visuals read the committed wheel poses
        for (id, vehicle) in &mut self.vehicles {
            if let Some(host) = self.world.host(*id) {
                vehicle.sync_visuals(&host);
            }
        }

        // 5) timed effects run on real time
        self.time_scale.advance(self.time_scale.base_dt());
        self.tick += 1;

        events
    }

    pub fn snapshot(&self) -> Snapshot {
        let vehicles = self
            .vehicles
            .iter()
            .filter_map(|(id, vehicle)| {
                let state = self.world.chassis_state(*id)?;
                let p = state.pose.position;
                let q = state.pose.rotation;
                let diag = vehicle.diagnostics();
                Some(VehicleSnapshot {
                    id: *id,
                    name: vehicle.name().to_string(),
                    position: [p.x, p.y, p.z],
                    rotation: [q.i, q.j, q.k, q.w],
                    forward_speed: state.forward_speed(),
                    health: vehicle.health().current(),
                    destroyed: vehicle.health().is_dead(),
                    signal: vehicle.last_signal(),
                    throttle: diag.throttle,
                    steer_angle: diag.steer_angle,
                    avoiding: diag.avoiding,
                })
            })
            .collect();

        Snapshot {
            tick: self.tick,
            time: self.time,
            time_scale: self.time_scale.scale(),
            vehicles,
        }
    }
}
