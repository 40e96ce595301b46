// ==============================================================================
// physics.rs — RAPIER PHYSICS COLLABORATOR
// ------------------------------------------------------------------------------
// Owns the rapier pipeline + sets and one DynamicRayCastVehicleController per
// spawned vehicle. Suspension, tire friction and integration all live here.
//
// Per tick (driven by sim.rs):
//   host(id)   -> RapierHost: chassis state, ray casts, wheel actuators
//                 (the vehicle writes its WheelCommands through this)
//   step(dt)   -> vehicle controllers, pipeline step, exploding-body reset,
//                 new chassis contacts reported as Impact
//
// Frame: +Y up, +Z forward. Raycast wheels hang along -Y with axle -X so a
// positive steering angle yaws the wheel toward +X.
// ==============================================================================

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use rapier3d::control::{DynamicRayCastVehicleController, Wheel, WheelTuning};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::actuator::{WheelActuator, WheelRig};
use crate::config::{ConfigError, VehicleConfig};
use crate::pose::Pose;
use crate::sensor::{LayerMask, RayCaster, RayHit};
use crate::vehicle::{ChassisSource, ChassisState};

pub const GROUP_GROUND: Group = Group::from_bits_truncate(0b0001);
pub const GROUP_CHASSIS: Group = Group::from_bits_truncate(0b0010);
pub const GROUP_OBSTACLE: Group = Group::from_bits_truncate(0b0100);

const WORLD_LIMIT: Real = 1_000.0;

pub type VehicleId = Uuid;

/// New contact between a vehicle chassis and something else this step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Impact {
    pub vehicle: VehicleId,
    pub relative_speed: f32, // m/s, pre-step closing speed
    pub layer_bits: u32,     // membership bits of the other collider
}

struct VehicleRig {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    controller: DynamicRayCastVehicleController,
    spawn: Vector<Real>,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    query_pipeline: QueryPipeline,
    rigs: HashMap<VehicleId, VehicleRig>,
    touching: HashSet<(ColliderHandle, ColliderHandle)>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        // Large static ground box, top surface exactly at y = 0.
        let ground = bodies.insert(RigidBodyBuilder::fixed().translation(vector![0.0, -1.0, 0.0]).build());
        let ground_collider = ColliderBuilder::cuboid(500.0, 1.0, 500.0)
            .collision_groups(InteractionGroups::new(GROUP_GROUND, GROUP_CHASSIS))
            .friction(1.2)
            .restitution(0.0)
            .build();
        colliders.insert_with_parent(ground_collider, ground, &mut bodies);

        let mut query_pipeline = QueryPipeline::new();
        query_pipeline.update(&colliders);

        info!("🌎 Ground inserted. Bodies = {}, Colliders = {}", bodies.len(), colliders.len());

        Self {
            gravity: vector![0.0, -9.81, 0.0],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline,
            rigs: HashMap::new(),
            touching: HashSet::new(),
        }
    }

    pub fn vehicle_count(&self) -> usize {
        self.rigs.len()
    }

    /// Dynamic chassis + one raycast wheel per configured wheel.
    pub fn spawn_vehicle(&mut self, config: &VehicleConfig, position: [f32; 3], yaw_deg: f32) -> Result<VehicleId, ConfigError> {
        config.validate()?;

        let chassis = &config.chassis;
        let [hx, hy, hz] = chassis.half_extents;
        let m = chassis.mass;
        let inertia = vector![
            m / 3.0 * (hy * hy + hz * hz),
            m / 3.0 * (hx * hx + hz * hz),
            m / 3.0 * (hx * hx + hy * hy)
        ];
        let com = point![
            config.tuning.center_of_mass[0],
            config.tuning.center_of_mass[1],
            config.tuning.center_of_mass[2]
        ];

        let spawn = vector![position[0], position[1], position[2]];
        let rb = RigidBodyBuilder::dynamic()
            .translation(spawn)
            .rotation(vector![0.0, yaw_deg.to_radians(), 0.0])
            .linear_damping(chassis.linear_damping)
            .angular_damping(chassis.angular_damping)
            .additional_mass_properties(MassProperties::new(com, m, inertia))
            .ccd_enabled(true)
            .build();
        let body = self.bodies.insert(rb);

        // Mass comes entirely from additional_mass_properties.
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .density(0.0)
            .collision_groups(InteractionGroups::new(
                GROUP_CHASSIS,
                GROUP_GROUND | GROUP_CHASSIS | GROUP_OBSTACLE,
            ))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .friction(0.3)
            .restitution(0.0)
            .build();
        let collider = self.colliders.insert_with_parent(collider, body, &mut self.bodies);

        let mut controller = DynamicRayCastVehicleController::new(body);
        controller.index_up_axis = 1;
        controller.index_forward_axis = 2;
        for wheel in &config.wheels {
            let mount = &wheel.mount;
            let tuning = WheelTuning {
                suspension_stiffness: mount.stiffness,
                suspension_compression: mount.damping,
                suspension_damping: mount.damping,
                max_suspension_travel: mount.max_travel,
                friction_slip: mount.friction_slip,
                max_suspension_force: mount.max_suspension_force,
                ..WheelTuning::default()
            };
            let [x, y, z] = mount.offset;
            controller.add_wheel(point![x, y, z], -Vector::y(), -Vector::x(), mount.rest_length, mount.radius, &tuning);
        }

        let id = Uuid::new_v4();
        self.rigs.insert(id, VehicleRig { body, collider, controller, spawn });
        self.query_pipeline.update(&self.colliders);

        info!("🚗 Spawned vehicle {id} at {position:?} yaw {yaw_deg:.0}° ({} wheels)", config.wheels.len());
        Ok(id)
    }

    pub fn remove_vehicle(&mut self, id: VehicleId) -> bool {
        let Some(rig) = self.rigs.remove(&id) else { return false };
        self.bodies.remove(
            rig.body,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true,
        );
        self.touching.retain(|(a, b)| *a != rig.collider && *b != rig.collider);
        self.query_pipeline.update(&self.colliders);
        true
    }

    /// Fixed box on the obstacle group. Sensors see it, chassis collide with it.
    pub fn add_obstacle(&mut self, position: [f32; 3], half_extents: [f32; 3]) -> ColliderHandle {
        let [hx, hy, hz] = half_extents;
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .translation(vector![position[0], position[1], position[2]])
            .collision_groups(InteractionGroups::new(GROUP_OBSTACLE, GROUP_CHASSIS))
            .friction(0.8)
            .build();
        let handle = self.colliders.insert(collider);
        self.query_pipeline.update(&self.colliders);
        debug!("obstacle at {position:?} half extents {half_extents:?}");
        handle
    }

    pub fn chassis_state(&self, id: VehicleId) -> Option<ChassisState> {
        let rig = self.rigs.get(&id)?;
        chassis_state(&self.bodies, rig.body)
    }

    /// Borrow everything a vehicle tick needs for this vehicle.
    pub fn host(&mut self, id: VehicleId) -> Option<RapierHost<'_>> {
        let rig = self.rigs.get_mut(&id)?;
        Some(RapierHost {
            body: rig.body,
            bodies: &self.bodies,
            colliders: &self.colliders,
            queries: &self.query_pipeline,
            wheels: rig.controller.wheels_mut(),
        })
    }

    pub fn step(&mut self, dt: Real) -> Vec<Impact> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Vec::new();
        }

        // 1) Raycast suspension + tire impulses from the last WheelCommands.
        self.query_pipeline.update(&self.colliders);
        for rig in self.rigs.values_mut() {
            let filter = QueryFilter::default()
                .exclude_rigid_body(rig.body)
                .groups(InteractionGroups::new(GROUP_CHASSIS, GROUP_GROUND | GROUP_OBSTACLE | GROUP_CHASSIS));
            rig.controller.update_vehicle(dt, &mut self.bodies, &self.colliders, &self.query_pipeline, filter);
        }

        // Closing speeds are measured before the solver resolves the contact.
        let velocities: HashMap<RigidBodyHandle, Vector<Real>> =
            self.bodies.iter().map(|(h, b)| (h, *b.linvel())).collect();

        // 2) Step physics.
        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters { dt, ..IntegrationParameters::default() },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        // 3) Safety: keep bodies from exploding to insane coordinates.
        self.reset_exploded_bodies();

        // 4) Contacts that started this step.
        self.collect_impacts(&velocities)
    }

    fn reset_exploded_bodies(&mut self) {
        let spawns: HashMap<RigidBodyHandle, Vector<Real>> =
            self.rigs.values().map(|r| (r.body, r.spawn)).collect();

        for (handle, body) in self.bodies.iter_mut() {
            let pos = *body.translation();
            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > WORLD_LIMIT
                || pos.y.abs() > WORLD_LIMIT
                || pos.z.abs() > WORLD_LIMIT;

            if bad {
                let reset = spawns.get(&handle).copied().unwrap_or(vector![0.0, 1.0, 0.0]);
                body.set_translation(reset, true);
                body.set_linvel(Vector::zeros(), true);
                body.set_angvel(Vector::zeros(), true);
                warn!("⚠️ Reset exploding body back to {:?}", reset);
            }
        }
    }

    fn collect_impacts(&mut self, velocities: &HashMap<RigidBodyHandle, Vector<Real>>) -> Vec<Impact> {
        let mut impacts = Vec::new();
        let mut touching = HashSet::new();

        for (&id, rig) in &self.rigs {
            let own_vel = velocities.get(&rig.body).copied().unwrap_or_else(Vector::zeros);

            for pair in self.narrow_phase.contact_pairs_with(rig.collider) {
                if !pair.has_any_active_contact {
                    continue;
                }
                let other = if pair.collider1 == rig.collider { pair.collider2 } else { pair.collider1 };
                let key = (rig.collider, other);
                touching.insert(key);
                if self.touching.contains(&key) {
                    continue;
                }

                let Some(other_collider) = self.colliders.get(other) else { continue };
                let other_vel = other_collider
                    .parent()
                    .and_then(|h| velocities.get(&h).copied())
                    .unwrap_or_else(Vector::zeros);

                impacts.push(Impact {
                    vehicle: id,
                    relative_speed: (own_vel - other_vel).norm(),
                    layer_bits: other_collider.collision_groups().memberships.bits(),
                });
            }
        }

        self.touching = touching;
        impacts
    }
}

fn chassis_state(bodies: &RigidBodySet, handle: RigidBodyHandle) -> Option<ChassisState> {
    let body = bodies.get(handle)?;
    let iso = body.position();
    Some(ChassisState {
        pose: Pose::new(iso.translation.vector.into(), iso.rotation),
        linear_velocity: *body.linvel(),
        angular_velocity: *body.angvel(),
        world_center_of_mass: *body.center_of_mass(),
    })
}

// ==============================================================================
// Per-vehicle view handed to Vehicle::tick / Vehicle::sync_visuals
// ==============================================================================

pub struct RapierHost<'w> {
    body: RigidBodyHandle,
    bodies: &'w RigidBodySet,
    colliders: &'w ColliderSet,
    queries: &'w QueryPipeline,
    wheels: &'w mut [Wheel],
}

impl ChassisSource for RapierHost<'_> {
    fn chassis(&self) -> Option<ChassisState> {
        chassis_state(self.bodies, self.body)
    }
}

impl RayCaster for RapierHost<'_> {
    fn cast_ray(&self, origin: Point<Real>, direction: Vector<Real>, max_distance: f32, mask: LayerMask) -> Option<RayHit> {
        let ray = Ray::new(origin, direction);
        let filter = QueryFilter::default()
            .exclude_rigid_body(self.body)
            .groups(InteractionGroups::new(Group::ALL, Group::from_bits_truncate(mask.0)));

        let (handle, toi) = self.queries.cast_ray(self.bodies, self.colliders, &ray, max_distance, true, filter)?;
        let is_self = self
            .colliders
            .get(handle)
            .and_then(|c| c.parent())
            .is_some_and(|parent| parent == self.body);

        Some(RayHit {
            distance: toi,
            point: ray.point_at(toi),
            is_self,
        })
    }
}

impl WheelRig for RapierHost<'_> {
    fn actuator(&self, slot: usize) -> Option<&dyn WheelActuator> {
        self.wheels.get(slot).map(|w| w as &dyn WheelActuator)
    }

    fn actuator_mut(&mut self, slot: usize) -> Option<&mut dyn WheelActuator> {
        self.wheels.get_mut(slot).map(|w| w as &mut dyn WheelActuator)
    }
}

// ------------------------------------------------------------------------------
// rapier raycast wheel as a torque actuator
//   engine_force = torque / radius      (N at the contact patch)
//   brake        = brake torque / radius
//   steering     = degrees -> radians
// ------------------------------------------------------------------------------
impl WheelActuator for Wheel {
    fn set_motor_torque(&mut self, torque: f32) {
        self.engine_force = if self.radius > 0.0 { torque / self.radius } else { 0.0 };
    }

    fn set_brake_torque(&mut self, torque: f32) {
        self.brake = if self.radius > 0.0 { torque / self.radius } else { 0.0 };
    }

    fn set_steer_angle(&mut self, degrees: f32) {
        self.steering = degrees.to_radians();
    }

    fn world_pose(&self) -> Pose {
        let up = -self.suspension();
        let forward = up.cross(&self.axle());
        let facing = if forward.norm_squared() > 1e-8 && up.norm_squared() > 1e-8 {
            UnitQuaternion::face_towards(&forward, &up)
        } else {
            UnitQuaternion::identity()
        };
        let spin = UnitQuaternion::from_axis_angle(&Vector::x_axis(), self.rotation);
        Pose::new(self.center(), facing * spin)
    }
}
