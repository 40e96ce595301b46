// ==============================================================================
// vehicle.rs — ONE DRIVABLE VEHICLE (driver + drivetrain + wheel binding)
// ------------------------------------------------------------------------------
// tick(host, dt), strictly in this order:
//   1) chassis state from the host        (missing => tick skipped, warn)
//   2) driver -> ControlSignal
//        Human:      latched HumanInput
//        Autonomous: ObstacleSensor::scan -> NavigationController::tick
//        Destroyed:  neutral signal (coast)
//   3) DrivetrainModel::tick              -> WheelCommands
//   4) WheelBinding::apply                -> physics actuators
//
// sync_visuals(host) runs after the physics step has committed.
//
// The host is whatever owns physics (rapier in this crate, a scripted fake in
// tests). The vehicle never keeps a reference to it between ticks.
// ==============================================================================

use log::{debug, warn};
use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::actuator::{ApplyReport, MeshTransform, VisualMesh, WheelBinding, WheelRig};
use crate::config::VehicleConfig;
use crate::control::{ControlSignal, HumanInput};
use crate::diagnostics::Diagnostics;
use crate::drivetrain::{ChassisMotion, DrivetrainModel};
use crate::health::{HealthEvent, VehicleHealth};
use crate::navigation::{NavGoal, NavOutput, NavTuning, NavigationController};
use crate::pose::Pose;
use crate::sensor::{ObstacleSensor, RayCaster, SensorConfig, SensorScan};

// ----------------------------------------------------------------------------
// Physics collaborator seams
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChassisState {
    pub pose: Pose,
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
    pub world_center_of_mass: Point3<f32>,
}

impl ChassisState {
    pub fn at_rest(pose: Pose) -> Self {
        Self {
            pose,
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            world_center_of_mass: pose.position,
        }
    }

    /// Signed speed along the chassis heading.
    pub fn forward_speed(&self) -> f32 {
        self.linear_velocity.dot(&self.pose.forward())
    }

    pub fn speed(&self) -> f32 {
        self.linear_velocity.norm()
    }

    pub fn motion(&self) -> ChassisMotion {
        ChassisMotion::new(self.forward_speed(), self.speed())
    }
}

pub trait ChassisSource {
    fn chassis(&self) -> Option<ChassisState>;
}

/// Everything a vehicle tick reads from or writes to.
pub trait VehicleHost: ChassisSource + RayCaster + WheelRig {}

impl<T: ChassisSource + RayCaster + WheelRig + ?Sized> VehicleHost for T {}

// ----------------------------------------------------------------------------
// Drivers
// ----------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Autopilot {
    pub sensor: ObstacleSensor,
    pub controller: NavigationController,
    pub goal: NavGoal,
}

impl Autopilot {
    pub fn new(sensor: SensorConfig, tuning: NavTuning, goal: NavGoal) -> Self {
        Self {
            sensor: ObstacleSensor::new(sensor),
            controller: NavigationController::new(tuning),
            goal,
        }
    }

    /// Re-point at the tracked reference. `None` when it disappeared.
    pub fn set_target(&mut self, target: Option<Point3<f32>>) {
        self.goal.target = target;
    }

    fn drive<H: VehicleHost + ?Sized>(
        &mut self,
        host: &H,
        chassis: &ChassisState,
        max_steering_angle: f32,
    ) -> (NavOutput, SensorScan) {
        let scan = if self.controller.tuning().avoidance_enabled && self.goal.target.is_some() {
            self.sensor.scan(host, chassis.pose.position, chassis.pose.forward())
        } else {
            SensorScan::default()
        };

        let out = self
            .controller
            .tick(&chassis.pose, &self.goal, scan.reading, chassis.speed(), max_steering_angle);
        (out, scan)
    }
}

#[derive(Debug, Clone)]
pub enum Driver {
    Human(HumanInput),
    Autonomous(Autopilot),
}

impl Driver {
    pub fn autopilot_from(config: &VehicleConfig, goal: NavGoal) -> Self {
        Driver::Autonomous(Autopilot::new(config.sensor, config.nav, goal))
    }
}

// ----------------------------------------------------------------------------
// Vehicle
// ----------------------------------------------------------------------------

pub struct Vehicle<V: VisualMesh = MeshTransform> {
    name: String,
    drivetrain: DrivetrainModel,
    binding: WheelBinding,
    driver: Driver,
    health: VehicleHealth,
    visuals: Vec<Option<V>>,
    diagnostics: Diagnostics,
    last_signal: ControlSignal,
}

impl<V: VisualMesh> Vehicle<V> {
    /// `visuals` is in wheel order. Missing entries mean "no mesh".
    pub fn new(name: impl Into<String>, config: &VehicleConfig, driver: Driver, mut visuals: Vec<Option<V>>) -> Self {
        let wheels = config.wheel_specs();
        visuals.resize_with(wheels.len(), || None);

        Self {
            name: name.into(),
            drivetrain: DrivetrainModel::new(config.tuning, wheels.clone()),
            binding: WheelBinding::new(wheels),
            driver,
            health: VehicleHealth::new(config.health),
            visuals,
            diagnostics: Diagnostics::default(),
            last_signal: ControlSignal::NEUTRAL,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut Driver {
        &mut self.driver
    }

    pub fn drivetrain(&self) -> &DrivetrainModel {
        &self.drivetrain
    }

    pub fn health(&self) -> &VehicleHealth {
        &self.health
    }

    pub fn health_mut(&mut self) -> &mut VehicleHealth {
        &mut self.health
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn visuals(&self) -> &[Option<V>] {
        &self.visuals
    }

    pub fn last_signal(&self) -> ControlSignal {
        self.last_signal
    }

    /// Latch raw human axes. Ignored for autonomous vehicles.
    pub fn set_human_input(&mut self, vertical: f32, horizontal: f32, brake: bool) {
        if let Driver::Human(input) = &mut self.driver {
            input.set_axes(vertical, horizontal);
            input.set_brake(brake);
        }
    }

    pub fn set_target(&mut self, target: Option<Point3<f32>>) {
        if let Driver::Autonomous(autopilot) = &mut self.driver {
            autopilot.set_target(target);
        }
    }

    /// Route an impact into health. Logs the outcome.
    pub fn on_impact(&mut self, relative_speed: f32, layer_bits: u32, now: f64) -> Option<HealthEvent> {
        let event = self.health.on_impact(relative_speed, layer_bits, now);
        if let Some(HealthEvent::Damaged { amount, remaining }) = event {
            debug!("{} hit for {amount:.0} at {relative_speed:.1} m/s ({remaining:.0} left)", self.name);
        }
        event
    }

    /// One fixed tick. Returns the applied report, or `None` when skipped.
    pub fn tick<H: VehicleHost + ?Sized>(&mut self, host: &mut H, dt: f32) -> Option<ApplyReport> {
        let Some(chassis) = host.chassis() else {
            warn!("⚠️ {}: chassis unavailable, tick skipped", self.name);
            return None;
        };

        self.diagnostics.clear();
        let max_steer = self.drivetrain.tuning().max_steering_angle;

        let signal = if self.health.is_dead() {
            ControlSignal::NEUTRAL
        } else {
            match &mut self.driver {
                Driver::Human(input) => input.signal(),
                Driver::Autonomous(autopilot) => {
                    let (out, scan) = autopilot.drive(&*host, &chassis, max_steer);
                    self.diagnostics.avoiding = out.avoiding;
                    self.diagnostics.reading = scan.reading;
                    self.diagnostics.set_rays(&scan.rays);
                    out.signal
                }
            }
        };
        self.last_signal = signal;

        let commands = self.drivetrain.tick(signal, chassis.motion(), dt);
        let report = self.binding.apply(host, &commands);
        if !report.skipped.is_empty() {
            warn!("⚠️ {}: no actuator for wheel(s) {:?}", self.name, report.skipped);
        }

        self.diagnostics.throttle = self.drivetrain.throttle();
        self.diagnostics.steer_angle = self.drivetrain.steer_angle();
        self.diagnostics.mode = Some(self.drivetrain.last_mode());

        Some(report)
    }

    /// Copy settled wheel poses to the visual meshes. Call after the physics step.
    pub fn sync_visuals<H: WheelRig + ?Sized>(&mut self, host: &H) -> usize {
        self.binding.sync_visuals(host, &mut self.visuals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::WheelActuator;
    use crate::sensor::{LayerMask, RayHit};
    use approx::assert_relative_eq;

    #[derive(Default)]
    struct Slot {
        motor: f32,
        brake: f32,
        steer: f32,
    }

    impl WheelActuator for Slot {
        fn set_motor_torque(&mut self, torque: f32) { self.motor = torque; }
        fn set_brake_torque(&mut self, torque: f32) { self.brake = torque; }
        fn set_steer_angle(&mut self, degrees: f32) { self.steer = degrees; }
        fn world_pose(&self) -> Pose { Pose::identity() }
    }

    struct Host {
        chassis: Option<ChassisState>,
        wall_at: Option<f32>,
        slots: Vec<Slot>,
    }

    impl Host {
        fn parked() -> Self {
            Self {
                chassis: Some(ChassisState::at_rest(Pose::identity())),
                wall_at: None,
                slots: (0..4).map(|_| Slot::default()).collect(),
            }
        }

        fn cruising(speed: f32) -> Self {
            let mut host = Self::parked();
            if let Some(state) = host.chassis.as_mut() {
                state.linear_velocity = Vector3::z() * speed;
            }
            host
        }
    }

    impl ChassisSource for Host {
        fn chassis(&self) -> Option<ChassisState> { self.chassis }
    }

    impl RayCaster for Host {
        fn cast_ray(&self, origin: Point3<f32>, dir: Vector3<f32>, max: f32, _: LayerMask) -> Option<RayHit> {
            let d = self.wall_at?;
            (dir.x.abs() < 1e-4 && d <= max).then(|| RayHit { distance: d, point: origin + dir * d, is_self: false })
        }
    }

    impl WheelRig for Host {
        fn actuator(&self, slot: usize) -> Option<&dyn WheelActuator> {
            self.slots.get(slot).map(|s| s as &dyn WheelActuator)
        }
        fn actuator_mut(&mut self, slot: usize) -> Option<&mut dyn WheelActuator> {
            self.slots.get_mut(slot).map(|s| s as &mut dyn WheelActuator)
        }
    }

    fn human() -> Vehicle {
        Vehicle::new("player", &VehicleConfig::player(), Driver::Human(HumanInput::new()), Vec::new())
    }

    #[test]
    fn human_throttle_reaches_rear_wheels() {
        let mut car = human();
        let mut host = Host::parked();
        car.set_human_input(1.0, 0.0, false);

        let report = car.tick(&mut host, 0.02).unwrap();
        assert_eq!(report.applied, 4);
        assert_relative_eq!(host.slots[2].motor, 180.0, epsilon = 1e-3);
        assert_eq!(host.slots[0].motor, 0.0);
    }

    #[test]
    fn missing_chassis_skips_tick() {
        let mut car = human();
        let mut host = Host::parked();
        host.chassis = None;
        car.set_human_input(1.0, 0.0, false);

        assert!(car.tick(&mut host, 0.02).is_none());
        assert_eq!(car.drivetrain().throttle(), 0.0);
    }

    #[test]
    fn autopilot_swerves_and_reports_it() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 60.0));
        let cfg = VehicleConfig::pursuer();
        let mut car: Vehicle = Vehicle::new("ai", &cfg, Driver::autopilot_from(&cfg, goal), Vec::new());
        let mut host = Host::cruising(10.0);
        host.wall_at = Some(7.5);

        car.tick(&mut host, 0.02).unwrap();
        let diag = car.diagnostics();
        assert!(diag.avoiding);
        assert_relative_eq!(diag.reading.strength, 0.5, epsilon = 1e-4);
        assert_eq!(diag.rays.len(), 9);
        // Head-on hit carries no direction, throttle eased by half the strength.
        assert_relative_eq!(car.last_signal().throttle, 0.75, epsilon = 1e-5);
    }

    #[test]
    fn autopilot_from_rest_pulls_away_despite_obstacle() {
        let goal = NavGoal::towards(Point3::new(0.0, 0.0, 60.0));
        let cfg = VehicleConfig::pursuer();
        let mut car: Vehicle = Vehicle::new("ai", &cfg, Driver::autopilot_from(&cfg, goal), Vec::new());
        let mut host = Host::parked();
        host.wall_at = Some(7.5);

        car.tick(&mut host, 0.02).unwrap();
        assert!(car.diagnostics().avoiding);
        assert_eq!(car.last_signal().throttle, 1.0);
    }

    #[test]
    fn destroyed_vehicle_coasts() {
        let mut car = human();
        let mut host = Host::parked();
        car.set_human_input(1.0, 0.0, false);
        car.tick(&mut host, 0.02);

        assert_eq!(car.on_impact(100.0, u32::MAX, 0.0), Some(HealthEvent::Destroyed));
        for _ in 0..20 {
            car.tick(&mut host, 0.02);
        }
        assert_eq!(car.last_signal(), ControlSignal::NEUTRAL);
        assert_eq!(car.drivetrain().throttle(), 0.0);
        assert!(host.slots.iter().all(|s| s.motor == 0.0 && s.brake == 0.0));
    }

    #[test]
    fn visuals_follow_wheels_after_sync() {
        let mut car = Vehicle::new(
            "player",
            &VehicleConfig::player(),
            Driver::Human(HumanInput::new()),
            vec![Some(MeshTransform::default()), None, Some(MeshTransform::default())],
        );
        let host = Host::parked();
        assert_eq!(car.visuals().len(), 4);
        assert_eq!(car.sync_visuals(&host), 2);
    }
}
