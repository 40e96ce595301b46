// ==============================================================================
// actuator.rs — WHEEL ACTUATOR BINDING (drivetrain <-> physics collaborator)
// ------------------------------------------------------------------------------
// apply():
//   Writes motor torque, brake torque and (front wheels only) steer angle to
//   the physics actuator behind each WheelSpec::slot.
//
// sync_visuals():
//   Reads the settled wheel pose back from each actuator and writes it to the
//   optional visual mesh:
//
//      mesh_rot = wheel_rot * euler(rotation_offset) * (inverted ? yaw(180) : I)
//
// Notes:
// - This file does NOT integrate anything. It is a read/write adapter.
// - Actuators are owned by the physics side. A slot that no longer resolves
//   (destroyed collider, wrong index) is skipped for the tick and reported.
// - sync_visuals() must run after the physics step commits.
// ==============================================================================

use crate::drivetrain::{WheelCommand, WheelSpec};
use crate::pose::{euler_deg, yaw, Pose};

/// One wheel actuator owned by the physics collaborator.
pub trait WheelActuator {
    fn set_motor_torque(&mut self, torque: f32);
    fn set_brake_torque(&mut self, torque: f32);
    /// Degrees, positive yaws toward +X.
    fn set_steer_angle(&mut self, degrees: f32);
    /// Latest settled world pose of the wheel.
    fn world_pose(&self) -> Pose;
}

/// Resolves actuator slots. Resolution may fail at any tick.
pub trait WheelRig {
    fn actuator(&self, slot: usize) -> Option<&dyn WheelActuator>;
    fn actuator_mut(&mut self, slot: usize) -> Option<&mut dyn WheelActuator>;
}

/// Render-side transform written once per tick.
pub trait VisualMesh {
    fn set_world_pose(&mut self, pose: Pose);
}

/// Plain transform slot. Holds whatever pose was written last.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MeshTransform {
    pub pose: Pose,
    pub writes: u64,
}

impl VisualMesh for MeshTransform {
    fn set_world_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.writes += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: usize,
    pub skipped: Vec<String>, // wheel names whose actuator was absent
}

#[derive(Debug, Clone)]
pub struct WheelBinding {
    wheels: Vec<WheelSpec>,
}

impl WheelBinding {
    pub fn new(wheels: Vec<WheelSpec>) -> Self {
        Self { wheels }
    }

    pub fn wheels(&self) -> &[WheelSpec] {
        &self.wheels
    }

    /// `commands` is in wheel order, as produced by the drivetrain.
    pub fn apply<R: WheelRig + ?Sized>(&self, rig: &mut R, commands: &[WheelCommand]) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (wheel, cmd) in self.wheels.iter().zip(commands) {
            let Some(actuator) = rig.actuator_mut(wheel.slot) else {
                report.skipped.push(wheel.name.clone());
                continue;
            };

            actuator.set_motor_torque(cmd.motor_torque);
            actuator.set_brake_torque(cmd.brake_torque);
            if let Some(angle) = cmd.steer_angle {
                actuator.set_steer_angle(angle);
            }
            report.applied += 1;
        }

        report
    }

    /// Copies settled wheel poses onto the visual meshes (wheel order, `None` = no mesh).
    /// Returns the number of meshes written.
    pub fn sync_visuals<R, V>(&self, rig: &R, visuals: &mut [Option<V>]) -> usize
    where
        R: WheelRig + ?Sized,
        V: VisualMesh,
    {
        let mut written = 0;

        for (wheel, visual) in self.wheels.iter().zip(visuals.iter_mut()) {
            let Some(mesh) = visual.as_mut() else { continue };
            let Some(actuator) = rig.actuator(wheel.slot) else { continue };

            mesh.set_world_pose(visual_pose(wheel, actuator.world_pose()));
            written += 1;
        }

        written
    }
}

/// Compose the collider pose with the per-wheel mesh correction.
pub fn visual_pose(wheel: &WheelSpec, collider: Pose) -> Pose {
    let offset = euler_deg(wheel.rotation_offset);
    let rotation = if wheel.inverted_rotation {
        collider.rotation * offset * yaw(180.0)
    } else {
        collider.rotation * offset
    };
    Pose::new(collider.position, rotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivetrain::Axle;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    #[derive(Default)]
    struct FakeWheel {
        motor: f32,
        brake: f32,
        steer: Option<f32>,
        pose: Pose,
    }

    impl WheelActuator for FakeWheel {
        fn set_motor_torque(&mut self, torque: f32) { self.motor = torque; }
        fn set_brake_torque(&mut self, torque: f32) { self.brake = torque; }
        fn set_steer_angle(&mut self, degrees: f32) { self.steer = Some(degrees); }
        fn world_pose(&self) -> Pose { self.pose }
    }

    struct FakeRig(Vec<Option<FakeWheel>>);

    impl WheelRig for FakeRig {
        fn actuator(&self, slot: usize) -> Option<&dyn WheelActuator> {
            self.0.get(slot)?.as_ref().map(|w| w as &dyn WheelActuator)
        }
        fn actuator_mut(&mut self, slot: usize) -> Option<&mut dyn WheelActuator> {
            self.0.get_mut(slot)?.as_mut().map(|w| w as &mut dyn WheelActuator)
        }
    }

    fn cmd(motor: f32, brake: f32, steer: Option<f32>) -> WheelCommand {
        WheelCommand { motor_torque: motor, brake_torque: brake, steer_angle: steer }
    }

    #[test]
    fn apply_writes_through_slots_and_leaves_rear_steer_alone() {
        let binding = WheelBinding::new(WheelSpec::rear_drive_four());
        let mut rig = FakeRig((0..4).map(|_| Some(FakeWheel::default())).collect());

        let report = binding.apply(
            &mut rig,
            &[cmd(0.0, 0.0, Some(12.0)), cmd(0.0, 0.0, Some(12.0)), cmd(180.0, 0.0, None), cmd(180.0, 0.0, None)],
        );

        assert_eq!(report.applied, 4);
        assert!(report.skipped.is_empty());
        let wheels: Vec<_> = rig.0.iter().map(|w| w.as_ref().unwrap()).collect();
        assert_eq!(wheels[0].steer, Some(12.0));
        assert_eq!(wheels[2].motor, 180.0);
        assert_eq!(wheels[3].steer, None);
    }

    #[test]
    fn missing_actuator_is_skipped_not_fatal() {
        let binding = WheelBinding::new(WheelSpec::rear_drive_four());
        let mut rig = FakeRig(vec![Some(FakeWheel::default()), None, Some(FakeWheel::default())]);

        let all_brake = [cmd(0.0, 8000.0, Some(0.0)); 4];
        let report = binding.apply(&mut rig, &all_brake);

        assert_eq!(report.applied, 2);
        assert_eq!(report.skipped, vec!["FR".to_string(), "RR".to_string()]);
        assert_eq!(rig.0[2].as_ref().unwrap().brake, 8000.0);
    }

    #[test]
    fn sync_visuals_applies_offset_and_inversion() {
        let mut spec = WheelSpec::new("FL", Axle::Front, false, 0);
        spec.inverted_rotation = true;
        let binding = WheelBinding::new(vec![spec, WheelSpec::new("FR", Axle::Front, false, 1)]);

        let pose = Pose::new(Point3::new(1.0, 0.4, 2.0), yaw(10.0));
        let rig = FakeRig(vec![Some(FakeWheel { pose, ..FakeWheel::default() }), Some(FakeWheel::default())]);

        let mut visuals = vec![Some(MeshTransform::default()), None];
        let written = binding.sync_visuals(&rig, &mut visuals);

        assert_eq!(written, 1);
        let mesh = visuals[0].unwrap();
        assert_eq!(mesh.pose.position, pose.position);
        // 10° + 180° of yaw: forward points back and slightly toward -X.
        let f = mesh.pose.rotation * Vector3::z();
        assert_relative_eq!(f.z, -(10f32.to_radians().cos()), epsilon = 1e-5);
        assert_relative_eq!(f.x, -(10f32.to_radians().sin()), epsilon = 1e-5);
    }

    #[test]
    fn rotation_offset_applies_before_inversion() {
        let mut spec = WheelSpec::new("RL", Axle::Rear, true, 0);
        spec.rotation_offset = [0.0, 0.0, 90.0];
        spec.inverted_rotation = true;

        let posed = visual_pose(&spec, Pose::identity());
        // Flip about Y first, then roll 90° about Z: local +X ends up on -Y.
        let x = posed.rotation * Vector3::x();
        assert_relative_eq!(x, -Vector3::y(), epsilon = 1e-5);
        let z = posed.rotation * Vector3::z();
        assert_relative_eq!(z, -Vector3::z(), epsilon = 1e-5);

        spec.inverted_rotation = false;
        let plain = visual_pose(&spec, Pose::new(Point3::new(0.0, 0.3, 1.0), yaw(90.0)));
        assert_eq!(plain.position, Point3::new(0.0, 0.3, 1.0));
        // Roll puts +X on +Y, the collider yaw leaves Y alone.
        assert_relative_eq!(plain.rotation * Vector3::x(), Vector3::y(), epsilon = 1e-5);
    }
}
