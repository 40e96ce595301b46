//! World-space pose shared by the chassis, wheels and visual meshes.
//!
//! Frame convention: +Y up, +Z forward. Positive yaw rotates +Z toward +X.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn new(position: Point3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` yawed by `yaw_deg` around +Y.
    pub fn from_yaw(position: Point3<f32>, yaw_deg: f32) -> Self {
        Self {
            position,
            rotation: yaw(yaw_deg),
        }
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * Vector3::z()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    /// World point expressed in this pose's local frame.
    pub fn inverse_transform_point(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.rotation.inverse() * (p - self.position))
    }
}

/// Rotation of `deg` degrees around world up.
pub fn yaw(deg: f32) -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), deg.to_radians())
}

/// Euler rotation from degrees, applied Z, then X, then Y.
pub fn euler_deg(e: [f32; 3]) -> UnitQuaternion<f32> {
    let [x, y, z] = e;
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y.to_radians())
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x.to_radians())
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z.to_radians())
}
