//! drive-core: shared ground-vehicle drivetrain, ray-fan obstacle sensing and
//! target-pursuit navigation, bound to a rapier3d physics world.

pub mod actuator;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod drivetrain;
pub mod health;
pub mod navigation;
pub mod physics;
pub mod pose;
pub mod sensor;
pub mod sim;
pub mod time_scale;
pub mod vehicle;

pub use actuator::{ApplyReport, MeshTransform, VisualMesh, WheelActuator, WheelBinding, WheelRig};
pub use config::{ConfigError, VehicleConfig, WheelConfig};
pub use control::{ControlSignal, HumanInput};
pub use drivetrain::{DrivetrainModel, VehicleTuning, WheelCommand, WheelSpec};
pub use navigation::{NavGoal, NavOutput, NavTuning, NavigationController};
pub use physics::{Impact, PhysicsWorld, VehicleId};
pub use pose::Pose;
pub use sensor::{LayerMask, ObstacleReading, ObstacleSensor, RayCaster, RayHit, SensorConfig};
pub use sim::{SimError, Simulation, Snapshot};
pub use vehicle::{Autopilot, ChassisSource, ChassisState, Driver, Vehicle, VehicleHost};
