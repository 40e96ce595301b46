//! drivetrain - engine-agnostic vehicle drivetrain (pure types + per-tick model)

pub mod types;
pub mod throttle;
pub mod torque;
pub mod steering;
pub mod model;

pub use types::*;
pub use model::DrivetrainModel;
pub use torque::TorqueMode;
