//! Robot models: the kinematic capability set, the URDF-backed chain, and
//! the analytic planar arm.

pub mod chain;
pub mod kinematics;
pub mod planar;

pub use chain::{LinkGeometry, LinkShape, UrdfRobot};
pub use kinematics::{JointKind, JointSpec, KinematicModel, SerialChain};
pub use planar::planar_arm;
