//! burplan - bur-based motion planning for articulated robots
//!
//! A sampling-based planner that connects two joint-space configurations of
//! a serial-chain robot with a collision-free piecewise-linear path. In open
//! workspace regions the planner expands whole burs (star-shaped free
//! neighborhoods certified by one clearance query plus a per-joint Lipschitz
//! bound); near obstacles it falls back to small explicitly checked steps.

pub mod assets;
pub mod collision;
pub mod config;
pub mod error;
pub mod planner;
pub mod robot;
pub mod scene;

pub use collision::CollisionEnv;
pub use config::PlannerParams;
pub use error::{PlanningError, Result};
pub use planner::{interpolate_path, write_path, Bur, ConfigTree, ConnectStatus, RbtPlanner};
pub use robot::{planar_arm, KinematicModel, SerialChain, UrdfRobot};
pub use scene::SceneDefinition;
