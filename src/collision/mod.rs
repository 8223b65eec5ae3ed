//! Collision environment: posed robot geometry against fixed obstacles.
//!
//! The environment is a leaf. It never calls back into the planner or the
//! kinematic model; the planner computes forward kinematics and hands the
//! posed frames in through [`CollisionEnv::set_pose`]. Both queries read the
//! last-set pose, so a result is valid only until the next `set_pose`.

use std::path::Path;

use nalgebra::Isometry3;
use parry3d_f64::query;
use parry3d_f64::shape::SharedShape;
use tracing::{debug, warn};

use crate::assets::{load_trimesh, resolve_mesh_path};
use crate::error::{PlanningError, Result};
use crate::robot::{LinkGeometry, LinkShape, UrdfRobot};

/// One collision body of the robot, bound to an actuated frame index (or to
/// the world when `frame` is `None`).
struct RobotPart {
    name: String,
    frame: Option<usize>,
    local: Isometry3<f64>,
    shape: SharedShape,
    pose: Isometry3<f64>,
}

/// A fixed obstacle; immutable once registered.
struct Obstacle {
    name: String,
    shape: SharedShape,
    pose: Isometry3<f64>,
}

/// Workspace proximity oracle over the currently posed robot.
#[derive(Default)]
pub struct CollisionEnv {
    parts: Vec<RobotPart>,
    obstacles: Vec<Obstacle>,
}

impl CollisionEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an environment carrying the collision geometry of a URDF robot,
    /// loading referenced meshes relative to `mesh_dir`.
    pub fn for_robot(robot: &UrdfRobot, mesh_dir: &Path) -> Result<Self> {
        let mut env = Self::new();
        for geometry in &robot.geometry {
            env.add_robot_geometry(geometry, mesh_dir)?;
        }
        debug!(
            robot = %robot.name,
            parts = env.parts.len(),
            "collision environment assembled"
        );
        Ok(env)
    }

    fn add_robot_geometry(&mut self, geometry: &LinkGeometry, mesh_dir: &Path) -> Result<()> {
        let shape = build_shape(&geometry.shape, mesh_dir)?;
        self.add_robot_part(&geometry.link, geometry.frame, geometry.local, shape);
        Ok(())
    }

    /// Attach a collision body to the robot. `frame` indexes the posed
    /// frames later passed to [`set_pose`](Self::set_pose); `local` is the
    /// body's offset within that frame.
    pub fn add_robot_part(
        &mut self,
        name: &str,
        frame: Option<usize>,
        local: Isometry3<f64>,
        shape: SharedShape,
    ) {
        self.parts.push(RobotPart {
            name: name.to_string(),
            frame,
            local,
            // World-fixed parts are fully posed up front.
            pose: local,
            shape,
        });
    }

    /// Register an obstacle with a fixed world transform. Subsequent
    /// queries include it.
    pub fn add_obstacle(&mut self, name: &str, shape: SharedShape, pose: Isometry3<f64>) {
        self.obstacles.push(Obstacle {
            name: name.to_string(),
            shape,
            pose,
        });
    }

    /// Register an obstacle loaded from an OBJ file.
    pub fn add_obstacle_mesh(&mut self, path: &Path, pose: Isometry3<f64>) -> Result<()> {
        let mesh = load_trimesh(path, None)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "obstacle".into());
        self.add_obstacle(&name, SharedShape::new(mesh), pose);
        Ok(())
    }

    pub fn obstacle_count(&self) -> usize {
        self.obstacles.len()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Re-pose every robot body from the given actuated-joint frames.
    pub fn set_pose(&mut self, frames: &[Isometry3<f64>]) -> Result<()> {
        for part in &mut self.parts {
            match part.frame {
                Some(index) => {
                    let frame = frames.get(index).ok_or_else(|| {
                        PlanningError::BadInput(format!(
                            "part '{}' rides frame {index} but only {} frames were posed",
                            part.name,
                            frames.len()
                        ))
                    })?;
                    part.pose = frame * part.local;
                }
                None => part.pose = part.local,
            }
        }
        Ok(())
    }

    /// Minimum surface distance between any robot body and any obstacle at
    /// the last-set pose. Interpenetrating pairs report 0; an empty obstacle
    /// set reports infinity.
    pub fn closest_distance(&self) -> f64 {
        let mut closest = f64::INFINITY;
        for part in &self.parts {
            for obstacle in &self.obstacles {
                match query::distance(&part.pose, &*part.shape, &obstacle.pose, &*obstacle.shape) {
                    Ok(distance) => closest = closest.min(distance),
                    Err(unsupported) => {
                        warn!(
                            part = %part.name,
                            obstacle = %obstacle.name,
                            "unsupported distance query ({unsupported}), pair skipped"
                        );
                    }
                }
            }
        }
        closest
    }

    /// Whether any robot body interpenetrates any obstacle at the last-set
    /// pose.
    pub fn is_colliding(&self) -> bool {
        for part in &self.parts {
            for obstacle in &self.obstacles {
                match query::intersection_test(
                    &part.pose,
                    &*part.shape,
                    &obstacle.pose,
                    &*obstacle.shape,
                ) {
                    Ok(true) => return true,
                    Ok(false) => {}
                    Err(unsupported) => {
                        warn!(
                            part = %part.name,
                            obstacle = %obstacle.name,
                            "unsupported intersection query ({unsupported}), pair skipped"
                        );
                    }
                }
            }
        }
        false
    }
}

fn build_shape(shape: &LinkShape, mesh_dir: &Path) -> Result<SharedShape> {
    Ok(match shape {
        LinkShape::Mesh { filename, scale } => {
            let path = resolve_mesh_path(filename, mesh_dir);
            SharedShape::new(load_trimesh(&path, *scale)?)
        }
        LinkShape::Sphere { radius } => SharedShape::ball(*radius),
        LinkShape::Box { size } => {
            SharedShape::cuboid(size[0] / 2.0, size[1] / 2.0, size[2] / 2.0)
        }
        LinkShape::Cylinder { radius, length } => {
            // URDF cylinders extend along z, parry's along y.
            let upright = Isometry3::rotation(nalgebra::Vector3::x() * std::f64::consts::FRAC_PI_2);
            SharedShape::compound(vec![(upright, SharedShape::cylinder(length / 2.0, *radius))])
        }
        LinkShape::Capsule { radius, length } => SharedShape::new(
            parry3d_f64::shape::Capsule::new_z(length / 2.0, *radius),
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    fn iso(x: f64, y: f64, z: f64) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity())
    }

    fn ball_env(robot_at: Isometry3<f64>, obstacle_at: Isometry3<f64>) -> CollisionEnv {
        let mut env = CollisionEnv::new();
        env.add_robot_part("tip", Some(0), Isometry3::identity(), SharedShape::ball(0.1));
        env.add_obstacle("ball", SharedShape::ball(0.5), obstacle_at);
        env.set_pose(&[robot_at]).unwrap();
        env
    }

    #[test]
    fn test_distance_between_balls() {
        let env = ball_env(iso(0.0, 0.0, 0.0), iso(2.0, 0.0, 0.0));
        // Surface distance: 2.0 - 0.1 - 0.5.
        assert_relative_eq!(env.closest_distance(), 1.4, epsilon = 1e-9);
        assert!(!env.is_colliding());
    }

    #[test]
    fn test_interpenetration() {
        let env = ball_env(iso(0.0, 0.0, 0.0), iso(0.3, 0.0, 0.0));
        assert!(env.is_colliding());
        assert!(env.closest_distance() <= 0.0 + 1e-9);
    }

    #[test]
    fn test_positive_distance_implies_no_collision() {
        for x in [0.55, 0.61, 1.0, 3.0] {
            let env = ball_env(iso(0.0, 0.0, 0.0), iso(x, 0.0, 0.0));
            if env.closest_distance() > 0.0 {
                assert!(!env.is_colliding(), "contradictory queries at x={x}");
            }
        }
    }

    #[test]
    fn test_empty_scene_is_clear() {
        let mut env = CollisionEnv::new();
        env.add_robot_part("tip", Some(0), Isometry3::identity(), SharedShape::ball(0.1));
        env.set_pose(&[iso(0.0, 0.0, 0.0)]).unwrap();
        assert_eq!(env.closest_distance(), f64::INFINITY);
        assert!(!env.is_colliding());
    }

    #[test]
    fn test_pose_updates_shift_queries() {
        let mut env = ball_env(iso(0.0, 0.0, 0.0), iso(2.0, 0.0, 0.0));
        env.set_pose(&[iso(1.0, 0.0, 0.0)]).unwrap();
        assert_relative_eq!(env.closest_distance(), 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_world_fixed_part() {
        let mut env = CollisionEnv::new();
        env.add_robot_part("base", None, iso(1.0, 0.0, 0.0), SharedShape::ball(0.1));
        env.add_obstacle("ball", SharedShape::ball(0.2), iso(2.0, 0.0, 0.0));
        // No frames needed for world-fixed parts.
        env.set_pose(&[]).unwrap();
        assert_relative_eq!(env.closest_distance(), 0.7, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_frame_rejected() {
        let mut env = CollisionEnv::new();
        env.add_robot_part("tip", Some(3), Isometry3::identity(), SharedShape::ball(0.1));
        assert!(env.set_pose(&[iso(0.0, 0.0, 0.0)]).is_err());
    }
}
