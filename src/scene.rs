//! YAML scene descriptions: robot, obstacles, and the planning query.

use std::path::Path;

use nalgebra::{DVector, Isometry3, Translation3, UnitQuaternion};
use parry3d_f64::shape::SharedShape;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collision::CollisionEnv;
use crate::config::PlannerParams;
use crate::error::{PlanningError, Result};
use crate::robot::UrdfRobot;

/// A complete planning scene as loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDefinition {
    pub name: String,
    pub robot: SceneRobot,
    #[serde(default)]
    pub obstacles: Vec<SceneObstacle>,
    /// Start configuration, one value per actuated joint.
    pub start: Option<Vec<f64>>,
    /// Goal configuration, one value per actuated joint.
    pub goal: Option<Vec<f64>>,
    /// Planner parameter overrides for this scene.
    pub planner: Option<PlannerParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneRobot {
    /// URDF file, relative to the scene file's directory.
    pub urdf: String,
    /// Base directory for the robot's collision meshes, relative to the
    /// scene file's directory. Defaults to the scene directory itself.
    #[serde(default)]
    pub mesh_dir: Option<String>,
    /// Chain end link; the first leaf link when omitted.
    #[serde(default)]
    pub end_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObstacle {
    pub name: String,
    pub shape: ObstacleShape,
    #[serde(default)]
    pub position: [f64; 3],
    /// Roll-pitch-yaw in radians.
    #[serde(default)]
    pub rotation_rpy: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObstacleShape {
    Mesh { path: String },
    Sphere { radius: f64 },
    Box { size: [f64; 3] },
}

impl SceneObstacle {
    pub fn pose(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.position[0], self.position[1], self.position[2]),
            UnitQuaternion::from_euler_angles(
                self.rotation_rpy[0],
                self.rotation_rpy[1],
                self.rotation_rpy[2],
            ),
        )
    }
}

impl SceneDefinition {
    /// Load a scene description from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PlanningError::SceneInvalid(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse a scene description from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| PlanningError::SceneInvalid(e.to_string()))
    }

    /// Assemble the robot model and the fully populated collision
    /// environment. Relative paths resolve against `scene_dir`.
    pub fn build(&self, scene_dir: &Path) -> Result<(UrdfRobot, CollisionEnv)> {
        let urdf_path = scene_dir.join(&self.robot.urdf);
        let robot = UrdfRobot::from_file(&urdf_path, self.robot.end_link.as_deref())?;

        let mesh_dir = match &self.robot.mesh_dir {
            Some(dir) => scene_dir.join(dir),
            None => scene_dir.to_path_buf(),
        };
        let mut env = CollisionEnv::for_robot(&robot, &mesh_dir)?;

        for obstacle in &self.obstacles {
            match &obstacle.shape {
                ObstacleShape::Mesh { path } => {
                    env.add_obstacle_mesh(&scene_dir.join(path), obstacle.pose())?;
                }
                ObstacleShape::Sphere { radius } => {
                    env.add_obstacle(&obstacle.name, SharedShape::ball(*radius), obstacle.pose());
                }
                ObstacleShape::Box { size } => {
                    env.add_obstacle(
                        &obstacle.name,
                        SharedShape::cuboid(size[0] / 2.0, size[1] / 2.0, size[2] / 2.0),
                        obstacle.pose(),
                    );
                }
            }
        }

        info!(
            scene = %self.name,
            robot = %robot.name,
            obstacles = env.obstacle_count(),
            "scene assembled"
        );
        Ok((robot, env))
    }

    /// The scene's start configuration, if present.
    pub fn start_config(&self) -> Option<DVector<f64>> {
        self.start.as_ref().map(|v| DVector::from_vec(v.clone()))
    }

    /// The scene's goal configuration, if present.
    pub fn goal_config(&self) -> Option<DVector<f64>> {
        self.goal.as_ref().map(|v| DVector::from_vec(v.clone()))
    }

    /// Path of the scene's obstacle meshes and URDF, for logging.
    pub fn describe(&self) -> String {
        format!(
            "scene '{}': robot '{}', {} obstacle(s)",
            self.name,
            self.robot.urdf,
            self.obstacles.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SCENE_YAML: &str = r#"
name: shelf_reach
robot:
  urdf: robot.urdf
obstacles:
  - name: ball
    shape: { type: sphere, radius: 0.3 }
    position: [2.0, 0.0, 0.0]
  - name: crate
    shape: { type: box, size: [1.0, 1.0, 1.0] }
    position: [0.0, -2.0, 0.0]
    rotation_rpy: [0.0, 0.0, 1.57]
start: [0.0, 0.0]
goal: [1.0, 0.0]
planner:
  max_iters: 500
  seed: 9
"#;

    #[test]
    fn test_parse_scene_yaml() {
        let scene = SceneDefinition::from_yaml_str(SCENE_YAML).unwrap();
        assert_eq!(scene.name, "shelf_reach");
        assert_eq!(scene.obstacles.len(), 2);
        assert!(matches!(
            scene.obstacles[0].shape,
            ObstacleShape::Sphere { radius } if radius == 0.3
        ));
        assert_eq!(scene.start_config().unwrap().len(), 2);

        let params = scene.planner.unwrap();
        assert_eq!(params.max_iters, 500);
        assert_eq!(params.seed, Some(9));
        // Unspecified fields keep their defaults.
        assert_eq!(params.num_spikes, 7);
    }

    #[test]
    fn test_obstacle_pose() {
        let scene = SceneDefinition::from_yaml_str(SCENE_YAML).unwrap();
        let pose = scene.obstacles[1].pose();
        assert_relative_eq!(pose.translation.vector.y, -2.0, epsilon = 1e-12);
        let (_, _, yaw) = pose.rotation.euler_angles();
        assert_relative_eq!(yaw, 1.57, epsilon = 1e-9);
    }

    #[test]
    fn test_build_with_inline_robot() {
        let dir = tempfile::tempdir().unwrap();
        let urdf = r#"
            <robot name="pointer">
                <link name="base"/>
                <link name="needle">
                    <collision>
                        <origin xyz="0.5 0 0"/>
                        <geometry><sphere radius="0.05"/></geometry>
                    </collision>
                </link>
                <joint name="pivot" type="revolute">
                    <parent link="base"/>
                    <child link="needle"/>
                    <axis xyz="0 0 1"/>
                    <limit lower="-3.14" upper="3.14" effort="1" velocity="1"/>
                </joint>
            </robot>
        "#;
        std::fs::write(dir.path().join("robot.urdf"), urdf).unwrap();

        let scene = SceneDefinition::from_yaml_str(SCENE_YAML).unwrap();
        let (robot, env) = scene.build(dir.path()).unwrap();
        assert_eq!(robot.name, "pointer");
        assert_eq!(env.part_count(), 1);
        assert_eq!(env.obstacle_count(), 2);
    }

    #[test]
    fn test_malformed_scene_rejected() {
        let err = SceneDefinition::from_yaml_str("obstacles: 3").unwrap_err();
        assert!(matches!(err, PlanningError::SceneInvalid(_)), "{err}");
    }
}
