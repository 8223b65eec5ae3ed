//! RBT-Connect: bidirectional tree search alternating bur expansion far from
//! obstacles with small checked steps near them.

use std::path::Path;
use std::sync::Arc;

use nalgebra::{DMatrix, DVector, Isometry3};
use parry3d_f64::shape::SharedShape;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::collision::CollisionEnv;
use crate::config::PlannerParams;
use crate::error::{PlanningError, Result};
use crate::planner::bur::grow_bur;
use crate::planner::tree::ConfigTree;
use crate::robot::{KinematicModel, UrdfRobot};

/// Outcome of a greedy connect attempt toward a target configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStatus {
    Reached,
    Trapped,
}

/// The bur-based bidirectional planner.
///
/// Owns the collision environment and both search trees; shares the
/// kinematic model read-only with the bur geometry. Single-threaded: every
/// proximity query is preceded by a pose update for the configuration it
/// belongs to.
pub struct RbtPlanner<M: KinematicModel> {
    model: Arc<M>,
    env: CollisionEnv,
    params: PlannerParams,
    rng: StdRng,
}

impl RbtPlanner<crate::robot::SerialChain> {
    /// Convenience constructor: load a robot from a URDF file, assemble its
    /// collision environment with meshes resolved against `mesh_dir`, and
    /// wrap both in a planner.
    pub fn from_urdf(
        urdf_path: impl AsRef<Path>,
        mesh_dir: impl AsRef<Path>,
        params: PlannerParams,
    ) -> Result<Self> {
        let robot = UrdfRobot::from_file(urdf_path, None)?;
        let env = CollisionEnv::for_robot(&robot, mesh_dir.as_ref())?;
        Ok(Self::new(Arc::new(robot.chain), env, params))
    }
}

impl<M: KinematicModel> RbtPlanner<M> {
    pub fn new(model: Arc<M>, env: CollisionEnv, params: PlannerParams) -> Self {
        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            model,
            env,
            params,
            rng,
        }
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    /// Adjust parameters between invocations. Changing the seed reseeds the
    /// random stream.
    pub fn params_mut(&mut self) -> &mut PlannerParams {
        &mut self.params
    }

    /// Register a fixed obstacle; all subsequent planning sees it.
    pub fn add_obstacle(&mut self, name: &str, shape: SharedShape, pose: Isometry3<f64>) {
        self.env.add_obstacle(name, shape, pose);
    }

    /// Register an obstacle mesh from an OBJ file with a fixed transform.
    pub fn add_obstacle_mesh(&mut self, path: &Path, pose: Isometry3<f64>) -> Result<()> {
        self.env.add_obstacle_mesh(path, pose)
    }

    pub fn env(&self) -> &CollisionEnv {
        &self.env
    }

    /// Plan a collision-free piecewise-linear path from `q_start` to
    /// `q_goal`.
    ///
    /// Recoverable failures (`BadInput`, `StartInContact`, `IterationLimit`)
    /// leave the planner usable for further calls.
    pub fn plan(
        &mut self,
        q_start: &DVector<f64>,
        q_goal: &DVector<f64>,
    ) -> Result<Vec<DVector<f64>>> {
        self.params.validate()?;
        if let Some(seed) = self.params.seed {
            self.rng = StdRng::seed_from_u64(seed);
        }
        self.check_input(q_start, "start")?;
        self.check_input(q_goal, "goal")?;

        let mut t_a = ConfigTree::new(q_start.clone());
        let mut t_b = ConfigTree::new(q_goal.clone());
        // Which physical tree `t_a` currently is; flips on every swap.
        let mut a_is_start = true;

        for iteration in 0..self.params.max_iters {
            let mut directions = self.random_configurations(self.params.num_spikes);
            let q_e0 = directions.column(0).into_owned();
            let nearest = t_a.nearest(&q_e0);
            let q_near = t_a.get(nearest).clone();

            // Rescale every sampled configuration to a delta_q-long direction
            // out of q_near.
            for column in 0..directions.ncols() {
                let target = directions.column(column).into_owned();
                let scaled = steer(&q_near, &target, self.params.delta_q);
                directions.set_column(column, &scaled);
            }

            let clearance = self.clearance_at(&q_near)?;
            if clearance < self.params.contact_eps {
                debug!(iteration, clearance, "tree frontier in contact");
                return Err(PlanningError::StartInContact {
                    clearance,
                    threshold: self.params.contact_eps,
                });
            }

            let q_new;
            if clearance < self.params.d_crit {
                // Near-obstacle regime: one small checked step.
                let q_step = steer(&q_near, &q_e0, self.params.epsilon_q);
                if self.colliding_at(&q_step)? {
                    trace!(iteration, "epsilon step collides, resampling");
                    continue;
                }
                t_a.add_node(nearest, q_step.clone());
                q_new = q_step;
            } else {
                // Free regime: grow a whole bur at once.
                let bur = grow_bur(
                    self.model.as_ref(),
                    &q_near,
                    &directions,
                    clearance,
                    self.params.bur_cutoff,
                )?;
                for column in 0..bur.endpoints.ncols() {
                    t_a.add_node(nearest, bur.endpoints.column(column).into_owned());
                }
                // Any endpoint works as the connect target; they are all
                // random directions.
                q_new = bur.endpoints.column(0).into_owned();
            }

            if self.connect(&mut t_b, &q_new)? == ConnectStatus::Reached {
                let path = extract_path(&t_a, &t_b, &q_new, a_is_start);
                info!(
                    iteration,
                    waypoints = path.len(),
                    nodes = t_a.len() + t_b.len(),
                    "trees connected"
                );
                return Ok(path);
            }

            std::mem::swap(&mut t_a, &mut t_b);
            a_is_start = !a_is_start;
        }

        debug!(max_iters = self.params.max_iters, "iteration budget exhausted");
        Err(PlanningError::IterationLimit(self.params.max_iters))
    }

    /// Greedily extend `tree` toward `q`, inserting every intermediate
    /// configuration so path extraction can recover the segment.
    fn connect(&mut self, tree: &mut ConfigTree, q: &DVector<f64>) -> Result<ConnectStatus> {
        let mut node = tree.nearest(q);
        let mut q_n = tree.get(node).clone();
        let q_0 = q_n.clone();
        let mut delta_s = f64::INFINITY;

        while delta_s >= self.params.d_crit {
            let clearance = self.clearance_at(&q_n)?;
            if clearance > self.params.d_crit {
                let target = DMatrix::from_columns(&[q.clone()]);
                let bur = grow_bur(
                    self.model.as_ref(),
                    &q_n,
                    &target,
                    clearance,
                    self.params.bur_cutoff,
                )?;
                let q_t = bur.endpoints.column(0).into_owned();
                delta_s = (&q_t - &q_n).norm();
                node = tree.add_node(node, q_t.clone());
                q_n = q_t;
                if (&q_n - q).norm() < self.params.connect_tolerance {
                    return Ok(ConnectStatus::Reached);
                }
            } else {
                // Inside the critical shell: creep with checked steps. The
                // branch terminates through the overshoot test or a hit, so
                // delta_s stays untouched here.
                let q_t = steer(&q_n, q, self.params.epsilon_q);
                if self.colliding_at(&q_t)? {
                    return Ok(ConnectStatus::Trapped);
                }
                node = tree.add_node(node, q_t.clone());
                q_n = q_t;
                if (&q_n - &q_0).norm() >= (q - &q_0).norm() {
                    return Ok(ConnectStatus::Reached);
                }
            }
        }
        Ok(ConnectStatus::Trapped)
    }

    /// Draw `count` configurations uniformly from the bounds box, one per
    /// column.
    fn random_configurations(&mut self, count: usize) -> DMatrix<f64> {
        let bounds = self.model.bounds().to_vec();
        DMatrix::from_fn(bounds.len(), count, |row, _| {
            let (lower, upper) = bounds[row];
            if upper > lower {
                self.rng.gen_range(lower..upper)
            } else {
                lower
            }
        })
    }

    /// Pose the robot at `q` and query the closest obstacle distance.
    fn clearance_at(&mut self, q: &DVector<f64>) -> Result<f64> {
        let frames = self.model.forward_all(q)?;
        self.env.set_pose(&frames)?;
        Ok(self.env.closest_distance())
    }

    /// Pose the robot at `q` and query for interpenetration.
    fn colliding_at(&mut self, q: &DVector<f64>) -> Result<bool> {
        let frames = self.model.forward_all(q)?;
        self.env.set_pose(&frames)?;
        Ok(self.env.is_colliding())
    }

    fn check_input(&self, q: &DVector<f64>, what: &str) -> Result<()> {
        let bounds = self.model.bounds();
        if q.len() != bounds.len() {
            return Err(PlanningError::BadInput(format!(
                "{what} has {} values, robot has {} joints",
                q.len(),
                bounds.len()
            )));
        }
        for (i, (&value, &(lower, upper))) in q.iter().zip(bounds.iter()).enumerate() {
            if !(lower..=upper).contains(&value) {
                return Err(PlanningError::BadInput(format!(
                    "{what}[{i}] = {value} outside joint limits [{lower}, {upper}]"
                )));
            }
        }
        Ok(())
    }
}

/// The configuration at distance `step` from `from` along the direction of
/// `toward`. Zero-length directions return `toward` unchanged.
fn steer(from: &DVector<f64>, toward: &DVector<f64>, step: f64) -> DVector<f64> {
    let direction = toward - from;
    let norm = direction.norm();
    if norm <= f64::EPSILON {
        return toward.clone();
    }
    from + (step / norm) * direction
}

/// Join the two parent chains at the connect point. Each tree is walked with
/// its own parent links; the result runs from the start-tree root to the
/// goal-tree root.
fn extract_path(
    t_a: &ConfigTree,
    t_b: &ConfigTree,
    q_new: &DVector<f64>,
    a_is_start: bool,
) -> Vec<DVector<f64>> {
    let a_closest = t_a.nearest(q_new);
    let b_closest = t_b.nearest(q_new);

    let mut path = t_a.walk_to_root(a_closest);
    path.reverse();
    path.extend(t_b.walk_to_root(b_closest));

    if !a_is_start {
        path.reverse();
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::planar_arm;
    use nalgebra::{Translation3, UnitQuaternion};
    use std::f64::consts::PI;

    fn planar_planner(params: PlannerParams) -> RbtPlanner<crate::robot::SerialChain> {
        let model = Arc::new(planar_arm(&[1.0, 1.0], (-PI, PI)).unwrap());
        let mut env = CollisionEnv::new();
        // Collision balls ride the distal end of each link.
        let at_tip =
            Isometry3::from_parts(Translation3::new(1.0, 0.0, 0.0), UnitQuaternion::identity());
        env.add_robot_part("elbow", Some(0), at_tip, SharedShape::ball(0.05));
        env.add_robot_part("tip", Some(1), at_tip, SharedShape::ball(0.05));
        RbtPlanner::new(model, env, params)
    }

    fn qv(a: f64, b: f64) -> DVector<f64> {
        DVector::from_vec(vec![a, b])
    }

    #[test]
    fn test_steer_respects_step_length() {
        let from = qv(0.0, 0.0);
        let toward = qv(3.0, 4.0);
        let stepped = steer(&from, &toward, 1.0);
        approx::assert_relative_eq!(stepped.norm(), 1.0, epsilon = 1e-12);
        // Direction preserved.
        approx::assert_relative_eq!(stepped[1] / stepped[0], 4.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_steer_degenerate_direction() {
        let from = qv(0.5, 0.5);
        assert_eq!(steer(&from, &from, 0.3), from);
    }

    #[test]
    fn test_bad_dimension_rejected() {
        let mut planner = planar_planner(PlannerParams::default());
        let err = planner
            .plan(&DVector::from_vec(vec![0.0]), &qv(1.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, PlanningError::BadInput(_)), "{err}");
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut planner = planar_planner(PlannerParams::default());
        let err = planner.plan(&qv(10.0, 0.0), &qv(1.0, 0.0)).unwrap_err();
        assert!(matches!(err, PlanningError::BadInput(_)), "{err}");
    }

    #[test]
    fn test_empty_scene_connects_immediately() {
        let mut params = PlannerParams::default();
        params.seed = Some(1);
        let mut planner = planar_planner(params);

        let start = qv(0.0, 0.0);
        let goal = qv(1.0, 0.0);
        let path = planner.plan(&start, &goal).unwrap();

        assert_eq!(path.first().unwrap(), &start);
        assert_eq!(path.last().unwrap(), &goal);
        for q in &path {
            assert_eq!(q.len(), 2);
        }
    }

    #[test]
    fn test_extract_path_orientation() {
        // t_a grew from the goal side: the joined path must be flipped so it
        // starts at the start-tree root.
        let mut t_a = ConfigTree::new(qv(9.0, 0.0));
        let a = t_a.add_node(0, qv(8.0, 0.0));
        t_a.add_node(a, qv(7.0, 0.0));

        let mut t_b = ConfigTree::new(qv(0.0, 0.0));
        t_b.add_node(0, qv(6.9, 0.0));

        let q_new = qv(7.0, 0.0);
        let path = extract_path(&t_a, &t_b, &q_new, false);

        assert_eq!(path.first().unwrap(), &qv(0.0, 0.0));
        assert_eq!(path.last().unwrap(), &qv(9.0, 0.0));
    }
}
