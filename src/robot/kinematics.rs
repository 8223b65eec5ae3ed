//! Serial-chain forward kinematics and reach radii.
//!
//! The planner and the bur geometry only see the [`KinematicModel`]
//! capability set; [`SerialChain`] is the concrete implementation shared by
//! the URDF-backed robot and the analytic planar arm.

use nalgebra::{DVector, Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::error::{PlanningError, Result};

/// Capability set consumed by the bur geometry and the planner.
///
/// `forward_point` and `radius` together realize the Lipschitz bound
/// `‖p_end(q') − p_end(q)‖ ≤ Σ_i r_i(q)·|q'_i − q_i|` over small motions.
pub trait KinematicModel {
    /// Number of actuated joints.
    fn dof(&self) -> usize;

    /// Per-joint `[lower, upper]` limits, indexed by joint.
    fn bounds(&self) -> &[(f64, f64)];

    /// World frame of every actuated joint (rotation applied, origin at the
    /// joint anchor), root to tip, in a single traversal.
    fn forward_all(&self, q: &DVector<f64>) -> Result<Vec<Isometry3<f64>>>;

    /// World position of the distal end of the link driven by joint `i`
    /// (the next joint's anchor, or the chain tip for the last joint).
    fn forward_point(&self, i: usize, q: &DVector<f64>) -> Result<Point3<f64>>;

    /// Upper bound on the workspace speed induced on the end effector by
    /// unit motion of joint `i` at configuration `q`: the perpendicular
    /// distance from the end effector to joint `i`'s world axis for a
    /// revolute joint, 1 for a prismatic joint.
    fn radius(&self, i: usize, q: &DVector<f64>) -> Result<f64>;
}

/// Actuated joint kinds the chain supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Revolute,
    Prismatic,
}

/// One actuated joint of a serial chain.
///
/// `origin` is the transform from the previous actuated frame to this
/// joint's anchor, with any interleaved fixed joints folded in.
#[derive(Debug, Clone)]
pub struct JointSpec {
    pub name: String,
    pub kind: JointKind,
    pub axis: Unit<Vector3<f64>>,
    pub origin: Isometry3<f64>,
    pub limits: (f64, f64),
}

impl JointSpec {
    fn motion(&self, value: f64) -> Isometry3<f64> {
        match self.kind {
            JointKind::Revolute => Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&self.axis, value),
            ),
            JointKind::Prismatic => Isometry3::from_parts(
                Translation3::from(self.axis.into_inner() * value),
                UnitQuaternion::identity(),
            ),
        }
    }
}

/// A serial kinematic chain: actuated joints root to tip plus a fixed tail
/// transform from the last joint to the end effector.
#[derive(Debug, Clone)]
pub struct SerialChain {
    joints: Vec<JointSpec>,
    tip: Isometry3<f64>,
    bounds: Vec<(f64, f64)>,
}

impl SerialChain {
    /// Build a chain from joint specs and the last-joint-to-end-effector
    /// transform.
    pub fn new(joints: Vec<JointSpec>, tip: Isometry3<f64>) -> Result<Self> {
        if joints.is_empty() {
            return Err(PlanningError::ModelInvalid(
                "chain has no actuated joints".into(),
            ));
        }
        for joint in &joints {
            let (lower, upper) = joint.limits;
            if !lower.is_finite() || !upper.is_finite() || lower > upper {
                return Err(PlanningError::ModelInvalid(format!(
                    "joint '{}' has unusable limits [{lower}, {upper}]",
                    joint.name
                )));
            }
        }
        let bounds = joints.iter().map(|j| j.limits).collect();
        Ok(Self { joints, tip, bounds })
    }

    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    fn check_config(&self, q: &DVector<f64>) -> Result<()> {
        if q.len() != self.joints.len() {
            return Err(PlanningError::BadInput(format!(
                "configuration has {} values, chain has {} joints",
                q.len(),
                self.joints.len()
            )));
        }
        Ok(())
    }

    /// World frames of all actuated joints under `q`.
    fn frames(&self, q: &DVector<f64>) -> Vec<Isometry3<f64>> {
        let mut world = Isometry3::identity();
        self.joints
            .iter()
            .zip(q.iter())
            .map(|(joint, &value)| {
                world *= joint.origin * joint.motion(value);
                world
            })
            .collect()
    }

    /// World position of the end effector (chain tip) under `q`.
    pub fn end_effector(&self, q: &DVector<f64>) -> Result<Point3<f64>> {
        self.check_config(q)?;
        let frames = self.frames(q);
        let last = frames.last().expect("chain has at least one joint");
        Ok((last * self.tip).translation.vector.into())
    }
}

impl KinematicModel for SerialChain {
    fn dof(&self) -> usize {
        self.joints.len()
    }

    fn bounds(&self) -> &[(f64, f64)] {
        &self.bounds
    }

    fn forward_all(&self, q: &DVector<f64>) -> Result<Vec<Isometry3<f64>>> {
        self.check_config(q)?;
        Ok(self.frames(q))
    }

    fn forward_point(&self, i: usize, q: &DVector<f64>) -> Result<Point3<f64>> {
        self.check_config(q)?;
        if i >= self.joints.len() {
            return Err(PlanningError::BadInput(format!(
                "joint index {i} out of range for {}-joint chain",
                self.joints.len()
            )));
        }

        let mut world = Isometry3::identity();
        for (joint, &value) in self.joints.iter().zip(q.iter()).take(i + 1) {
            world *= joint.origin * joint.motion(value);
        }
        let distal = match self.joints.get(i + 1) {
            Some(next) => world * next.origin,
            None => world * self.tip,
        };
        Ok(distal.translation.vector.into())
    }

    fn radius(&self, i: usize, q: &DVector<f64>) -> Result<f64> {
        self.check_config(q)?;
        let joint = self.joints.get(i).ok_or_else(|| {
            PlanningError::BadInput(format!(
                "joint index {i} out of range for {}-joint chain",
                self.joints.len()
            ))
        })?;

        // Unit prismatic motion translates the whole distal chain by the
        // (unit) axis.
        if joint.kind == JointKind::Prismatic {
            return Ok(1.0);
        }

        let frames = self.frames(q);
        let frame = &frames[i];
        let last = frames.last().expect("chain has at least one joint");
        let end_effector = (last * self.tip).translation.vector;

        let axis_world = frame.rotation * joint.axis.into_inner();
        let diff = end_effector - frame.translation.vector;
        // Perpendicular distance from the end effector to the joint axis;
        // the axis is unit length, no normalization needed.
        let projection = diff - diff.dot(&axis_world) * axis_world;
        Ok(projection.norm())
    }
}
