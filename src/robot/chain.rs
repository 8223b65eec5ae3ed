//! URDF-backed robot: chain extraction, joint limits, and per-link collision
//! geometry descriptors.

use std::collections::HashMap;
use std::path::Path;

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use tracing::{debug, warn};
use urdf_rs::{Geometry, JointType};

use crate::error::{PlanningError, Result};
use crate::robot::kinematics::{JointKind, JointSpec, SerialChain};

/// Collision geometry attached to a chain link, prior to mesh loading.
#[derive(Debug, Clone)]
pub enum LinkShape {
    Mesh {
        filename: String,
        scale: Option<[f64; 3]>,
    },
    Sphere {
        radius: f64,
    },
    Box {
        size: [f64; 3],
    },
    Cylinder {
        radius: f64,
        length: f64,
    },
    Capsule {
        radius: f64,
        length: f64,
    },
}

/// One collision element of the robot, bound to the actuated frame it rides
/// on. `frame == None` pins the element to the world (geometry on the base
/// side of the first actuated joint).
#[derive(Debug, Clone)]
pub struct LinkGeometry {
    pub link: String,
    pub frame: Option<usize>,
    pub local: Isometry3<f64>,
    pub shape: LinkShape,
}

/// An articulated robot assembled from a URDF description: the actuated
/// chain from the root link to an end link, plus the collision geometry of
/// the links along it.
#[derive(Debug, Clone)]
pub struct UrdfRobot {
    pub name: String,
    pub chain: SerialChain,
    pub geometry: Vec<LinkGeometry>,
}

impl UrdfRobot {
    /// Load and assemble a robot from a URDF file. When `end_link` is
    /// `None`, the chain runs to the first leaf link in description order.
    pub fn from_file(path: impl AsRef<Path>, end_link: Option<&str>) -> Result<Self> {
        let path = path.as_ref();
        let urdf = urdf_rs::read_file(path).map_err(|e| {
            PlanningError::ModelInvalid(format!("failed to parse '{}': {e}", path.display()))
        })?;
        Self::from_urdf(&urdf, end_link)
    }

    /// Assemble a robot from a URDF XML string.
    pub fn from_str(urdf: &str, end_link: Option<&str>) -> Result<Self> {
        let urdf = urdf_rs::read_from_string(urdf)
            .map_err(|e| PlanningError::ModelInvalid(format!("failed to parse URDF: {e}")))?;
        Self::from_urdf(&urdf, end_link)
    }

    fn from_urdf(urdf: &urdf_rs::Robot, end_link: Option<&str>) -> Result<Self> {
        let root = find_root(urdf)?;
        let end = match end_link {
            Some(name) => {
                if !urdf.links.iter().any(|l| l.name == name) {
                    return Err(PlanningError::ModelInvalid(format!(
                        "end link '{name}' does not exist"
                    )));
                }
                name.to_string()
            }
            None => find_end_link(urdf)?,
        };
        debug!(robot = %urdf.name, %root, %end, "extracting joint chain");

        let path_joints = chain_path(urdf, &root, &end)?;
        if path_joints.is_empty() {
            return Err(PlanningError::ModelInvalid(format!(
                "no joints between root '{root}' and end link '{end}'"
            )));
        }

        // Fold fixed joints into the next actuated joint's origin; remember
        // which actuated frame each traversed link rides on.
        let mut specs: Vec<JointSpec> = Vec::new();
        let mut attachments: HashMap<String, (Option<usize>, Isometry3<f64>)> = HashMap::new();
        attachments.insert(root.clone(), (None, Isometry3::identity()));

        let mut pending = Isometry3::identity();
        for joint in &path_joints {
            let origin = pose_to_isometry(&joint.origin);
            match &joint.joint_type {
                JointType::Fixed => {
                    pending *= origin;
                    let frame = specs.len().checked_sub(1);
                    attachments.insert(joint.child.link.clone(), (frame, pending));
                }
                JointType::Revolute | JointType::Prismatic => {
                    let kind = if matches!(joint.joint_type, JointType::Revolute) {
                        JointKind::Revolute
                    } else {
                        JointKind::Prismatic
                    };
                    let (lower, upper) = (joint.limit.lower, joint.limit.upper);
                    if lower == 0.0 && upper == 0.0 {
                        return Err(PlanningError::ModelInvalid(format!(
                            "actuated joint '{}' has no limits",
                            joint.name
                        )));
                    }
                    if lower > upper {
                        return Err(PlanningError::ModelInvalid(format!(
                            "joint '{}' has inverted limits [{lower}, {upper}]",
                            joint.name
                        )));
                    }
                    let axis = Vector3::new(joint.axis.xyz[0], joint.axis.xyz[1], joint.axis.xyz[2]);
                    if axis.norm() < 1e-9 {
                        return Err(PlanningError::ModelInvalid(format!(
                            "joint '{}' has a zero axis",
                            joint.name
                        )));
                    }
                    specs.push(JointSpec {
                        name: joint.name.clone(),
                        kind,
                        axis: Unit::new_normalize(axis),
                        origin: pending * origin,
                        limits: (lower, upper),
                    });
                    pending = Isometry3::identity();
                    attachments.insert(
                        joint.child.link.clone(),
                        (Some(specs.len() - 1), Isometry3::identity()),
                    );
                }
                other => {
                    return Err(PlanningError::ModelInvalid(format!(
                        "joint '{}' has unsupported type {other:?}",
                        joint.name
                    )));
                }
            }
        }

        let chain = SerialChain::new(specs, pending)?;
        let geometry = collect_geometry(urdf, &attachments);
        Ok(Self {
            name: urdf.name.clone(),
            chain,
            geometry,
        })
    }
}

/// The unique link that is nobody's child.
fn find_root(urdf: &urdf_rs::Robot) -> Result<String> {
    let mut roots = urdf
        .links
        .iter()
        .filter(|l| !urdf.joints.iter().any(|j| j.child.link == l.name))
        .map(|l| l.name.clone());
    let root = roots
        .next()
        .ok_or_else(|| PlanningError::ModelInvalid("description has no root link".into()))?;
    if let Some(second) = roots.next() {
        return Err(PlanningError::ModelInvalid(format!(
            "description has multiple root links ('{root}', '{second}', ...)"
        )));
    }
    Ok(root)
}

/// First link, in description order, that parents no joint.
fn find_end_link(urdf: &urdf_rs::Robot) -> Result<String> {
    urdf.links
        .iter()
        .find(|l| !urdf.joints.iter().any(|j| j.parent.link == l.name))
        .map(|l| l.name.clone())
        .ok_or_else(|| PlanningError::ModelInvalid("description has no leaf link".into()))
}

/// Joints from `root` to `end`, in traversal order.
fn chain_path<'a>(
    urdf: &'a urdf_rs::Robot,
    root: &str,
    end: &str,
) -> Result<Vec<&'a urdf_rs::Joint>> {
    let parent_joint: HashMap<&str, &urdf_rs::Joint> = urdf
        .joints
        .iter()
        .map(|j| (j.child.link.as_str(), j))
        .collect();

    let mut reversed = Vec::new();
    let mut current = end;
    while current != root {
        let joint = parent_joint.get(current).ok_or_else(|| {
            PlanningError::ModelInvalid(format!(
                "broken chain: link '{current}' is not connected to root '{root}'"
            ))
        })?;
        reversed.push(*joint);
        current = joint.parent.link.as_str();
        if reversed.len() > urdf.joints.len() {
            return Err(PlanningError::ModelInvalid(
                "joint graph contains a cycle".into(),
            ));
        }
    }
    reversed.reverse();
    Ok(reversed)
}

fn collect_geometry(
    urdf: &urdf_rs::Robot,
    attachments: &HashMap<String, (Option<usize>, Isometry3<f64>)>,
) -> Vec<LinkGeometry> {
    let mut out = Vec::new();
    for link in &urdf.links {
        let Some((frame, base)) = attachments.get(&link.name) else {
            if !link.collision.is_empty() {
                warn!(link = %link.name, "collision geometry on off-chain link ignored");
            }
            continue;
        };
        for collision in &link.collision {
            let local = base * pose_to_isometry(&collision.origin);
            let shape = match &collision.geometry {
                Geometry::Mesh { filename, scale } => LinkShape::Mesh {
                    filename: filename.clone(),
                    scale: scale.as_ref().map(|s| [s[0], s[1], s[2]]),
                },
                Geometry::Sphere { radius } => LinkShape::Sphere { radius: *radius },
                Geometry::Box { size } => LinkShape::Box {
                    size: [size[0], size[1], size[2]],
                },
                Geometry::Cylinder { radius, length } => LinkShape::Cylinder {
                    radius: *radius,
                    length: *length,
                },
                Geometry::Capsule { radius, length } => LinkShape::Capsule {
                    radius: *radius,
                    length: *length,
                },
            };
            out.push(LinkGeometry {
                link: link.name.clone(),
                frame: *frame,
                local,
                shape,
            });
        }
    }
    out
}

pub(crate) fn pose_to_isometry(pose: &urdf_rs::Pose) -> Isometry3<f64> {
    let translation = Translation3::new(pose.xyz[0], pose.xyz[1], pose.xyz[2]);
    let rotation = UnitQuaternion::from_euler_angles(pose.rpy[0], pose.rpy[1], pose.rpy[2]);
    Isometry3::from_parts(translation, rotation)
}
