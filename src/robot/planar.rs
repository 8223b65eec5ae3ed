//! Analytic planar-arm chain for mesh-free experiments and tests.

use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::error::Result;
use crate::robot::kinematics::{JointKind, JointSpec, SerialChain};

/// Build an n-link planar arm: every joint revolute about +z, each link a
/// straight segment along the local x axis, all joints sharing one limit
/// interval.
///
/// The arm lives in the z = 0 plane with its base at the world origin.
pub fn planar_arm(link_lengths: &[f64], limits: (f64, f64)) -> Result<SerialChain> {
    let axis = Unit::new_normalize(Vector3::z());
    let joints = link_lengths
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let origin = if i == 0 {
                Isometry3::identity()
            } else {
                Isometry3::from_parts(
                    Translation3::new(link_lengths[i - 1], 0.0, 0.0),
                    UnitQuaternion::identity(),
                )
            };
            JointSpec {
                name: format!("joint_{i}"),
                kind: JointKind::Revolute,
                axis,
                origin,
                limits,
            }
        })
        .collect();

    let tip = Isometry3::from_parts(
        Translation3::new(*link_lengths.last().unwrap_or(&0.0), 0.0, 0.0),
        UnitQuaternion::identity(),
    );
    SerialChain::new(joints, tip)
}
