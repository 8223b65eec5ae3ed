//! Bur construction: star-shaped collision-free neighborhoods certified by a
//! single workspace clearance query and the per-joint Lipschitz bound.

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::error::Result;
use crate::robot::KinematicModel;

/// A bur: a center configuration and one certified-free endpoint per
/// direction (one matrix column each).
///
/// Every straight configuration-space segment from `center` to an endpoint
/// is collision-free against the clearance the bur was grown with.
#[derive(Debug, Clone)]
pub struct Bur {
    pub center: DVector<f64>,
    pub endpoints: DMatrix<f64>,
}

/// Maximum workspace displacement of any distal chain point between two
/// configurations.
pub fn rho_r<M: KinematicModel>(model: &M, a: &DVector<f64>, b: &DVector<f64>) -> Result<f64> {
    let mut max_distance = 0.0;
    for i in 0..model.dof() {
        let moved = (model.forward_point(i, a)? - model.forward_point(i, b)?).norm();
        if moved > max_distance {
            max_distance = moved;
        }
    }
    Ok(max_distance)
}

/// Grow a bur from `q_near` along each column of `directions`, given the
/// workspace clearance `d_closest` measured at `q_near`.
///
/// Per direction, the step fraction `Δt = φ·(1−t) / (r(q_k)·|q_e − q_k|)` is
/// the largest advance the Lipschitz bound still certifies free; iterating
/// approaches the collision boundary until the remaining margin drops under
/// `cutoff · d_closest` or the full segment is certified (`t > 1`).
///
/// Degenerate directions (zero direction component or all-zero radii) clamp
/// the endpoint back to `q_near`; they never error.
pub fn grow_bur<M: KinematicModel>(
    model: &M,
    q_near: &DVector<f64>,
    directions: &DMatrix<f64>,
    d_closest: f64,
    cutoff: f64,
) -> Result<Bur> {
    let dof = q_near.len();
    let mut endpoints = DMatrix::zeros(dof, directions.ncols());

    // Unbounded clearance (no obstacles registered): every direction is free
    // in its entirety.
    if d_closest.is_infinite() {
        endpoints.copy_from(directions);
        return Ok(Bur {
            center: q_near.clone(),
            endpoints,
        });
    }

    let d_small = cutoff * d_closest;
    for (column, q_e) in directions.column_iter().enumerate() {
        let q_e = q_e.into_owned();
        let mut t = 0.0;
        let mut q_k = q_near.clone();

        loop {
            let phi = d_closest - rho_r(model, q_near, &q_k)?;
            if phi <= d_small {
                break;
            }

            let mut denominator = 0.0;
            for i in 0..dof {
                denominator += model.radius(i, &q_k)? * (q_e[i] - q_k[i]).abs();
            }
            if denominator <= f64::EPSILON {
                q_k = q_near.clone();
                break;
            }

            t += phi * (1.0 - t) / denominator;
            if t > 1.0 {
                q_k = q_e.clone();
                break;
            }
            q_k = q_near + t * (&q_e - q_near);
        }

        trace!(column, t, "bur direction finished");
        endpoints.set_column(column, &q_k);
    }

    Ok(Bur {
        center: q_near.clone(),
        endpoints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::robot::planar::planar_arm;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn arm() -> impl KinematicModel {
        planar_arm(&[1.0, 1.0], (-PI, PI)).unwrap()
    }

    fn qv(a: f64, b: f64) -> DVector<f64> {
        DVector::from_vec(vec![a, b])
    }

    #[test]
    fn test_rho_r_zero_for_same_config() {
        let model = arm();
        let q = qv(0.3, -0.8);
        assert_relative_eq!(rho_r(&model, &q, &q).unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rho_r_bounds_tip_motion() {
        let model = arm();
        let a = qv(0.0, 0.0);
        let b = qv(0.2, -0.1);
        let tip_moved = (model.forward_point(1, &a).unwrap() - model.forward_point(1, &b).unwrap())
            .norm();
        assert!(rho_r(&model, &a, &b).unwrap() >= tip_moved - 1e-12);
    }

    #[test]
    fn test_unbounded_clearance_returns_directions() {
        let model = arm();
        let q_near = qv(0.0, 0.0);
        let directions = DMatrix::from_columns(&[qv(1.0, 0.0), qv(0.0, -1.0)]);
        let bur = grow_bur(&model, &q_near, &directions, f64::INFINITY, 0.1).unwrap();
        assert_eq!(&bur.endpoints, &directions);
    }

    #[test]
    fn test_degenerate_direction_clamps_to_center() {
        let model = arm();
        let q_near = qv(0.5, 0.5);
        // Direction equal to the center: zero denominator on the first pass.
        let directions = DMatrix::from_columns(&[q_near.clone()]);
        let bur = grow_bur(&model, &q_near, &directions, 0.5, 0.1).unwrap();
        assert_eq!(bur.endpoints.column(0), q_near.column(0));
    }

    #[test]
    fn test_endpoint_stays_within_certificate() {
        let model = arm();
        let q_near = qv(0.0, 0.0);
        let q_e = qv(1.0, 0.0);
        let directions = DMatrix::from_columns(&[q_e.clone()]);
        let d_closest = 0.5;
        let bur = grow_bur(&model, &q_near, &directions, d_closest, 0.1).unwrap();

        let endpoint = bur.endpoints.column(0).into_owned();
        // The workspace sweep to the endpoint never exceeds the clearance.
        let swept = rho_r(&model, &q_near, &endpoint).unwrap();
        assert!(
            swept <= d_closest + 1e-9,
            "swept {swept} exceeds clearance {d_closest}"
        );
        // And the endpoint actually advanced along the direction.
        assert!((endpoint - &q_near).norm() > 0.0);
    }

    #[test]
    fn test_large_clearance_certifies_full_segment() {
        let model = arm();
        let q_near = qv(0.0, 0.0);
        let q_e = qv(0.1, 0.0);
        let directions = DMatrix::from_columns(&[q_e.clone()]);
        // Far more clearance than a 0.1 rad motion can consume.
        let bur = grow_bur(&model, &q_near, &directions, 10.0, 0.1).unwrap();
        assert_eq!(bur.endpoints.column(0).into_owned(), q_e);
    }

    #[test]
    fn test_monotone_margin_along_endpoint_segment() {
        let model = arm();
        let q_near = qv(0.2, 0.3);
        let directions = DMatrix::from_columns(&[qv(1.2, -0.5), qv(-0.8, 1.0)]);
        let d_closest = 0.4;
        let bur = grow_bur(&model, &q_near, &directions, d_closest, 0.1).unwrap();

        for column in 0..bur.endpoints.ncols() {
            let endpoint = bur.endpoints.column(column).into_owned();
            for step in 0..=32 {
                let t = f64::from(step) / 32.0;
                let q_t = &q_near + t * (&endpoint - &q_near);
                let swept = rho_r(&model, &q_near, &q_t).unwrap();
                // First-order certificate: allow the radii's O(‖Δq‖²) slack.
                assert!(
                    swept <= d_closest + 1e-2,
                    "certificate violated at t={t} of column {column}"
                );
            }
        }
    }
}
