//! The RBT-Connect planner and its supporting pieces.

pub mod bur;
pub mod rbt;
pub mod tree;

pub use bur::{grow_bur, rho_r, Bur};
pub use rbt::{ConnectStatus, RbtPlanner};
pub use tree::ConfigTree;

use std::io::{self, Write};

use nalgebra::DVector;

/// Densify a path by subdividing each consecutive pair into
/// `⌈‖q_{i+1} − q_i‖ / step⌉` uniform segments.
///
/// Collision is not re-checked: each input segment is already certified free
/// by the planner, and uniform subdivision stays on it.
pub fn interpolate_path(path: &[DVector<f64>], step: f64) -> Vec<DVector<f64>> {
    if path.len() < 2 || step <= 0.0 {
        return path.to_vec();
    }

    let mut dense = vec![path[0].clone()];
    for pair in path.windows(2) {
        let segment = &pair[1] - &pair[0];
        let count = (segment.norm() / step).ceil().max(1.0) as usize;
        for s in 1..=count {
            dense.push(&pair[0] + (s as f64 / count as f64) * &segment);
        }
    }
    dense
}

/// Dump a path as one configuration per line, joint values space-separated.
/// Side channel for external renderers; not part of the planner contract.
pub fn write_path<W: Write>(path: &[DVector<f64>], writer: &mut W) -> io::Result<()> {
    for q in path {
        let line = q
            .iter()
            .map(|value| format!("{value:.6}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
