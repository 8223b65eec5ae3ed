//! Wavefront OBJ loading into parry triangle meshes.

use std::path::{Path, PathBuf};

use nalgebra::Point3;
use parry3d_f64::shape::TriMesh;
use tracing::debug;

use crate::error::{PlanningError, Result};

/// Load an OBJ file as a single triangle mesh, optionally scaling vertices.
///
/// All models in the file are merged; collision queries do not care about
/// group structure.
pub fn load_trimesh(path: &Path, scale: Option<[f64; 3]>) -> Result<TriMesh> {
    debug!("loading OBJ file: {}", path.display());

    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
        },
    )
    .map_err(|e| PlanningError::MeshLoadFailed {
        path: path.to_path_buf(),
        reason: format!("OBJ parsing error: {e}"),
    })?;

    if models.is_empty() {
        return Err(PlanningError::MeshLoadFailed {
            path: path.to_path_buf(),
            reason: "OBJ file contains no models".into(),
        });
    }

    let scale = scale.unwrap_or([1.0, 1.0, 1.0]);
    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut indices: Vec<[u32; 3]> = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let base = vertices.len() as u32;
        vertices.extend(mesh.positions.chunks(3).map(|p| {
            Point3::new(
                f64::from(p[0]) * scale[0],
                f64::from(p[1]) * scale[1],
                f64::from(p[2]) * scale[2],
            )
        }));
        indices.extend(
            mesh.indices
                .chunks(3)
                .map(|t| [base + t[0], base + t[1], base + t[2]]),
        );
    }

    debug!(
        "OBJ '{}': {} vertices, {} triangles",
        path.display(),
        vertices.len(),
        indices.len()
    );

    Ok(TriMesh::new(vertices, indices))
}

/// Resolve a mesh URI from a robot description against a base directory.
///
/// `package://` and `file://` prefixes are stripped the same way the usual
/// ROS tooling expects; bare paths are taken relative to `base_dir`.
pub fn resolve_mesh_path(filename: &str, base_dir: &Path) -> PathBuf {
    if let Some(relative) = filename.strip_prefix("package://") {
        base_dir.join(relative)
    } else if let Some(absolute) = filename.strip_prefix("file://") {
        PathBuf::from(absolute)
    } else {
        base_dir.join(filename)
    }
}
