//! Mesh asset loading for collision geometry.

pub mod obj;

pub use obj::{load_trimesh, resolve_mesh_path};
