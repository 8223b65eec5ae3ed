//! Error types for model construction, scene assembly, and planning.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the planner and its supporting subsystems.
///
/// Construction-time errors (`ModelInvalid`, `MeshLoadFailed`, `SceneInvalid`)
/// are fatal to the planner instance being built. The remaining kinds are
/// recoverable: `plan` returns them as an absent-path outcome and the planner
/// stays usable for subsequent calls.
#[derive(Debug, Error)]
pub enum PlanningError {
    /// The robot description cannot be assembled into a joint chain with
    /// limits (missing limits on an actuated joint, nonexistent root link,
    /// broken chain, unsupported joint type).
    #[error("invalid robot model: {0}")]
    ModelInvalid(String),

    /// A referenced mesh file is missing or malformed.
    #[error("failed to load mesh '{}': {reason}", .path.display())]
    MeshLoadFailed { path: PathBuf, reason: String },

    /// A scene description file could not be read or parsed.
    #[error("invalid scene: {0}")]
    SceneInvalid(String),

    /// Start/goal of the wrong dimension or outside the joint bounds, or
    /// unusable planner parameters.
    #[error("bad planning input: {0}")]
    BadInput(String),

    /// The workspace clearance at the active tree frontier dropped below the
    /// contact threshold; the start (or goal) configuration touches an
    /// obstacle.
    #[error("configuration in contact: clearance {clearance} m below threshold {threshold} m")]
    StartInContact { clearance: f64, threshold: f64 },

    /// The iteration budget ran out before the two trees connected.
    #[error("no path found within {0} iterations")]
    IterationLimit(usize),
}

impl PlanningError {
    /// Whether the planner instance remains usable after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PlanningError::BadInput(_)
                | PlanningError::StartInContact { .. }
                | PlanningError::IterationLimit(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlanningError>;
