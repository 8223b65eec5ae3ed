//! Command-line interface definitions.

use std::path::PathBuf;

use clap::Parser;

/// Plan a collision-free joint-space path for an articulated robot.
#[derive(Debug, Parser)]
#[command(name = "burplan", version, about)]
pub struct Cli {
    /// Scene description file (YAML): robot URDF, obstacles, start/goal.
    #[arg(long, value_name = "FILE")]
    pub scene: PathBuf,

    /// Start configuration as comma-separated joint values; overrides the
    /// scene file.
    #[arg(long, value_name = "Q", allow_hyphen_values = true)]
    pub start: Option<String>,

    /// Goal configuration as comma-separated joint values; overrides the
    /// scene file.
    #[arg(long, value_name = "Q", allow_hyphen_values = true)]
    pub goal: Option<String>,

    /// Planner parameter file (YAML); overrides the scene's planner section.
    #[arg(long, value_name = "FILE")]
    pub params: Option<PathBuf>,

    /// RNG seed; overrides any seed from the parameter sources.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Subdivide the result to this configuration-space spacing.
    #[arg(long, value_name = "STEP")]
    pub interpolate: Option<f64>,

    /// Write the path (one configuration per line) to this file instead of
    /// stdout.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Parse a comma-separated joint vector such as `0.0,-1.57,0.4`.
pub fn parse_config(text: &str) -> Result<Vec<f64>, String> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("bad joint value '{}': {e}", part.trim()))
        })
        .collect()
}
