//! burplan CLI: load a scene, plan, and emit the path.

mod cli;

use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nalgebra::DVector;
use tracing::info;
use tracing_subscriber::EnvFilter;

use burplan::{interpolate_path, write_path, PlannerParams, RbtPlanner, SceneDefinition};

use cli::{parse_config, Cli};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let scene = SceneDefinition::from_yaml_file(&cli.scene)
        .with_context(|| format!("loading scene '{}'", cli.scene.display()))?;
    info!("{}", scene.describe());

    let scene_dir = cli
        .scene
        .parent()
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| ".".into());
    let (robot, env) = scene.build(&scene_dir).context("assembling scene")?;

    let mut params = match &cli.params {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading parameters '{}'", path.display()))?;
            PlannerParams::from_yaml_str(&text)?
        }
        None => scene.planner.clone().unwrap_or_default(),
    };
    if let Some(seed) = cli.seed {
        params.seed = Some(seed);
    }

    let start = resolve_config(cli.start.as_deref(), scene.start_config(), "start")?;
    let goal = resolve_config(cli.goal.as_deref(), scene.goal_config(), "goal")?;

    let mut planner = RbtPlanner::new(Arc::new(robot.chain), env, params);

    let began = Instant::now();
    let path = planner
        .plan(&start, &goal)
        .context("planning failed")?;
    info!(
        waypoints = path.len(),
        elapsed_ms = began.elapsed().as_millis() as u64,
        "path found"
    );

    let path = match cli.interpolate {
        Some(step) => interpolate_path(&path, step),
        None => path,
    };

    match &cli.output {
        Some(file) => {
            let mut out = std::fs::File::create(file)
                .with_context(|| format!("creating '{}'", file.display()))?;
            write_path(&path, &mut out)?;
            out.flush()?;
            info!("path written to {}", file.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            write_path(&path, &mut stdout)?;
        }
    }

    Ok(())
}

fn resolve_config(
    from_cli: Option<&str>,
    from_scene: Option<DVector<f64>>,
    what: &str,
) -> Result<DVector<f64>> {
    if let Some(text) = from_cli {
        let values = parse_config(text).map_err(anyhow::Error::msg)?;
        return Ok(DVector::from_vec(values));
    }
    match from_scene {
        Some(q) => Ok(q),
        None => bail!("no {what} configuration given (use --{what} or the scene file)"),
    }
}
