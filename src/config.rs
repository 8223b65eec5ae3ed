//! Planner parameters with serde-loadable defaults.

use serde::{Deserialize, Serialize};

use crate::error::{PlanningError, Result};

/// Tuning parameters for the RBT-Connect planner.
///
/// All values can be loaded from YAML; every field falls back to the
/// documented default when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerParams {
    /// Upper bound on outer planner iterations before declaring failure.
    #[serde(default = "default_max_iters")]
    pub max_iters: usize,

    /// Workspace-distance threshold (meters) separating the bur regime from
    /// the basic-RRT regime.
    #[serde(default = "default_d_crit")]
    pub d_crit: f64,

    /// Configuration-space length to which sampled bur directions are
    /// rescaled.
    #[serde(default = "default_delta_q")]
    pub delta_q: f64,

    /// Configuration-space step length used in the near-obstacle regime.
    #[serde(default = "default_epsilon_q")]
    pub epsilon_q: f64,

    /// Number of simultaneous bur directions grown per iteration.
    #[serde(default = "default_num_spikes")]
    pub num_spikes: usize,

    /// Clearance (meters) below which a tree frontier counts as in contact.
    #[serde(default = "default_contact_eps")]
    pub contact_eps: f64,

    /// Configuration-space tolerance for treating the connect target as
    /// reached.
    #[serde(default = "default_connect_tolerance")]
    pub connect_tolerance: f64,

    /// Fraction of the measured clearance at which a bur extension stops.
    #[serde(default = "default_bur_cutoff")]
    pub bur_cutoff: f64,

    /// Fixed RNG seed. Runs with the same seed, inputs, and parameters
    /// produce identical paths; `None` seeds from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_iters() -> usize {
    1000
}

fn default_d_crit() -> f64 {
    0.1
}

fn default_delta_q() -> f64 {
    1.0
}

fn default_epsilon_q() -> f64 {
    0.05
}

fn default_num_spikes() -> usize {
    7
}

fn default_contact_eps() -> f64 {
    1e-3
}

fn default_connect_tolerance() -> f64 {
    1e-2
}

fn default_bur_cutoff() -> f64 {
    0.1
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            max_iters: default_max_iters(),
            d_crit: default_d_crit(),
            delta_q: default_delta_q(),
            epsilon_q: default_epsilon_q(),
            num_spikes: default_num_spikes(),
            contact_eps: default_contact_eps(),
            connect_tolerance: default_connect_tolerance(),
            bur_cutoff: default_bur_cutoff(),
            seed: None,
        }
    }
}

impl PlannerParams {
    /// Parse parameters from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let params: PlannerParams = serde_yaml::from_str(yaml)
            .map_err(|e| PlanningError::BadInput(format!("planner parameters: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    /// Reject parameter sets the planner cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_iters == 0 {
            return Err(PlanningError::BadInput("max_iters must be positive".into()));
        }
        if self.num_spikes == 0 {
            return Err(PlanningError::BadInput(
                "num_spikes must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("d_crit", self.d_crit),
            ("delta_q", self.delta_q),
            ("epsilon_q", self.epsilon_q),
            ("contact_eps", self.contact_eps),
            ("connect_tolerance", self.connect_tolerance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(PlanningError::BadInput(format!(
                    "{name} must be positive and finite, got {value}"
                )));
            }
        }
        if !(0.0..1.0).contains(&self.bur_cutoff) || self.bur_cutoff == 0.0 {
            return Err(PlanningError::BadInput(format!(
                "bur_cutoff must lie in (0, 1), got {}",
                self.bur_cutoff
            )));
        }
        Ok(())
    }
}
