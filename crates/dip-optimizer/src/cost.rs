//! Trajectory cost
//!
//! ```text
//! ISE      = Σ ‖x_k‖²·dt
//! ITAE     = Σ t_k·‖x_k‖₁·dt
//! effort   = Σ u_k²·dt
//! rate     = Σ ((u_k − u_{k−1}) / dt)²·dt
//! sliding  = Σ s_k²·dt
//! total    = Σ w_i·(component_i / norm_i) + penalty
//! ```
//!
//! Diverged runs never produce NaN costs: they score exactly the configured
//! sentinel so the swarm can rank them as worst.

use serde::{Deserialize, Serialize};
use tracing::trace;

use dip_common::{DipError, Result, Trajectory};

/// Weights of the cost components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostWeights {
    pub ise: f64,
    pub itae: f64,
    pub control_effort: f64,
    pub control_rate: f64,
    pub sliding_effort: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            ise: 1.0,
            itae: 0.1,
            control_effort: 0.01,
            control_rate: 1e-4,
            sliding_effort: 0.1,
        }
    }
}

/// Per-component normalization constants. Values ≤ 0 (or non-finite) are
/// treated as 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostNormalization {
    pub ise: f64,
    pub itae: f64,
    pub control_effort: f64,
    pub control_rate: f64,
    pub sliding_effort: f64,
}

impl Default for CostNormalization {
    fn default() -> Self {
        Self {
            ise: 1.0,
            itae: 1.0,
            control_effort: 1.0,
            control_rate: 1.0,
            sliding_effort: 1.0,
        }
    }
}

#[inline]
fn divisor(norm: f64) -> f64 {
    if norm.is_finite() && norm > 0.0 {
        norm
    } else {
        1.0
    }
}

/// Cost function configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostConfig {
    pub weights: CostWeights,
    pub normalization: CostNormalization,
    /// Cost assigned to diverged or failed runs
    pub sentinel: f64,
    /// Any `|state component|` above this marks the run as diverged
    pub divergence_bound: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            weights: CostWeights::default(),
            normalization: CostNormalization::default(),
            sentinel: 1e6,
            divergence_bound: 100.0,
        }
    }
}

/// Cost breakdown for one trajectory
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostResult {
    pub ise: f64,
    pub itae: f64,
    pub control_effort: f64,
    pub control_rate: f64,
    pub sliding_effort: f64,
    pub instability_penalty: f64,
    pub total: f64,
}

impl CostResult {
    fn diverged(sentinel: f64) -> Self {
        Self {
            ise: 0.0,
            itae: 0.0,
            control_effort: 0.0,
            control_rate: 0.0,
            sliding_effort: 0.0,
            instability_penalty: sentinel,
            total: sentinel,
        }
    }

    pub fn is_diverged(&self) -> bool {
        self.instability_penalty > 0.0
    }
}

/// Scores closed-loop trajectories
#[derive(Debug, Clone, PartialEq)]
pub struct CostFunction {
    config: CostConfig,
}

impl CostFunction {
    pub fn new(config: CostConfig) -> Result<Self> {
        if !config.sentinel.is_finite() || config.sentinel <= 0.0 {
            return Err(DipError::Configuration(format!(
                "cost sentinel must be finite and > 0, got {}",
                config.sentinel
            )));
        }
        if !config.divergence_bound.is_finite() || config.divergence_bound <= 0.0 {
            return Err(DipError::Configuration(format!(
                "divergence_bound must be finite and > 0, got {}",
                config.divergence_bound
            )));
        }
        let w = &config.weights;
        for (name, value) in [
            ("ise", w.ise),
            ("itae", w.itae),
            ("control_effort", w.control_effort),
            ("control_rate", w.control_rate),
            ("sliding_effort", w.sliding_effort),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DipError::Configuration(format!(
                    "cost weight {} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &CostConfig {
        &self.config
    }

    pub fn sentinel(&self) -> f64 {
        self.config.sentinel
    }

    /// Why a trajectory counts as diverged, if it does
    fn divergence(&self, traj: &Trajectory) -> Option<String> {
        if let Some(failure) = &traj.failure {
            return Some(format!("simulation failed at step {}: {}", failure.step, failure.reason));
        }
        if traj.is_empty() {
            return Some("empty trajectory".to_string());
        }
        let bound = self.config.divergence_bound;
        for (k, state) in traj.states.iter().enumerate() {
            if !state.is_finite() {
                return Some(format!("non-finite state at step {}", k));
            }
            if state.max_abs() > bound {
                return Some(format!("state exceeds divergence bound {} at step {}", bound, k));
            }
        }
        if let Some(k) = traj.controls.iter().position(|u| !u.is_finite()) {
            return Some(format!("non-finite control at step {}", k));
        }
        if let Some(k) = traj.sliding.iter().position(|s| !s.is_finite()) {
            return Some(format!("non-finite sliding variable at step {}", k));
        }
        None
    }

    pub fn evaluate(&self, traj: &Trajectory) -> CostResult {
        let sentinel = self.config.sentinel;
        if let Some(reason) = self.divergence(traj) {
            trace!(%reason, "trajectory diverged");
            return CostResult::diverged(sentinel);
        }

        let dt = traj.dt;
        let mut ise = 0.0;
        let mut itae = 0.0;
        for (state, t) in traj.states.iter().zip(traj.times()) {
            ise += state.norm_squared() * dt;
            itae += t * state.l1_norm() * dt;
        }
        let control_effort: f64 = traj.controls.iter().map(|u| u * u * dt).sum();
        let control_rate: f64 = traj
            .controls
            .windows(2)
            .map(|w| {
                let du = (w[1] - w[0]) / dt;
                du * du * dt
            })
            .sum();
        let sliding_effort: f64 = traj.sliding.iter().map(|s| s * s * dt).sum();

        let w = &self.config.weights;
        let n = &self.config.normalization;
        let total = w.ise * ise / divisor(n.ise)
            + w.itae * itae / divisor(n.itae)
            + w.control_effort * control_effort / divisor(n.control_effort)
            + w.control_rate * control_rate / divisor(n.control_rate)
            + w.sliding_effort * sliding_effort / divisor(n.sliding_effort);

        if !total.is_finite() {
            return CostResult::diverged(sentinel);
        }

        CostResult {
            ise,
            itae,
            control_effort,
            control_rate,
            sliding_effort,
            instability_penalty: 0.0,
            total: total.min(sentinel),
        }
    }
}

impl Default for CostFunction {
    fn default() -> Self {
        Self {
            config: CostConfig::default(),
        }
    }
}
