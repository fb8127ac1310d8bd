//! Trajectory - one closed-loop simulation run
//!
//! Sample `k` holds the state at `t = k·dt` together with the control and
//! sliding variable computed from it. A run that stopped early carries a
//! [`SimulationFailure`]; the samples before the failure are kept.

use serde::{Deserialize, Serialize};

use crate::error::{DipError, Result};
use crate::types::state::StateVector;

/// Why a simulation stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// DynamicsModel returned `success = false`
    IllConditioned,
    /// Integration produced a non-finite state
    NonFiniteState,
    /// Controller construction or `compute_control` failed
    ControllerError,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllConditioned => write!(f, "ill-conditioned dynamics"),
            Self::NonFiniteState => write!(f, "non-finite state"),
            Self::ControllerError => write!(f, "controller error"),
        }
    }
}

/// Early-termination record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationFailure {
    pub step: usize,
    pub time: f64,
    pub reason: FailureReason,
    pub detail: String,
}

/// Time series of (state, control, sliding variable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub dt: f64,
    pub states: Vec<StateVector>,
    pub controls: Vec<f64>,
    pub sliding: Vec<f64>,
    pub failure: Option<SimulationFailure>,
}

impl Trajectory {
    pub fn with_capacity(dt: f64, steps: usize) -> Self {
        Self {
            dt,
            states: Vec::with_capacity(steps),
            controls: Vec::with_capacity(steps),
            sliding: Vec::with_capacity(steps),
            failure: None,
        }
    }

    /// A run that failed before producing any sample
    pub fn failed(dt: f64, reason: FailureReason, detail: impl Into<String>) -> Self {
        let mut traj = Self::with_capacity(dt, 0);
        traj.fail(reason, detail);
        traj
    }

    pub fn push(&mut self, state: StateVector, control: f64, sliding: f64) {
        self.states.push(state);
        self.controls.push(control);
        self.sliding.push(sliding);
    }

    /// Mark the run as stopped at the current sample count
    pub fn fail(&mut self, reason: FailureReason, detail: impl Into<String>) {
        let step = self.states.len();
        self.failure = Some(SimulationFailure {
            step,
            time: step as f64 * self.dt,
            reason,
            detail: detail.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Sample times `k·dt`
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.states.len()).map(move |k| k as f64 * self.dt)
    }

    pub fn duration(&self) -> f64 {
        self.states.len() as f64 * self.dt
    }

    pub fn final_state(&self) -> Option<&StateVector> {
        self.states.last()
    }

    /// Propagate a recorded failure as `NumericalInstability`
    pub fn into_result(self) -> Result<Self> {
        match &self.failure {
            Some(f) => Err(DipError::NumericalInstability(format!(
                "simulation stopped at step {} (t={:.4}s): {}: {}",
                f.step, f.time, f.reason, f.detail
            ))),
            None => Ok(self),
        }
    }
}
