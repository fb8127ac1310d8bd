//! Convergence bookkeeping for a PSO run

use serde::{Deserialize, Serialize};

/// Particles that scored the sentinel cost in one iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceEvent {
    /// 0 is the initial swarm, `i` the i-th update
    pub iteration: usize,
    pub particles: Vec<usize>,
}

/// Why the run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Iteration budget exhausted
    Budget,
    /// Best-cost improvement stayed below tolerance for `patience` iterations
    Converged,
}

/// Per-iteration record of the swarm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceHistory {
    /// Global best after each evaluation round, initial swarm first
    pub best_costs: Vec<f64>,
    /// Mean particle cost of each evaluation round
    pub mean_costs: Vec<f64>,
    pub divergences: Vec<DivergenceEvent>,
    /// Swarm updates performed (the initial evaluation is not counted)
    pub iterations: usize,
    pub termination: Termination,
}

impl ConvergenceHistory {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            best_costs: Vec::with_capacity(capacity),
            mean_costs: Vec::with_capacity(capacity),
            divergences: Vec::new(),
            iterations: 0,
            termination: Termination::Budget,
        }
    }

    pub(crate) fn record(&mut self, best: f64, costs: &[f64]) {
        self.best_costs.push(best);
        let mean = if costs.is_empty() {
            0.0
        } else {
            costs.iter().sum::<f64>() / costs.len() as f64
        };
        self.mean_costs.push(mean);
    }

    /// Total number of diverged particle evaluations
    pub fn diverged_evaluations(&self) -> usize {
        self.divergences.iter().map(|e| e.particles.len()).sum()
    }

    /// Final global best, if any round was recorded
    pub fn final_best(&self) -> Option<f64> {
        self.best_costs.last().copied()
    }
}
