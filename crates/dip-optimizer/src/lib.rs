//! # DIP Optimizer
//!
//! Particle-swarm tuning of sliding-mode controller gains.
//!
//! - [`CostFunction`]: scores one closed-loop [`Trajectory`](dip_common::Trajectory),
//!   mapping diverged runs to a finite sentinel
//! - [`BatchSimulator`]: the simulation collaborator, called once per swarm
//!   evaluation
//! - [`PsoTuner`]: the swarm itself, with explicit RNG handling
//! - [`TunedGains`]: JSON persistence of the best gains

pub mod batch;
pub mod cost;
pub mod history;
pub mod persistence;
pub mod pso;

pub use batch::{BatchSimulator, ControllerFactoryFn};
pub use cost::{CostConfig, CostFunction, CostNormalization, CostResult, CostWeights};
pub use history::{ConvergenceHistory, DivergenceEvent, Termination};
pub use persistence::TunedGains;
pub use pso::{EarlyStop, InertiaSchedule, PsoConfig, PsoTuner, TuningResult};
