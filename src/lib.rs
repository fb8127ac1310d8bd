//! # DIP-SMC-PSO
//!
//! Sliding-mode control of a double inverted pendulum on a cart, with
//! particle-swarm tuning of the controller gains.
//!
//! | crate | contents |
//! |---|---|
//! | [`common`] | state vectors, telemetry, trajectories, plant interfaces, errors |
//! | [`controllers`] | classical, super-twisting, adaptive and hybrid SMC plus the registry |
//! | [`optimizer`] | cost function, PSO tuner, tuned-gain persistence |
//! | [`sim`] | reference plant, integrators, closed-loop and batch simulation |
//!
//! ```no_run
//! use std::sync::Arc;
//! use dip_smc_pso::prelude::*;
//!
//! let plant = Arc::new(DoubleInvertedPendulum::new(PendulumParams::default()).unwrap());
//! let registry = Arc::new(ControllerRegistry::new().with_plant(plant.clone()));
//! let simulator = ClosedLoopSimulator::new(plant)
//!     .with_initial_state(StateVector::new([0.0, 0.05, -0.03, 0.0, 0.0, 0.0]));
//!
//! let tuner = PsoTuner::new(registry.clone(), Arc::new(simulator), ControllerKind::Classical);
//! let bounds = registry.default_bounds("classical_smc").unwrap();
//! let result = tuner.optimize_seeded(&bounds, 20, 30, 42).unwrap();
//! println!("best cost {} with gains {:?}", result.best_cost, result.best_gains);
//! ```

pub use dip_common as common;
pub use dip_controllers as controllers;
pub use dip_optimizer as optimizer;
pub use dip_sim as sim;

/// Commonly used items from every crate
pub mod prelude {
    pub use dip_common::{
        DipError, DynamicsModel, GainBounds, HistoryLog, PlantModel, Result, StateVector,
        Trajectory,
    };
    pub use dip_controllers::{
        Controller, ControllerKind, ControllerRegistry, ControllerSettings, SlidingSurface,
    };
    pub use dip_optimizer::{
        BatchSimulator, CostConfig, CostFunction, PsoConfig, PsoTuner, TunedGains, TuningResult,
    };
    pub use dip_sim::{ClosedLoopSimulator, DoubleInvertedPendulum, Integrator, PendulumParams};
}
