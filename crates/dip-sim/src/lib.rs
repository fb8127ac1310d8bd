//! # DIP Sim
//!
//! Reference plant and simulators used to tune and check the controllers.
//!
//! - [`DoubleInvertedPendulum`]: nonlinear cart-pole with two links,
//!   implementing both [`DynamicsModel`](dip_common::DynamicsModel) and
//!   [`PlantModel`](dip_common::PlantModel)
//! - [`Integrator`]: explicit Euler and RK4
//! - [`ClosedLoopSimulator`]: single runs and the parallel
//!   [`BatchSimulator`](dip_optimizer::BatchSimulator) used by the swarm

pub mod integrator;
pub mod model;
pub mod params;
pub mod simulator;

pub use integrator::Integrator;
pub use model::DoubleInvertedPendulum;
pub use params::PendulumParams;
pub use simulator::ClosedLoopSimulator;
