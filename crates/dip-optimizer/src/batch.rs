//! Batched closed-loop simulation interface
//!
//! The tuner never integrates the plant itself. Once per iteration it hands
//! the whole swarm to a [`BatchSimulator`], which builds one controller per
//! gain vector through the supplied factory and returns one trajectory per
//! particle, in input order.

use dip_common::{Result, Trajectory};
use dip_controllers::Controller;

/// Builds a fresh controller from a gain vector
pub type ControllerFactoryFn<'a> = dyn Fn(&[f64]) -> Result<Controller> + Sync + 'a;

/// Simulates many controllers over the same horizon
pub trait BatchSimulator: Send + Sync {
    /// Run one closed-loop simulation per entry of `gains_batch`.
    ///
    /// The output has the same length and order as `gains_batch`. A gain
    /// vector whose controller cannot be built, or whose run blows up, yields
    /// a trajectory carrying a failure record rather than an error.
    fn simulate_batch(
        &self,
        factory: &ControllerFactoryFn<'_>,
        gains_batch: &[Vec<f64>],
        duration: f64,
        dt: f64,
    ) -> Vec<Trajectory>;
}
