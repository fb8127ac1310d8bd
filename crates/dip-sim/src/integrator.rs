//! Explicit fixed-step integrators
//!
//! The control force is held constant over the step (zero-order hold).

use serde::{Deserialize, Serialize};

use dip_common::{DynamicsModel, FailureReason, StateVector};

/// Integration scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Integrator {
    /// Forward Euler, first order
    Euler,
    /// Classical Runge-Kutta, fourth order
    #[default]
    Rk4,
}

impl Integrator {
    /// Advance `state` by `dt` under constant `control`
    pub fn step(
        &self,
        model: &dyn DynamicsModel,
        state: &StateVector,
        control: f64,
        dt: f64,
    ) -> Result<StateVector, FailureReason> {
        let eval = |x: &StateVector| {
            let result = model.step(x, control);
            if result.success {
                Ok(result.state_derivative)
            } else {
                Err(FailureReason::IllConditioned)
            }
        };

        let next = match self {
            Self::Euler => state.advanced(dt, &eval(state)?),
            Self::Rk4 => {
                let k1 = eval(state)?;
                let k2 = eval(&state.advanced(0.5 * dt, &k1))?;
                let k3 = eval(&state.advanced(0.5 * dt, &k2))?;
                let k4 = eval(&state.advanced(dt, &k3))?;
                let mut slope = [0.0; 6];
                for (i, s) in slope.iter_mut().enumerate() {
                    *s = (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]) / 6.0;
                }
                state.advanced(dt, &slope)
            }
        };

        if next.is_finite() {
            Ok(next)
        } else {
            Err(FailureReason::NonFiniteState)
        }
    }
}
