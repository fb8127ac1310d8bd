//! Linear sliding surface
//!
//! ```text
//! s = k1·(ė1 + λ1·e1) + k2·(ė2 + λ2·e2)
//! ```
//!
//! with `e = state − target` restricted to the two pendulum angles. The cart
//! coordinate does not enter the surface.

use dip_common::{DipError, Result, StateVector};

/// Sliding surface with fixed, strictly positive gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlidingSurface {
    k1: f64,
    k2: f64,
    lambda1: f64,
    lambda2: f64,
}

impl SlidingSurface {
    /// Build a surface. All gains must be finite and strictly positive
    /// (Hurwitz requirement on the reduced dynamics).
    pub fn new(k1: f64, k2: f64, lambda1: f64, lambda2: f64) -> Result<Self> {
        for (name, value) in [("k1", k1), ("k2", k2), ("lambda1", lambda1), ("lambda2", lambda2)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DipError::Configuration(format!(
                    "sliding surface gain {} must be finite and > 0, got {}",
                    name, value
                )));
            }
        }
        Ok(Self {
            k1,
            k2,
            lambda1,
            lambda2,
        })
    }

    /// Sliding variable relative to `target`
    pub fn compute(&self, state: &StateVector, target: &StateVector) -> Result<f64> {
        state.ensure_finite()?;
        target.ensure_finite()?;
        let e = state.error_from(target);
        Ok(self.combine(&e))
    }

    /// Sliding variable relative to the upright equilibrium
    pub fn evaluate(&self, state: &StateVector) -> Result<f64> {
        state.ensure_finite()?;
        Ok(self.combine(state))
    }

    /// `k1·λ1·θ̇1 + k2·λ2·θ̇2`, the part of `ṡ` that does not involve `θ̈`
    pub fn derivative_terms(&self, state: &StateVector) -> f64 {
        self.k1 * self.lambda1 * state.theta1_dot() + self.k2 * self.lambda2 * state.theta2_dot()
    }

    /// Row `L = [0, k1, k2]` multiplying `q̈` in `ṡ`
    pub fn acceleration_row(&self) -> [f64; 3] {
        [0.0, self.k1, self.k2]
    }

    pub fn gains(&self) -> [f64; 4] {
        [self.k1, self.k2, self.lambda1, self.lambda2]
    }

    #[inline]
    fn combine(&self, e: &StateVector) -> f64 {
        self.k1 * (e.theta1_dot() + self.lambda1 * e.theta1())
            + self.k2 * (e.theta2_dot() + self.lambda2 * e.theta2())
    }
}
