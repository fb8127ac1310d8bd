//! StateVector - double inverted pendulum state
//!
//! Ordering is `[x, θ1, θ2, ẋ, θ̇1, θ̇2]`: cart position, the two absolute
//! pendulum angles measured from upright, then their rates.

use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::{DipError, Result};

/// Number of state components
pub const STATE_DIM: usize = 6;

const COMPONENT_NAMES: [&str; STATE_DIM] = ["x", "theta1", "theta2", "x_dot", "theta1_dot", "theta2_dot"];

/// Plant state at one control step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateVector([f64; STATE_DIM]);

impl StateVector {
    pub const fn new(values: [f64; STATE_DIM]) -> Self {
        Self(values)
    }

    /// Upright equilibrium with the cart at the origin
    pub const fn upright() -> Self {
        Self([0.0; STATE_DIM])
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    #[inline]
    pub fn theta1(&self) -> f64 {
        self.0[1]
    }

    #[inline]
    pub fn theta2(&self) -> f64 {
        self.0[2]
    }

    #[inline]
    pub fn x_dot(&self) -> f64 {
        self.0[3]
    }

    #[inline]
    pub fn theta1_dot(&self) -> f64 {
        self.0[4]
    }

    #[inline]
    pub fn theta2_dot(&self) -> f64 {
        self.0[5]
    }

    /// Generalized coordinates `q = [x, θ1, θ2]`
    pub fn positions(&self) -> [f64; 3] {
        [self.0[0], self.0[1], self.0[2]]
    }

    /// Generalized velocities `q̇ = [ẋ, θ̇1, θ̇2]`
    pub fn velocities(&self) -> [f64; 3] {
        [self.0[3], self.0[4], self.0[5]]
    }

    pub fn as_array(&self) -> &[f64; STATE_DIM] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    /// Fail with `InvalidState` naming the first non-finite component
    pub fn ensure_finite(&self) -> Result<()> {
        match self.0.iter().position(|v| !v.is_finite()) {
            Some(i) => Err(DipError::InvalidState(format!(
                "state component {} (index {}) is {}",
                COMPONENT_NAMES[i], i, self.0[i]
            ))),
            None => Ok(()),
        }
    }

    /// Component-wise `self - target`
    pub fn error_from(&self, target: &StateVector) -> StateVector {
        let mut out = [0.0; STATE_DIM];
        for (i, o) in out.iter_mut().enumerate() {
            *o = self.0[i] - target.0[i];
        }
        Self(out)
    }

    /// `self + h * derivative`, used by explicit integrators
    pub fn advanced(&self, h: f64, derivative: &[f64; STATE_DIM]) -> StateVector {
        let mut out = self.0;
        for (o, d) in out.iter_mut().zip(derivative.iter()) {
            *o += h * d;
        }
        Self(out)
    }

    /// Squared Euclidean norm
    pub fn norm_squared(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum()
    }

    /// Sum of absolute values
    pub fn l1_norm(&self) -> f64 {
        self.0.iter().map(|v| v.abs()).sum()
    }

    /// Largest absolute component
    pub fn max_abs(&self) -> f64 {
        self.0.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }
}

impl From<[f64; STATE_DIM]> for StateVector {
    fn from(values: [f64; STATE_DIM]) -> Self {
        Self(values)
    }
}

impl Index<usize> for StateVector {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl std::fmt::Display for StateVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[x={:.4}, θ1={:.4}, θ2={:.4}, ẋ={:.4}, θ̇1={:.4}, θ̇2={:.4}]",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let s = StateVector::new([1.0, 0.1, 0.2, 2.0, 0.3, 0.4]);
        assert_eq!(s.x(), 1.0);
        assert_eq!(s.theta1(), 0.1);
        assert_eq!(s.theta2(), 0.2);
        assert_eq!(s.x_dot(), 2.0);
        assert_eq!(s.theta1_dot(), 0.3);
        assert_eq!(s.theta2_dot(), 0.4);
        assert_eq!(s.positions(), [1.0, 0.1, 0.2]);
        assert_eq!(s.velocities(), [2.0, 0.3, 0.4]);
    }

    #[test]
    fn test_ensure_finite_names_component() {
        let s = StateVector::new([0.0, 0.0, f64::NAN, 0.0, 0.0, 0.0]);
        assert!(!s.is_finite());
        let err = s.ensure_finite().unwrap_err();
        assert!(matches!(err, DipError::InvalidState(_)));
        assert!(err.to_string().contains("theta2"));
    }

    #[test]
    fn test_norms() {
        let s = StateVector::new([1.0, -2.0, 0.0, 0.0, 2.0, 0.0]);
        assert!((s.norm_squared() - 9.0).abs() < 1e-12);
        assert!((s.l1_norm() - 5.0).abs() < 1e-12);
        assert!((s.max_abs() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_advanced() {
        let s = StateVector::upright();
        let next = s.advanced(0.5, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(next.as_array(), &[0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_serde_is_flat_array() {
        let s = StateVector::new([0.0, 0.05, 0.03, 0.0, 0.0, 0.0]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[0.0,0.05,0.03,0.0,0.0,0.0]");
    }
}
