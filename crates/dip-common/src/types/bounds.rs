//! GainBounds - per-dimension search box for gain tuning

use serde::{Deserialize, Serialize};

use crate::error::{DipError, Result};

/// Lower/upper bounds, one pair per gain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl GainBounds {
    /// Build and validate: equal lengths, finite, `lower < upper` everywhere
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(DipError::Configuration(format!(
                "bounds dimension mismatch: {} lower vs {} upper",
                lower.len(),
                upper.len()
            )));
        }
        if lower.is_empty() {
            return Err(DipError::Configuration("bounds must not be empty".to_string()));
        }
        for (i, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(DipError::Configuration(format!(
                    "bounds for dimension {} must be finite, got [{}, {}]",
                    i, lo, hi
                )));
            }
            if lo >= hi {
                return Err(DipError::Configuration(format!(
                    "bounds for dimension {} must satisfy lower < upper, got [{}, {}]",
                    i, lo, hi
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Build from `(lower, upper)` pairs
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        let (lower, upper): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();
        Self::new(lower, upper)
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// `upper - lower` for one dimension
    pub fn range(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    /// Clamp every coordinate into the box
    pub fn clamp(&self, point: &mut [f64]) {
        for (i, v) in point.iter_mut().enumerate() {
            *v = v.clamp(self.lower[i], self.upper[i]);
        }
    }

    pub fn contains(&self, point: &[f64]) -> bool {
        point.len() == self.dim()
            && point
                .iter()
                .enumerate()
                .all(|(i, v)| *v >= self.lower[i] && *v <= self.upper[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(GainBounds::new(vec![1.0, 2.0], vec![2.0, 2.0]).is_err());
        assert!(GainBounds::new(vec![1.0], vec![2.0, 3.0]).is_err());
        assert!(GainBounds::new(vec![f64::NAN], vec![1.0]).is_err());
        assert!(GainBounds::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_clamp_and_contains() {
        let b = GainBounds::from_pairs(&[(0.0, 1.0), (10.0, 20.0)]).unwrap();
        let mut p = vec![-1.0, 25.0];
        assert!(!b.contains(&p));
        b.clamp(&mut p);
        assert_eq!(p, vec![0.0, 20.0]);
        assert!(b.contains(&p));
        assert!((b.range(1) - 10.0).abs() < 1e-12);
    }
}
