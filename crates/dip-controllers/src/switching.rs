//! Switching law with boundary-layer smoothing
//!
//! Maps the sliding variable to a correction in `[-1, 1]`:
//!
//! ```text
//! linear: sat(s / (ε + δ))
//! tanh:   tanh(s / (ε + δ))
//! ```
//!
//! `δ = 1e-10` keeps the division defined when ε underflows.

use std::str::FromStr;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::warn;

use dip_common::{DipError, Result, BOUNDARY_EPS};

static LINEAR_WARNING: Once = Once::new();

/// Switching function family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchingMethod {
    /// Piecewise-linear saturation. Its derivative is discontinuous at the
    /// layer edge, which shows up as chattering.
    Linear,
    /// Smooth hyperbolic tangent
    #[default]
    Tanh,
}

impl FromStr for SwitchingMethod {
    type Err = DipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" | "sat" | "saturation" => Ok(Self::Linear),
            "tanh" => Ok(Self::Tanh),
            other => Err(DipError::Configuration(format!(
                "unknown switching method '{}', expected 'linear' or 'tanh'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SwitchingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Tanh => write!(f, "tanh"),
        }
    }
}

/// Reject zero, negative or non-finite boundary layers
pub fn validate_boundary_layer(boundary_layer: f64) -> Result<()> {
    if !boundary_layer.is_finite() || boundary_layer <= 0.0 {
        return Err(DipError::Configuration(format!(
            "boundary_layer must be finite and > 0, got {}",
            boundary_layer
        )));
    }
    Ok(())
}

/// Design-time check of the switching method.
///
/// `linear` is accepted but warned about once per process.
pub fn check_method(method: SwitchingMethod) {
    if method == SwitchingMethod::Linear {
        LINEAR_WARNING.call_once(|| {
            warn!(
                "linear switching has a discontinuous derivative at the boundary layer edge \
                 and produces chattering; prefer 'tanh'"
            );
        });
    }
}

/// Switching correction in `[-1, 1]` with boundary-layer validation
pub fn switching(s: f64, boundary_layer: f64, method: SwitchingMethod) -> Result<f64> {
    validate_boundary_layer(boundary_layer)?;
    if s.is_nan() {
        return Err(DipError::InvalidState(
            "sliding variable is NaN".to_string(),
        ));
    }
    Ok(switch_value(s, boundary_layer, method))
}

/// Hot-path variant for parameters already validated at construction
#[inline]
pub(crate) fn switch_value(s: f64, boundary_layer: f64, method: SwitchingMethod) -> f64 {
    let z = s / (boundary_layer + BOUNDARY_EPS);
    match method {
        SwitchingMethod::Linear => z.clamp(-1.0, 1.0),
        SwitchingMethod::Tanh => z.tanh(),
    }
}

/// Symmetric actuator saturation
#[inline]
pub fn saturate(u: f64, limit: f64) -> f64 {
    u.clamp(-limit, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_saturates() {
        assert_eq!(switching(10.0, 1.0, SwitchingMethod::Linear).unwrap(), 1.0);
        assert_eq!(switching(-10.0, 1.0, SwitchingMethod::Linear).unwrap(), -1.0);
        let mid = switching(0.5, 1.0, SwitchingMethod::Linear).unwrap();
        assert!((mid - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_tanh_bounded_and_odd() {
        for s in [-100.0, -1.0, -0.01, 0.0, 0.01, 1.0, 100.0] {
            let v = switching(s, 0.1, SwitchingMethod::Tanh).unwrap();
            assert!((-1.0..=1.0).contains(&v));
            let w = switching(-s, 0.1, SwitchingMethod::Tanh).unwrap();
            assert!((v + w).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invalid_boundary_layer() {
        assert!(matches!(
            switching(1.0, 0.0, SwitchingMethod::Tanh),
            Err(DipError::Configuration(_))
        ));
        assert!(matches!(
            switching(1.0, -0.1, SwitchingMethod::Linear),
            Err(DipError::Configuration(_))
        ));
    }

    #[test]
    fn test_tiny_boundary_layer_is_finite() {
        let v = switching(1e-3, f64::MIN_POSITIVE, SwitchingMethod::Linear).unwrap();
        assert!(v.is_finite());
        assert_eq!(v, 1.0);
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("TANH".parse::<SwitchingMethod>().unwrap(), SwitchingMethod::Tanh);
        assert_eq!("linear".parse::<SwitchingMethod>().unwrap(), SwitchingMethod::Linear);
        assert!("sign".parse::<SwitchingMethod>().is_err());
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(25.0, 20.0), 20.0);
        assert_eq!(saturate(-25.0, 20.0), -20.0);
        assert_eq!(saturate(3.0, 20.0), 3.0);
    }
}
