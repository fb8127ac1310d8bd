//! Gain and parameter validation shared by the controller variants

use dip_common::{DipError, GainValidationError, Result};

use crate::kind::ControllerKind;

/// Constraint attached to one gain position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainConstraint {
    /// Strictly positive
    Positive,
    /// Zero allowed
    NonNegative,
}

/// Check count, finiteness and per-position sign constraints, then the
/// variant's ordering rules. Returns the first violation found.
pub fn validate_gains(kind: ControllerKind, gains: &[f64]) -> Result<()> {
    let controller = kind.tag();
    let expected = kind.n_gains();
    if gains.len() != expected {
        return Err(GainValidationError::WrongCount {
            controller,
            expected,
            actual: gains.len(),
        }
        .into());
    }

    let names = kind.gain_names();
    let constraints = kind.gain_constraints();
    for (index, &value) in gains.iter().enumerate() {
        let name = names[index];
        if !value.is_finite() {
            return Err(GainValidationError::NonFinite {
                controller,
                name,
                index,
                value,
            }
            .into());
        }
        match constraints[index] {
            GainConstraint::Positive if value <= 0.0 => {
                return Err(GainValidationError::NotPositive {
                    controller,
                    name,
                    index,
                    value,
                }
                .into());
            }
            GainConstraint::NonNegative if value < 0.0 => {
                return Err(GainValidationError::Negative {
                    controller,
                    name,
                    index,
                    value,
                }
                .into());
            }
            _ => {}
        }
    }

    if kind == ControllerKind::SuperTwisting && gains[0] <= gains[1] {
        return Err(GainValidationError::OrderingViolated {
            controller,
            k1: gains[0],
            k2: gains[1],
        }
        .into());
    }

    Ok(())
}

/// `value` must be finite and strictly positive
pub fn require_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DipError::Configuration(format!(
            "{} must be finite and > 0, got {}",
            name, value
        )));
    }
    Ok(())
}

/// `value` must be finite and non-negative
pub fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(DipError::Configuration(format!(
            "{} must be finite and >= 0, got {}",
            name, value
        )));
    }
    Ok(())
}
