//! Physical parameters of the cart and the two pendulum links

use serde::{Deserialize, Serialize};

use dip_common::{DipError, Result};

/// Cart + two-link pendulum parameters (SI units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendulumParams {
    pub cart_mass: f64,
    pub pendulum1_mass: f64,
    pub pendulum2_mass: f64,
    pub pendulum1_length: f64,
    pub pendulum2_length: f64,
    /// Pivot to center of mass
    pub pendulum1_com: f64,
    pub pendulum2_com: f64,
    /// Moment of inertia about the center of mass
    pub pendulum1_inertia: f64,
    pub pendulum2_inertia: f64,
    pub gravity: f64,
    /// Viscous friction coefficients
    pub cart_friction: f64,
    pub joint1_friction: f64,
    pub joint2_friction: f64,
}

impl Default for PendulumParams {
    fn default() -> Self {
        Self {
            cart_mass: 1.5,
            pendulum1_mass: 0.2,
            pendulum2_mass: 0.15,
            pendulum1_length: 0.4,
            pendulum2_length: 0.3,
            pendulum1_com: 0.2,
            pendulum2_com: 0.15,
            pendulum1_inertia: 0.0081,
            pendulum2_inertia: 0.0034,
            gravity: 9.81,
            cart_friction: 0.2,
            joint1_friction: 0.005,
            joint2_friction: 0.004,
        }
    }
}

impl PendulumParams {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("cart_mass", self.cart_mass),
            ("pendulum1_mass", self.pendulum1_mass),
            ("pendulum2_mass", self.pendulum2_mass),
            ("pendulum1_length", self.pendulum1_length),
            ("pendulum2_length", self.pendulum2_length),
            ("pendulum1_com", self.pendulum1_com),
            ("pendulum2_com", self.pendulum2_com),
            ("gravity", self.gravity),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(DipError::Configuration(format!(
                    "plant parameter {} must be finite and > 0, got {}",
                    name, value
                )));
            }
        }
        let non_negative = [
            ("pendulum1_inertia", self.pendulum1_inertia),
            ("pendulum2_inertia", self.pendulum2_inertia),
            ("cart_friction", self.cart_friction),
            ("joint1_friction", self.joint1_friction),
            ("joint2_friction", self.joint2_friction),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(DipError::Configuration(format!(
                    "plant parameter {} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        if self.pendulum1_com > self.pendulum1_length || self.pendulum2_com > self.pendulum2_length {
            return Err(DipError::Configuration(
                "pendulum center of mass must lie on the link".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PendulumParams::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let p = PendulumParams {
            cart_mass: 0.0,
            ..PendulumParams::default()
        };
        assert!(p.validate().is_err());

        let p = PendulumParams {
            pendulum2_com: 0.5,
            ..PendulumParams::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize() {
        let p: PendulumParams = serde_json::from_str(r#"{"cart_mass": 2.0}"#).unwrap();
        assert_eq!(p.cart_mass, 2.0);
        assert_eq!(p.gravity, 9.81);
    }
}
