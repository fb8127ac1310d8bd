//! Controller construction settings
//!
//! One flat, serde-friendly struct covering every variant. Each variant reads
//! the fields it needs when building its immutable config; unused fields are
//! ignored. All fields have defaults so partial config files deserialize.

use serde::{Deserialize, Serialize};

use dip_common::{DipError, Result};

use crate::switching::SwitchingMethod;

/// Settings shared by all controller variants plus variant extras
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Gains to use when none are passed explicitly
    pub gains: Option<Vec<f64>>,
    /// Actuator limit, `|u| ≤ max_force` (N)
    pub max_force: f64,
    /// Boundary layer width ε
    pub boundary_layer: f64,
    /// Classical only: `ε_eff = ε + slope·|s|`
    pub boundary_layer_slope: f64,
    pub switch_method: SwitchingMethod,
    /// Control period (s), used by integrating and adaptive laws. The
    /// closed-loop simulator and the tuner replace it with their step.
    pub dt: f64,
    /// Add the model-based equivalent control when a plant model is available
    pub use_equivalent: bool,
    /// Linear damping on s (super-twisting and hybrid)
    pub damping_gain: f64,

    // Adaptive
    /// Leakage rate pulling adaptive gains back toward zero
    pub leak_rate: f64,
    /// |s| below which adaptation freezes
    pub dead_zone: f64,
    /// Optional bound on |K̇|
    pub adapt_rate_limit: Option<f64>,
    pub k_min: f64,
    pub k_max: f64,
    pub k_init: f64,
    /// Proportional term on s
    pub alpha: f64,

    // Hybrid
    pub k1_init: f64,
    pub k2_init: f64,
    pub gamma1: f64,
    pub gamma2: f64,
    pub k1_max: f64,
    pub k2_max: f64,
    /// Bound on the super-twisting integral term
    pub u_int_max: f64,
    /// |s| above which the hybrid enters aggressive mode
    pub s_aggressive_threshold: f64,
    /// |s| below which the hybrid returns to adaptive mode
    pub s_conservative_threshold: f64,
    pub aggressive_scale: f64,
    pub conservative_scale: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            gains: None,
            max_force: 150.0,
            boundary_layer: 0.02,
            boundary_layer_slope: 0.0,
            switch_method: SwitchingMethod::Tanh,
            dt: 0.001,
            use_equivalent: false,
            damping_gain: 0.0,
            leak_rate: 0.01,
            dead_zone: 0.01,
            adapt_rate_limit: None,
            k_min: 0.1,
            k_max: 100.0,
            k_init: 10.0,
            alpha: 0.5,
            k1_init: 4.0,
            k2_init: 0.4,
            gamma1: 2.0,
            gamma2: 0.5,
            k1_max: 50.0,
            k2_max: 50.0,
            u_int_max: 50.0,
            s_aggressive_threshold: 1.0,
            s_conservative_threshold: 0.1,
            aggressive_scale: 1.0,
            conservative_scale: 1.0,
        }
    }
}

impl ControllerSettings {
    /// Look up a numeric parameter by name
    pub fn parameter(&self, name: &str) -> Option<f64> {
        let value = match name {
            "max_force" => self.max_force,
            "boundary_layer" => self.boundary_layer,
            "boundary_layer_slope" => self.boundary_layer_slope,
            "dt" => self.dt,
            "damping_gain" => self.damping_gain,
            "leak_rate" => self.leak_rate,
            "dead_zone" => self.dead_zone,
            "adapt_rate_limit" => return self.adapt_rate_limit,
            "k_min" => self.k_min,
            "k_max" => self.k_max,
            "k_init" => self.k_init,
            "alpha" => self.alpha,
            "k1_init" => self.k1_init,
            "k2_init" => self.k2_init,
            "gamma1" => self.gamma1,
            "gamma2" => self.gamma2,
            "k1_max" => self.k1_max,
            "k2_max" => self.k2_max,
            "u_int_max" => self.u_int_max,
            "s_aggressive_threshold" => self.s_aggressive_threshold,
            "s_conservative_threshold" => self.s_conservative_threshold,
            "aggressive_scale" => self.aggressive_scale,
            "conservative_scale" => self.conservative_scale,
            _ => return None,
        };
        Some(value)
    }

    /// Every named parameter must exist and be finite and > 0
    pub fn require(&self, names: &[&str]) -> Result<()> {
        for name in names {
            match self.parameter(name) {
                Some(v) if v.is_finite() && v > 0.0 => {}
                Some(v) => {
                    return Err(DipError::Configuration(format!(
                        "required parameter {} must be finite and > 0, got {}",
                        name, v
                    )))
                }
                None => {
                    return Err(DipError::Configuration(format!(
                        "required parameter {} is missing",
                        name
                    )))
                }
            }
        }
        Ok(())
    }
}
