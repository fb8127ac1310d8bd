//! Super-twisting (second-order) sliding-mode controller
//!
//! ```text
//! u_cont = −K1·√|s|·sw(s)
//! z⁺     = clamp(z − K2·sw(s)·dt, ±max_force)
//! u      = sat(u_eq + u_cont + z⁺ − damping·s, max_force)
//! ```
//!
//! Finite-time convergence needs `K1 > K2`; gains violating it are rejected
//! at construction.

use std::sync::Arc;

use dip_common::{keys, DipError, HistoryLog, PlantModel, Result, StateVector};

use crate::controller::ControlLaw;
use crate::equivalent::EquivalentControl;
use crate::kind::ControllerKind;
use crate::settings::ControllerSettings;
use crate::surface::SlidingSurface;
use crate::switching::{check_method, saturate, switch_value, validate_boundary_layer, SwitchingMethod};
use crate::validation::{require_non_negative, require_positive, validate_gains};

/// Validated super-twisting configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SuperTwistingConfig {
    gains: [f64; 6],
    max_force: f64,
    boundary_layer: f64,
    switch_method: SwitchingMethod,
    dt: f64,
    damping_gain: f64,
    use_equivalent: bool,
}

impl SuperTwistingConfig {
    /// Gains `[K1, K2, k1, k2, λ1, λ2]`
    pub fn from_settings(gains: &[f64], settings: &ControllerSettings) -> Result<Self> {
        validate_gains(ControllerKind::SuperTwisting, gains)?;
        require_positive("max_force", settings.max_force)?;
        validate_boundary_layer(settings.boundary_layer)?;
        require_positive("dt", settings.dt)?;
        require_non_negative("damping_gain", settings.damping_gain)?;
        check_method(settings.switch_method);

        let mut g = [0.0; 6];
        g.copy_from_slice(gains);
        Ok(Self {
            gains: g,
            max_force: settings.max_force,
            boundary_layer: settings.boundary_layer,
            switch_method: settings.switch_method,
            dt: settings.dt,
            damping_gain: settings.damping_gain,
            use_equivalent: settings.use_equivalent,
        })
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Same configuration integrating over `dt`
    pub fn with_dt(&self, dt: f64) -> Result<Self> {
        require_positive("dt", dt)?;
        Ok(Self { dt, ..self.clone() })
    }
}

/// Integral term and last control
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SuperTwistingState {
    pub z: f64,
    pub last_u: f64,
}

/// Super-twisting sliding-mode controller
#[derive(Debug, Clone)]
pub struct SuperTwistingSmc {
    config: SuperTwistingConfig,
    surface: SlidingSurface,
    equivalent: Option<EquivalentControl>,
}

impl SuperTwistingSmc {
    pub fn new(config: SuperTwistingConfig, plant: Option<Arc<dyn PlantModel>>) -> Result<Self> {
        let [_, _, k1, k2, lambda1, lambda2] = config.gains;
        let surface = SlidingSurface::new(k1, k2, lambda1, lambda2)?;
        let equivalent = match (config.use_equivalent, plant) {
            (true, Some(plant)) => Some(EquivalentControl::new(plant, config.max_force)),
            _ => None,
        };
        Ok(Self {
            config,
            surface,
            equivalent,
        })
    }

    pub fn config(&self) -> &SuperTwistingConfig {
        &self.config
    }

    /// Copy of this controller with its integral term stepped over `dt`
    pub fn with_dt(&self, dt: f64) -> Result<Self> {
        Ok(Self {
            config: self.config.with_dt(dt)?,
            ..self.clone()
        })
    }
}

impl ControlLaw for SuperTwistingSmc {
    type State = SuperTwistingState;

    const KIND: ControllerKind = ControllerKind::SuperTwisting;

    fn compute_control(
        &self,
        state: &StateVector,
        controller_state: &SuperTwistingState,
        history: &mut HistoryLog,
    ) -> Result<(f64, SuperTwistingState)> {
        let s = self.surface.evaluate(state)?;
        let cfg = &self.config;
        let [k_1, k_2, _, _, _, _] = cfg.gains;

        let sw = switch_value(s, cfg.boundary_layer, cfg.switch_method);
        let u_cont = -k_1 * s.abs().sqrt() * sw;
        let z = (controller_state.z - k_2 * sw * cfg.dt).clamp(-cfg.max_force, cfg.max_force);

        let u_eq = self
            .equivalent
            .as_ref()
            .map_or(0.0, |eq| eq.compute(&self.surface, state));
        let u_robust = u_cont + z - cfg.damping_gain * s;
        let u_total = u_eq + u_robust;
        if u_total.is_nan() {
            return Err(DipError::NumericalInstability(format!(
                "super-twisting control is NaN at state {}",
                state
            )));
        }
        let u = saturate(u_total, cfg.max_force);

        history.record(keys::SLIDING, s);
        history.record(keys::U_EQ, u_eq);
        history.record(keys::U_ROBUST, u_robust);
        history.record(keys::U_TOTAL, u_total);
        history.record(keys::U, u);
        history.record(keys::INTEGRAL, z);

        Ok((u, SuperTwistingState { z, last_u: u }))
    }

    fn reset(&self) -> SuperTwistingState {
        SuperTwistingState::default()
    }

    fn gains(&self) -> Vec<f64> {
        self.config.gains.to_vec()
    }

    fn max_force(&self) -> f64 {
        self.config.max_force
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dip_common::GainValidationError;

    fn settings() -> ControllerSettings {
        ControllerSettings {
            max_force: 20.0,
            boundary_layer: 0.05,
            dt: 0.01,
            ..ControllerSettings::default()
        }
    }

    fn controller() -> SuperTwistingSmc {
        let config =
            SuperTwistingConfig::from_settings(&[8.0, 4.0, 5.0, 3.0, 2.0, 1.5], &settings()).unwrap();
        SuperTwistingSmc::new(config, None).unwrap()
    }

    #[test]
    fn test_equal_k1_k2_rejected() {
        let err = SuperTwistingConfig::from_settings(&[5.0, 5.0, 1.0, 1.0, 1.0, 1.0], &settings())
            .unwrap_err();
        assert!(matches!(
            err,
            DipError::GainValidation(GainValidationError::OrderingViolated { .. })
        ));
    }

    #[test]
    fn test_k1_below_k2_rejected() {
        assert!(
            SuperTwistingConfig::from_settings(&[3.0, 5.0, 1.0, 1.0, 1.0, 1.0], &settings()).is_err()
        );
    }

    #[test]
    fn test_integral_accumulates_against_s() {
        let smc = controller();
        let state = StateVector::new([0.0, 0.1, 0.0, 0.0, 0.0, 0.0]);
        let mut history = HistoryLog::new();
        let mut cs = smc.reset();
        for _ in 0..10 {
            let (_, next) = smc.compute_control(&state, &cs, &mut history).unwrap();
            assert!(next.z < cs.z);
            cs = next;
        }
        assert_eq!(history.get(keys::INTEGRAL).unwrap().len(), 10);
    }

    #[test]
    fn test_retimed_integral_uses_new_step() {
        let smc = controller().with_dt(0.001).unwrap();
        assert_eq!(smc.config().dt(), 0.001);
        // s = 5·(0 + 2·0.5) = 5, tanh(5/0.05) = 1
        let state = StateVector::new([0.0, 0.5, 0.0, 0.0, 0.0, 0.0]);
        let (_, next) = smc
            .compute_control(&state, &smc.reset(), &mut HistoryLog::new())
            .unwrap();
        assert!((next.z + 4.0 * 0.001).abs() < 1e-12);
        assert!(controller().with_dt(0.0).is_err());
    }

    #[test]
    fn test_integral_anti_windup() {
        let smc = controller();
        let state = StateVector::new([0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        let mut history = HistoryLog::new();
        let mut cs = smc.reset();
        for _ in 0..10_000 {
            let (u, next) = smc.compute_control(&state, &cs, &mut history).unwrap();
            assert!(u.abs() <= 20.0);
            cs = next;
        }
        assert!(cs.z >= -20.0);
        assert!((cs.z + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset_clears_integral() {
        let smc = controller();
        let state = StateVector::new([0.0, 0.2, 0.0, 0.0, 0.0, 0.0]);
        let mut history = HistoryLog::new();
        let (_, cs) = smc.compute_control(&state, &smc.reset(), &mut history).unwrap();
        assert!(cs.z != 0.0);
        assert_eq!(smc.reset(), SuperTwistingState::default());
    }
}
