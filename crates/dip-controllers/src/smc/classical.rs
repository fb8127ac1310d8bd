//! Classical sliding-mode controller
//!
//! ```text
//! ε_eff    = ε + slope·|s|
//! u_robust = −K·sw(s / ε_eff) − kd·s
//! u        = sat(u_eq + u_robust, max_force)
//! ```

use std::sync::Arc;

use dip_common::{keys, DipError, HistoryLog, PlantModel, Result, StateVector};

use crate::controller::ControlLaw;
use crate::equivalent::EquivalentControl;
use crate::kind::ControllerKind;
use crate::settings::ControllerSettings;
use crate::surface::SlidingSurface;
use crate::switching::{check_method, saturate, switch_value, validate_boundary_layer, SwitchingMethod};
use crate::validation::{require_non_negative, require_positive, validate_gains};

/// Validated classical SMC configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicalConfig {
    gains: [f64; 6],
    max_force: f64,
    boundary_layer: f64,
    boundary_layer_slope: f64,
    switch_method: SwitchingMethod,
    use_equivalent: bool,
}

impl ClassicalConfig {
    /// Gains `[k1, k2, λ1, λ2, K, kd]`
    pub fn from_settings(gains: &[f64], settings: &ControllerSettings) -> Result<Self> {
        validate_gains(ControllerKind::Classical, gains)?;
        require_positive("max_force", settings.max_force)?;
        validate_boundary_layer(settings.boundary_layer)?;
        require_non_negative("boundary_layer_slope", settings.boundary_layer_slope)?;
        check_method(settings.switch_method);

        let mut g = [0.0; 6];
        g.copy_from_slice(gains);
        Ok(Self {
            gains: g,
            max_force: settings.max_force,
            boundary_layer: settings.boundary_layer,
            boundary_layer_slope: settings.boundary_layer_slope,
            switch_method: settings.switch_method,
            use_equivalent: settings.use_equivalent,
        })
    }

    pub fn max_force(&self) -> f64 {
        self.max_force
    }

    pub fn boundary_layer(&self) -> f64 {
        self.boundary_layer
    }

    pub fn switch_method(&self) -> SwitchingMethod {
        self.switch_method
    }
}

/// Classical SMC state: only the last applied control
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassicalState {
    pub last_u: f64,
}

/// Classical sliding-mode controller
#[derive(Debug, Clone)]
pub struct ClassicalSmc {
    config: ClassicalConfig,
    surface: SlidingSurface,
    equivalent: Option<EquivalentControl>,
}

impl ClassicalSmc {
    /// Build the controller. The equivalent control is only active when the
    /// config asks for it and a plant model is supplied.
    pub fn new(config: ClassicalConfig, plant: Option<Arc<dyn PlantModel>>) -> Result<Self> {
        let [k1, k2, lambda1, lambda2, _, _] = config.gains;
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

    pub fn config(&self) -> &ClassicalConfig {
        &self.config
    }

    pub fn surface(&self) -> &SlidingSurface {
        &self.surface
    }
}

impl ControlLaw for ClassicalSmc {
    type State = ClassicalState;

    const KIND: ControllerKind = ControllerKind::Classical;

    fn compute_control(
        &self,
        state: &StateVector,
        _controller_state: &ClassicalState,
        history: &mut HistoryLog,
    ) -> Result<(f64, ClassicalState)> {
        let s = self.surface.evaluate(state)?;
        let [_, _, _, _, k_switch, kd] = self.config.gains;

        let eps_eff = self.config.boundary_layer + self.config.boundary_layer_slope * s.abs();
        let u_eq = self
            .equivalent
            .as_ref()
            .map_or(0.0, |eq| eq.compute(&self.surface, state));
        let u_robust = -k_switch * switch_value(s, eps_eff, self.config.switch_method) - kd * s;
        let u_total = u_eq + u_robust;
        if u_total.is_nan() {
            return Err(DipError::NumericalInstability(format!(
                "classical control is NaN at state {}",
                state
            )));
        }
        let u = saturate(u_total, self.config.max_force);

        history.record(keys::SLIDING, s);
        history.record(keys::EPSILON_EFF, eps_eff);
        history.record(keys::U_EQ, u_eq);
        history.record(keys::U_ROBUST, u_robust);
        history.record(keys::U_TOTAL, u_total);
        history.record(keys::U, u);

        Ok((u, ClassicalState { last_u: u }))
    }

    fn reset(&self) -> ClassicalState {
        ClassicalState::default()
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

    const GAINS: [f64; 6] = [77.62, 44.45, 17.31, 14.25, 18.66, 9.76];

    fn settings(boundary_layer: f64) -> ControllerSettings {
        ControllerSettings {
            max_force: 20.0,
            boundary_layer,
            ..ControllerSettings::default()
        }
    }

    fn controller(boundary_layer: f64) -> ClassicalSmc {
        let config = ClassicalConfig::from_settings(&GAINS, &settings(boundary_layer)).unwrap();
        ClassicalSmc::new(config, None).unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        let smc = controller(9.76);
        let state = StateVector::new([0.0, 0.05, 0.03, 0.0, 0.0, 0.0]);
        let mut history = HistoryLog::new();
        let (u, next) = smc
            .compute_control(&state, &smc.reset(), &mut history)
            .unwrap();

        assert!(u.is_finite());
        assert!(u.abs() <= 20.0);
        assert_eq!(next.last_u, u);
        for key in [keys::SLIDING, keys::U_EQ, keys::U_ROBUST, keys::U_TOTAL, keys::U] {
            assert!(history.contains_key(key), "missing history key {key}");
        }
        // s = 77.62·17.31·0.05 + 44.45·14.25·0.03 > 0, so the force pushes back
        assert!(u < 0.0);
    }

    #[test]
    fn test_zero_k1_rejected() {
        let mut gains = GAINS;
        gains[0] = 0.0;
        let err = ClassicalConfig::from_settings(&gains, &settings(1.0)).unwrap_err();
        assert!(matches!(
            err,
            DipError::GainValidation(GainValidationError::NotPositive { index: 0, .. })
        ));
    }

    #[test]
    fn test_zero_boundary_layer_rejected() {
        let err = ClassicalConfig::from_settings(&GAINS, &settings(0.0)).unwrap_err();
        assert!(matches!(err, DipError::Configuration(_)));
    }

    #[test]
    fn test_gains_returns_copy() {
        let smc = controller(1.0);
        let mut gains = smc.gains();
        gains[0] = -1.0;
        assert_eq!(smc.gains()[0], GAINS[0]);
        assert_eq!(smc.n_gains(), 6);
    }

    #[test]
    fn test_upright_gives_zero_control() {
        let smc = controller(1.0);
        let mut history = HistoryLog::new();
        let (u, _) = smc
            .compute_control(&StateVector::upright(), &smc.reset(), &mut history)
            .unwrap();
        assert_eq!(u, 0.0);
    }

    #[test]
    fn test_wider_layer_flattens_switching_response() {
        // States straddling the surface with s ≈ ±0.078
        let states: Vec<StateVector> = (0..200)
            .map(|k| {
                let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                StateVector::new([0.0, 0.0, 0.0, 0.0, sign * 1e-3, 0.0])
            })
            .collect();

        let variance = |smc: &ClassicalSmc| {
            let mut history = HistoryLog::new();
            let mut cs = smc.reset();
            let mut controls = Vec::new();
            for state in &states {
                let (u, next) = smc.compute_control(state, &cs, &mut history).unwrap();
                controls.push(u);
                cs = next;
            }
            let mean = controls.iter().sum::<f64>() / controls.len() as f64;
            controls.iter().map(|u| (u - mean).powi(2)).sum::<f64>() / controls.len() as f64
        };

        let wide = variance(&controller(9.76));
        let narrow = variance(&controller(0.1));
        assert!(wide < 0.5 * narrow, "wide={wide}, narrow={narrow}");
    }

    #[test]
    fn test_linear_switching_accepted() {
        let settings = ControllerSettings {
            switch_method: SwitchingMethod::Linear,
            ..settings(0.5)
        };
        let config = ClassicalConfig::from_settings(&GAINS, &settings).unwrap();
        assert_eq!(config.switch_method(), SwitchingMethod::Linear);
    }

    #[test]
    fn test_non_finite_state_rejected() {
        let smc = controller(1.0);
        let mut history = HistoryLog::new();
        let state = StateVector::new([0.0, f64::NAN, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(
            smc.compute_control(&state, &smc.reset(), &mut history),
            Err(DipError::InvalidState(_))
        ));
        assert!(history.is_empty());
    }
}
