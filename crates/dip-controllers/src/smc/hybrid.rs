//! Hybrid adaptive / super-twisting sliding-mode controller
//!
//! The surface uses gains `[c1, λ1, c2, λ2]`. Two adaptive gains `k1`, `k2`
//! are shared by both sub-laws; the [`HybridMode`] decides which one drives
//! the plant on a given step.
//!
//! ```text
//! Adaptive:   u_sub = −(scale·k1)·sw(s) − damping·s,          z ← z·(1 − leak·dt)
//! Aggressive: u_sub = −(scale·k1)·√|s|·sw(s) + z − damping·s, z ← z − (scale·k2)·sw(s)·dt
//! k̇i = γi·|s| − leak·ki  outside the dead zone,  ki ∈ [0, ki_max]
//! u   = sat(u_eq + u_sub, max_force)
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use dip_common::{keys, DipError, HistoryLog, PlantModel, Result, StateVector};

use crate::controller::ControlLaw;
use crate::equivalent::EquivalentControl;
use crate::kind::ControllerKind;
use crate::settings::ControllerSettings;
use crate::smc::mode::{next_mode, HybridMode, ModeThresholds};
use crate::surface::SlidingSurface;
use crate::switching::{check_method, saturate, switch_value, validate_boundary_layer, SwitchingMethod};
use crate::validation::{require_non_negative, require_positive, validate_gains};

/// Validated hybrid configuration
#[derive(Debug, Clone, PartialEq)]
pub struct HybridConfig {
    gains: [f64; 4],
    max_force: f64,
    boundary_layer: f64,
    switch_method: SwitchingMethod,
    dt: f64,
    damping_gain: f64,
    use_equivalent: bool,
    leak_rate: f64,
    dead_zone: f64,
    k1_init: f64,
    k2_init: f64,
    gamma1: f64,
    gamma2: f64,
    k1_max: f64,
    k2_max: f64,
    u_int_max: f64,
    thresholds: ModeThresholds,
    aggressive_scale: f64,
    conservative_scale: f64,
}

impl HybridConfig {
    /// Gains `[c1, λ1, c2, λ2]`
    pub fn from_settings(gains: &[f64], settings: &ControllerSettings) -> Result<Self> {
        validate_gains(ControllerKind::Hybrid, gains)?;
        require_positive("max_force", settings.max_force)?;
        validate_boundary_layer(settings.boundary_layer)?;
        require_positive("dt", settings.dt)?;
        require_non_negative("damping_gain", settings.damping_gain)?;
        require_non_negative("leak_rate", settings.leak_rate)?;
        require_non_negative("dead_zone", settings.dead_zone)?;
        require_non_negative("k1_init", settings.k1_init)?;
        require_non_negative("k2_init", settings.k2_init)?;
        require_non_negative("gamma1", settings.gamma1)?;
        require_non_negative("gamma2", settings.gamma2)?;
        require_positive("k1_max", settings.k1_max)?;
        require_positive("k2_max", settings.k2_max)?;
        require_positive("u_int_max", settings.u_int_max)?;
        require_positive("aggressive_scale", settings.aggressive_scale)?;
        require_positive("conservative_scale", settings.conservative_scale)?;
        check_leak_step(settings.leak_rate, settings.dt)?;
        if settings.k1_init > settings.k1_max || settings.k2_init > settings.k2_max {
            return Err(DipError::Configuration(format!(
                "initial adaptive gains ({}, {}) exceed their limits ({}, {})",
                settings.k1_init, settings.k2_init, settings.k1_max, settings.k2_max
            )));
        }
        let thresholds = ModeThresholds::new(
            settings.s_aggressive_threshold,
            settings.s_conservative_threshold,
        )?;
        check_method(settings.switch_method);

        if settings.aggressive_scale < settings.conservative_scale {
            warn!(
                aggressive_scale = settings.aggressive_scale,
                conservative_scale = settings.conservative_scale,
                "aggressive mode scales gains below adaptive mode, reaching margin is reduced far from the surface"
            );
        }

        let mut g = [0.0; 4];
        g.copy_from_slice(gains);
        Ok(Self {
            gains: g,
            max_force: settings.max_force,
            boundary_layer: settings.boundary_layer,
            switch_method: settings.switch_method,
            dt: settings.dt,
            damping_gain: settings.damping_gain,
            use_equivalent: settings.use_equivalent,
            leak_rate: settings.leak_rate,
            dead_zone: settings.dead_zone,
            k1_init: settings.k1_init,
            k2_init: settings.k2_init,
            gamma1: settings.gamma1,
            gamma2: settings.gamma2,
            k1_max: settings.k1_max,
            k2_max: settings.k2_max,
            u_int_max: settings.u_int_max,
            thresholds,
            aggressive_scale: settings.aggressive_scale,
            conservative_scale: settings.conservative_scale,
        })
    }

    pub fn thresholds(&self) -> &ModeThresholds {
        &self.thresholds
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Same configuration integrating over `dt`
    pub fn with_dt(&self, dt: f64) -> Result<Self> {
        require_positive("dt", dt)?;
        check_leak_step(self.leak_rate, dt)?;
        Ok(Self { dt, ..self.clone() })
    }

    fn scale(&self, mode: HybridMode) -> f64 {
        match mode {
            HybridMode::Adaptive => self.conservative_scale,
            HybridMode::Aggressive => self.aggressive_scale,
        }
    }
}

/// The adaptive-mode decay `z·(1 − leak·dt)` must not flip the sign of `z`
fn check_leak_step(leak_rate: f64, dt: f64) -> Result<()> {
    if leak_rate * dt > 1.0 {
        return Err(DipError::Configuration(format!(
            "leak_rate·dt must be at most 1, got {} · {} = {}",
            leak_rate,
            dt,
            leak_rate * dt
        )));
    }
    Ok(())
}

/// Mode, adaptive gains and integral term
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridState {
    pub mode: HybridMode,
    pub k1: f64,
    pub k2: f64,
    pub z: f64,
    pub last_u: f64,
}

/// Hybrid adaptive / super-twisting controller
#[derive(Debug, Clone)]
pub struct HybridSmc {
    config: HybridConfig,
    surface: SlidingSurface,
    equivalent: Option<EquivalentControl>,
}

impl HybridSmc {
    pub fn new(config: HybridConfig, plant: Option<Arc<dyn PlantModel>>) -> Result<Self> {
        let [c1, lambda1, c2, lambda2] = config.gains;
        let surface = SlidingSurface::new(c1, c2, lambda1, lambda2)?;
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

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    pub fn with_dt(&self, dt: f64) -> Result<Self> {
        Ok(Self {
            config: self.config.with_dt(dt)?,
            ..self.clone()
        })
    }
}

impl ControlLaw for HybridSmc {
    type State = HybridState;

    const KIND: ControllerKind = ControllerKind::Hybrid;

    fn compute_control(
        &self,
        state: &StateVector,
        controller_state: &HybridState,
        history: &mut HistoryLog,
    ) -> Result<(f64, HybridState)> {
        let s = self.surface.evaluate(state)?;
        let cfg = &self.config;
        let abs_s = s.abs();

        let mode = next_mode(controller_state.mode, abs_s, &cfg.thresholds);
        if mode != controller_state.mode {
            debug!(from = %controller_state.mode, to = %mode, abs_s, "hybrid mode change");
        }
        let scale = cfg.scale(mode);
        let sw = switch_value(s, cfg.boundary_layer, cfg.switch_method);
        let HybridState { k1, k2, z, .. } = *controller_state;

        let (u_sub, z) = match mode {
            HybridMode::Adaptive => {
                let z = z * (1.0 - cfg.leak_rate * cfg.dt);
                (-(scale * k1) * sw - cfg.damping_gain * s, z)
            }
            HybridMode::Aggressive => {
                let z = (z - scale * k2 * sw * cfg.dt).clamp(-cfg.u_int_max, cfg.u_int_max);
                (-(scale * k1) * abs_s.sqrt() * sw + z - cfg.damping_gain * s, z)
            }
        };

        let (k1, k2) = if abs_s > cfg.dead_zone {
            (
                (k1 + (cfg.gamma1 * abs_s - cfg.leak_rate * k1) * cfg.dt).clamp(0.0, cfg.k1_max),
                (k2 + (cfg.gamma2 * abs_s - cfg.leak_rate * k2) * cfg.dt).clamp(0.0, cfg.k2_max),
            )
        } else {
            (k1, k2)
        };

        let u_eq = self
            .equivalent
            .as_ref()
            .map_or(0.0, |eq| eq.compute(&self.surface, state));
        let u_total = u_eq + u_sub;
        if u_total.is_nan() {
            return Err(DipError::NumericalInstability(format!(
                "hybrid control is NaN at state {}",
                state
            )));
        }
        let u = saturate(u_total, cfg.max_force);

        history.record(keys::SLIDING, s);
        history.record(keys::U_EQ, u_eq);
        history.record(keys::U_ROBUST, u_sub);
        history.record(keys::U_TOTAL, u_total);
        history.record(keys::U, u);
        history.record(keys::K1, k1);
        history.record(keys::K2, k2);
        history.record(keys::INTEGRAL, z);
        history.record(keys::MODE, mode.as_f64());

        Ok((
            u,
            HybridState {
                mode,
                k1,
                k2,
                z,
                last_u: u,
            },
        ))
    }

    fn reset(&self) -> HybridState {
        HybridState {
            mode: HybridMode::Adaptive,
            k1: self.config.k1_init,
            k2: self.config.k2_init,
            z: 0.0,
            last_u: 0.0,
        }
    }

    fn gains(&self) -> Vec<f64> {
        self.config.gains.to_vec()
    }

    fn max_force(&self) -> f64 {
        self.config.max_force
    }
}
