//! Adaptive sliding-mode controller
//!
//! The switching gain `K` is estimated online instead of fixed:
//!
//! ```text
//! u  = sat(−K·sw(s) − α·s, max_force)
//! K̇  = γ·|s| − leak·K        when |s| > dead_zone, else 0
//! K  ∈ [K_min, K_max]
//! ```

use tracing::warn;

use dip_common::{keys, DipError, HistoryLog, Result, StateVector};

use crate::controller::ControlLaw;
use crate::kind::ControllerKind;
use crate::settings::ControllerSettings;
use crate::surface::SlidingSurface;
use crate::switching::{check_method, saturate, switch_value, validate_boundary_layer, SwitchingMethod};
use crate::validation::{require_non_negative, require_positive, validate_gains};

/// Adaptation rates above this value are accepted but logged
pub const ADAPTATION_RATE_WARN: f64 = 10.0;

/// Validated adaptive SMC configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveConfig {
    gains: [f64; 5],
    max_force: f64,
    boundary_layer: f64,
    switch_method: SwitchingMethod,
    dt: f64,
    leak_rate: f64,
    dead_zone: f64,
    adapt_rate_limit: Option<f64>,
    k_min: f64,
    k_max: f64,
    k_init: f64,
    alpha: f64,
}

impl AdaptiveConfig {
    /// Gains `[k1, k2, λ1, λ2, γ]`
    pub fn from_settings(gains: &[f64], settings: &ControllerSettings) -> Result<Self> {
        validate_gains(ControllerKind::Adaptive, gains)?;
        require_positive("max_force", settings.max_force)?;
        validate_boundary_layer(settings.boundary_layer)?;
        require_positive("dt", settings.dt)?;
        require_non_negative("leak_rate", settings.leak_rate)?;
        require_non_negative("dead_zone", settings.dead_zone)?;
        require_non_negative("alpha", settings.alpha)?;
        require_non_negative("k_min", settings.k_min)?;
        require_positive("k_max", settings.k_max)?;
        if let Some(limit) = settings.adapt_rate_limit {
            require_positive("adapt_rate_limit", limit)?;
        }
        if settings.k_min >= settings.k_max {
            return Err(DipError::Configuration(format!(
                "k_min ({}) must be below k_max ({})",
                settings.k_min, settings.k_max
            )));
        }
        if !(settings.k_min..=settings.k_max).contains(&settings.k_init) {
            return Err(DipError::Configuration(format!(
                "k_init ({}) must lie in [{}, {}]",
                settings.k_init, settings.k_min, settings.k_max
            )));
        }
        check_method(settings.switch_method);

        let gamma = gains[4];
        if gamma > ADAPTATION_RATE_WARN {
            warn!(
                gamma,
                limit = ADAPTATION_RATE_WARN,
                "adaptation rate is large and may cause gain oscillation"
            );
        }

        let mut g = [0.0; 5];
        g.copy_from_slice(gains);
        Ok(Self {
            gains: g,
            max_force: settings.max_force,
            boundary_layer: settings.boundary_layer,
            switch_method: settings.switch_method,
            dt: settings.dt,
            leak_rate: settings.leak_rate,
            dead_zone: settings.dead_zone,
            adapt_rate_limit: settings.adapt_rate_limit,
            k_min: settings.k_min,
            k_max: settings.k_max,
            k_init: settings.k_init,
            alpha: settings.alpha,
        })
    }

    pub fn gamma(&self) -> f64 {
        self.gains[4]
    }

    pub fn gain_range(&self) -> (f64, f64) {
        (self.k_min, self.k_max)
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Same configuration adapting over `dt`
    pub fn with_dt(&self, dt: f64) -> Result<Self> {
        require_positive("dt", dt)?;
        Ok(Self { dt, ..self.clone() })
    }
}

/// Adaptive gain estimate and bookkeeping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveState {
    /// Current switching gain estimate
    pub k: f64,
    pub last_u: f64,
    /// Accumulated time spent inside the dead zone
    pub time_in_sliding: f64,
}

/// Adaptive sliding-mode controller
#[derive(Debug, Clone)]
pub struct AdaptiveSmc {
    config: AdaptiveConfig,
    surface: SlidingSurface,
}

impl AdaptiveSmc {
    pub fn new(config: AdaptiveConfig) -> Result<Self> {
        let [k1, k2, lambda1, lambda2, _] = config.gains;
        let surface = SlidingSurface::new(k1, k2, lambda1, lambda2)?;
        Ok(Self { config, surface })
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn with_dt(&self, dt: f64) -> Result<Self> {
        Ok(Self {
            config: self.config.with_dt(dt)?,
            surface: self.surface,
        })
    }

    /// Gain estimate after one control period
    fn adapt(&self, k: f64, abs_s: f64) -> f64 {
        let cfg = &self.config;
        if abs_s <= cfg.dead_zone {
            return k;
        }
        let mut k_dot = self.config.gamma() * abs_s - cfg.leak_rate * k;
        if let Some(limit) = cfg.adapt_rate_limit {
            k_dot = k_dot.clamp(-limit, limit);
        }
        (k + k_dot * cfg.dt).clamp(cfg.k_min, cfg.k_max)
    }
}

impl ControlLaw for AdaptiveSmc {
    type State = AdaptiveState;

    const KIND: ControllerKind = ControllerKind::Adaptive;

    fn compute_control(
        &self,
        state: &StateVector,
        controller_state: &AdaptiveState,
        history: &mut HistoryLog,
    ) -> Result<(f64, AdaptiveState)> {
        let s = self.surface.evaluate(state)?;
        let cfg = &self.config;

        let k = controller_state.k;
        let u_robust = -k * switch_value(s, cfg.boundary_layer, cfg.switch_method) - cfg.alpha * s;
        let u_total = u_robust;
        if u_total.is_nan() {
            return Err(DipError::NumericalInstability(format!(
                "adaptive control is NaN at state {}",
                state
            )));
        }
        let u = saturate(u_total, cfg.max_force);

        let k_next = self.adapt(k, s.abs());
        let time_in_sliding = if s.abs() <= cfg.dead_zone {
            controller_state.time_in_sliding + cfg.dt
        } else {
            controller_state.time_in_sliding
        };

        history.record(keys::SLIDING, s);
        history.record(keys::U_EQ, 0.0);
        history.record(keys::U_ROBUST, u_robust);
        history.record(keys::U_TOTAL, u_total);
        history.record(keys::U, u);
        history.record(keys::ADAPTIVE_GAIN, k_next);

        Ok((
            u,
            AdaptiveState {
                k: k_next,
                last_u: u,
                time_in_sliding,
            },
        ))
    }

    fn reset(&self) -> AdaptiveState {
        AdaptiveState {
            k: self.config.k_init,
            last_u: 0.0,
            time_in_sliding: 0.0,
        }
    }

    fn gains(&self) -> Vec<f64> {
        self.config.gains.to_vec()
    }

    fn max_force(&self) -> f64 {
        self.config.max_force
    }
}
