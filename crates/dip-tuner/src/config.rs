//! Tuner configuration
//!
//! Layers, lowest priority first: built-in defaults, the TOML (or any format
//! the `config` crate recognizes) file, then `DIP_` environment variables
//! with `__` between nested keys, e.g. `DIP_PSO__ITERS=100`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use dip_common::{GainBounds, StateVector, STATE_DIM};
use dip_controllers::{ControllerKind, ControllerRegistry, ControllerSettings};
use dip_optimizer::{CostConfig, PsoConfig};
use dip_sim::{Integrator, PendulumParams};

/// Top-level tuner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    pub simulation: SimulationSettings,
    pub plant: PendulumParams,
    pub cost: CostConfig,
    pub pso: SwarmSettings,
    /// Per-controller settings keyed by type tag (`classical_smc`, ...)
    pub controllers: BTreeMap<String, ControllerEntry>,
}

/// Closed-loop simulation settings used for every fitness evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Horizon in seconds
    pub duration: f64,
    pub dt: f64,
    pub initial_state: [f64; STATE_DIM],
    pub integrator: Integrator,
    /// Batch worker threads, `None` for the available parallelism
    pub workers: Option<usize>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            duration: 5.0,
            dt: 0.01,
            initial_state: [0.0, 0.05, -0.03, 0.0, 0.0, 0.0],
            integrator: Integrator::Rk4,
            workers: None,
        }
    }
}

/// Swarm size, budget and coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmSettings {
    pub n_particles: usize,
    pub iters: usize,
    /// Fixed seed for reproducible runs
    pub seed: Option<u64>,
    #[serde(flatten)]
    pub coefficients: PsoConfig,
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            n_particles: 30,
            iters: 50,
            seed: None,
            coefficients: PsoConfig::default(),
        }
    }
}

/// Settings for one controller type plus an optional search box
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerEntry {
    #[serde(flatten)]
    pub settings: ControllerSettings,
    /// `(lower, upper)` per gain; the registry defaults are used when absent
    pub bounds: Option<Vec<(f64, f64)>>,
}

impl TunerConfig {
    /// Load `.env`, then layer `path` (optional file) and `DIP_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let cfg: Self = builder
            .add_source(
                config::Environment::with_prefix("DIP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration sources")?
            .try_deserialize()
            .context("failed to parse configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document on top of the defaults, without environment
    pub fn from_toml(toml: &str) -> Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let sim = &self.simulation;
        if !(sim.duration.is_finite() && sim.duration > 0.0) {
            bail!("simulation.duration must be finite and > 0, got {}", sim.duration);
        }
        if !(sim.dt.is_finite() && sim.dt > 0.0 && sim.dt <= sim.duration) {
            bail!("simulation.dt must be in (0, duration], got {}", sim.dt);
        }
        if sim.initial_state.iter().any(|v| !v.is_finite()) {
            bail!("simulation.initial_state must be finite");
        }
        if sim.workers == Some(0) {
            bail!("simulation.workers must be at least 1");
        }
        self.plant.validate()?;
        if self.pso.n_particles == 0 {
            bail!("pso.n_particles must be at least 1");
        }
        self.pso.coefficients.validate()?;
        for tag in self.controllers.keys() {
            tag.parse::<ControllerKind>()
                .with_context(|| format!("unknown controller section [controllers.{}]", tag))?;
        }
        Ok(())
    }

    pub fn initial_state(&self) -> StateVector {
        StateVector::new(self.simulation.initial_state)
    }

    fn entry(&self, kind: ControllerKind) -> Option<&ControllerEntry> {
        self.controllers
            .iter()
            .find(|(tag, _)| tag.parse::<ControllerKind>().ok() == Some(kind))
            .map(|(_, entry)| entry)
    }

    /// Settings for `kind`, defaults when the section is missing.
    ///
    /// The control period is always `simulation.dt`.
    pub fn controller_settings(&self, kind: ControllerKind) -> ControllerSettings {
        let settings = self
            .entry(kind)
            .map(|e| e.settings.clone())
            .unwrap_or_default();
        ControllerSettings {
            dt: self.simulation.dt,
            ..settings
        }
    }

    /// Configured search box for `kind`, else the registry's default bounds
    pub fn bounds(&self, kind: ControllerKind, registry: &ControllerRegistry) -> Result<GainBounds> {
        match self.entry(kind).and_then(|e| e.bounds.as_deref()) {
            Some(pairs) => GainBounds::from_pairs(pairs)
                .with_context(|| format!("invalid bounds for {}", kind)),
            None => Ok(registry.default_bounds(kind.tag())?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TunerConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.pso.n_particles, 30);
        assert_eq!(cfg.simulation.integrator, Integrator::Rk4);
    }

    #[test]
    fn test_from_toml_overrides() {
        let cfg = TunerConfig::from_toml(
            r#"
            [simulation]
            duration = 2.0
            dt = 0.005
            integrator = "euler"
            workers = 2

            [pso]
            n_particles = 12
            iters = 8
            seed = 7
            c1 = 1.5

            [pso.inertia]
            schedule = "fixed"
            weight = 0.7

            [controllers.sta_smc]
            max_force = 100.0
            dt = 0.001
            bounds = [[2.0, 50.0], [1.0, 40.0], [1.0, 20.0], [1.0, 20.0], [1.0, 10.0], [1.0, 10.0]]
            "#,
        )
        .unwrap();

        assert_eq!(cfg.simulation.duration, 2.0);
        assert_eq!(cfg.simulation.integrator, Integrator::Euler);
        assert_eq!(cfg.simulation.workers, Some(2));
        assert_eq!(cfg.pso.n_particles, 12);
        assert_eq!(cfg.pso.seed, Some(7));
        assert_eq!(cfg.pso.coefficients.c1, 1.5);
        assert_eq!(cfg.pso.coefficients.c2, 2.0);
        assert_eq!(
            cfg.pso.coefficients.inertia,
            dip_optimizer::InertiaSchedule::Fixed { weight: 0.7 }
        );

        let settings = cfg.controller_settings(ControllerKind::SuperTwisting);
        assert_eq!(settings.max_force, 100.0);
        assert_eq!(settings.boundary_layer, ControllerSettings::default().boundary_layer);
        // section dt gives way to the simulation step
        assert_eq!(settings.dt, 0.005);
        assert_eq!(cfg.controller_settings(ControllerKind::Hybrid).dt, 0.005);

        let registry = ControllerRegistry::new();
        let bounds = cfg.bounds(ControllerKind::SuperTwisting, &registry).unwrap();
        assert_eq!(bounds.upper()[0], 50.0);
        let fallback = cfg.bounds(ControllerKind::Classical, &registry).unwrap();
        assert_eq!(fallback, registry.default_bounds("classical_smc").unwrap());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(TunerConfig::from_toml("[simulation]\ndt = -1.0").is_err());
        assert!(TunerConfig::from_toml("[pso]\nn_particles = 0").is_err());
        assert!(TunerConfig::from_toml("[controllers.pid]\nmax_force = 1.0").is_err());
        assert!(TunerConfig::from_toml("[plant]\ncart_mass = 0.0").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("dip-missing-{}.toml", uuid::Uuid::now_v7()));
        let cfg = TunerConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.pso.iters, TunerConfig::default().pso.iters);
    }
}
