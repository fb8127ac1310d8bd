//! Particle-swarm gain tuner
//!
//! ```text
//! v ← w·v + c1·r1·(pbest − x) + c2·r2·(gbest − x),   |v_j| ≤ clamp·(hi_j − lo_j)
//! x ← repair(clamp(x + v))
//! ```
//!
//! Every position is clamped into the bounds and repaired into the
//! controller's admissible set before it is simulated, so no evaluation is
//! spent on gains the registry would reject. All randomness comes from the
//! RNG handle passed to [`PsoTuner::optimize`].

use std::sync::Arc;

use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use dip_common::{DipError, GainBounds, Result};
use dip_controllers::{ControllerKind, ControllerRegistry, ControllerSettings};

use crate::batch::BatchSimulator;
use crate::cost::CostFunction;
use crate::history::{ConvergenceHistory, DivergenceEvent, Termination};

/// Inertia weight over the run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schedule", rename_all = "snake_case")]
pub enum InertiaSchedule {
    Fixed { weight: f64 },
    /// Linear interpolation from `start` on the first update to `end` on the last
    Linear { start: f64, end: f64 },
}

impl Default for InertiaSchedule {
    fn default() -> Self {
        Self::Linear {
            start: 0.9,
            end: 0.4,
        }
    }
}

impl InertiaSchedule {
    /// Weight for update `iteration` (0-based) of `iters`
    pub fn weight(&self, iteration: usize, iters: usize) -> f64 {
        match *self {
            Self::Fixed { weight } => weight,
            Self::Linear { start, end } => {
                if iters <= 1 {
                    return start;
                }
                let frac = iteration as f64 / (iters - 1) as f64;
                start + (end - start) * frac
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let (a, b) = match *self {
            Self::Fixed { weight } => (weight, weight),
            Self::Linear { start, end } => (start, end),
        };
        if !(a.is_finite() && b.is_finite()) || a < 0.0 || b < 0.0 {
            return Err(DipError::Configuration(format!(
                "inertia weights must be finite and >= 0, got {:?}",
                self
            )));
        }
        Ok(())
    }
}

/// Stop when the global best improves by at most `tolerance` for
/// `patience` consecutive iterations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EarlyStop {
    pub tolerance: f64,
    pub patience: usize,
}

/// Swarm coefficients
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsoConfig {
    /// Cognitive coefficient
    pub c1: f64,
    /// Social coefficient
    pub c2: f64,
    pub inertia: InertiaSchedule,
    /// Velocity limit as a fraction of each dimension's range
    pub velocity_clamp: f64,
    pub early_stop: Option<EarlyStop>,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            c1: 2.0,
            c2: 2.0,
            inertia: InertiaSchedule::default(),
            velocity_clamp: 0.2,
            early_stop: None,
        }
    }
}

impl PsoConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("c1", self.c1), ("c2", self.c2)] {
            if !value.is_finite() || value < 0.0 {
                return Err(DipError::Configuration(format!(
                    "{} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        if !self.velocity_clamp.is_finite() || self.velocity_clamp <= 0.0 {
            return Err(DipError::Configuration(format!(
                "velocity_clamp must be finite and > 0, got {}",
                self.velocity_clamp
            )));
        }
        self.inertia.validate()?;
        if let Some(stop) = self.early_stop {
            if !stop.tolerance.is_finite() || stop.tolerance < 0.0 || stop.patience == 0 {
                return Err(DipError::Configuration(format!(
                    "early stop needs tolerance >= 0 and patience > 0, got {:?}",
                    stop
                )));
            }
        }
        Ok(())
    }
}

/// Outcome of a tuning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub controller: ControllerKind,
    pub best_gains: Vec<f64>,
    pub best_cost: f64,
    pub history: ConvergenceHistory,
}

/// Particle-swarm tuner for one controller kind
pub struct PsoTuner {
    registry: Arc<ControllerRegistry>,
    simulator: Arc<dyn BatchSimulator>,
    cost: CostFunction,
    kind: ControllerKind,
    settings: ControllerSettings,
    config: PsoConfig,
    duration: f64,
    dt: f64,
}

impl PsoTuner {
    pub fn new(
        registry: Arc<ControllerRegistry>,
        simulator: Arc<dyn BatchSimulator>,
        kind: ControllerKind,
    ) -> Self {
        Self {
            registry,
            simulator,
            cost: CostFunction::default(),
            kind,
            settings: ControllerSettings::default(),
            config: PsoConfig::default(),
            duration: 5.0,
            dt: 0.01,
        }
    }

    pub fn with_cost(mut self, cost: CostFunction) -> Self {
        self.cost = cost;
        self
    }

    /// Settings used for every controller built during the run; their `dt`
    /// is replaced by the horizon step
    pub fn with_settings(mut self, settings: ControllerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_config(mut self, config: PsoConfig) -> Self {
        self.config = config;
        self
    }

    /// Simulation horizon and step for each fitness evaluation
    pub fn with_horizon(mut self, duration: f64, dt: f64) -> Self {
        self.duration = duration;
        self.dt = dt;
        self
    }

    pub fn kind(&self) -> ControllerKind {
        self.kind
    }

    fn validate(&self, bounds: &GainBounds, n_particles: usize) -> Result<()> {
        self.config.validate()?;
        self.kind.validate_bounds(bounds)?;
        if n_particles == 0 {
            return Err(DipError::Configuration(
                "n_particles must be at least 1".to_string(),
            ));
        }
        if !(self.dt.is_finite() && self.dt > 0.0 && self.duration.is_finite() && self.duration >= self.dt) {
            return Err(DipError::Configuration(format!(
                "simulation horizon needs 0 < dt <= duration, got dt={} duration={}",
                self.dt, self.duration
            )));
        }
        Ok(())
    }

    /// Simulate and score a whole swarm; also returns the diverged indices.
    ///
    /// Controllers are built with the horizon step as their control period.
    fn evaluate(&self, positions: &[Vec<f64>]) -> (Vec<f64>, Vec<usize>) {
        let settings = ControllerSettings {
            dt: self.dt,
            ..self.settings.clone()
        };
        let factory = |gains: &[f64]| {
            self.registry
                .create_kind(self.kind, Some(gains), Some(&settings))
        };
        let trajectories = self
            .simulator
            .simulate_batch(&factory, positions, self.duration, self.dt);

        let mut costs = Vec::with_capacity(positions.len());
        let mut diverged = Vec::new();
        for i in 0..positions.len() {
            match trajectories.get(i).map(|traj| self.cost.evaluate(traj)) {
                Some(result) => {
                    if result.is_diverged() {
                        diverged.push(i);
                    }
                    costs.push(result.total);
                }
                None => {
                    diverged.push(i);
                    costs.push(self.cost.sentinel());
                }
            }
        }
        (costs, diverged)
    }

    fn note_divergence(&self, history: &mut ConvergenceHistory, iteration: usize, diverged: Vec<usize>) {
        if diverged.is_empty() {
            return;
        }
        warn!(
            controller = %self.kind,
            iteration,
            particles = ?diverged,
            "particles diverged and were assigned the sentinel cost"
        );
        history.divergences.push(DivergenceEvent {
            iteration,
            particles: diverged,
        });
    }

    /// Run the swarm.
    ///
    /// One batched simulation for the initial swarm plus one per iteration.
    /// The same RNG state, bounds and sizes give the same result.
    #[instrument(skip(self, bounds, rng), fields(controller = %self.kind))]
    pub fn optimize<R: Rng>(
        &self,
        bounds: &GainBounds,
        n_particles: usize,
        iters: usize,
        rng: &mut R,
    ) -> Result<TuningResult> {
        self.validate(bounds, n_particles)?;
        let dim = bounds.dim();
        let lower = bounds.lower();
        let upper = bounds.upper();
        let v_max: Vec<f64> = (0..dim)
            .map(|j| self.config.velocity_clamp * bounds.range(j))
            .collect();

        let mut positions: Vec<Vec<f64>> = Vec::with_capacity(n_particles);
        let mut velocities: Vec<Vec<f64>> = Vec::with_capacity(n_particles);
        for _ in 0..n_particles {
            let mut x: Vec<f64> = (0..dim).map(|j| rng.gen_range(lower[j]..=upper[j])).collect();
            self.kind.repair_gains(&mut x, bounds);
            let v: Vec<f64> = (0..dim).map(|j| rng.gen_range(-v_max[j]..=v_max[j])).collect();
            positions.push(x);
            velocities.push(v);
        }

        let mut history = ConvergenceHistory::new(iters + 1);
        let (costs, diverged) = self.evaluate(&positions);
        self.note_divergence(&mut history, 0, diverged);

        let mut pbest_pos = positions.clone();
        let mut pbest_cost = costs.clone();
        let mut gbest = argmin(&pbest_cost);
        let mut gbest_pos = pbest_pos[gbest].clone();
        let mut gbest_cost = pbest_cost[gbest];
        history.record(gbest_cost, &costs);

        let mut stall = 0usize;
        for iteration in 1..=iters {
            let w = self.config.inertia.weight(iteration - 1, iters);
            #[allow(clippy::needless_range_loop)]
            for i in 0..n_particles {
                for j in 0..dim {
                    let r1: f64 = rng.gen();
                    let r2: f64 = rng.gen();
                    let v = w * velocities[i][j]
                        + self.config.c1 * r1 * (pbest_pos[i][j] - positions[i][j])
                        + self.config.c2 * r2 * (gbest_pos[j] - positions[i][j]);
                    velocities[i][j] = v.clamp(-v_max[j], v_max[j]);
                    positions[i][j] += velocities[i][j];
                }
                self.kind.repair_gains(&mut positions[i], bounds);
            }

            let (costs, diverged) = self.evaluate(&positions);
            self.note_divergence(&mut history, iteration, diverged);

            for (i, &cost) in costs.iter().enumerate() {
                if cost < pbest_cost[i] {
                    pbest_cost[i] = cost;
                    pbest_pos[i].clone_from(&positions[i]);
                }
            }
            let previous = gbest_cost;
            gbest = argmin(&pbest_cost);
            if pbest_cost[gbest] < gbest_cost {
                gbest_cost = pbest_cost[gbest];
                gbest_pos.clone_from(&pbest_pos[gbest]);
            }
            history.record(gbest_cost, &costs);
            history.iterations = iteration;
            debug!(iteration, best_cost = gbest_cost, inertia = w, "pso iteration");

            if let Some(stop) = self.config.early_stop {
                if previous - gbest_cost <= stop.tolerance {
                    stall += 1;
                } else {
                    stall = 0;
                }
                if stall >= stop.patience {
                    history.termination = Termination::Converged;
                    debug!(iteration, stall, "early stop");
                    break;
                }
            }
        }

        if gbest_cost >= self.cost.sentinel() {
            warn!(controller = %self.kind, "no particle produced a stable run");
        }
        info!(
            controller = %self.kind,
            best_cost = gbest_cost,
            iterations = history.iterations,
            diverged = history.diverged_evaluations(),
            "pso finished"
        );

        Ok(TuningResult {
            controller: self.kind,
            best_gains: gbest_pos,
            best_cost: gbest_cost,
            history,
        })
    }

    /// [`optimize`](Self::optimize) with a `StdRng` seeded from `seed`
    pub fn optimize_seeded(
        &self,
        bounds: &GainBounds,
        n_particles: usize,
        iters: usize,
        seed: u64,
    ) -> Result<TuningResult> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.optimize(bounds, n_particles, iters, &mut rng)
    }
}

impl std::fmt::Debug for PsoTuner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PsoTuner")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .field("duration", &self.duration)
            .field("dt", &self.dt)
            .finish_non_exhaustive()
    }
}

/// Index of the smallest cost, first one on ties
fn argmin(costs: &[f64]) -> usize {
    costs
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| OrderedFloat(**c))
        .map_or(0, |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::ControllerFactoryFn;
    use crate::cost::CostConfig;
    use dip_common::{FailureReason, StateVector, Trajectory};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fake simulator: the trajectory is a single state whose angle equals the
    /// distance of the gains from a target point, so the cost is a bowl.
    struct Bowl {
        target: Vec<f64>,
        calls: AtomicUsize,
    }

    impl Bowl {
        fn new(target: Vec<f64>) -> Self {
            Self {
                target,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl BatchSimulator for Bowl {
        fn simulate_batch(
            &self,
            factory: &ControllerFactoryFn<'_>,
            gains_batch: &[Vec<f64>],
            _duration: f64,
            dt: f64,
        ) -> Vec<Trajectory> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            gains_batch
                .iter()
                .map(|gains| {
                    if let Err(e) = factory(gains) {
                        return Trajectory::failed(dt, FailureReason::ControllerError, e.to_string());
                    }
                    let d: f64 = gains
                        .iter()
                        .zip(&self.target)
                        .map(|(g, t)| (g - t).powi(2))
                        .sum::<f64>()
                        .sqrt();
                    let mut traj = Trajectory::with_capacity(dt, 1);
                    traj.push(StateVector::new([0.0, d, 0.0, 0.0, 0.0, 0.0]), 0.0, 0.0);
                    traj
                })
                .collect()
        }
    }

    /// Every particle diverges
    struct Exploding;

    impl BatchSimulator for Exploding {
        fn simulate_batch(
            &self,
            _factory: &ControllerFactoryFn<'_>,
            gains_batch: &[Vec<f64>],
            _duration: f64,
            dt: f64,
        ) -> Vec<Trajectory> {
            gains_batch
                .iter()
                .map(|_| {
                    let mut traj = Trajectory::with_capacity(dt, 1);
                    traj.push(StateVector::new([f64::NAN; 6]), 0.0, 0.0);
                    traj
                })
                .collect()
        }
    }

    fn tuner(kind: ControllerKind, sim: Arc<dyn BatchSimulator>) -> PsoTuner {
        PsoTuner::new(Arc::new(ControllerRegistry::new()), sim, kind).with_horizon(0.1, 0.01)
    }

    fn hybrid_bounds() -> GainBounds {
        GainBounds::from_pairs(&[(1.0, 10.0), (1.0, 10.0), (1.0, 10.0), (1.0, 10.0)]).unwrap()
    }

    #[test]
    fn test_converges_on_bowl() {
        let sim = Arc::new(Bowl::new(vec![3.0, 7.0, 5.0, 2.0]));
        let t = tuner(ControllerKind::Hybrid, sim.clone());
        let result = t.optimize_seeded(&hybrid_bounds(), 20, 60, 7).unwrap();

        // cost = 0.01·‖gains − target‖²
        assert!(result.best_cost < 0.02, "gains {:?}", result.best_gains);
        assert!(result.best_cost < result.history.best_costs[0]);
        assert_eq!(sim.calls.load(Ordering::SeqCst), 61);
        assert_eq!(result.history.best_costs.len(), 61);
        assert_eq!(result.history.iterations, 60);
        assert_eq!(result.history.termination, Termination::Budget);
        assert!(result
            .history
            .best_costs
            .windows(2)
            .all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_same_seed_same_result() {
        let run = |seed| {
            tuner(ControllerKind::Hybrid, Arc::new(Bowl::new(vec![3.0, 7.0, 5.0, 2.0])))
                .optimize_seeded(&hybrid_bounds(), 8, 10, seed)
                .unwrap()
        };
        let a = run(42);
        let b = run(42);
        assert_eq!(a.best_gains, b.best_gains);
        assert_eq!(a.best_cost, b.best_cost);
        assert_eq!(a.history, b.history);
        let c = run(43);
        assert_ne!(a.best_gains, c.best_gains);
    }

    #[test]
    fn test_sta_particles_are_repaired() {
        // K2 target above K1 target: the optimum is infeasible
        let sim = Arc::new(Bowl::new(vec![2.0, 8.0, 5.0, 5.0, 5.0, 5.0]));
        let bounds = GainBounds::from_pairs(&[(1.0, 10.0); 6]).unwrap();
        let result = tuner(ControllerKind::SuperTwisting, sim)
            .optimize_seeded(&bounds, 10, 15, 1)
            .unwrap();
        assert!(result.best_gains[0] > result.best_gains[1]);
        assert!(result.history.divergences.is_empty());
    }

    #[test]
    fn test_divergence_recorded() {
        let result = tuner(ControllerKind::Hybrid, Arc::new(Exploding))
            .optimize_seeded(&hybrid_bounds(), 4, 2, 0)
            .unwrap();
        assert_eq!(result.best_cost, 1e6);
        assert_eq!(result.history.divergences.len(), 3);
        assert_eq!(result.history.divergences[1].iteration, 1);
        assert_eq!(result.history.divergences[1].particles, vec![0, 1, 2, 3]);
        assert!(hybrid_bounds().contains(&result.best_gains));
    }

    #[test]
    fn test_early_stop() {
        let config = PsoConfig {
            early_stop: Some(EarlyStop {
                tolerance: 1.0,
                patience: 3,
            }),
            ..PsoConfig::default()
        };
        let result = tuner(ControllerKind::Hybrid, Arc::new(Exploding))
            .with_config(config)
            .optimize_seeded(&hybrid_bounds(), 4, 50, 0)
            .unwrap();
        assert_eq!(result.history.termination, Termination::Converged);
        assert_eq!(result.history.iterations, 3);
    }

    #[test]
    fn test_zero_tolerance_stops_on_flat_best() {
        let config = PsoConfig {
            early_stop: Some(EarlyStop {
                tolerance: 0.0,
                patience: 2,
            }),
            ..PsoConfig::default()
        };
        assert!(config.validate().is_ok());
        let result = tuner(ControllerKind::Hybrid, Arc::new(Exploding))
            .with_config(config)
            .optimize_seeded(&hybrid_bounds(), 4, 50, 0)
            .unwrap();
        assert_eq!(result.history.termination, Termination::Converged);
        assert_eq!(result.history.iterations, 2);
    }

    #[test]
    fn test_capped_finite_cost_is_not_divergence() {
        // 0.01·‖gains − target‖² ≥ 64 everywhere in the box, far above the sentinel
        let sim = Arc::new(Bowl::new(vec![50.0; 4]));
        let cost = CostFunction::new(CostConfig {
            sentinel: 1.0,
            ..CostConfig::default()
        })
        .unwrap();
        let result = tuner(ControllerKind::Hybrid, sim)
            .with_cost(cost)
            .optimize_seeded(&hybrid_bounds(), 4, 3, 0)
            .unwrap();
        assert_eq!(result.best_cost, 1.0);
        assert!(result.history.divergences.is_empty());
    }

    /// Counts controllers whose control period differs from the run's step
    struct PeriodCheck {
        mismatched: AtomicUsize,
    }

    impl BatchSimulator for PeriodCheck {
        fn simulate_batch(
            &self,
            factory: &ControllerFactoryFn<'_>,
            gains_batch: &[Vec<f64>],
            duration: f64,
            dt: f64,
        ) -> Vec<Trajectory> {
            for gains in gains_batch {
                if let Ok(controller) = factory(gains) {
                    if controller.control_period() != Some(dt) {
                        self.mismatched.fetch_add(1, Ordering::SeqCst);
                    }
                }
            }
            Exploding.simulate_batch(factory, gains_batch, duration, dt)
        }
    }

    #[test]
    fn test_controllers_use_horizon_step() {
        let sim = Arc::new(PeriodCheck {
            mismatched: AtomicUsize::new(0),
        });
        let settings = ControllerSettings {
            dt: 0.001,
            ..ControllerSettings::default()
        };
        for kind in [ControllerKind::SuperTwisting, ControllerKind::Adaptive, ControllerKind::Hybrid] {
            let bounds = ControllerRegistry::new().default_bounds(kind.tag()).unwrap();
            PsoTuner::new(Arc::new(ControllerRegistry::new()), sim.clone(), kind)
                .with_settings(settings.clone())
                .with_horizon(0.1, 0.02)
                .optimize_seeded(&bounds, 3, 1, 5)
                .unwrap();
        }
        assert_eq!(sim.mismatched.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let t = tuner(ControllerKind::Classical, Arc::new(Exploding));
        assert!(matches!(
            t.optimize_seeded(&hybrid_bounds(), 4, 2, 0),
            Err(DipError::Configuration(_))
        ));
        let bounds = GainBounds::from_pairs(&[(1.0, 10.0); 6]).unwrap();
        assert!(t.optimize_seeded(&bounds, 0, 2, 0).is_err());
    }

    #[test]
    fn test_inertia_schedule() {
        let s = InertiaSchedule::Linear { start: 0.9, end: 0.4 };
        assert_eq!(s.weight(0, 11), 0.9);
        assert!((s.weight(10, 11) - 0.4).abs() < 1e-12);
        assert!((s.weight(5, 11) - 0.65).abs() < 1e-12);
        assert_eq!(InertiaSchedule::Fixed { weight: 0.7 }.weight(3, 10), 0.7);
    }

    #[test]
    fn test_argmin_first_on_ties() {
        assert_eq!(argmin(&[3.0, 1.0, 1.0, 2.0]), 1);
    }
}
