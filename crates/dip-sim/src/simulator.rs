//! Closed-loop simulation
//!
//! A run samples the state, asks the controller for a force, records
//! `(state, u, s)` and advances the plant one step. It stops early, keeping
//! the samples so far, when the controller fails or the plant cannot be
//! integrated. Controllers with integral or adaptive terms are stepped with
//! the simulation `dt`, whatever period they were built with.

use std::sync::Arc;
use std::thread;

use tracing::{debug, instrument};

use dip_common::{keys, DynamicsModel, FailureReason, HistoryLog, StateVector, Trajectory};
use dip_controllers::Controller;
use dip_optimizer::{BatchSimulator, ControllerFactoryFn};

use crate::integrator::Integrator;

/// Single and batched closed-loop simulator
#[derive(Clone)]
pub struct ClosedLoopSimulator {
    model: Arc<dyn DynamicsModel>,
    initial_state: StateVector,
    integrator: Integrator,
    workers: usize,
}

impl ClosedLoopSimulator {
    /// Worker count defaults to the available parallelism
    pub fn new(model: Arc<dyn DynamicsModel>) -> Self {
        Self {
            model,
            initial_state: StateVector::upright(),
            integrator: Integrator::default(),
            workers: thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }

    pub fn with_initial_state(mut self, state: StateVector) -> Self {
        self.initial_state = state;
        self
    }

    pub fn with_integrator(mut self, integrator: Integrator) -> Self {
        self.integrator = integrator;
        self
    }

    /// Threads used by `simulate_batch`; 0 is treated as 1
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn initial_state(&self) -> &StateVector {
        &self.initial_state
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Simulate `controller` from the configured initial state
    pub fn run(
        &self,
        controller: &Controller,
        duration: f64,
        dt: f64,
        history: &mut HistoryLog,
    ) -> Trajectory {
        self.run_from(controller, self.initial_state, duration, dt, history)
    }

    /// Simulate `controller` from `initial_state`
    pub fn run_from(
        &self,
        controller: &Controller,
        initial_state: StateVector,
        duration: f64,
        dt: f64,
        history: &mut HistoryLog,
    ) -> Trajectory {
        let steps = if dt > 0.0 && duration.is_finite() {
            (duration / dt).round() as usize
        } else {
            0
        };
        let mut traj = Trajectory::with_capacity(dt, steps);

        // The simulation step is the controller's integration step
        let retimed;
        let controller = match controller.control_period() {
            Some(period) if steps > 0 && period != dt => {
                debug!(period, dt, "controller period follows the simulation step");
                match controller.with_control_period(dt) {
                    Ok(c) => {
                        retimed = c;
                        &retimed
                    }
                    Err(e) => {
                        traj.fail(FailureReason::ControllerError, e.to_string());
                        return traj;
                    }
                }
            }
            _ => controller,
        };

        let mut state = initial_state;
        let mut cs = controller.reset();

        for _ in 0..steps {
            let (u, next_cs) = match controller.compute_control(&state, &cs, history) {
                Ok(out) => out,
                Err(e) => {
                    traj.fail(FailureReason::ControllerError, e.to_string());
                    break;
                }
            };
            let s = history.last(keys::SLIDING).unwrap_or(0.0);
            traj.push(state, u, s);
            cs = next_cs;

            match self.integrator.step(self.model.as_ref(), &state, u, dt) {
                Ok(next) => state = next,
                Err(reason) => {
                    traj.fail(reason, format!("integration failed from state {}", state));
                    break;
                }
            }
        }

        if let Some(failure) = &traj.failure {
            debug!(step = failure.step, reason = %failure.reason, "simulation stopped early");
        }
        traj
    }

    fn simulate_one(
        &self,
        factory: &ControllerFactoryFn<'_>,
        gains: &[f64],
        duration: f64,
        dt: f64,
    ) -> Trajectory {
        match factory(gains) {
            Ok(controller) => self.run(&controller, duration, dt, &mut HistoryLog::new()),
            Err(e) => Trajectory::failed(dt, FailureReason::ControllerError, e.to_string()),
        }
    }
}

impl BatchSimulator for ClosedLoopSimulator {
    /// Particles are split into contiguous chunks, one scoped thread per
    /// chunk. Each result lands at its particle's index.
    #[instrument(skip_all, fields(particles = gains_batch.len(), workers = self.workers))]
    fn simulate_batch(
        &self,
        factory: &ControllerFactoryFn<'_>,
        gains_batch: &[Vec<f64>],
        duration: f64,
        dt: f64,
    ) -> Vec<Trajectory> {
        let n = gains_batch.len();
        if n == 0 {
            return Vec::new();
        }
        let workers = self.workers.clamp(1, n);
        if workers == 1 {
            return gains_batch
                .iter()
                .map(|gains| self.simulate_one(factory, gains, duration, dt))
                .collect();
        }

        let chunk = n.div_ceil(workers);
        let mut out = vec![Trajectory::with_capacity(dt, 0); n];
        thread::scope(|scope| {
            for (gains_chunk, out_chunk) in gains_batch.chunks(chunk).zip(out.chunks_mut(chunk)) {
                scope.spawn(move || {
                    for (gains, slot) in gains_chunk.iter().zip(out_chunk.iter_mut()) {
                        *slot = self.simulate_one(factory, gains, duration, dt);
                    }
                });
            }
        });
        out
    }
}

impl std::fmt::Debug for ClosedLoopSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosedLoopSimulator")
            .field("initial_state", &self.initial_state)
            .field("integrator", &self.integrator)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}
