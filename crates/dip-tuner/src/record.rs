//! Output records written by the CLI

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dip_common::StateVector;
use dip_optimizer::{ConvergenceHistory, CostResult, TunedGains, TuningResult};

/// One tuning run. The flattened gain fields keep the file loadable with
/// [`TunedGains::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuningRecord {
    pub run_id: Uuid,
    pub tuned_at: DateTime<Utc>,
    #[serde(flatten)]
    pub tuned: TunedGains,
    pub seed: Option<u64>,
    pub history: ConvergenceHistory,
}

impl TuningRecord {
    pub fn new(result: &TuningResult, seed: Option<u64>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            tuned_at: Utc::now(),
            tuned: TunedGains::from(result),
            seed,
            history: result.history.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Summary of a single evaluation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub controller: String,
    pub gains: Vec<f64>,
    pub steps: usize,
    pub failure: Option<String>,
    pub final_state: Option<StateVector>,
    pub cost: CostResult,
}
