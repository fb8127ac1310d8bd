//! Controller type tags and per-type gain layout

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use dip_common::{DipError, GainBounds, Result};

use crate::validation::GainConstraint;

/// Margin kept between K1 and K2 when repairing super-twisting gains
pub const STA_ORDER_MARGIN: f64 = 0.9;

/// The closed set of controller variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControllerKind {
    #[serde(rename = "classical_smc")]
    Classical,
    #[serde(rename = "sta_smc")]
    SuperTwisting,
    #[serde(rename = "adaptive_smc")]
    Adaptive,
    #[serde(rename = "hybrid_adaptive_sta_smc")]
    Hybrid,
}

impl ControllerKind {
    pub const ALL: [ControllerKind; 4] = [
        ControllerKind::Classical,
        ControllerKind::SuperTwisting,
        ControllerKind::Adaptive,
        ControllerKind::Hybrid,
    ];

    /// Canonical type tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Classical => "classical_smc",
            Self::SuperTwisting => "sta_smc",
            Self::Adaptive => "adaptive_smc",
            Self::Hybrid => "hybrid_adaptive_sta_smc",
        }
    }

    pub fn n_gains(&self) -> usize {
        self.gain_names().len()
    }

    pub fn gain_names(&self) -> &'static [&'static str] {
        match self {
            Self::Classical => &["k1", "k2", "lambda1", "lambda2", "K", "kd"],
            Self::SuperTwisting => &["K1", "K2", "k1", "k2", "lambda1", "lambda2"],
            Self::Adaptive => &["k1", "k2", "lambda1", "lambda2", "gamma"],
            Self::Hybrid => &["c1", "lambda1", "c2", "lambda2"],
        }
    }

    pub fn gain_constraints(&self) -> &'static [GainConstraint] {
        use GainConstraint::{NonNegative, Positive};
        match self {
            Self::Classical => &[Positive, Positive, Positive, Positive, Positive, NonNegative],
            Self::SuperTwisting => &[Positive; 6],
            Self::Adaptive => &[Positive; 5],
            Self::Hybrid => &[Positive; 4],
        }
    }

    /// Check that a search box can only produce admissible gains after repair
    pub fn validate_bounds(&self, bounds: &GainBounds) -> Result<()> {
        if bounds.dim() != self.n_gains() {
            return Err(DipError::Configuration(format!(
                "{} bounds must have {} dimensions, got {}",
                self.tag(),
                self.n_gains(),
                bounds.dim()
            )));
        }
        let names = self.gain_names();
        for (i, constraint) in self.gain_constraints().iter().enumerate() {
            let lo = bounds.lower()[i];
            let ok = match constraint {
                GainConstraint::Positive => lo > 0.0,
                GainConstraint::NonNegative => lo >= 0.0,
            };
            if !ok {
                return Err(DipError::Configuration(format!(
                    "{} lower bound for {} must respect its sign constraint, got {}",
                    self.tag(),
                    names[i],
                    lo
                )));
            }
        }
        if *self == Self::SuperTwisting && bounds.upper()[0] <= bounds.lower()[1] {
            return Err(DipError::Configuration(format!(
                "{} bounds cannot satisfy K1 > K2: K1 upper {} <= K2 lower {}",
                self.tag(),
                bounds.upper()[0],
                bounds.lower()[1]
            )));
        }
        Ok(())
    }

    /// Move a candidate into the admissible set: clamp into `bounds`, then
    /// enforce ordering rules. Assumes `validate_bounds` passed.
    pub fn repair_gains(&self, gains: &mut [f64], bounds: &GainBounds) {
        for v in gains.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
        bounds.clamp(gains);

        if *self == Self::SuperTwisting && gains[0] <= gains[1] {
            let lo_k2 = bounds.lower()[1];
            let shrunk = gains[0] * STA_ORDER_MARGIN;
            if shrunk >= lo_k2 {
                gains[1] = shrunk;
            } else {
                gains[1] = lo_k2;
                gains[0] = (lo_k2 / STA_ORDER_MARGIN).min(bounds.upper()[0]);
            }
        }
    }
}

impl FromStr for ControllerKind {
    type Err = DipError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classical_smc" | "classical" => Ok(Self::Classical),
            "sta_smc" | "sta" | "super_twisting" | "super_twisting_smc" => Ok(Self::SuperTwisting),
            "adaptive_smc" | "adaptive" => Ok(Self::Adaptive),
            "hybrid_adaptive_sta_smc" | "hybrid" | "hybrid_smc" => Ok(Self::Hybrid),
            _ => Err(DipError::UnknownController(s.to_string())),
        }
    }
}

impl std::fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}
