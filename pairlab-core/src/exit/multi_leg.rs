//! Multi-leg target — staged exits at two z thresholds with a hard |z| abort.
//!
//! Each leg's pips are computed independently and summed (price basis).
//! One transition per bar, checked in order:
//! 1. |z| ≥ `stop_z` → close everything (stop-loss)
//! 2. no partial yet and directional z ≤ `tp1_z` → book `partial_fraction`
//! 3. partial taken and directional z ≤ `tp2_z` → close the rest (take-profit)

use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;
use crate::error::ConfigError;

use super::{require_fraction, require_positive, ExitContext, ExitDecision, ExitRule, PnlBasis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiLegTarget {
    pub tp1_z: f64,
    pub tp2_z: f64,
    pub stop_z: f64,
    pub partial_fraction: f64,
}

impl Default for MultiLegTarget {
    fn default() -> Self {
        Self {
            tp1_z: 1.0,
            tp2_z: 0.0,
            stop_z: 3.0,
            partial_fraction: 0.5,
        }
    }
}

impl ExitRule for MultiLegTarget {
    fn name(&self) -> &'static str {
        "multi_leg_target"
    }

    fn validate(&self, z_entry: f64) -> Result<(), ConfigError> {
        require_positive("stop_z", self.stop_z)?;
        require_fraction("partial_fraction", self.partial_fraction)?;
        if !self.tp1_z.is_finite() || !self.tp2_z.is_finite() {
            return Err(ConfigError::InconsistentTargets(
                "tp1_z and tp2_z must be finite".to_string(),
            ));
        }
        if self.tp1_z >= z_entry {
            return Err(ConfigError::InconsistentTargets(format!(
                "tp1_z {} must be below the entry threshold {z_entry}",
                self.tp1_z
            )));
        }
        if self.tp2_z > self.tp1_z {
            return Err(ConfigError::InconsistentTargets(format!(
                "tp2_z {} must not exceed tp1_z {}",
                self.tp2_z, self.tp1_z
            )));
        }
        if self.stop_z <= z_entry {
            return Err(ConfigError::InconsistentTargets(format!(
                "stop_z {} must be beyond the entry threshold {z_entry}",
                self.stop_z
            )));
        }
        Ok(())
    }

    fn evaluate(&self, ctx: &ExitContext) -> ExitDecision {
        if ctx.zscore.abs() >= self.stop_z {
            ExitDecision::close(PnlBasis::Price, ExitReason::StopLoss)
        } else if !ctx.partial_taken && ctx.directional_z <= self.tp1_z {
            ExitDecision::partial(self.partial_fraction, PnlBasis::Price)
        } else if ctx.partial_taken && ctx.directional_z <= self.tp2_z {
            ExitDecision::close(PnlBasis::Price, ExitReason::TakeProfit)
        } else {
            ExitDecision::hold()
        }
    }
}
