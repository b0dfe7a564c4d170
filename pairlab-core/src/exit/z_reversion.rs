//! Z-reversion — close everything once the z-score has come back to the mean.
//!
//! Fires when the directional z drops below `epsilon`: either |z| fell inside
//! the band on the entry side, or z crossed through zero in one bar.

use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;
use crate::error::ConfigError;

use super::{require_positive, ExitContext, ExitDecision, ExitRule, PnlBasis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZReversion {
    pub epsilon: f64,
}

impl Default for ZReversion {
    fn default() -> Self {
        Self { epsilon: 0.1 }
    }
}

impl ExitRule for ZReversion {
    fn name(&self) -> &'static str {
        "z_reversion"
    }

    fn validate(&self, z_entry: f64) -> Result<(), ConfigError> {
        require_positive("epsilon", self.epsilon)?;
        if self.epsilon >= z_entry {
            return Err(ConfigError::InconsistentTargets(format!(
                "epsilon {} must be below the entry threshold {z_entry}",
                self.epsilon
            )));
        }
        Ok(())
    }

    fn evaluate(&self, ctx: &ExitContext) -> ExitDecision {
        if ctx.directional_z < self.epsilon {
            ExitDecision::close(PnlBasis::ZScore, ExitReason::ZReversion)
        } else {
            ExitDecision::hold()
        }
    }
}
