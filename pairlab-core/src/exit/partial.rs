//! Staged z-score exits: book part of the position at an intermediate z, the
//! rest on reversion, optionally under a hard floating stop.
//!
//! The partial fires at most once per position (guarded by the position's
//! `partial_taken` flag). Partial and final may land on the same bar; the
//! partial is booked first.

use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;
use crate::error::ConfigError;

use super::{require_fraction, require_positive, ExitContext, ExitDecision, ExitRule, PnlBasis};

/// Half off at |z| ≤ 1, the rest at |z| < 0.1 (defaults).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialZReversion {
    pub partial_z: f64,
    pub epsilon: f64,
    pub partial_fraction: f64,
}

impl Default for PartialZReversion {
    fn default() -> Self {
        Self {
            partial_z: 1.0,
            epsilon: 0.1,
            partial_fraction: 0.5,
        }
    }
}

impl PartialZReversion {
    fn check(&self, z_entry: f64) -> Result<(), ConfigError> {
        require_positive("partial_z", self.partial_z)?;
        require_positive("epsilon", self.epsilon)?;
        require_fraction("partial_fraction", self.partial_fraction)?;
        if self.partial_z >= z_entry {
            return Err(ConfigError::InconsistentTargets(format!(
                "partial_z {} must be below the entry threshold {z_entry}",
                self.partial_z
            )));
        }
        if self.epsilon >= self.partial_z {
            return Err(ConfigError::InconsistentTargets(format!(
                "epsilon {} must be below partial_z {}",
                self.epsilon, self.partial_z
            )));
        }
        Ok(())
    }

    fn staged(&self, ctx: &ExitContext) -> ExitDecision {
        let mut decision = ExitDecision::hold();
        let mut partial_taken = ctx.partial_taken;

        if !partial_taken && ctx.directional_z <= self.partial_z {
            decision = ExitDecision::partial(self.partial_fraction, PnlBasis::ZScore);
            partial_taken = true;
        }

        if ctx.directional_z < self.epsilon {
            let reason = if partial_taken {
                ExitReason::PartialThenReversion
            } else {
                ExitReason::ZReversion
            };
            decision = decision.then_close(PnlBasis::ZScore, reason);
        }

        decision
    }
}

impl ExitRule for PartialZReversion {
    fn name(&self) -> &'static str {
        "partial_z_reversion"
    }

    fn validate(&self, z_entry: f64) -> Result<(), ConfigError> {
        self.check(z_entry)
    }

    fn evaluate(&self, ctx: &ExitContext) -> ExitDecision {
        self.staged(ctx)
    }
}

/// Staged z exits plus a floating stop on the whole position.
///
/// The stop is checked first each bar and pre-empts the staged exits: once
/// floating PnL (booked partial + remaining marked at market) is at or below
/// `-stop_loss_pips`, the remaining size closes at market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialStopLoss {
    #[serde(flatten)]
    pub staged: PartialZReversion,
    pub stop_loss_pips: f64,
}

impl Default for PartialStopLoss {
    fn default() -> Self {
        Self {
            staged: PartialZReversion::default(),
            stop_loss_pips: 30.0,
        }
    }
}

impl ExitRule for PartialStopLoss {
    fn name(&self) -> &'static str {
        "partial_stop_loss"
    }

    fn validate(&self, z_entry: f64) -> Result<(), ConfigError> {
        self.staged.check(z_entry)?;
        require_positive("stop_loss_pips", self.stop_loss_pips)
    }

    fn evaluate(&self, ctx: &ExitContext) -> ExitDecision {
        if ctx.floating_pnl_pips <= -self.stop_loss_pips {
            return ExitDecision::close(PnlBasis::Price, ExitReason::StopLoss);
        }
        self.staged.staged(ctx)
    }
}
