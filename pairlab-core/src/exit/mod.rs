//! Exit policies — decide, bar by bar, whether an open position holds, books
//! a partial, or closes.
//!
//! Exactly one policy is active per run, selected by configuration. A policy is
//! pure: it reads an [`ExitContext`] built by the engine after mark-to-market
//! and returns an [`ExitDecision`]. The engine performs the bookings, so the
//! policy never touches the position or the trade log.
//!
//! A decision carries at most one partial and at most one full close. Policies
//! that allow both on the same bar (partial first, then re-check) return both;
//! the engine applies the partial before the close.

pub mod multi_leg;
pub mod partial;
pub mod take_profit_stop_loss;
pub mod z_reversion;

pub use multi_leg::MultiLegTarget;
pub use partial::{PartialStopLoss, PartialZReversion};
pub use take_profit_stop_loss::FixedTakeProfitStopLoss;
pub use z_reversion::ZReversion;

use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;
use crate::error::ConfigError;

/// How a booking converts into pips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PnlBasis {
    /// Z-score distance travelled since entry, scaled by `pip_scale`.
    ZScore,
    /// Summed per-leg price movement in pips.
    Price,
}

/// Everything a policy may look at for one bar of an open position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitContext {
    /// Raw z-score on this bar.
    pub zscore: f64,
    /// Z-score seen from the entry side (see `Position::directional_z`).
    pub directional_z: f64,
    /// Summed leg movement since entry, in pips, before cost.
    pub movement_pips: f64,
    /// Realized partials plus the remaining size marked at `movement − cost`.
    pub floating_pnl_pips: f64,
    pub partial_taken: bool,
}

/// Book a fraction of the original size and keep the rest open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialExit {
    pub fraction: f64,
    pub basis: PnlBasis,
}

/// Close all remaining size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FullExit {
    pub basis: PnlBasis,
    pub reason: ExitReason,
}

/// Outcome of evaluating a policy on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExitDecision {
    pub partial: Option<PartialExit>,
    pub close: Option<FullExit>,
}

impl ExitDecision {
    pub fn hold() -> Self {
        Self::default()
    }

    pub fn close(basis: PnlBasis, reason: ExitReason) -> Self {
        Self {
            partial: None,
            close: Some(FullExit { basis, reason }),
        }
    }

    pub fn partial(fraction: f64, basis: PnlBasis) -> Self {
        Self {
            partial: Some(PartialExit { fraction, basis }),
            close: None,
        }
    }

    /// Add a full close after whatever this decision already books.
    pub fn then_close(mut self, basis: PnlBasis, reason: ExitReason) -> Self {
        self.close = Some(FullExit { basis, reason });
        self
    }

    pub fn is_hold(&self) -> bool {
        self.partial.is_none() && self.close.is_none()
    }
}

/// Behaviour shared by every exit policy.
pub trait ExitRule: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Check the parameters against each other and against the entry threshold.
    fn validate(&self, z_entry: f64) -> Result<(), ConfigError>;

    /// Decide what to do on one bar of an open position.
    fn evaluate(&self, ctx: &ExitContext) -> ExitDecision;
}

/// The configured exit policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExitPolicy {
    ZReversion(ZReversion),
    PartialZReversion(PartialZReversion),
    FixedTakeProfitStopLoss(FixedTakeProfitStopLoss),
    PartialStopLoss(PartialStopLoss),
    MultiLegTarget(MultiLegTarget),
}

impl Default for ExitPolicy {
    fn default() -> Self {
        ExitPolicy::ZReversion(ZReversion::default())
    }
}

impl ExitPolicy {
    pub fn rule(&self) -> &dyn ExitRule {
        match self {
            ExitPolicy::ZReversion(p) => p,
            ExitPolicy::PartialZReversion(p) => p,
            ExitPolicy::FixedTakeProfitStopLoss(p) => p,
            ExitPolicy::PartialStopLoss(p) => p,
            ExitPolicy::MultiLegTarget(p) => p,
        }
    }

    pub fn name(&self) -> &'static str {
        self.rule().name()
    }

    pub fn validate(&self, z_entry: f64) -> Result<(), ConfigError> {
        self.rule().validate(z_entry)
    }

    pub fn evaluate(&self, ctx: &ExitContext) -> ExitDecision {
        self.rule().evaluate(ctx)
    }
}

// ── Shared parameter checks ──

pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

pub(crate) fn require_fraction(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::FractionOutOfRange { name, value })
    }
}

#[cfg(test)]
pub(crate) fn ctx(zscore: f64, directional_z: f64, movement_pips: f64, cost: f64) -> ExitContext {
    ExitContext {
        zscore,
        directional_z,
        movement_pips,
        floating_pnl_pips: movement_pips - cost,
        partial_taken: false,
    }
}
