//! Fixed take-profit / stop-loss in pips of spread movement.
//!
//! Closes 100% on the first bar where movement ≥ take-profit or
//! movement ≤ −stop-loss. Booked at the price basis: movement − cost.

use serde::{Deserialize, Serialize};

use crate::domain::ExitReason;
use crate::error::ConfigError;

use super::{require_positive, ExitContext, ExitDecision, ExitRule, PnlBasis};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedTakeProfitStopLoss {
    pub take_profit_pips: f64,
    pub stop_loss_pips: f64,
}

impl Default for FixedTakeProfitStopLoss {
    fn default() -> Self {
        Self {
            take_profit_pips: 20.0,
            stop_loss_pips: 30.0,
        }
    }
}

impl ExitRule for FixedTakeProfitStopLoss {
    fn name(&self) -> &'static str {
        "fixed_take_profit_stop_loss"
    }

    fn validate(&self, _z_entry: f64) -> Result<(), ConfigError> {
        require_positive("take_profit_pips", self.take_profit_pips)?;
        require_positive("stop_loss_pips", self.stop_loss_pips)
    }

    fn evaluate(&self, ctx: &ExitContext) -> ExitDecision {
        if ctx.movement_pips <= -self.stop_loss_pips {
            ExitDecision::close(PnlBasis::Price, ExitReason::StopLoss)
        } else if ctx.movement_pips >= self.take_profit_pips {
            ExitDecision::close(PnlBasis::Price, ExitReason::TakeProfit)
        } else {
            ExitDecision::hold()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::ctx;

    #[test]
    fn holds_inside_band() {
        let rule = FixedTakeProfitStopLoss::default();
        assert!(rule.evaluate(&ctx(1.0, 1.0, 19.9, 1.2)).is_hold());
        assert!(rule.evaluate(&ctx(1.0, 1.0, -29.9, 1.2)).is_hold());
    }

    #[test]
    fn take_profit_at_target() {
        let rule = FixedTakeProfitStopLoss::default();
        let d = rule.evaluate(&ctx(0.3, 0.3, 20.0, 1.2));
        assert_eq!(d.close.unwrap().reason, ExitReason::TakeProfit);
        assert_eq!(d.close.unwrap().basis, PnlBasis::Price);
    }

    #[test]
    fn stop_loss_at_stop() {
        let rule = FixedTakeProfitStopLoss::default();
        let d = rule.evaluate(&ctx(2.9, 2.9, -30.0, 1.2));
        assert_eq!(d.close.unwrap().reason, ExitReason::StopLoss);
    }

    #[test]
    fn ignores_zscore() {
        // z fully reverted but the price band is not touched
        let rule = FixedTakeProfitStopLoss::default();
        assert!(rule.evaluate(&ctx(0.0, 0.0, 5.0, 1.2)).is_hold());
    }

    #[test]
    fn both_distances_required() {
        let rule = FixedTakeProfitStopLoss {
            take_profit_pips: 20.0,
            stop_loss_pips: -5.0,
        };
        assert!(matches!(
            rule.validate(2.0),
            Err(ConfigError::NonPositive {
                name: "stop_loss_pips",
                ..
            })
        ));
    }
}
