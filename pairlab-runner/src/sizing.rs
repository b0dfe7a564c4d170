//! Fixed-fractional sizing overlay — replays the pip trade log in account currency.
//!
//! Each trade risks `risk_fraction` of the equity held when it opens, sized
//! against a notional stop of `stop_distance_pips`:
//! `lot = equity × r / (stop × pip_value)`. Trades are compounded in close order.

use pairlab_core::domain::ClosedTrade;
use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;

/// One trade expressed in currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedTrade {
    pub lot: f64,
    pub pnl_ccy: f64,
    pub equity_before: f64,
    pub equity_after: f64,
    /// Lowest equity reached while the trade was open.
    pub floating_floor: f64,
}

impl SizedTrade {
    /// Depth of the in-trade floating drawdown below the opening equity (≥ 0).
    pub fn floating_drawdown(&self) -> f64 {
        (self.equity_before - self.floating_floor).max(0.0)
    }
}

/// Currency equity path of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizedEquity {
    pub starting_equity: f64,
    pub final_equity: f64,
    pub trades: Vec<SizedTrade>,
    /// Deepest in-trade floating drawdown in currency (≥ 0).
    pub max_floating_drawdown: f64,
}

impl SizedEquity {
    pub fn compute(trades: &[ClosedTrade], sizing: &SizingConfig) -> Self {
        let risk_per_lot = sizing.stop_distance_pips * sizing.pip_value;
        let mut equity = sizing.starting_equity;
        let mut sized = Vec::with_capacity(trades.len());

        for trade in trades {
            // A blown account trades nothing further.
            let lot = if risk_per_lot > 0.0 {
                equity.max(0.0) * sizing.risk_fraction / risk_per_lot
            } else {
                0.0
            };
            let pnl_ccy = trade.total_pnl_pips * sizing.pip_value * lot;
            let floating_floor = equity + trade.worst_floating_pnl_pips * sizing.pip_value * lot;
            let equity_before = equity;
            equity += pnl_ccy;
            sized.push(SizedTrade {
                lot,
                pnl_ccy,
                equity_before,
                equity_after: equity,
                floating_floor,
            });
        }

        let max_floating_drawdown = sized
            .iter()
            .map(SizedTrade::floating_drawdown)
            .fold(0.0, f64::max);

        Self {
            starting_equity: sizing.starting_equity,
            final_equity: equity,
            trades: sized,
            max_floating_drawdown,
        }
    }

    /// Equity after each trade, starting point excluded.
    pub fn equity_curve(&self) -> Vec<f64> {
        self.trades.iter().map(|t| t.equity_after).collect()
    }

    pub fn total_return(&self) -> f64 {
        if self.starting_equity <= 0.0 {
            return 0.0;
        }
        (self.final_equity - self.starting_equity) / self.starting_equity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pairlab_core::domain::{ExitFill, ExitReason, Side};

    fn make_trade(pnl: f64, worst: f64) -> ClosedTrade {
        let entry = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 0, 0)
            .unwrap();
        let exit = entry + chrono::Duration::hours(5);
        ClosedTrade {
            side: Side::Long,
            entry_bar: 0,
            entry_timestamp: entry,
            entry_price_a: 1.0950,
            entry_price_b: 1.2700,
            entry_zscore: -2.2,
            exit_bar: 5,
            exit_timestamp: exit,
            exit_price_a: 1.0960,
            exit_price_b: 1.2700,
            exit_zscore: -0.05,
            exit_reason: ExitReason::ZReversion,
            total_pnl_pips: pnl,
            bars_held: 5,
            holding_secs: 5 * 3600,
            worst_floating_pnl_pips: worst,
            best_floating_pnl_pips: pnl.max(0.0),
            fills: vec![ExitFill {
                bar_index: 5,
                timestamp: exit,
                zscore: -0.05,
                fraction: 1.0,
                pnl_pips: pnl,
            }],
        }
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn compounds_one_percent_risk() {
        let sizing = SizingConfig::default();
        let trades = vec![make_trade(30.0, -6.0), make_trade(-30.0, -31.2)];
        let sized = SizedEquity::compute(&trades, &sizing);

        // 1000 × 0.01 / (30 × 10) lots, so a 30-pip win is worth 1% of equity
        let first = &sized.trades[0];
        approx(first.lot, 1.0 / 30.0);
        approx(first.pnl_ccy, 10.0);
        approx(first.equity_after, 1010.0);
        approx(first.floating_floor, 1000.0 - 2.0);

        let second = &sized.trades[1];
        approx(second.lot, 1010.0 * 0.01 / 300.0);
        approx(second.pnl_ccy, -10.1);
        approx(sized.final_equity, 999.9);
        approx(second.floating_floor, 1010.0 - 31.2 * 10.0 * 1010.0 * 0.01 / 300.0);

        approx(sized.max_floating_drawdown, 31.2 * 10.0 * 1010.0 * 0.01 / 300.0);
        assert_eq!(sized.equity_curve().len(), 2);
        approx(sized.total_return(), -0.0001);
    }

    #[test]
    fn empty_log_keeps_starting_equity() {
        let sized = SizedEquity::compute(&[], &SizingConfig::default());
        assert_eq!(sized.final_equity, 1000.0);
        assert_eq!(sized.max_floating_drawdown, 0.0);
        assert!(sized.equity_curve().is_empty());
        assert_eq!(sized.total_return(), 0.0);
    }

    #[test]
    fn blown_account_stops_sizing() {
        let sizing = SizingConfig {
            starting_equity: 100.0,
            risk_fraction: 0.5,
            stop_distance_pips: 1.0,
            pip_value: 10.0,
        };
        // lot 5 → −25 pips costs 1250, equity goes negative
        let trades = vec![make_trade(-25.0, -25.0), make_trade(40.0, -1.0)];
        let sized = SizedEquity::compute(&trades, &sizing);
        assert!(sized.trades[0].equity_after < 0.0);
        assert_eq!(sized.trades[1].lot, 0.0);
        assert_eq!(sized.trades[1].pnl_ccy, 0.0);
    }
}
