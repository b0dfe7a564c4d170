//! Per-bar events, run diagnostics and the run result.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{ExitFill, ExitReason, Position, Side, TradeLog};

/// A state transition produced while processing one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BarEvent {
    Entered { side: Side, zscore: f64 },
    PartialExit(ExitFill),
    Closed { reason: ExitReason, total_pnl_pips: f64 },
}

/// Mark-to-market equity at one bar, in pips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarEquity {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    /// Sum of closed trades so far.
    pub booked_pips: f64,
    /// Floating PnL of the open position, 0 when flat.
    pub floating_pips: f64,
}

impl BarEquity {
    pub fn equity_pips(&self) -> f64 {
        self.booked_pips + self.floating_pips
    }
}

/// Counters describing how much of the input was actually usable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub bars_total: usize,
    /// Bars with a non-finite price, skipped entirely.
    pub void_bars: usize,
    /// Bars before the rolling window filled.
    pub warmup_bars: usize,
    /// Bars where the spread had zero variance over the window.
    pub undefined_zscore_bars: usize,
    /// Bars where one leg was constant over the window.
    pub undefined_correlation_bars: usize,
    pub entries: usize,
    pub partial_exits: usize,
}

impl RunDiagnostics {
    pub fn void_bar_rate(&self) -> f64 {
        if self.bars_total > 0 {
            self.void_bars as f64 / self.bars_total as f64
        } else {
            0.0
        }
    }
}

/// Everything a completed run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: TradeLog,
    /// One point per input bar. Void bars carry the previous value forward.
    pub bar_equity: Vec<BarEquity>,
    /// A position still open when the data ran out. Never force-closed.
    pub open_position: Option<Position>,
    pub diagnostics: RunDiagnostics,
}

impl RunResult {
    pub fn empty() -> Self {
        Self {
            trades: TradeLog::new(),
            bar_equity: Vec::new(),
            open_position: None,
            diagnostics: RunDiagnostics::default(),
        }
    }

    /// Cumulative pip PnL after each closed trade.
    pub fn equity_curve(&self) -> Vec<f64> {
        self.trades.equity_curve()
    }

    pub fn total_pnl_pips(&self) -> f64 {
        self.trades.total_pnl_pips()
    }

    pub fn bar_equity_pips(&self) -> Vec<f64> {
        self.bar_equity.iter().map(BarEquity::equity_pips).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_rate_guards_empty_run() {
        assert_eq!(RunDiagnostics::default().void_bar_rate(), 0.0);
        let diag = RunDiagnostics {
            bars_total: 10,
            void_bars: 2,
            ..Default::default()
        };
        assert!((diag.void_bar_rate() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn empty_result_has_no_curve() {
        let result = RunResult::empty();
        assert!(result.equity_curve().is_empty());
        assert_eq!(result.total_pnl_pips(), 0.0);
        assert!(result.open_position.is_none());
    }

    #[test]
    fn events_are_tagged() {
        let json = serde_json::to_string(&BarEvent::Entered {
            side: Side::Short,
            zscore: 2.5,
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"entered","side":"SHORT","zscore":2.5}"#);
    }
}
