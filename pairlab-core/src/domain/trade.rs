//! ClosedTrade — a completed round trip — and the append-only trade log.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::position::Side;

/// Why a position was fully closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// The z-score reverted to the mean in one step.
    ZReversion,
    /// A partial was booked earlier, the rest closed on reversion.
    PartialThenReversion,
    StopLoss,
    TakeProfit,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::ZReversion => "Z_REVERSION",
            ExitReason::PartialThenReversion => "PARTIAL_THEN_REVERSION",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TakeProfit => "TAKE_PROFIT",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One booking of a fraction of the original position size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitFill {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub zscore: f64,
    /// Fraction of the original size closed by this fill.
    pub fraction: f64,
    /// Net PnL of this fill, cost share included.
    pub pnl_pips: f64,
}

/// A fully closed position. Created once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub side: Side,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_timestamp: NaiveDateTime,
    pub entry_price_a: f64,
    pub entry_price_b: f64,
    pub entry_zscore: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_timestamp: NaiveDateTime,
    pub exit_price_a: f64,
    pub exit_price_b: f64,
    pub exit_zscore: f64,
    pub exit_reason: ExitReason,

    // ── PnL ──
    /// Sum of every partial and final booking.
    pub total_pnl_pips: f64,

    // ── Duration ──
    pub bars_held: usize,
    pub holding_secs: i64,

    // ── Excursion ──
    /// Most adverse floating PnL endured while open (in-trade drawdown).
    pub worst_floating_pnl_pips: f64,
    /// Most favourable floating PnL seen while open.
    pub best_floating_pnl_pips: f64,

    pub fills: Vec<ExitFill>,
}

impl ClosedTrade {
    pub fn holding_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.holding_secs)
    }

    pub fn holding_hours(&self) -> f64 {
        self.holding_secs as f64 / 3600.0
    }

    pub fn is_winner(&self) -> bool {
        self.total_pnl_pips > 0.0
    }

    /// Sum of the fill fractions. Exactly one full size per closed trade.
    pub fn booked_fraction(&self) -> f64 {
        self.fills.iter().map(|f| f.fraction).sum()
    }

    pub fn partial_count(&self) -> usize {
        self.fills.len().saturating_sub(1)
    }
}

/// Append-only sequence of closed trades in close order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeLog {
    trades: Vec<ClosedTrade>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trade: ClosedTrade) {
        debug_assert!(
            self.trades
                .last()
                .map_or(true, |prev| prev.exit_timestamp <= trade.entry_timestamp),
            "trades must close in time order"
        );
        self.trades.push(trade);
    }

    pub fn as_slice(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ClosedTrade> {
        self.trades.iter()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn total_pnl_pips(&self) -> f64 {
        self.trades.iter().map(|t| t.total_pnl_pips).sum()
    }

    /// Cumulative pip PnL after each trade.
    pub fn equity_curve(&self) -> Vec<f64> {
        self.trades
            .iter()
            .scan(0.0, |acc, t| {
                *acc += t.total_pnl_pips;
                Some(*acc)
            })
            .collect()
    }

    pub fn into_vec(self) -> Vec<ClosedTrade> {
        self.trades
    }
}

impl<'a> IntoIterator for &'a TradeLog {
    type Item = &'a ClosedTrade;
    type IntoIter = std::slice::Iter<'a, ClosedTrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}
