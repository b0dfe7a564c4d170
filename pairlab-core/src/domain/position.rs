//! Position — the single open hedged position and its per-trade accumulators.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::bar::Bar;
use super::trade::{ClosedTrade, ExitFill, ExitReason};

/// Which leg is bought and which is sold.
///
/// `Long` buys A and sells B, profiting when the spread rises (entered when the
/// z-score is stretched below zero). `Short` sells A and buys B, profiting when
/// the spread falls (entered when the z-score is stretched above zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, −1 for short: multiplies a spread change into pips gained.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    /// Sign of the z-score at entry: −1 for long, +1 for short.
    pub fn entry_z_sign(self) -> f64 {
        -self.sign()
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// An open position. At most one exists at any time, owned by the engine.
///
/// Entry fields are private and fixed at creation. The accumulators
/// (`realized_pnl_pips`, `worst_floating_pnl_pips`, `partial_taken`, fills)
/// start fresh with every new position, so nothing leaks between trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    side: Side,
    entry_bar: usize,
    entry_timestamp: NaiveDateTime,
    entry_price_a: f64,
    entry_price_b: f64,
    entry_zscore: f64,
    remaining_size: f64,
    realized_pnl_pips: f64,
    worst_floating_pnl_pips: f64,
    best_floating_pnl_pips: f64,
    partial_taken: bool,
    bars_held: usize,
    fills: Vec<ExitFill>,
}

impl Position {
    /// Open a full-size position at the bar's prices.
    ///
    /// `entry_mark` is the floating PnL on the entry bar itself (zero movement,
    /// so only the round-trip cost) and seeds both excursion extremes.
    pub fn open(
        side: Side,
        bar_index: usize,
        bar: &Bar,
        entry_zscore: f64,
        entry_mark: f64,
    ) -> Self {
        Self {
            side,
            entry_bar: bar_index,
            entry_timestamp: bar.timestamp,
            entry_price_a: bar.price_a,
            entry_price_b: bar.price_b,
            entry_zscore,
            remaining_size: 1.0,
            realized_pnl_pips: 0.0,
            worst_floating_pnl_pips: entry_mark,
            best_floating_pnl_pips: entry_mark,
            partial_taken: false,
            bars_held: 0,
            fills: Vec::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn entry_bar(&self) -> usize {
        self.entry_bar
    }

    pub fn entry_timestamp(&self) -> NaiveDateTime {
        self.entry_timestamp
    }

    pub fn entry_price_a(&self) -> f64 {
        self.entry_price_a
    }

    pub fn entry_price_b(&self) -> f64 {
        self.entry_price_b
    }

    pub fn entry_zscore(&self) -> f64 {
        self.entry_zscore
    }

    /// Fraction of the original size still open, in (0, 1].
    pub fn remaining_size(&self) -> f64 {
        self.remaining_size
    }

    /// PnL already booked by partial exits.
    pub fn realized_pnl_pips(&self) -> f64 {
        self.realized_pnl_pips
    }

    /// Most adverse floating PnL seen since entry. Never increases.
    pub fn worst_floating_pnl_pips(&self) -> f64 {
        self.worst_floating_pnl_pips
    }

    /// Most favourable floating PnL seen since entry. Never decreases.
    pub fn best_floating_pnl_pips(&self) -> f64 {
        self.best_floating_pnl_pips
    }

    pub fn partial_taken(&self) -> bool {
        self.partial_taken
    }

    pub fn bars_held(&self) -> usize {
        self.bars_held
    }

    pub fn fills(&self) -> &[ExitFill] {
        &self.fills
    }

    /// Z-score seen from the entry side: positive while the spread is still
    /// stretched the way it was at entry, negative once it crossed zero.
    pub fn directional_z(&self, zscore: f64) -> f64 {
        zscore * self.side.entry_z_sign()
    }

    /// Advance the holding counter by one bar.
    pub fn tick_bar(&mut self) {
        self.bars_held += 1;
    }

    /// Record this bar's floating PnL into the excursion extremes.
    pub fn record_mark(&mut self, floating_pnl_pips: f64) {
        self.worst_floating_pnl_pips = self.worst_floating_pnl_pips.min(floating_pnl_pips);
        self.best_floating_pnl_pips = self.best_floating_pnl_pips.max(floating_pnl_pips);
    }

    /// Book a partial exit. The fill's fraction must leave some size open.
    pub fn book_partial(&mut self, fill: ExitFill) {
        debug_assert!(
            fill.fraction > 0.0 && fill.fraction < self.remaining_size,
            "partial fraction {} must be inside (0, {})",
            fill.fraction,
            self.remaining_size
        );
        self.remaining_size -= fill.fraction;
        self.realized_pnl_pips += fill.pnl_pips;
        self.partial_taken = true;
        self.fills.push(fill);
    }

    /// Book the final exit on all remaining size and turn the position into a
    /// closed trade.
    pub fn close(mut self, fill: ExitFill, bar: &Bar, reason: ExitReason) -> ClosedTrade {
        debug_assert!(
            (fill.fraction - self.remaining_size).abs() < 1e-12,
            "final fill must cover the remaining size"
        );
        self.realized_pnl_pips += fill.pnl_pips;
        self.remaining_size = 0.0;
        let exit_bar = fill.bar_index;
        let exit_zscore = fill.zscore;
        self.fills.push(fill);

        let holding = bar.timestamp - self.entry_timestamp;
        ClosedTrade {
            side: self.side,
            entry_bar: self.entry_bar,
            exit_bar,
            entry_timestamp: self.entry_timestamp,
            exit_timestamp: bar.timestamp,
            entry_price_a: self.entry_price_a,
            entry_price_b: self.entry_price_b,
            exit_price_a: bar.price_a,
            exit_price_b: bar.price_b,
            entry_zscore: self.entry_zscore,
            exit_zscore,
            total_pnl_pips: self.realized_pnl_pips,
            bars_held: self.bars_held,
            holding_secs: holding.num_seconds(),
            worst_floating_pnl_pips: self.worst_floating_pnl_pips,
            best_floating_pnl_pips: self.best_floating_pnl_pips,
            exit_reason: reason,
            fills: self.fills,
        }
    }
}
