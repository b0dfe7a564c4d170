//! Trade statistics — pure functions over the closed-trade log.
//!
//! Every metric is a pure function: trade list and/or equity curve in, scalar out.
//! No dependencies on the runner or the engine loop.

use std::collections::BTreeMap;

use pairlab_core::domain::{ClosedTrade, ExitReason};
use serde::{Deserialize, Serialize};

/// Trading periods per year used to annualize the per-trade Sharpe-like ratio.
const ANNUALIZATION: f64 = 252.0;

/// Cap for profit factor when there are no losing trades.
const PROFIT_FACTOR_CAP: f64 = 100.0;

/// Aggregate statistics for a single backtest run, all in pips unless noted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeStatistics {
    pub trade_count: usize,
    pub total_pnl: f64,
    /// Largest peak-to-trough fall of the cumulative trade PnL (≥ 0).
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub median_pnl: f64,
    pub best: f64,
    pub worst: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub expectancy: f64,
    pub quick_expectancy: f64,
    pub sharpe: f64,
    pub profit_factor: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_holding_hours: f64,
    pub median_holding_hours: f64,
    pub min_holding_hours: f64,
    pub max_holding_hours: f64,
    /// Most adverse in-trade floating PnL over all trades (≤ 0 once any trade exists).
    pub worst_excursion: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
    /// Largest peak-to-trough fall of the per-bar mark-to-market curve (≥ 0).
    pub bar_equity_max_drawdown: f64,
}

impl TradeStatistics {
    /// Compute all statistics from the trade log and the per-bar equity curve.
    pub fn compute(trades: &[ClosedTrade], bar_equity: &[f64]) -> Self {
        let pnls: Vec<f64> = trades.iter().map(|t| t.total_pnl_pips).collect();
        let hours: Vec<f64> = trades.iter().map(|t| t.holding_hours()).collect();
        let wins: Vec<f64> = pnls.iter().copied().filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = pnls.iter().copied().filter(|&p| p <= 0.0).collect();

        let rate = win_rate(&pnls);
        let avg_pnl = mean_f64(&pnls);
        let avg_win = mean_f64(&wins);
        let avg_loss = mean_f64(&losses);

        Self {
            trade_count: trades.len(),
            total_pnl: pnls.iter().sum(),
            max_drawdown: max_drawdown(&equity_curve(&pnls)),
            win_rate: rate,
            avg_pnl,
            median_pnl: median(&pnls),
            best: max_or_zero(&pnls),
            worst: min_or_zero(&pnls),
            avg_win,
            avg_loss,
            expectancy: expectancy(rate, avg_win, avg_loss),
            quick_expectancy: quick_expectancy(rate, avg_pnl),
            sharpe: sharpe_ratio(&pnls),
            profit_factor: profit_factor(&pnls),
            max_consecutive_wins: max_consecutive(&pnls, true),
            max_consecutive_losses: max_consecutive(&pnls, false),
            avg_holding_hours: mean_f64(&hours),
            median_holding_hours: median(&hours),
            min_holding_hours: min_or_zero(&hours),
            max_holding_hours: max_or_zero(&hours),
            worst_excursion: min_or_zero(
                &trades
                    .iter()
                    .map(|t| t.worst_floating_pnl_pips)
                    .collect::<Vec<_>>(),
            ),
            exit_reasons: exit_reason_counts(trades),
            bar_equity_max_drawdown: max_drawdown(bar_equity),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Cumulative PnL after each trade.
pub fn equity_curve(pnls: &[f64]) -> Vec<f64> {
    pnls.iter()
        .scan(0.0, |acc, p| {
            *acc += p;
            Some(*acc)
        })
        .collect()
}

/// Maximum drawdown in absolute units: the largest fall from a running peak.
///
/// The running peak starts at the first point of the curve. Returns 0.0 for
/// empty, single-point or never-falling curves.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        max_dd = max_dd.max(peak - eq);
    }
    max_dd
}

/// Fraction of trades with strictly positive PnL.
pub fn win_rate(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    pnls.iter().filter(|&&p| p > 0.0).count() as f64 / pnls.len() as f64
}

/// win_rate × avg_win − (1 − win_rate) × |avg_loss|.
pub fn expectancy(win_rate: f64, avg_win: f64, avg_loss: f64) -> f64 {
    win_rate * avg_win - (1.0 - win_rate) * avg_loss.abs()
}

/// Shortcut form built from the overall average: avg × wr − (1 − wr) × |avg|.
pub fn quick_expectancy(win_rate: f64, avg_pnl: f64) -> f64 {
    avg_pnl * win_rate - (1.0 - win_rate) * avg_pnl.abs()
}

/// Per-trade Sharpe-like ratio: mean / sample std × √252.
///
/// Returns 0.0 with fewer than 2 trades or zero dispersion.
pub fn sharpe_ratio(pnls: &[f64]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }
    let std = std_dev(pnls);
    if std < 1e-15 {
        return 0.0;
    }
    mean_f64(pnls) / std * ANNUALIZATION.sqrt()
}

/// Profit factor: gross profits / gross losses.
///
/// Capped at 100.0 for edge cases (all winners, zero losses).
pub fn profit_factor(pnls: &[f64]) -> f64 {
    if pnls.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = pnls.iter().filter(|&&p| p > 0.0).sum();
    let gross_loss: f64 = pnls.iter().filter(|&&p| p < 0.0).map(|p| p.abs()).sum();

    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { PROFIT_FACTOR_CAP } else { 0.0 };
    }
    (gross_profit / gross_loss).min(PROFIT_FACTOR_CAP)
}

/// Longest run of winners (`winners = true`) or non-winners.
pub fn max_consecutive(pnls: &[f64], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for &pnl in pnls {
        if (pnl > 0.0) == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

pub fn exit_reason_counts(trades: &[ClosedTrade]) -> BTreeMap<ExitReason, usize> {
    let mut counts = BTreeMap::new();
    for trade in trades {
        *counts.entry(trade.exit_reason).or_insert(0) += 1;
    }
    counts
}

// ─── Helpers ────────────────────────────────────────────────────────

pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Middle value; mean of the two middle values for an even count.
pub(crate) fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub(crate) fn min_or_zero(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

pub(crate) fn max_or_zero(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}
