//! Backtest runner — wires together configuration, engine, and metrics.
//!
//! Bars arrive pre-aligned from the caller; the runner never reads price data.
//! `run_backtest()` validates the config, replays the bars through the engine,
//! then derives statistics, the optional currency overlay and the excursion profile.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use pairlab_core::domain::{Bar, ClosedTrade, Position};
use pairlab_core::engine::{BarEquity, RunDiagnostics};
use pairlab_core::signal::{scan_signals, SignalMark};
use pairlab_core::EngineError;

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::excursion::ExcursionProfile;
use crate::metrics::TradeStatistics;
use crate::sizing::SizedEquity;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub pair: String,
    pub exit_policy: String,
    pub start: Option<chrono::NaiveDateTime>,
    pub end: Option<chrono::NaiveDateTime>,
    pub bar_count: usize,
    pub statistics: TradeStatistics,
    pub trades: Vec<ClosedTrade>,
    /// Cumulative pip PnL after each closed trade.
    pub equity_curve: Vec<f64>,
    pub bar_equity: Vec<BarEquity>,
    /// Present when the config carries a `[sizing]` section.
    pub sized_equity: Option<SizedEquity>,
    pub excursion_profile: ExcursionProfile,
    /// Still open after the last bar; not counted in the statistics.
    pub open_position: Option<Position>,
    pub diagnostics: RunDiagnostics,
    /// Per-bar signal table, when `report.include_signals` is set.
    #[serde(default)]
    pub signals: Option<Vec<SignalMark>>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Run a single backtest over pre-aligned bars — no I/O.
pub fn run_backtest(bars: &[Bar], config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;

    let result = pairlab_core::engine::run_backtest(bars, &config.strategy)?;

    let bar_equity_pips = result.bar_equity_pips();
    let equity_curve = result.equity_curve();
    let trades = result.trades.into_vec();

    let statistics = TradeStatistics::compute(&trades, &bar_equity_pips);
    let sized_equity = config
        .sizing
        .as_ref()
        .map(|sizing| SizedEquity::compute(&trades, sizing));
    let excursion_profile = ExcursionProfile::compute(&trades);
    let signals = if config.report.include_signals {
        Some(
            scan_signals(bars, &config.strategy, config.report.exit_zone)
                .map_err(ConfigError::from)?,
        )
    } else {
        None
    };

    info!(
        run_id = %run_id,
        pair = %config.backtest.label(),
        trades = statistics.trade_count,
        total_pnl_pips = statistics.total_pnl,
        win_rate = statistics.win_rate,
        max_drawdown_pips = statistics.max_drawdown,
        final_equity = sized_equity.as_ref().map(|s| s.final_equity),
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        pair: config.backtest.label(),
        exit_policy: config.strategy.exit_policy.name().to_string(),
        start: bars.first().map(|b| b.timestamp),
        end: bars.last().map(|b| b.timestamp),
        bar_count: bars.len(),
        statistics,
        trades,
        equity_curve,
        bar_equity: result.bar_equity,
        sized_equity,
        excursion_profile,
        open_position: result.open_position,
        diagnostics: result.diagnostics,
        signals,
    })
}
