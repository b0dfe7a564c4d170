//! PairLab Runner — backtest orchestration, statistics and reporting overlays.
//!
//! This crate builds on `pairlab-core` to provide:
//! - TOML configuration with validation and run fingerprinting
//! - Single-backtest runner over pre-aligned bars
//! - Trade statistics (win rate, expectancy, drawdown, holding times, ...)
//! - Fixed-fractional sizing overlay in account currency
//! - In-trade excursion profile by entry hour and weekday

pub mod config;
pub mod excursion;
pub mod metrics;
pub mod runner;
pub mod sizing;

pub use config::{BacktestConfig, ConfigError, PairSpec, ReportConfig, RunId, SizingConfig};
pub use excursion::{ExcursionBucket, ExcursionProfile};
pub use metrics::TradeStatistics;
pub use runner::{run_backtest, BacktestResult, RunError, SCHEMA_VERSION};
pub use sizing::{SizedEquity, SizedTrade};
