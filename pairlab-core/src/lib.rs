//! PairLab Core — engine, domain types and exit policies for pairs-trading
//! backtests.
//!
//! This crate contains the heart of the backtesting engine:
//! - Domain types (bars, positions, closed trades, trade log)
//! - Rolling spread z-score and correlation over a bounded trailing window
//! - Entry signal classification
//! - Exit policies as a tagged variant selected by configuration
//! - Bar-by-bar simulation with PnL and worst-excursion accounting

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod exit;
pub mod indicators;
pub mod signal;

pub use config::EngineConfig;
pub use domain::{Bar, ClosedTrade, ExitFill, ExitReason, Position, Side, TradeLog};
pub use engine::{run_backtest, RunResult, Simulation};
pub use error::{ConfigError, EngineError};
pub use exit::ExitPolicy;
pub use indicators::IndicatorSnapshot;
pub use signal::{scan_signals, Signal};
