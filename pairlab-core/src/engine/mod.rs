//! Backtesting engine — bar-by-bar simulation of one hedged pair position.
//!
//! The engine consumes aligned bars, maintains the rolling indicators itself,
//! and runs the position state machine:
//!
//! FLAT → OPEN → (PARTIALLY_CLOSED) → CLOSED → FLAT
//!
//! At most one position is open at any time. Closed positions are appended to
//! the trade log in close order.

pub mod accounting;
pub mod loop_runner;
pub mod state;

pub use accounting::{Mark, PnlAccountant};
pub use loop_runner::{run_backtest, Simulation};
pub use state::{BarEquity, BarEvent, RunDiagnostics, RunResult};
