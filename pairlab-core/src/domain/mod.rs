//! Domain types for PairLab

pub mod bar;
pub mod position;
pub mod trade;

pub use bar::{first_unordered, Bar};
pub use position::{Position, Side};
pub use trade::{ClosedTrade, ExitFill, ExitReason, TradeLog};
