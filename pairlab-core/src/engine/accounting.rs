//! PnL and excursion accounting for the open position.
//!
//! Two bases convert a move into pips:
//! - price: each leg's move divided by `pip_size`, signed by side, summed
//! - z-score: (|entry z| − directional z) × `pip_scale`
//!
//! Every booking of fraction f pays f × round-trip cost, so a position booked
//! in pieces pays the full cost exactly once.

use crate::config::EngineConfig;
use crate::domain::{Bar, Position};
use crate::exit::PnlBasis;

/// Floating state of the open position on one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mark {
    pub leg_a_pips: f64,
    pub leg_b_pips: f64,
    /// `leg_a_pips + leg_b_pips`, before cost.
    pub movement_pips: f64,
    /// Realized partials + remaining × (movement − cost).
    pub floating_pnl_pips: f64,
}

/// Converts prices and z-scores into pips for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlAccountant {
    pip_size: f64,
    pip_scale: f64,
    round_trip_cost_pips: f64,
}

impl PnlAccountant {
    pub fn new(pip_size: f64, pip_scale: f64, round_trip_cost_pips: f64) -> Self {
        Self {
            pip_size,
            pip_scale,
            round_trip_cost_pips,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.pip_size, config.pip_scale, config.round_trip_cost_pips)
    }

    pub fn round_trip_cost_pips(&self) -> f64 {
        self.round_trip_cost_pips
    }

    /// Per-leg pips gained since entry. Long holds A long and B short.
    pub fn leg_pips(&self, position: &Position, bar: &Bar) -> (f64, f64) {
        let sign = position.side().sign();
        let leg_a = sign * (bar.price_a - position.entry_price_a()) / self.pip_size;
        let leg_b = -sign * (bar.price_b - position.entry_price_b()) / self.pip_size;
        (leg_a, leg_b)
    }

    /// Mark the position at this bar's prices.
    pub fn mark(&self, position: &Position, bar: &Bar) -> Mark {
        let (leg_a_pips, leg_b_pips) = self.leg_pips(position, bar);
        let movement_pips = leg_a_pips + leg_b_pips;
        let floating_pnl_pips = position.realized_pnl_pips()
            + position.remaining_size() * (movement_pips - self.round_trip_cost_pips);
        Mark {
            leg_a_pips,
            leg_b_pips,
            movement_pips,
            floating_pnl_pips,
        }
    }

    /// Floating PnL of a freshly opened position: no movement, full cost.
    pub fn entry_mark(&self) -> f64 {
        -self.round_trip_cost_pips
    }

    /// Gross pips on the z basis for a full-size position.
    pub fn z_pips(&self, entry_zscore: f64, directional_z: f64) -> f64 {
        (entry_zscore.abs() - directional_z) * self.pip_scale
    }

    /// Net pips booked by closing `fraction` of the original size.
    pub fn booking(&self, fraction: f64, gross_pips: f64) -> f64 {
        fraction * (gross_pips - self.round_trip_cost_pips)
    }

    /// Net pips for a booking on the given basis.
    pub fn book(
        &self,
        basis: PnlBasis,
        fraction: f64,
        position: &Position,
        mark: &Mark,
        zscore: f64,
    ) -> f64 {
        let gross = match basis {
            PnlBasis::ZScore => {
                self.z_pips(position.entry_zscore(), position.directional_z(zscore))
            }
            PnlBasis::Price => mark.movement_pips,
        };
        self.booking(fraction, gross)
    }
}
