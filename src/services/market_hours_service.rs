//! Open/after-hours cycle of the simulated market.
//!
//! Each snapshot cycle advances the singleton [`MarketState`] by one step.
//! While open, cycles count towards the end of the market day; once
//! `snapshots_per_market_day` is reached the market closes for
//! `after_hours_snapshots` cycles and then reopens. Every opening starts a
//! new market day, which resets each stock's reference baseline.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::MarketConfig;
use crate::models::MarketState;

/// What happened to the market during one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketTransition {
    pub closed: bool,
    pub opened: bool,
}

impl MarketTransition {
    /// Reference prices restart whenever the market opens.
    pub fn resets_reference(&self) -> bool {
        self.opened
    }
}

pub fn advance(state: &mut MarketState, config: &MarketConfig, now: DateTime<Utc>) -> MarketTransition {
    let mut transition = MarketTransition::default();
    state.updated_at = now;

    if state.is_pristine() {
        state.is_open = true;
        transition.opened = true;
        info!("Initial market opened, reference prices set");
    }

    if state.is_open {
        state.snapshot_count += 1;

        if state.snapshot_count >= config.snapshots_per_market_day {
            state.market_day_count += 1;
            state.snapshot_count = 0;
            state.is_open = false;
            state.after_hours_snapshot_count = 0;
            transition.closed = true;
            info!("Market day {} completed, entering after-hours", state.market_day_count);

            if config.after_hours_snapshots == 0 {
                state.is_open = true;
                transition.opened = true;
                info!(
                    "Market day {} opened immediately, reference prices set",
                    state.market_day_count + 1
                );
            }
        }
    } else {
        state.after_hours_snapshot_count += 1;

        if state.after_hours_snapshot_count >= config.after_hours_snapshots {
            state.is_open = true;
            state.after_hours_snapshot_count = 0;
            transition.opened = true;
            info!(
                "After-hours complete, market day {} opened, reference prices set",
                state.market_day_count + 1
            );
        }
    }

    transition
}
