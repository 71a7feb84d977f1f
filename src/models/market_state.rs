use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Primary key of the single market state row.
pub const MARKET_STATE_ID: i32 = 1;

/// Open/after-hours cycle of the simulated exchange.
///
/// Exactly one row exists; it is created lazily by the store on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MarketState {
    pub id: i32,
    pub is_open: bool,
    pub market_day_count: i32,
    pub snapshot_count: i32,
    pub after_hours_snapshot_count: i32,
    pub updated_at: DateTime<Utc>,
}

impl MarketState {
    /// Closed market with all counters at zero.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            id: MARKET_STATE_ID,
            is_open: false,
            market_day_count: 0,
            snapshot_count: 0,
            after_hours_snapshot_count: 0,
            updated_at: now,
        }
    }

    /// True before the very first market day has ever been opened.
    pub fn is_pristine(&self) -> bool {
        self.market_day_count == 0 && self.snapshot_count == 0 && !self.is_open
    }
}
