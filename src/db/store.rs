use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{AiTask, CreatePriceEvent, CreateStockSnapshot, MarketState, Stock};

/// Persistence operations the background jobs depend on.
///
/// Every `commit_*`/`save_*` call is atomic: either all rows are written or
/// none are. The price tick and the snapshot cycle run concurrently, so each
/// commit only writes the columns its job owns and derives extremes and
/// baselines from the row's current price.
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Active stocks ordered by ticker.
    async fn fetch_active_stocks(&self) -> Result<Vec<Stock>, AppError>;

    /// Reads the singleton market state, creating the closed/zeroed row if it
    /// does not exist yet.
    async fn get_or_create_market_state(&self) -> Result<MarketState, AppError>;

    /// Writes new prices plus their price events. `max_price`/`min_price`
    /// are widened to include the new price.
    async fn commit_price_tick(
        &self,
        stocks: &[Stock],
        events: &[CreatePriceEvent],
    ) -> Result<(), AppError>;

    /// Writes ranks, appends snapshots and saves the market state. With
    /// `reset_at` set, every given stock's reference price and extremes
    /// restart from its current price.
    async fn commit_snapshot_cycle(
        &self,
        stocks: &[Stock],
        snapshots: &[CreateStockSnapshot],
        market_state: &MarketState,
        reset_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;

    /// Keeps the `retention` newest snapshots per ticker and deletes the rest.
    /// Returns the number of deleted rows.
    async fn prune_snapshots(&self, retention: i64) -> Result<u64, AppError>;

    /// Tasks in `PENDING` or `PROCESSING`, oldest first.
    async fn fetch_open_ai_tasks(&self) -> Result<Vec<AiTask>, AppError>;

    async fn save_ai_tasks(&self, tasks: &[AiTask]) -> Result<(), AppError>;
}
