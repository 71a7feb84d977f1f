use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{error, warn};

use crate::db::query_stats::timed;
use crate::db::store::MarketStore;
use crate::db::{ai_task_queries, market_state_queries, stock_queries};
use crate::errors::AppError;
use crate::models::{AiTask, CreatePriceEvent, CreateStockSnapshot, MarketState, Stock};

/// PostgreSQL-backed store. Each commit runs in its own transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn fetch_active_stocks(&self) -> Result<Vec<Stock>, AppError> {
        Ok(timed(stock_queries::fetch_active(&self.pool)).await?)
    }

    async fn get_or_create_market_state(&self) -> Result<MarketState, AppError> {
        if let Some(state) = timed(market_state_queries::fetch(&self.pool)).await? {
            return Ok(state);
        }

        let initial = MarketState::initial(Utc::now());
        timed(market_state_queries::insert_initial(&self.pool, &initial)).await?;

        timed(market_state_queries::fetch(&self.pool))
            .await?
            .ok_or_else(|| AppError::StateInvariant("market state row missing after insert".to_string()))
    }

    async fn commit_price_tick(
        &self,
        stocks: &[Stock],
        events: &[CreatePriceEvent],
    ) -> Result<(), AppError> {
        let mut tx = timed(self.pool.begin()).await?;

        timed(stock_queries::update_prices(&mut *tx, stocks)).await?;
        timed(stock_queries::insert_price_events(&mut *tx, events)).await?;

        timed(tx.commit()).await.map_err(|e| {
            error!("Failed to commit price tick for {} stocks: {}", stocks.len(), e);
            e
        })?;
        Ok(())
    }

    async fn commit_snapshot_cycle(
        &self,
        stocks: &[Stock],
        snapshots: &[CreateStockSnapshot],
        market_state: &MarketState,
        reset_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        let mut tx = timed(self.pool.begin()).await?;

        timed(stock_queries::update_rankings(&mut *tx, stocks)).await?;
        if let Some(at) = reset_at {
            let tickers: Vec<String> = stocks.iter().map(|s| s.ticker.clone()).collect();
            timed(stock_queries::reset_reference(&mut *tx, &tickers, at)).await?;
        }
        timed(stock_queries::insert_snapshots(&mut *tx, snapshots)).await?;
        timed(market_state_queries::update(&mut *tx, market_state)).await?;

        timed(tx.commit()).await.map_err(|e| {
            error!("Failed to commit snapshot cycle: {}", e);
            e
        })?;
        Ok(())
    }

    async fn prune_snapshots(&self, retention: i64) -> Result<u64, AppError> {
        Ok(timed(stock_queries::delete_snapshots_beyond_retention(&self.pool, retention)).await?)
    }

    async fn fetch_open_ai_tasks(&self) -> Result<Vec<AiTask>, AppError> {
        Ok(timed(ai_task_queries::fetch_open(&self.pool)).await?)
    }

    async fn save_ai_tasks(&self, tasks: &[AiTask]) -> Result<(), AppError> {
        if tasks.is_empty() {
            return Ok(());
        }

        let mut tx = timed(self.pool.begin()).await?;

        for task in tasks {
            if !timed(ai_task_queries::update(&mut *tx, task)).await? {
                warn!("AI task {} disappeared before its update was saved", task.id);
            }
        }

        timed(tx.commit()).await?;
        Ok(())
    }
}
