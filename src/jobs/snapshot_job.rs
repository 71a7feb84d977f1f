//! Periodic snapshot, ranking and market-hours cycle.
//!
//! Per invocation:
//! 1. Load active stocks and the market state; keep copies for event detection
//! 2. Recompute `rank`/`change_rank`
//! 3. Advance the market-hours state machine, resetting reference prices on open
//! 4. Commit snapshots, stock rows and market state in one transaction
//! 5. Broadcast the stock list, then per-stock events, then market-day events
//! 6. Prune snapshots beyond the retention window

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::models::{CreateStockSnapshot, Stock};
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::{market_hours_service, ranking_service};

pub async fn run_price_snapshot(ctx: JobContext) -> Result<JobResult, AppError> {
    let mut stocks = ctx.store.fetch_active_stocks().await?;
    if stocks.is_empty() {
        return Ok(JobResult { items_processed: 0, items_failed: 0 });
    }

    let mut state = ctx.store.get_or_create_market_state().await?;
    let previous_stocks: HashMap<String, Stock> =
        stocks.iter().map(|s| (s.ticker.clone(), s.clone())).collect();
    let previous_state = state.clone();

    ranking_service::update_rankings(&mut stocks);

    let now = Utc::now();
    let transition = market_hours_service::advance(&mut state, &ctx.market, now);
    let reset_at = transition.resets_reference().then_some(now);
    if let Some(at) = reset_at {
        for stock in stocks.iter_mut() {
            stock.reset_reference(at);
        }
    }

    let snapshots: Vec<CreateStockSnapshot> = stocks
        .iter()
        .map(|s| CreateStockSnapshot { ticker: s.ticker.clone(), price: s.price })
        .collect();

    ctx.store.commit_snapshot_cycle(&stocks, &snapshots, &state, reset_at).await?;
    debug!(
        "Snapshot cycle committed: {} stocks, open={}, day={}, snapshot={}",
        stocks.len(),
        state.is_open,
        state.market_day_count,
        state.snapshot_count
    );

    ctx.broadcaster.broadcast_stocks_update(&stocks);

    let mut events = ctx.event_detector.detect_events(&stocks, &previous_stocks, &state);
    events.extend(ctx.event_detector.market_day_events(&stocks, &state, &previous_state));
    ctx.broadcaster.broadcast_events(&events);

    match ctx.store.prune_snapshots(ctx.market.snapshot_retention).await {
        Ok(0) => {}
        Ok(deleted) => info!("Deleted {} old snapshots", deleted),
        Err(e) => warn!("Snapshot retention cleanup failed: {}", e),
    }

    Ok(JobResult { items_processed: stocks.len() as i32, items_failed: 0 })
}
