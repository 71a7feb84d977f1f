//! Random walk applied to every active stock.
//!
//! Each tick moves a stock by a uniform draw within ±5% of its price. While
//! the market is closed the range is scaled by the after-hours volatility
//! multiplier. All prices and their price events are committed together and
//! the new prices are broadcast afterwards.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;

use crate::errors::AppError;
use crate::models::{ChangeType, CreatePriceEvent, Stock};
use crate::services::job_scheduler_service::{JobContext, JobResult};

/// Largest relative move of one tick at full volatility.
pub const MAX_TICK_CHANGE: f64 = 0.05;

pub async fn run_price_tick(ctx: JobContext) -> Result<JobResult, AppError> {
    let mut stocks = ctx.store.fetch_active_stocks().await?;
    if stocks.is_empty() {
        return Ok(JobResult { items_processed: 0, items_failed: 0 });
    }

    let state = ctx.store.get_or_create_market_state().await?;
    let multiplier = if state.is_open {
        1.0
    } else {
        ctx.market.after_hours_volatility_multiplier
    };

    let events = {
        let mut rng = rand::rng();
        apply_tick(&mut stocks, multiplier, &mut rng, Utc::now())
    };

    ctx.store.commit_price_tick(&stocks, &events).await?;
    debug!("Price tick applied to {} stocks (multiplier {})", stocks.len(), multiplier);

    ctx.broadcaster.broadcast_stocks_update(&stocks);

    Ok(JobResult { items_processed: stocks.len() as i32, items_failed: 0 })
}

/// Moves every stock and returns one `RANDOM` price event per stock.
pub fn apply_tick<R: Rng>(
    stocks: &mut [Stock],
    multiplier: f64,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Vec<CreatePriceEvent> {
    stocks
        .iter_mut()
        .map(|stock| {
            let bound = stock.price * MAX_TICK_CHANGE * multiplier;
            let delta = if bound > 0.0 { rng.random_range(-bound..=bound) } else { 0.0 };
            stock.set_price((stock.price + delta).max(0.0), now);

            CreatePriceEvent {
                ticker: stock.ticker.clone(),
                price: stock.price,
                change_type: ChangeType::Random,
            }
        })
        .collect()
}
