use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::models::{CreatePriceEvent, CreateStockSnapshot, Stock};

pub async fn fetch_active(pool: &PgPool) -> Result<Vec<Stock>, sqlx::Error> {
    sqlx::query_as::<_, Stock>(
        r#"
        SELECT ticker, price, max_price, min_price, reference_price, reference_price_at,
               rank, change_rank, previous_rank, previous_change_rank,
               is_active, created_at, updated_at
        FROM stocks
        WHERE is_active = TRUE
        ORDER BY ticker ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Bulk-writes new prices. Extremes are widened against the row's current
/// values, so a reference reset committed after the tick's read is kept.
pub async fn update_prices(conn: &mut PgConnection, stocks: &[Stock]) -> Result<u64, sqlx::Error> {
    if stocks.is_empty() {
        return Ok(0);
    }

    let tickers: Vec<String> = stocks.iter().map(|s| s.ticker.clone()).collect();
    let prices: Vec<f64> = stocks.iter().map(|s| s.price).collect();
    let updated_at: Vec<DateTime<Utc>> = stocks.iter().map(|s| s.updated_at).collect();

    let result = sqlx::query(
        r#"
        UPDATE stocks AS s
        SET price = u.price,
            max_price = GREATEST(s.max_price, u.price),
            min_price = LEAST(s.min_price, u.price),
            updated_at = u.updated_at
        FROM UNNEST($1::text[], $2::float8[], $3::timestamptz[])
            AS u(ticker, price, updated_at)
        WHERE s.ticker = u.ticker
        "#,
    )
    .bind(tickers)
    .bind(prices)
    .bind(updated_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Bulk-writes the ranks computed by the snapshot cycle.
pub async fn update_rankings(conn: &mut PgConnection, stocks: &[Stock]) -> Result<u64, sqlx::Error> {
    if stocks.is_empty() {
        return Ok(0);
    }

    let tickers: Vec<String> = stocks.iter().map(|s| s.ticker.clone()).collect();
    let ranks: Vec<Option<i32>> = stocks.iter().map(|s| s.rank).collect();
    let change_ranks: Vec<Option<i32>> = stocks.iter().map(|s| s.change_rank).collect();
    let previous_ranks: Vec<Option<i32>> = stocks.iter().map(|s| s.previous_rank).collect();
    let previous_change_ranks: Vec<Option<i32>> = stocks.iter().map(|s| s.previous_change_rank).collect();

    let result = sqlx::query(
        r#"
        UPDATE stocks AS s
        SET rank = u.rank,
            change_rank = u.change_rank,
            previous_rank = u.previous_rank,
            previous_change_rank = u.previous_change_rank
        FROM UNNEST($1::text[], $2::int4[], $3::int4[], $4::int4[], $5::int4[])
            AS u(ticker, rank, change_rank, previous_rank, previous_change_rank)
        WHERE s.ticker = u.ticker
        "#,
    )
    .bind(tickers)
    .bind(ranks)
    .bind(change_ranks)
    .bind(previous_ranks)
    .bind(previous_change_ranks)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Starts a new baseline at each row's current price, including a price a
/// tick committed after the snapshot cycle read it.
pub async fn reset_reference(
    conn: &mut PgConnection,
    tickers: &[String],
    at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    if tickers.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        r#"
        UPDATE stocks
        SET reference_price = price,
            reference_price_at = $2,
            max_price = price,
            min_price = price
        WHERE ticker = ANY($1)
        "#,
    )
    .bind(tickers)
    .bind(at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_price_events(
    conn: &mut PgConnection,
    events: &[CreatePriceEvent],
) -> Result<u64, sqlx::Error> {
    if events.is_empty() {
        return Ok(0);
    }

    let tickers: Vec<String> = events.iter().map(|e| e.ticker.clone()).collect();
    let prices: Vec<f64> = events.iter().map(|e| e.price).collect();
    let change_types: Vec<String> = events.iter().map(|e| e.change_type.to_string()).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO price_events (ticker, price, change_type)
        SELECT * FROM UNNEST($1::text[], $2::float8[], $3::text[])
        "#,
    )
    .bind(tickers)
    .bind(prices)
    .bind(change_types)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_snapshots(
    conn: &mut PgConnection,
    snapshots: &[CreateStockSnapshot],
) -> Result<u64, sqlx::Error> {
    if snapshots.is_empty() {
        return Ok(0);
    }

    let tickers: Vec<String> = snapshots.iter().map(|s| s.ticker.clone()).collect();
    let prices: Vec<f64> = snapshots.iter().map(|s| s.price).collect();

    let result = sqlx::query(
        r#"
        INSERT INTO stock_snapshots (ticker, price)
        SELECT * FROM UNNEST($1::text[], $2::float8[])
        "#,
    )
    .bind(tickers)
    .bind(prices)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes every snapshot ranked below `retention` within its ticker, newest
/// first. Ties on `created_at` fall back to the higher id.
pub async fn delete_snapshots_beyond_retention(pool: &PgPool, retention: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM stock_snapshots
        WHERE id IN (
            SELECT id FROM (
                SELECT id,
                       ROW_NUMBER() OVER (
                           PARTITION BY ticker
                           ORDER BY created_at DESC, id DESC
                       ) AS rn
                FROM stock_snapshots
            ) ranked
            WHERE ranked.rn > $1
        )
        "#,
    )
    .bind(retention)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
