use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::models::market_state::{MarketState, MARKET_STATE_ID};

pub async fn fetch(pool: &PgPool) -> Result<Option<MarketState>, sqlx::Error> {
    sqlx::query_as::<_, MarketState>(
        r#"
        SELECT id, is_open, market_day_count, snapshot_count, after_hours_snapshot_count, updated_at
        FROM market_state
        WHERE id = $1
        "#,
    )
    .bind(MARKET_STATE_ID)
    .fetch_optional(pool)
    .await
}

/// Inserts the singleton row. A concurrent insert wins silently.
pub async fn insert_initial(pool: &PgPool, state: &MarketState) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO market_state (id, is_open, market_day_count, snapshot_count, after_hours_snapshot_count, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO NOTHING
        "#,
    )
    .bind(state.id)
    .bind(state.is_open)
    .bind(state.market_day_count)
    .bind(state.snapshot_count)
    .bind(state.after_hours_snapshot_count)
    .bind(state.updated_at)
    .execute(pool)
    .await?;

    let created = result.rows_affected() == 1;
    if created {
        info!("Created initial market state");
    }
    Ok(created)
}

pub async fn update(conn: &mut PgConnection, state: &MarketState) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE market_state
        SET is_open = $2,
            market_day_count = $3,
            snapshot_count = $4,
            after_hours_snapshot_count = $5,
            updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(state.id)
    .bind(state.is_open)
    .bind(state.market_day_count)
    .bind(state.snapshot_count)
    .bind(state.after_hours_snapshot_count)
    .bind(state.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}
