use sqlx::{PgConnection, PgPool};

use crate::models::AiTask;

pub async fn fetch_open(pool: &PgPool) -> Result<Vec<AiTask>, sqlx::Error> {
    sqlx::query_as::<_, AiTask>(
        r#"
        SELECT id, task_type, status, prompt, model, arguments, external_task_id,
               result, error, created_at, completed_at
        FROM ai_tasks
        WHERE status IN ('PENDING', 'PROCESSING')
        ORDER BY created_at ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Writes the mutable lifecycle fields of a task. Returns false when the row
/// no longer exists.
pub async fn update(conn: &mut PgConnection, task: &AiTask) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE ai_tasks
        SET status = $2,
            external_task_id = $3,
            result = $4,
            error = $5,
            completed_at = $6
        WHERE id = $1
        "#,
    )
    .bind(task.id)
    .bind(task.status)
    .bind(&task.external_task_id)
    .bind(&task.result)
    .bind(&task.error)
    .bind(task.completed_at)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() == 1)
}
