use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

async fn insert_entry(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: &Value,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(())
}

/// Audit writes never fail the business operation; problems only reach the log.
pub async fn record(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: &str,
    resource: &str,
    metadata: Value,
) {
    if let Err(err) = insert_entry(pool, user_id, action, resource, &metadata).await {
        tracing::warn!(error = %err, action, resource, "audit log failed");
    }
}
