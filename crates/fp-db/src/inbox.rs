//! Webhook inbox: at-most-once processing of provider deliveries.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::PgPool;

/// Record a webhook delivery.
///
/// Returns `true` the first time `(provider, event_id)` is seen and `false`
/// for redeliveries, which callers acknowledge without reprocessing.
pub async fn webhook_inbox_insert_deduped(
    pool: &PgPool,
    provider: &str,
    event_id: &str,
    event_type: &str,
    payload: &Value,
) -> Result<bool> {
    let res = sqlx::query(
        r#"
        insert into webhook_events (provider, event_id, event_type, payload)
        values ($1, $2, $3, $4)
        on conflict (provider, event_id) do nothing
        "#,
    )
    .bind(provider)
    .bind(event_id)
    .bind(event_type)
    .bind(payload)
    .execute(pool)
    .await
    .context("webhook_inbox_insert_deduped failed")?;

    Ok(res.rows_affected() == 1)
}

pub async fn webhook_mark_processed(pool: &PgPool, provider: &str, event_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        update webhook_events
        set processed_at = now()
        where provider = $1 and event_id = $2 and processed_at is null
        "#,
    )
    .bind(provider)
    .bind(event_id)
    .execute(pool)
    .await
    .context("webhook_mark_processed failed")?;
    Ok(())
}

/// Drop an unprocessed delivery so the provider's retry is handled afresh.
/// Used when processing failed after the inbox insert.
pub async fn webhook_release(pool: &PgPool, provider: &str, event_id: &str) -> Result<()> {
    sqlx::query(
        r#"
        delete from webhook_events
        where provider = $1 and event_id = $2 and processed_at is null
        "#,
    )
    .bind(provider)
    .bind(event_id)
    .execute(pool)
    .await
    .context("webhook_release failed")?;
    Ok(())
}
