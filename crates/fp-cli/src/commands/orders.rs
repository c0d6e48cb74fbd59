use anyhow::{bail, Context, Result};
use chrono::Duration;
use sqlx::PgPool;
use uuid::Uuid;

use fp_payments::{PaymentProvider, RefundRequest};
use fp_schemas::{Order, OrderStatus};

pub fn parse_ttl(ttl_minutes: i64) -> Result<Duration> {
    if ttl_minutes <= 0 {
        bail!("--ttl-minutes must be positive, got {ttl_minutes}");
    }
    Ok(Duration::minutes(ttl_minutes))
}

/// Provider first: the order only becomes REFUNDED once the provider
/// accepted the refund.
pub async fn refund(
    pool: &PgPool,
    provider: &dyn PaymentProvider,
    order_id: Uuid,
    reason: &str,
) -> Result<Order> {
    let order = fp_db::fetch_order(pool, order_id).await?;
    if order.status != OrderStatus::Paid {
        bail!(
            "REFUSING REFUND: order {} is {}; only PAID orders can be refunded",
            order.order_number,
            order.status.as_str()
        );
    }
    let reference = order
        .payment_intent_id
        .clone()
        .with_context(|| format!("order {} has no payment reference", order.order_number))?;

    provider
        .refund(&RefundRequest {
            payment_intent_id: reference,
            reason: reason.trim().to_string(),
        })
        .await
        .with_context(|| format!("{} refund failed", provider.name()))?;

    let order = fp_db::transition_order(pool, order_id, OrderStatus::Refunded, None)
        .await?
        .into_order();
    tracing::info!(order_id = %order.id, order_number = %order.order_number, "order refunded");
    Ok(order)
}
