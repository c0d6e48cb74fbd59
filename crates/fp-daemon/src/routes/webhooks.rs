use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use fp_config::AppEnv;
use fp_db::DbError;
use fp_payments::webhook::{parse_event, verify_stripe_signature, WebhookEvent, SIGNATURE_HEADER};
use fp_schemas::{Order, OrderStatus};

use super::send_receipt;
use crate::{
    api_types::WebhookAck,
    error::{ApiError, ApiResult},
    state::{AppState, BusMsg},
};

const PROVIDER: &str = "stripe";

// ---------------------------------------------------------------------------
// POST /v1/webhooks/stripe
// ---------------------------------------------------------------------------

/// Verify, dedupe through the inbox, then apply.
///
/// A delivery whose processing fails is released from the inbox and answered
/// with 500 so Stripe retries it.
pub(crate) async fn stripe_webhook(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::bad_request("No signature"))?;
    let payload = body?;

    match st.stripe_webhook_secret.as_deref() {
        Some(secret) => verify_stripe_signature(
            &payload,
            signature,
            secret,
            Utc::now().timestamp(),
            st.config.webhook_tolerance_secs,
        )
        .map_err(|e| {
            warn!(error = %e, "stripe webhook rejected");
            ApiError::bad_request(format!("Webhook verification failed: {e}"))
        })?,
        None if st.config.env == AppEnv::Development => {
            warn!("stripe webhook secret not set; accepting unsigned delivery (development only)");
        }
        None => {
            error!("stripe webhook secret not configured");
            return Err(ApiError::bad_request("Webhook verification failed"));
        }
    }

    let parsed = parse_event(&payload).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let fresh = fp_db::webhook_inbox_insert_deduped(
        &st.db,
        PROVIDER,
        &parsed.id,
        &parsed.event_type,
        &parsed.raw,
    )
    .await?;
    if !fresh {
        info!(event_id = %parsed.id, event_type = %parsed.event_type, "duplicate webhook acknowledged");
        return Ok(Json(WebhookAck {
            received: true,
            duplicate: true,
        }));
    }

    if let Err(err) = apply_event(&st, &parsed.event).await {
        if let Err(e) = fp_db::webhook_release(&st.db, PROVIDER, &parsed.id).await {
            warn!(event_id = %parsed.id, error = %e, "webhook release failed");
        }
        return Err(ApiError::internal("webhook processing failed", err));
    }

    fp_db::webhook_mark_processed(&st.db, PROVIDER, &parsed.id).await?;
    info!(event_id = %parsed.id, event_type = %parsed.event_type, "webhook processed");
    Ok(Json(WebhookAck {
        received: true,
        duplicate: false,
    }))
}

async fn resolve_order(st: &AppState, session_id: &str, order_id: Option<Uuid>) -> anyhow::Result<Order> {
    match order_id {
        Some(id) => fp_db::fetch_order(&st.db, id).await,
        None => fp_db::fetch_order_by_session(&st.db, session_id).await,
    }
}

/// Transitions that cannot apply (a late completion for an order the sweeper
/// already rejected, say) are logged and treated as handled; retrying would
/// not change the outcome.
async fn apply_event(st: &AppState, event: &WebhookEvent) -> anyhow::Result<()> {
    let (session_id, order_id, next, intent) = match event {
        WebhookEvent::CheckoutCompleted {
            session_id,
            order_id,
            payment_intent,
        } => (session_id, *order_id, OrderStatus::Paid, payment_intent.as_deref()),
        WebhookEvent::CheckoutExpired {
            session_id,
            order_id,
        } => (session_id, *order_id, OrderStatus::Rejected, None),
        WebhookEvent::Other(kind) => {
            info!(event_type = %kind, "webhook event ignored");
            return Ok(());
        }
    };

    let order = match resolve_order(st, session_id, order_id).await {
        Ok(o) => o,
        Err(err) if matches!(err.downcast_ref::<DbError>(), Some(DbError::NotFound(_))) => {
            warn!(session_id = %session_id, "webhook for unknown order ignored");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    let transition = match fp_db::transition_order(&st.db, order.id, next, intent).await {
        Ok(t) => t,
        Err(err) if matches!(err.downcast_ref::<DbError>(), Some(DbError::InvalidTransition { .. })) => {
            error!(
                order_id = %order.id,
                current = order.status.as_str(),
                requested = next.as_str(),
                "webhook transition refused"
            );
            return Ok(());
        }
        Err(err) => return Err(err).context("webhook order transition failed"),
    };

    if transition.was_applied() {
        let updated = transition.order();
        if updated.status == OrderStatus::Paid {
            send_receipt(st, updated).await;
        }
        st.publish(BusMsg::OrderUpdated {
            order_id: updated.id,
            order_number: updated.order_number.clone(),
            status: updated.status.as_str().to_string(),
        });
    }
    Ok(())
}
