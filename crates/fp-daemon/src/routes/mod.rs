//! Axum router and all HTTP handlers for fp-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. Handlers are grouped by area in the submodules.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderMap,
    routing::{get, patch, post},
    Router,
};
use chrono::Utc;
use tower_http::services::ServeDir;

use fp_config::settings::RateRule;
use fp_providers::client_ip;

use crate::error::ApiError;
use crate::state::AppState;

mod account;
mod admin;
mod ads;
mod auth;
mod catalog;
mod inquiries;
mod site;
mod system;
mod upload;
mod webhooks;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (security headers, CORS, tracing) are **not** applied
/// here; `main.rs` attaches them so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.upload_max_bytes);
    let local_uploads = state.config.local_uploads.clone();

    let router = Router::new()
        .route("/v1/health", get(system::health))
        .route("/v1/status", get(system::status_handler))
        .route("/v1/stream", get(system::stream))
        .route("/v1/maps/config", get(system::maps_config))
        .route("/v1/auth/signup", post(auth::signup))
        .route("/v1/auth/signin", post(auth::signin))
        .route("/v1/auth/me", get(auth::me))
        .route("/v1/celebs", get(catalog::list_celebs))
        .route("/v1/events", get(catalog::list_events).post(catalog::create_event))
        .route("/v1/events/:id", get(catalog::get_event))
        .route("/v1/places", get(catalog::list_places))
        .route("/v1/places/:id", get(catalog::get_place))
        .route(
            "/v1/place-inquiries",
            get(inquiries::list_inquiries).post(inquiries::create_inquiry),
        )
        .route("/v1/ads/products", get(ads::list_products))
        .route("/v1/checkout", post(ads::checkout))
        .route("/v1/checkout/confirm", post(ads::confirm_checkout))
        .route("/v1/orders/:id/review", post(ads::submit_review))
        .route("/v1/webhooks/stripe", post(webhooks::stripe_webhook))
        .route("/v1/account", get(account::account))
        .route("/v1/admin/dashboard", get(admin::dashboard))
        .route("/v1/admin/reviews/:id", patch(admin::decide_review))
        .route("/v1/admin/inquiries/:id", patch(admin::decide_inquiry))
        .route("/v1/admin/events/:id", patch(admin::set_event_status))
        .route("/v1/admin/orders/:id/refund", post(admin::refund_order))
        .route("/v1/admin/postings/:id/proofs", post(admin::add_proof))
        .route("/v1/upload/signature", post(upload::signature))
        .route("/v1/upload", post(upload::upload).layer(upload_limit))
        .route("/sitemap.xml", get(site::sitemap))
        .route("/robots.txt", get(site::robots))
        .with_state(state);

    match local_uploads {
        Some(local) => router.nest_service(&local.mount, ServeDir::new(&local.dir)),
        None => router,
    }
}

// ---------------------------------------------------------------------------
// Shared handler helpers
// ---------------------------------------------------------------------------

/// Count one request against `rule`, keyed by scope and client IP.
pub(crate) async fn enforce_rate_limit(
    st: &AppState,
    scope: &str,
    headers: &HeaderMap,
    rule: RateRule,
) -> Result<(), ApiError> {
    let identifier = format!("{scope}:{}", client_ip(headers));
    let decision = st
        .limiter
        .check(&identifier, rule.limit, Duration::from_secs(rule.window_secs))
        .await;
    if decision.allowed {
        return Ok(());
    }
    Err(ApiError::RateLimited {
        retry_after_secs: decision.retry_after_secs(Utc::now().timestamp_millis()),
    })
}

/// Trimmed value, or None when blank.
pub(crate) fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Best effort receipt for an order that just became PAID.
pub(crate) async fn send_receipt(st: &AppState, order: &fp_schemas::Order) {
    let user = match fp_db::fetch_user(&st.db, order.user_id).await {
        Ok(u) => u,
        Err(err) => {
            tracing::warn!(order_id = %order.id, error = %err, "receipt skipped: user lookup failed");
            return;
        }
    };
    let title = match fp_db::fetch_active_product(&st.db, order.product_id).await {
        Ok(p) => p.title,
        Err(_) => order.order_number.clone(),
    };
    st.send_email(fp_providers::email::receipt(
        &user.email,
        &order.order_number,
        order.amount,
        &title,
        &st.config.public_url,
    ));
}
