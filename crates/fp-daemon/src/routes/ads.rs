use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use fp_db::{NewOrder, NewReview};
use fp_payments::{CheckoutRequest, ConfirmRequest};
use fp_schemas::{Order, OrderStatus};

use super::{non_blank, send_receipt};
use crate::{
    api_types::{
        CheckoutBody, CheckoutResponse, ConfirmCheckoutRequest, LocaleQuery, OrderResponse,
        ProductView, ProductsResponse, ReviewResponse, SubmitReviewRequest,
    },
    auth::{authenticate, request_locale},
    error::{ApiError, ApiResult},
    state::{AppState, BusMsg},
};

const PRODUCT_NOT_FOUND: &str = "상품을 찾을 수 없습니다.";

fn order_updated(order: &Order) -> BusMsg {
    BusMsg::OrderUpdated {
        order_id: order.id,
        order_number: order.order_number.clone(),
        status: order.status.as_str().to_string(),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/ads/products
// ---------------------------------------------------------------------------

pub(crate) async fn list_products(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<LocaleQuery>, QueryRejection>,
) -> ApiResult<Json<ProductsResponse>> {
    let Query(q) = query?;
    let locale = request_locale(q.locale.as_deref(), &headers);
    let products = fp_db::list_active_products(&st.db)
        .await?
        .into_iter()
        .map(|p| ProductView::new(p, locale))
        .collect();
    Ok(Json(ProductsResponse { products }))
}

// ---------------------------------------------------------------------------
// POST /v1/checkout
// ---------------------------------------------------------------------------

/// Create a PENDING order and open a checkout with the configured provider.
///
/// The amount always comes from the product row, never from the client.
pub(crate) async fn checkout(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutBody>, JsonRejection>,
) -> ApiResult<Json<CheckoutResponse>> {
    let claims = authenticate(&st, &headers)?;
    let Json(req) = payload?;

    let product = fp_db::fetch_active_product(&st.db, req.product_id)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::NotFound(_) => ApiError::NotFound(PRODUCT_NOT_FOUND.to_string()),
            other => other,
        })?;
    let user = fp_db::fetch_user(&st.db, claims.user_id()).await?;

    let order = fp_db::insert_order(
        &st.db,
        &NewOrder {
            product_id: product.id,
            user_id: user.id,
            amount: product.price_krw,
            currency: st.config.currency.clone(),
            payment_provider: st.payments.name().to_string(),
            addons: req.addons,
        },
    )
    .await?;

    let public = &st.config.public_url;
    let checkout_req = CheckoutRequest {
        order_id: order.id,
        order_number: order.order_number.clone(),
        user_id: user.id,
        amount: order.amount,
        currency: order.currency.clone(),
        product_title: product.title.clone(),
        term_months: product.term_months,
        customer_email: Some(user.email.clone()),
        success_url: format!("{public}/account?order_success={}", order.id),
        cancel_url: format!("{public}/ads/checkout?canceled=true"),
    };

    let session = match st.payments.create_checkout(&checkout_req).await {
        Ok(s) => s,
        Err(err) => {
            // No checkout exists, so the order can never be paid.
            if let Err(e) =
                fp_db::transition_order(&st.db, order.id, OrderStatus::Rejected, None).await
            {
                warn!(order_id = %order.id, error = %e, "failed to reject order after checkout error");
            }
            return Err(err.into());
        }
    };
    fp_db::set_order_session(&st.db, order.id, &session.session_id).await?;

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        provider = st.payments.name(),
        "checkout opened"
    );
    st.publish(order_updated(&order));

    Ok(Json(CheckoutResponse {
        session_url: session.session_url,
        session_id: session.session_id,
        order_id: order.id,
        order_number: order.order_number,
        client_params: session.client_params,
    }))
}

// ---------------------------------------------------------------------------
// POST /v1/checkout/confirm
// ---------------------------------------------------------------------------

/// Ask the provider whether the order is paid and move it to PAID.
///
/// Safe to call after the webhook already did the same: a PAID order is
/// returned as is.
pub(crate) async fn confirm_checkout(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ConfirmCheckoutRequest>, JsonRejection>,
) -> ApiResult<Json<OrderResponse>> {
    let claims = authenticate(&st, &headers)?;
    let Json(req) = payload?;

    let order = fp_db::fetch_order(&st.db, req.order_id).await?;
    if order.user_id != claims.user_id() {
        return Err(ApiError::NotFound("order not found".to_string()));
    }
    if order.status == OrderStatus::Paid {
        return Ok(Json(OrderResponse { order }));
    }

    let reference = match st.payments.name() {
        "toss" => non_blank(req.payment_key)
            .ok_or_else(|| ApiError::bad_request("paymentKey is required"))?,
        _ => order
            .session_id
            .clone()
            .ok_or_else(|| ApiError::Conflict("order has no checkout session".to_string()))?,
    };

    let confirmed = st
        .payments
        .confirm_payment(&ConfirmRequest {
            reference,
            order_number: order.order_number.clone(),
            amount: order.amount,
        })
        .await?;
    if let Some(echoed) = confirmed.order_id {
        if echoed != order.id {
            warn!(order_id = %order.id, echoed = %echoed, "provider session belongs to another order");
            return Err(ApiError::Conflict("payment does not match order".to_string()));
        }
    }

    let transition = fp_db::transition_order(
        &st.db,
        order.id,
        OrderStatus::Paid,
        confirmed.payment_intent_id.as_deref(),
    )
    .await?;
    if transition.was_applied() {
        send_receipt(&st, transition.order()).await;
        st.publish(order_updated(transition.order()));
    }

    Ok(Json(OrderResponse {
        order: transition.into_order(),
    }))
}

// ---------------------------------------------------------------------------
// POST /v1/orders/:id/review
// ---------------------------------------------------------------------------

pub(crate) async fn submit_review(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SubmitReviewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ReviewResponse>)> {
    let claims = authenticate(&st, &headers)?;
    let Path(order_id) = path?;
    let Json(req) = payload?;

    let design_urls: Vec<String> = req
        .design_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if design_urls.is_empty() {
        return Err(ApiError::bad_request("at least one design url is required"));
    }

    let review = fp_db::submit_review(
        &st.db,
        order_id,
        claims.user_id(),
        &NewReview {
            design_urls,
            copy_text: non_blank(req.copy_text),
            target_date: req.target_date,
        },
    )
    .await?;

    st.publish(BusMsg::ReviewSubmitted {
        review_id: review.id,
        order_id,
    });
    Ok((StatusCode::CREATED, Json(ReviewResponse { review })))
}
