//! Admin-only handlers. Every handler starts with `require_admin`.

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use fp_db::{InquiryFilter, NewProof, REFUND_NOTE};
use fp_payments::RefundRequest;
use fp_schemas::{DashboardStats, EventStatus, InquiryStatus, OrderStatus, ReviewStatus};

use super::non_blank;
use crate::{
    api_types::{
        DashboardResponse, EventRecordResponse, EventStatusRequest, InquiryDecisionRequest,
        InquiryResponse, OrderResponse, ProofRequest, ProofResponse, RefundBody,
        ReviewDecisionRequest, ReviewDecisionResponse,
    },
    auth::require_admin,
    error::{ApiError, ApiResult},
    state::{AppState, BusMsg},
};

pub const DASHBOARD_POSTINGS: i64 = 20;
const DEFAULT_REFUND_REASON: &str = "requested_by_customer";

// ---------------------------------------------------------------------------
// GET /v1/admin/dashboard
// ---------------------------------------------------------------------------

pub(crate) async fn dashboard(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<DashboardResponse>> {
    require_admin(&st, &headers).await?;
    let now = Utc::now();
    let pending = InquiryFilter {
        status: Some(InquiryStatus::Requested),
        ..InquiryFilter::default()
    };

    let (pending_reviews, active_postings, pending_inquiries_n, paid_orders) = tokio::try_join!(
        fp_db::count_reviews(&st.db, Some(ReviewStatus::Submitted)),
        fp_db::count_active_postings(&st.db, now),
        fp_db::count_inquiries(&st.db, Some(InquiryStatus::Requested)),
        fp_db::count_orders(&st.db, Some(OrderStatus::Paid)),
    )?;
    let (review_queue, postings, pending_inquiries) = tokio::try_join!(
        fp_db::list_review_queue(&st.db),
        fp_db::list_postings(&st.db, DASHBOARD_POSTINGS, now),
        fp_db::list_inquiries(&st.db, &pending),
    )?;

    Ok(Json(DashboardResponse {
        stats: DashboardStats {
            pending_reviews,
            active_postings,
            pending_inquiries: pending_inquiries_n,
            total_orders: paid_orders,
        },
        review_queue,
        postings,
        pending_inquiries,
    }))
}

// ---------------------------------------------------------------------------
// PATCH /v1/admin/reviews/:id
// ---------------------------------------------------------------------------

/// Approval creates the posting in the same transaction.
pub(crate) async fn decide_review(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReviewDecisionRequest>, JsonRejection>,
) -> ApiResult<Json<ReviewDecisionResponse>> {
    require_admin(&st, &headers).await?;
    let Path(review_id) = path?;
    let Json(req) = payload?;

    if !matches!(req.status, ReviewStatus::Approved | ReviewStatus::Rejected) {
        return Err(ApiError::bad_request("status must be APPROVED or REJECTED"));
    }
    let note = non_blank(req.note);

    let decision =
        fp_db::decide_review(&st.db, review_id, req.status, note.as_deref(), Utc::now()).await?;
    info!(
        review_id = %review_id,
        order_number = %decision.order_number,
        status = decision.review.status.as_str(),
        "review decided"
    );
    st.publish(BusMsg::ReviewDecided {
        review_id,
        order_id: decision.review.order_id,
        status: decision.review.status.as_str().to_string(),
    });

    Ok(Json(ReviewDecisionResponse {
        review: decision.review,
        posting: decision.posting,
    }))
}

// ---------------------------------------------------------------------------
// PATCH /v1/admin/inquiries/:id
// ---------------------------------------------------------------------------

pub(crate) async fn decide_inquiry(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<InquiryDecisionRequest>, JsonRejection>,
) -> ApiResult<Json<InquiryResponse>> {
    require_admin(&st, &headers).await?;
    let Path(inquiry_id) = path?;
    let Json(req) = payload?;

    if !matches!(req.status, InquiryStatus::Connected | InquiryStatus::Declined) {
        return Err(ApiError::bad_request("status must be CONNECTED or DECLINED"));
    }
    let inquiry = fp_db::transition_inquiry(&st.db, inquiry_id, req.status).await?;
    st.publish(BusMsg::InquiryUpdated {
        inquiry_id,
        status: inquiry.status.as_str().to_string(),
    });
    Ok(Json(InquiryResponse { inquiry }))
}

// ---------------------------------------------------------------------------
// PATCH /v1/admin/events/:id
// ---------------------------------------------------------------------------

pub(crate) async fn set_event_status(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<EventStatusRequest>, JsonRejection>,
) -> ApiResult<Json<EventRecordResponse>> {
    require_admin(&st, &headers).await?;
    let Path(event_id) = path?;
    let Json(req) = payload?;

    let before = fp_db::fetch_event(&st.db, event_id).await?;
    let event = fp_db::set_event_status(&st.db, event_id, req.status).await?;
    info!(event_id = %event_id, status = event.status.as_str(), "event status set");

    if event.status == EventStatus::Published && before.event.status != EventStatus::Published {
        match fp_db::fetch_user(&st.db, event.user_id).await {
            Ok(owner) => st.send_email(fp_providers::email::event_approved(
                &owner.email,
                &event.title,
                &st.config.public_url,
            )),
            Err(err) => {
                tracing::warn!(event_id = %event_id, error = %err, "approval email skipped")
            }
        }
    }
    Ok(Json(EventRecordResponse { event }))
}

// ---------------------------------------------------------------------------
// POST /v1/admin/orders/:id/refund
// ---------------------------------------------------------------------------

/// Refund at the provider first; the order only becomes REFUNDED once the
/// provider accepted.
pub(crate) async fn refund_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Option<Json<RefundBody>>,
) -> ApiResult<Json<OrderResponse>> {
    require_admin(&st, &headers).await?;
    let Path(order_id) = path?;
    let body = payload.map(|Json(b)| b).unwrap_or_default();

    let order = fp_db::fetch_order(&st.db, order_id).await?;
    if order.status != OrderStatus::Paid {
        return Err(ApiError::Conflict(format!(
            "only PAID orders can be refunded; order is {}",
            order.status.as_str()
        )));
    }
    let reference = order
        .payment_intent_id
        .clone()
        .ok_or_else(|| ApiError::Conflict("order has no payment reference".to_string()))?;

    st.payments
        .refund(&RefundRequest {
            payment_intent_id: reference,
            reason: non_blank(body.reason).unwrap_or_else(|| DEFAULT_REFUND_REASON.to_string()),
        })
        .await?;

    let order = fp_db::transition_order(&st.db, order_id, OrderStatus::Refunded, None)
        .await?
        .into_order();
    info!(order_id = %order_id, order_number = %order.order_number, "order refunded");
    st.publish(BusMsg::OrderUpdated {
        order_id,
        order_number: order.order_number.clone(),
        status: order.status.as_str().to_string(),
    });

    // The refund rejects creative still waiting for review.
    if let Some(review) = fp_db::fetch_review_by_order(&st.db, order_id).await? {
        if review.status == ReviewStatus::Rejected && review.note.as_deref() == Some(REFUND_NOTE) {
            st.publish(BusMsg::ReviewDecided {
                review_id: review.id,
                order_id,
                status: review.status.as_str().to_string(),
            });
        }
    }
    Ok(Json(OrderResponse { order }))
}

// ---------------------------------------------------------------------------
// POST /v1/admin/postings/:id/proofs
// ---------------------------------------------------------------------------

pub(crate) async fn add_proof(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ProofRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProofResponse>)> {
    require_admin(&st, &headers).await?;
    let Path(posting_id) = path?;
    let Json(req) = payload?;

    let image_url =
        non_blank(Some(req.image_url)).ok_or_else(|| ApiError::bad_request("imageUrl is required"))?;
    let location =
        non_blank(Some(req.location)).ok_or_else(|| ApiError::bad_request("location is required"))?;

    let proof = fp_db::add_proof(
        &st.db,
        posting_id,
        &NewProof {
            image_url,
            location,
            taken_at: req.taken_at,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(ProofResponse { proof })))
}
