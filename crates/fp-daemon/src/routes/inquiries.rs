use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::info;

use fp_db::{InquiryFilter, NewInquiry};

use super::enforce_rate_limit;
use crate::{
    api_types::{CreateInquiryRequest, InquiriesQuery, InquiriesResponse, InquiryCreatedResponse},
    auth::{authenticate, is_current_admin},
    error::{ApiError, ApiResult},
    state::{AppState, BusMsg},
};

pub const MIN_MESSAGE_CHARS: usize = 10;
const INQUIRY_SENT: &str = "문의가 성공적으로 전송되었습니다.";

// ---------------------------------------------------------------------------
// POST /v1/place-inquiries
// ---------------------------------------------------------------------------

pub(crate) async fn create_inquiry(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateInquiryRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<InquiryCreatedResponse>)> {
    let claims = authenticate(&st, &headers)?;
    enforce_rate_limit(&st, "inquiry", &headers, st.config.inquiry_rule).await?;
    let Json(req) = payload?;

    let message = req.message.trim();
    if message.chars().count() < MIN_MESSAGE_CHARS {
        return Err(ApiError::bad_request(format!(
            "message must be at least {MIN_MESSAGE_CHARS} characters"
        )));
    }

    // 404 for unknown places rather than a foreign key failure.
    fp_db::fetch_place(&st.db, req.place_id).await?;

    let inquiry = fp_db::insert_inquiry(
        &st.db,
        &NewInquiry {
            place_id: req.place_id,
            user_id: claims.user_id(),
            message: message.to_string(),
            event_date: req.event_date,
        },
    )
    .await?;

    info!(inquiry_id = %inquiry.id, place_id = %inquiry.place_id, "inquiry created");
    st.publish(BusMsg::InquiryCreated {
        inquiry_id: inquiry.id,
        place_id: inquiry.place_id,
    });

    Ok((
        StatusCode::CREATED,
        Json(InquiryCreatedResponse {
            inquiry,
            message: INQUIRY_SENT.to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /v1/place-inquiries
// ---------------------------------------------------------------------------

pub(crate) async fn list_inquiries(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<InquiriesQuery>, QueryRejection>,
) -> ApiResult<Json<InquiriesResponse>> {
    let claims = authenticate(&st, &headers)?;
    let Query(q) = query?;

    let user_id = if is_current_admin(&st, &claims).await? {
        q.user_id
    } else {
        Some(claims.user_id())
    };
    let filter = InquiryFilter {
        user_id,
        place_id: q.place_id,
        status: q.status,
    };
    let inquiries = fp_db::list_inquiries(&st.db, &filter).await?;
    Ok(Json(InquiriesResponse { inquiries }))
}
