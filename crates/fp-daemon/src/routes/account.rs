use std::sync::Arc;

use axum::{extract::State, http::HeaderMap, Json};

use fp_db::InquiryFilter;

use crate::{api_types::AccountResponse, auth::authenticate, error::ApiResult, state::AppState};

// ---------------------------------------------------------------------------
// GET /v1/account
// ---------------------------------------------------------------------------

/// Everything the caller owns: events in any status, orders with their
/// review and posting summary, and place inquiries.
pub(crate) async fn account(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<AccountResponse>> {
    let claims = authenticate(&st, &headers)?;
    let user_id = claims.user_id();
    let inquiry_filter = InquiryFilter {
        user_id: Some(user_id),
        ..InquiryFilter::default()
    };

    let (user, events, orders, inquiries) = tokio::try_join!(
        fp_db::fetch_user(&st.db, user_id),
        fp_db::list_events_by_user(&st.db, user_id),
        fp_db::list_orders_by_user(&st.db, user_id),
        fp_db::list_inquiries(&st.db, &inquiry_filter),
    )?;

    Ok(Json(AccountResponse {
        user,
        events,
        orders,
        inquiries,
    }))
}
