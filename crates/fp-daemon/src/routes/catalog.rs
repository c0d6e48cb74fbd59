use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use fp_db::{EventFilter, EventSort, NewEvent};
use fp_schemas::EventStatus;

use super::non_blank;
use crate::{
    api_types::{
        CelebView, CelebsResponse, CreateEventRequest, EventRecordResponse, EventResponse,
        EventView, EventsQuery, EventsResponse, LocaleQuery, PlaceDetailResponse, PlaceView,
        PlacesQuery, PlacesResponse,
    },
    auth::{authenticate, is_current_admin, request_locale},
    error::{ApiError, ApiResult},
    state::AppState,
};

// ---------------------------------------------------------------------------
// GET /v1/celebs
// ---------------------------------------------------------------------------

pub(crate) async fn list_celebs(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<LocaleQuery>, QueryRejection>,
) -> ApiResult<Json<CelebsResponse>> {
    let Query(q) = query?;
    let locale = request_locale(q.locale.as_deref(), &headers);
    let celebs = fp_db::list_celebs(&st.db)
        .await?
        .into_iter()
        .map(|c| CelebView::new(c, locale))
        .collect();
    Ok(Json(CelebsResponse { celebs }))
}

// ---------------------------------------------------------------------------
// GET /v1/events
// ---------------------------------------------------------------------------

pub(crate) async fn list_events(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<EventsQuery>, QueryRejection>,
) -> ApiResult<Json<EventsResponse>> {
    let Query(q) = query?;
    let locale = request_locale(q.locale.as_deref(), &headers);
    let filter = EventFilter {
        search: non_blank(q.search),
        region: non_blank(q.region),
        celeb_id: q.celeb_id,
        sort: EventSort::parse_or_default(q.sort_by.as_deref()),
    };
    let events = fp_db::list_events(&st.db, &filter)
        .await?
        .into_iter()
        .map(|e| EventView::new(e, locale))
        .collect();
    Ok(Json(EventsResponse { events }))
}

// ---------------------------------------------------------------------------
// GET /v1/events/:id
// ---------------------------------------------------------------------------

/// Drafts are visible to their owner and to admins only.
pub(crate) async fn get_event(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<LocaleQuery>, QueryRejection>,
) -> ApiResult<Json<EventResponse>> {
    let Path(id) = path?;
    let Query(q) = query?;
    let locale = request_locale(q.locale.as_deref(), &headers);

    let summary = fp_db::fetch_event(&st.db, id).await?;
    if summary.event.status != EventStatus::Published {
        let visible = match authenticate(&st, &headers) {
            Ok(c) => c.user_id() == summary.event.user_id || is_current_admin(&st, &c).await?,
            Err(_) => false,
        };
        if !visible {
            return Err(ApiError::NotFound("event not found".to_string()));
        }
    }
    Ok(Json(EventResponse {
        event: EventView::new(summary, locale),
    }))
}

// ---------------------------------------------------------------------------
// POST /v1/events
// ---------------------------------------------------------------------------

pub(crate) async fn create_event(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<EventRecordResponse>)> {
    let claims = authenticate(&st, &headers)?;
    let Json(req) = payload?;

    let title = req.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    if req.end_date < req.start_date {
        return Err(ApiError::bad_request("endDate must not be before startDate"));
    }

    let new = NewEvent {
        title: title.to_string(),
        title_en: non_blank(req.title_en),
        description: non_blank(req.description),
        image_url: non_blank(req.image_url),
        start_date: req.start_date,
        end_date: req.end_date,
        perks: req
            .perks
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect(),
        celeb_id: req.celeb_id,
        place_id: req.place_id,
        user_id: claims.user_id(),
    };
    let event = fp_db::insert_event(&st.db, &new).await?;
    info!(event_id = %event.id, user_id = %event.user_id, "event created");

    Ok((StatusCode::CREATED, Json(EventRecordResponse { event })))
}

// ---------------------------------------------------------------------------
// GET /v1/places  /v1/places/:id
// ---------------------------------------------------------------------------

pub(crate) async fn list_places(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<PlacesQuery>, QueryRejection>,
) -> ApiResult<Json<PlacesResponse>> {
    let Query(q) = query?;
    let locale = request_locale(q.locale.as_deref(), &headers);
    let region = non_blank(q.region);
    let places = fp_db::list_places(&st.db, region.as_deref())
        .await?
        .into_iter()
        .map(|p| PlaceView::new(p, locale))
        .collect();
    Ok(Json(PlacesResponse { places }))
}

pub(crate) async fn get_place(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<LocaleQuery>, QueryRejection>,
) -> ApiResult<Json<PlaceDetailResponse>> {
    let Path(id) = path?;
    let Query(q) = query?;
    let locale = request_locale(q.locale.as_deref(), &headers);

    let place = fp_db::fetch_place(&st.db, id).await?;
    let events = fp_db::list_upcoming_events_at_place(&st.db, id, Utc::now())
        .await?
        .into_iter()
        .map(|e| EventView::new(e, locale))
        .collect();
    Ok(Json(PlaceDetailResponse {
        place: PlaceView::new(place, locale),
        events,
    }))
}
