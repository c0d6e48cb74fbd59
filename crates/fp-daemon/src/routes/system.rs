use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{
    api_types::{DbStatusView, HealthResponse, MapConfigResponse, ProviderNames, StatusResponse},
    auth::require_admin,
    error::ApiResult,
    state::{uptime_secs, AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let db = match fp_db::status(&st.db).await {
        Ok(s) => DbStatusView {
            ok: s.ok,
            has_orders_table: s.has_orders_table,
            error: None,
        },
        Err(err) => DbStatusView {
            ok: false,
            has_orders_table: false,
            error: Some(format!("{err:#}")),
        },
    };

    (
        StatusCode::OK,
        Json(StatusResponse {
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
            env: st.config.env.as_str().to_string(),
            uptime_secs: uptime_secs(),
            db,
            providers: ProviderNames {
                payments: st.payments.name().to_string(),
                storage: st.storage.name().to_string(),
                maps: st.maps.name().to_string(),
                mailer: st.mailer.name().to_string(),
                rate_limiter: st.limiter.name().to_string(),
            },
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE, admin)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    require_admin(&st, &headers).await?;

    let mut out = HeaderMap::new();
    out.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    out.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    Ok((out, Sse::new(events).keep_alive(KeepAlive::new())).into_response())
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}

// ---------------------------------------------------------------------------
// GET /v1/maps/config
// ---------------------------------------------------------------------------

pub(crate) async fn maps_config(State(st): State<Arc<AppState>>) -> Json<MapConfigResponse> {
    Json(MapConfigResponse {
        provider: st.maps.name().to_string(),
        token: st.maps.token(),
        is_mock: st.maps.is_mock(),
    })
}
