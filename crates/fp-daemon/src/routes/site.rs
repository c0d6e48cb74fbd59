use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::error;

use crate::{
    seo::{render_robots, render_sitemap, sitemap_entries},
    state::AppState,
};

// ---------------------------------------------------------------------------
// GET /sitemap.xml
// ---------------------------------------------------------------------------

/// A database failure still yields the static pages.
pub(crate) async fn sitemap(State(st): State<Arc<AppState>>) -> Response {
    let (events, places) = match tokio::try_join!(
        fp_db::list_event_sitemap(&st.db),
        fp_db::list_place_sitemap(&st.db),
    ) {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = %err, "sitemap query failed; serving static entries");
            (Vec::new(), Vec::new())
        }
    };

    let entries = sitemap_entries(&st.config.public_url, Utc::now(), &events, &places);
    (
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        render_sitemap(&entries),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// GET /robots.txt
// ---------------------------------------------------------------------------

pub(crate) async fn robots(State(st): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_robots(&st.config.public_url),
    )
        .into_response()
}
