use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;

use fp_storage::{is_allowed_content_type, PutOptions, UploadSignature};

use super::non_blank;
use crate::{
    api_types::{UploadQuery, UploadResponse, UploadSignatureRequest},
    auth::authenticate,
    error::{ApiError, ApiResult},
    state::AppState,
};

// ---------------------------------------------------------------------------
// POST /v1/upload/signature
// ---------------------------------------------------------------------------

pub(crate) async fn signature(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Option<Json<UploadSignatureRequest>>,
) -> ApiResult<Json<UploadSignature>> {
    authenticate(&st, &headers)?;
    let signer = st.cloudinary.as_ref().ok_or_else(|| {
        ApiError::internal(
            "Cloudinary is not configured",
            anyhow!("cloudinary credentials missing"),
        )
    })?;

    let folder = payload
        .and_then(|Json(b)| non_blank(b.folder))
        .unwrap_or_else(|| st.config.upload_default_folder.clone());
    Ok(Json(signer.sign(&folder, Utc::now().timestamp())))
}

// ---------------------------------------------------------------------------
// POST /v1/upload
// ---------------------------------------------------------------------------

/// Raw image body, stored under `?folder=` with a generated name.
pub(crate) async fn upload(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    query: Result<Query<UploadQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let claims = authenticate(&st, &headers)?;
    let Query(q) = query?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("Content-Type is required"))?;
    if !is_allowed_content_type(&content_type) {
        return Err(ApiError::bad_request("only image uploads are allowed"));
    }

    let bytes = body.map_err(|rej| {
        if rej.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                max_bytes: st.config.upload_max_bytes,
            }
        } else {
            ApiError::from(rej)
        }
    })?;
    if bytes.is_empty() {
        return Err(ApiError::bad_request("empty upload"));
    }

    let size = bytes.len();
    let stored = st
        .storage
        .put(
            bytes,
            PutOptions {
                folder: non_blank(q.folder),
                key: None,
                content_type: Some(content_type),
            },
        )
        .await?;
    info!(user_id = %claims.user_id(), key = %stored.key, size, "file uploaded");

    Ok(Json(UploadResponse {
        url: stored.url,
        key: stored.key,
    }))
}
