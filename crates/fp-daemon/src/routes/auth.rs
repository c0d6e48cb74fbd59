use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use tracing::info;

use fp_auth::{hash_password, normalize_email, validate_email, validate_name, validate_password, verify_password};
use fp_db::{DbError, NewUser};

use super::enforce_rate_limit;
use crate::{
    api_types::{MeResponse, SigninRequest, SigninResponse, SignupRequest, SignupResponse},
    auth::authenticate,
    error::{ApiError, ApiResult},
    state::AppState,
};

const SIGNUP_OK: &str = "회원가입이 완료되었습니다.";
const EMAIL_TAKEN: &str = "이미 등록된 이메일입니다.";
const BAD_CREDENTIALS: &str = "invalid email or password";

// ---------------------------------------------------------------------------
// POST /v1/auth/signup
// ---------------------------------------------------------------------------

pub(crate) async fn signup(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    enforce_rate_limit(&st, "signup", &headers, st.config.signup_rule).await?;
    let Json(req) = payload?;

    let email = normalize_email(&req.email);
    validate_email(&email).map_err(ApiError::BadRequest)?;
    validate_password(&req.password).map_err(ApiError::BadRequest)?;
    validate_name(&req.name).map_err(ApiError::BadRequest)?;
    let role = req.role.unwrap_or_default();
    if !role.is_self_assignable() {
        return Err(ApiError::bad_request(format!(
            "role {} cannot be chosen at signup",
            role.as_str()
        )));
    }

    if fp_db::email_exists(&st.db, &email).await? {
        return Err(ApiError::bad_request(EMAIL_TAKEN));
    }

    let cost = st.config.bcrypt_cost;
    let plain = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&plain, cost))
        .await
        .map_err(|e| ApiError::internal("password hashing failed", e))?
        .map_err(|e| ApiError::internal("password hashing failed", e))?;

    let new = NewUser {
        email,
        password_hash,
        name: Some(req.name.trim().to_string()),
        role,
    };
    let user = match fp_db::insert_user(&st.db, &new).await {
        Ok(u) => u,
        // Lost a race with a concurrent signup for the same address.
        Err(err) if matches!(err.downcast_ref::<DbError>(), Some(DbError::Conflict(_))) => {
            return Err(ApiError::bad_request(EMAIL_TAKEN));
        }
        Err(err) => return Err(err.into()),
    };

    info!(user_id = %user.id, role = user.role.as_str(), "user signed up");
    st.send_email(fp_providers::email::welcome(
        &user.email,
        user.name.as_deref().unwrap_or_default(),
        &st.config.public_url,
    ));

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user,
            message: SIGNUP_OK.to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// POST /v1/auth/signin
// ---------------------------------------------------------------------------

pub(crate) async fn signin(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> ApiResult<Json<SigninResponse>> {
    enforce_rate_limit(&st, "signin", &headers, st.config.signin_rule).await?;
    let Json(req) = payload?;

    let email = normalize_email(&req.email);
    let creds = fp_db::fetch_user_by_email(&st.db, &email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;
    // OAuth-only accounts have no password.
    let hash = creds
        .password_hash
        .ok_or_else(|| ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))?;

    let plain = req.password;
    let ok = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| ApiError::internal("password check failed", e))?;
    if !ok {
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let user = creds.user;
    let token = st
        .sessions
        .issue(user.id, user.role)
        .map_err(|e| ApiError::internal("token issue failed", e))?;
    info!(user_id = %user.id, "user signed in");

    Ok(Json(SigninResponse {
        token,
        expires_at: Utc::now() + st.sessions.ttl(),
        user,
    }))
}

// ---------------------------------------------------------------------------
// GET /v1/auth/me
// ---------------------------------------------------------------------------

pub(crate) async fn me(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<MeResponse>> {
    let claims = authenticate(&st, &headers)?;
    let user = fp_db::fetch_user(&st.db, claims.user_id()).await?;
    Ok(Json(MeResponse { user }))
}
