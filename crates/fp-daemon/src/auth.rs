//! Session checks for handlers.
//!
//! Identity always comes from the bearer token; request bodies never name
//! the acting user.

use axum::http::{header, HeaderMap};

use fp_auth::{AuthError, SessionClaims};
use fp_schemas::{Locale, Role};

use crate::error::ApiError;
use crate::state::AppState;

pub fn authenticate(st: &AppState, headers: &HeaderMap) -> Result<SessionClaims, ApiError> {
    let raw = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    Ok(st.sessions.verify_bearer(raw)?)
}

/// The token's role only short-circuits non-admins; the users row decides,
/// so a demotion takes effect before the token expires.
pub async fn require_admin(st: &AppState, headers: &HeaderMap) -> Result<SessionClaims, ApiError> {
    let claims = authenticate(st, headers)?;
    claims.require_admin()?;
    match fp_db::fetch_user_role(&st.db, claims.user_id()).await? {
        Some(Role::Admin) => Ok(claims),
        Some(role) => Err(AuthError::Forbidden(role.as_str()).into()),
        None => Err(AuthError::Invalid.into()),
    }
}

/// Admin per the users row. Non-admin tokens never reach the database.
pub async fn is_current_admin(st: &AppState, claims: &SessionClaims) -> Result<bool, ApiError> {
    if !claims.is_admin() {
        return Ok(false);
    }
    Ok(fp_db::fetch_user_role(&st.db, claims.user_id()).await? == Some(Role::Admin))
}

/// `?locale=` wins, then `Accept-Language`, then Korean.
pub fn request_locale(query: Option<&str>, headers: &HeaderMap) -> Locale {
    if let Some(l) = query.and_then(Locale::parse) {
        return l;
    }
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .and_then(Locale::from_accept_language)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn locale_precedence() {
        let mut h = HeaderMap::new();
        assert_eq!(request_locale(None, &h), Locale::Ko);

        h.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static("ja-JP,en;q=0.5"));
        assert_eq!(request_locale(None, &h), Locale::Ja);
        assert_eq!(request_locale(Some("en"), &h), Locale::En);
        assert_eq!(request_locale(Some("fr"), &h), Locale::Ja);
    }
}
