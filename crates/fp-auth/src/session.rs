//! Signed session tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use fp_schemas::Role;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing session token")]
    Missing,
    #[error("session expired")]
    Expired,
    #[error("invalid session token")]
    Invalid,
    #[error("role {0} is not allowed here")]
    Forbidden(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id.
    pub sub: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins pass every role check.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AuthError> {
        if self.is_admin() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AuthError::Forbidden(self.role.as_str()))
        }
    }

    pub fn require_admin(&self) -> Result<(), AuthError> {
        self.require_role(&[Role::Admin])
    }
}

/// HS256 signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("keys", &"<REDACTED>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| anyhow::anyhow!("session token encode failed: {e}"))
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::Expired),
                _ => Err(AuthError::Invalid),
            },
        }
    }

    /// Verify the token in an `Authorization: Bearer <token>` header value.
    pub fn verify_bearer(&self, header: Option<&str>) -> Result<SessionClaims, AuthError> {
        let raw = header.ok_or(AuthError::Missing)?;
        let token = raw
            .strip_prefix("Bearer ")
            .or_else(|| raw.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Missing)?;
        self.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("unit-test-secret", Duration::hours(1))
    }

    #[test]
    fn issued_token_round_trips_claims() {
        let k = keys();
        let id = Uuid::new_v4();
        let token = k.issue(id, Role::Advertiser).unwrap();
        let claims = k.verify(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Advertiser);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_invalid() {
        let other = SessionKeys::new("someone-else", Duration::hours(1));
        let token = other.issue(Uuid::new_v4(), Role::Admin).unwrap();
        assert_eq!(keys().verify(&token), Err(AuthError::Invalid));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let k = SessionKeys::new("unit-test-secret", Duration::seconds(-120));
        let token = k.issue(Uuid::new_v4(), Role::Fan).unwrap();
        assert_eq!(k.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn bearer_header_parsing() {
        let k = keys();
        let token = k.issue(Uuid::new_v4(), Role::Fan).unwrap();
        assert!(k.verify_bearer(Some(&format!("Bearer {token}"))).is_ok());
        assert_eq!(k.verify_bearer(None), Err(AuthError::Missing));
        assert_eq!(k.verify_bearer(Some("Basic abc")), Err(AuthError::Missing));
        assert_eq!(k.verify_bearer(Some("Bearer ")), Err(AuthError::Missing));
        assert_eq!(k.verify_bearer(Some("Bearer junk")), Err(AuthError::Invalid));
    }

    #[test]
    fn admin_passes_every_role_check() {
        let admin = SessionClaims {
            sub: Uuid::new_v4(),
            role: Role::Admin,
            exp: 0,
            iat: 0,
        };
        assert!(admin.require_role(&[Role::Advertiser]).is_ok());

        let fan = SessionClaims {
            role: Role::Fan,
            ..admin
        };
        assert_eq!(fan.require_admin(), Err(AuthError::Forbidden("FAN")));
        assert!(fan.require_role(&[Role::Fan, Role::Promoter]).is_ok());
    }
}
