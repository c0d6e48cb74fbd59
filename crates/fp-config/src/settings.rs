//! Typed view over the merged config JSON.
//!
//! Every section and field has a default so an empty config boots a local
//! development server. Fields ending in `_env` hold environment variable
//! NAMES; [`crate::secrets::resolve_secrets`] reads the values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub payments: PaymentSettings,
    pub storage: StorageSettings,
    pub uploads: UploadSettings,
    pub maps: MapSettings,
    pub email: EmailSettings,
    pub rate_limit: RateLimitSettings,
    pub orders: OrderSettings,
}

impl Settings {
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        serde_json::from_value(config_json.clone()).context("config does not match settings schema")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub addr: String,
    /// Externally visible base URL (checkout redirects, emails, sitemap).
    pub public_url: String,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            public_url: "http://localhost:3000".to_string(),
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub secret_env: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_env: "FANPLACE_AUTH_SECRET".to_string(),
            token_ttl_hours: 24 * 7,
            bcrypt_cost: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentSettings {
    /// "stripe" | "toss"
    pub provider: String,
    pub currency: String,
    pub stripe: StripeSettings,
    pub toss: TossSettings,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            provider: "stripe".to_string(),
            currency: "KRW".to_string(),
            stripe: StripeSettings::default(),
            toss: TossSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeSettings {
    pub api_base: String,
    pub secret_key_env: String,
    pub webhook_secret_env: String,
    pub webhook_tolerance_secs: i64,
    /// Line-item name shown on the hosted checkout page.
    pub product_name: String,
}

impl Default for StripeSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.stripe.com".to_string(),
            secret_key_env: "STRIPE_SECRET_KEY".to_string(),
            webhook_secret_env: "STRIPE_WEBHOOK_SECRET".to_string(),
            webhook_tolerance_secs: 300,
            product_name: "팬덤 광고 상품".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TossSettings {
    pub api_base: String,
    pub secret_key_env: String,
}

impl Default for TossSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.tosspayments.com".to_string(),
            secret_key_env: "TOSS_SECRET_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// "local" | "s3"
    pub provider: String,
    pub upload_dir: String,
    /// URL prefix the local upload dir is served under.
    pub public_base: String,
    pub s3: S3Settings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            provider: "local".to_string(),
            upload_dir: "./public/uploads".to_string(),
            public_base: "/uploads".to_string(),
            s3: S3Settings::default(),
        }
    }
}

/// Credentials come from the standard AWS_* environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub cdn_domain: Option<String>,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            cdn_domain: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub max_bytes: usize,
    pub default_folder: String,
    pub cloudinary: CloudinarySettings,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            default_folder: "fanplace".to_string(),
            cloudinary: CloudinarySettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudinarySettings {
    pub cloud_name_env: String,
    pub api_key_env: String,
    pub api_secret_env: String,
}

impl Default for CloudinarySettings {
    fn default() -> Self {
        Self {
            cloud_name_env: "CLOUDINARY_CLOUD_NAME".to_string(),
            api_key_env: "CLOUDINARY_API_KEY".to_string(),
            api_secret_env: "CLOUDINARY_API_SECRET".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// "mapbox" | "mock"
    pub provider: String,
    pub token_env: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            token_env: "MAPBOX_TOKEN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub from: String,
    pub api_base: String,
    pub api_key_env: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            from: "FanPlace <noreply@fanplace.com>".to_string(),
            api_base: "https://api.resend.com".to_string(),
            api_key_env: "RESEND_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateRule {
    pub limit: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub url_env: String,
    pub token_env: String,
    pub signup: RateRule,
    pub signin: RateRule,
    pub inquiry: RateRule,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            url_env: "UPSTASH_REDIS_REST_URL".to_string(),
            token_env: "UPSTASH_REDIS_REST_TOKEN".to_string(),
            signup: RateRule {
                limit: 5,
                window_secs: 60,
            },
            signin: RateRule {
                limit: 10,
                window_secs: 60,
            },
            inquiry: RateRule {
                limit: 10,
                window_secs: 60,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderSettings {
    /// PENDING orders older than this are swept to REJECTED.
    pub pending_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            // Stripe checkout sessions expire after 24h.
            pending_ttl_minutes: 24 * 60,
            sweep_interval_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_defaults() {
        let s = Settings::from_config_json(&serde_json::json!({})).unwrap();
        assert_eq!(s.payments.provider, "stripe");
        assert_eq!(s.payments.currency, "KRW");
        assert_eq!(s.storage.provider, "local");
        assert_eq!(s.maps.provider, "mock");
        assert_eq!(s.auth.bcrypt_cost, 12);
        assert_eq!(s.uploads.max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn partial_section_keeps_remaining_defaults() {
        let s = Settings::from_config_json(&serde_json::json!({
            "payments": { "provider": "toss" },
            "rate_limit": { "signup": { "limit": 2, "window_secs": 30 } }
        }))
        .unwrap();
        assert_eq!(s.payments.provider, "toss");
        assert_eq!(s.payments.stripe.webhook_tolerance_secs, 300);
        assert_eq!(s.rate_limit.signup.limit, 2);
        assert_eq!(s.rate_limit.signin.limit, 10);
    }

    #[test]
    fn wrong_type_is_an_error() {
        let err = Settings::from_config_json(&serde_json::json!({
            "orders": { "pending_ttl_minutes": "soon" }
        }));
        assert!(err.is_err());
    }
}
