//! Shared runtime state for fp-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Providers sit behind
//! trait objects so tests can swap in fakes after construction.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use fp_auth::SessionKeys;
use fp_config::secrets::ResolvedSecrets;
use fp_config::settings::{RateRule, Settings};
use fp_config::AppEnv;
use fp_payments::PaymentProvider;
use fp_providers::{MapProvider, Mailer, RateLimiter};
use fp_storage::{CloudinarySigner, StorageProvider};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    OrderUpdated {
        order_id: Uuid,
        order_number: String,
        status: String,
    },
    ReviewSubmitted {
        review_id: Uuid,
        order_id: Uuid,
    },
    ReviewDecided {
        review_id: Uuid,
        order_id: Uuid,
        status: String,
    },
    InquiryCreated {
        inquiry_id: Uuid,
        place_id: Uuid,
    },
    InquiryUpdated {
        inquiry_id: Uuid,
        status: String,
    },
    OrdersExpired {
        count: usize,
    },
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::OrderUpdated { .. } | BusMsg::OrdersExpired { .. } => "order",
            BusMsg::ReviewSubmitted { .. } | BusMsg::ReviewDecided { .. } => "review",
            BusMsg::InquiryCreated { .. } | BusMsg::InquiryUpdated { .. } => "inquiry",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health / status responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// The slice of [`Settings`] handlers read per request.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub env: AppEnv,
    pub public_url: String,
    pub currency: String,
    pub bcrypt_cost: u32,
    pub upload_max_bytes: usize,
    pub upload_default_folder: String,
    pub signup_rule: RateRule,
    pub signin_rule: RateRule,
    pub inquiry_rule: RateRule,
    pub webhook_tolerance_secs: i64,
    /// Set when uploads land on local disk and are served by this process.
    pub local_uploads: Option<LocalUploads>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalUploads {
    pub dir: String,
    /// Path prefix, e.g. `/uploads`.
    pub mount: String,
}

impl LocalUploads {
    /// `None` unless the local backend is active and its public base is a
    /// path on this host (an absolute URL means something else serves it).
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let storage = &settings.storage;
        if storage.provider != "local" {
            return None;
        }
        let mount = storage.public_base.trim().trim_end_matches('/');
        if !mount.starts_with('/') || mount.len() < 2 {
            return None;
        }
        Some(Self {
            dir: storage.upload_dir.clone(),
            mount: mount.to_string(),
        })
    }
}

impl AppConfig {
    pub fn from_settings(settings: &Settings, env: AppEnv) -> Self {
        Self {
            env,
            public_url: settings.server.public_url.trim_end_matches('/').to_string(),
            currency: settings.payments.currency.clone(),
            bcrypt_cost: settings.auth.bcrypt_cost,
            upload_max_bytes: settings.uploads.max_bytes,
            upload_default_folder: settings.uploads.default_folder.clone(),
            signup_rule: settings.rate_limit.signup,
            signin_rule: settings.rate_limit.signin,
            inquiry_rule: settings.rate_limit.inquiry,
            webhook_tolerance_secs: settings.payments.stripe.webhook_tolerance_secs,
            local_uploads: LocalUploads::from_settings(settings),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub config: AppConfig,
    pub db: PgPool,
    pub sessions: SessionKeys,
    pub payments: Arc<dyn PaymentProvider>,
    pub storage: Arc<dyn StorageProvider>,
    /// None when Cloudinary credentials are absent.
    pub cloudinary: Option<CloudinarySigner>,
    pub maps: Arc<dyn MapProvider>,
    pub mailer: Arc<dyn Mailer>,
    pub limiter: Arc<dyn RateLimiter>,
    pub stripe_webhook_secret: Option<String>,
}

impl AppState {
    /// Wire every provider from config. The pool may be lazy; nothing here
    /// touches the network.
    pub fn from_settings(
        settings: &Settings,
        secrets: &ResolvedSecrets,
        env: AppEnv,
        db: PgPool,
    ) -> Result<Self> {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        let payments = fp_payments::build_provider(&settings.payments, secrets)
            .context("payment provider setup failed")?;
        let storage =
            fp_storage::build_storage(&settings.storage).context("storage setup failed")?;

        Ok(Self {
            bus,
            build: BuildInfo {
                service: "fp-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config: AppConfig::from_settings(settings, env),
            db,
            sessions: SessionKeys::new(
                &secrets.auth_secret,
                chrono::Duration::hours(settings.auth.token_ttl_hours),
            ),
            payments,
            storage,
            cloudinary: secrets.cloudinary.clone().map(CloudinarySigner::new),
            maps: fp_providers::build_map_provider(&settings.maps, secrets),
            mailer: fp_providers::build_mailer(&settings.email, secrets.resend_api_key.as_deref()),
            limiter: fp_providers::build_rate_limiter(secrets.upstash.as_ref()),
            stripe_webhook_secret: secrets.stripe_webhook_secret.clone(),
        })
    }

    /// Best effort publish; no subscribers is not an error.
    pub fn publish(&self, msg: BusMsg) {
        let _ = self.bus.send(msg);
    }

    /// Fire-and-forget email. Failures are logged, never surfaced.
    pub fn send_email(&self, email: fp_providers::Email) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&email).await {
                warn!(error = %err, subject = %email.subject, "email send failed");
            }
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Monotonically increasing uptime since first call (process lifetime).
pub fn uptime_secs() -> u64 {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START
        .get_or_init(std::time::Instant::now)
        .elapsed()
        .as_secs()
}

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn a background task that rejects PENDING orders older than `ttl`.
///
/// Abandoned checkouts otherwise stay PENDING forever when the provider
/// never sends an expiry webhook.
pub fn spawn_order_sweeper(state: Arc<AppState>, interval: Duration, ttl: chrono::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match fp_db::expire_stale_pending_orders(&state.db, ttl).await {
                Ok(ids) if ids.is_empty() => {}
                Ok(ids) => {
                    info!(count = ids.len(), "stale pending orders rejected");
                    state.publish(BusMsg::OrdersExpired { count: ids.len() });
                }
                Err(err) => warn!(error = %err, "pending order sweep failed"),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_messages_map_to_domain_event_names() {
        let id = Uuid::new_v4();
        let msgs = [
            BusMsg::Heartbeat { ts_millis: 1 },
            BusMsg::OrderUpdated {
                order_id: id,
                order_number: "ORD-20300101-ABCDEF12".to_string(),
                status: "PAID".to_string(),
            },
            BusMsg::OrdersExpired { count: 2 },
            BusMsg::ReviewSubmitted {
                review_id: id,
                order_id: id,
            },
            BusMsg::ReviewDecided {
                review_id: id,
                order_id: id,
                status: "APPROVED".to_string(),
            },
            BusMsg::InquiryCreated {
                inquiry_id: id,
                place_id: id,
            },
            BusMsg::InquiryUpdated {
                inquiry_id: id,
                status: "CONNECTED".to_string(),
            },
        ];
        let names: Vec<&str> = msgs.iter().map(BusMsg::event_name).collect();
        assert_eq!(
            names,
            ["heartbeat", "order", "order", "review", "review", "inquiry", "inquiry"]
        );
    }

    #[test]
    fn local_uploads_mount_only_for_local_paths() {
        let mut settings = Settings::default();
        assert_eq!(
            LocalUploads::from_settings(&settings),
            Some(LocalUploads {
                dir: "./public/uploads".to_string(),
                mount: "/uploads".to_string(),
            })
        );

        settings.storage.public_base = "https://static.fanplace.com/uploads".to_string();
        assert_eq!(LocalUploads::from_settings(&settings), None);

        settings.storage.public_base = "/".to_string();
        assert_eq!(LocalUploads::from_settings(&settings), None);

        settings.storage.public_base = "/uploads/".to_string();
        settings.storage.provider = "s3".to_string();
        assert_eq!(LocalUploads::from_settings(&settings), None);
    }

    #[test]
    fn bus_message_payload_is_tagged() {
        let v = serde_json::to_value(BusMsg::OrdersExpired { count: 3 }).unwrap();
        assert_eq!(v, serde_json::json!({"type": "orders_expired", "count": 3}));
    }
}
