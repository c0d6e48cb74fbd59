//! Fixed-window rate limiting on Upstash Redis (REST).
//!
//! The limiter fails open: if Redis is unreachable or answers garbage the
//! request is allowed and a warning is logged.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use fp_config::secrets::UpstashCredentials;

pub const KEY_PREFIX: &str = "rate_limit:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix millis when the window resets.
    pub reset_ms: i64,
}

impl RateDecision {
    fn open(limit: u32, window: Duration, now_ms: i64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining: limit,
            reset_ms: now_ms + window.as_millis() as i64,
        }
    }

    /// Seconds until reset, at least 1. Used for `Retry-After`.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let ms = (self.reset_ms - now_ms).max(0) as u64;
        ms.div_ceil(1000).max(1)
    }
}

#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    fn name(&self) -> &'static str;
    async fn check(&self, identifier: &str, limit: u32, window: Duration) -> RateDecision;
}

/// Everything passes. Used when Upstash is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLimiter;

#[async_trait::async_trait]
impl RateLimiter for NoopLimiter {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn check(&self, _identifier: &str, limit: u32, window: Duration) -> RateDecision {
        RateDecision::open(limit, window, chrono::Utc::now().timestamp_millis())
    }
}

pub struct UpstashLimiter {
    creds: UpstashCredentials,
    http: reqwest::Client,
}

impl std::fmt::Debug for UpstashLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashLimiter")
            .field("creds", &self.creds)
            .finish()
    }
}

#[derive(Deserialize)]
struct CommandResponse {
    result: Option<Value>,
    error: Option<String>,
}

impl UpstashLimiter {
    pub fn new(creds: UpstashCredentials) -> Self {
        Self {
            creds,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn command(&self, args: Value) -> Result<i64> {
        let resp = self
            .http
            .post(self.creds.url.trim_end_matches('/'))
            .bearer_auth(&self.creds.token)
            .json(&args)
            .send()
            .await
            .context("upstash request failed")?;
        let status = resp.status();
        let body: CommandResponse = resp.json().await.context("upstash decode failed")?;
        if let Some(err) = body.error {
            bail!("upstash error status={}: {}", status.as_u16(), err);
        }
        body.result
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow!("upstash returned non-integer result"))
    }

    async fn try_check(&self, key: &str, limit: u32, window_ms: i64, now_ms: i64) -> Result<RateDecision> {
        let count = self.command(json!(["INCR", key])).await?;
        if count == 1 {
            self.command(json!(["PEXPIRE", key, window_ms])).await?;
        }
        let mut ttl = self.command(json!(["PTTL", key])).await?;
        if ttl == -1 {
            // Counter without expiry: the first PEXPIRE was lost. Re-arm it
            // or the key would block this client forever.
            self.command(json!(["PEXPIRE", key, window_ms])).await?;
            ttl = window_ms;
        }

        let reset_ms = now_ms + if ttl > 0 { ttl } else { window_ms };
        let remaining = (i64::from(limit) - count).max(0) as u32;
        Ok(RateDecision {
            allowed: count <= i64::from(limit),
            limit,
            remaining,
            reset_ms,
        })
    }
}

#[async_trait::async_trait]
impl RateLimiter for UpstashLimiter {
    fn name(&self) -> &'static str {
        "upstash"
    }

    async fn check(&self, identifier: &str, limit: u32, window: Duration) -> RateDecision {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let key = format!("{KEY_PREFIX}{identifier}");
        let window_ms = window.as_millis() as i64;

        match self.try_check(&key, limit, window_ms, now_ms).await {
            Ok(d) => d,
            Err(err) => {
                warn!(error = %err, key = %key, "rate limit check failed; allowing request");
                RateDecision::open(limit, window, now_ms)
            }
        }
    }
}

pub fn build_rate_limiter(creds: Option<&UpstashCredentials>) -> std::sync::Arc<dyn RateLimiter> {
    match creds {
        Some(c) => std::sync::Arc::new(UpstashLimiter::new(c.clone())),
        None => std::sync::Arc::new(NoopLimiter),
    }
}

/// First `x-forwarded-for` entry, else `unknown`.
pub fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn client_ip_takes_first_forwarded_hop() {
        let mut h = HeaderMap::new();
        assert_eq!(client_ip(&h), "unknown");
        h.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&h), "203.0.113.7");
        h.insert("x-forwarded-for", HeaderValue::from_static(" , 10.0.0.1"));
        assert_eq!(client_ip(&h), "unknown");
    }

    #[test]
    fn retry_after_rounds_up() {
        let d = RateDecision {
            allowed: false,
            limit: 5,
            remaining: 0,
            reset_ms: 10_500,
        };
        assert_eq!(d.retry_after_secs(9_000), 2);
        assert_eq!(d.retry_after_secs(20_000), 1);
    }

    #[tokio::test]
    async fn noop_always_allows() {
        let d = NoopLimiter.check("ip", 3, Duration::from_secs(60)).await;
        assert!(d.allowed);
        assert_eq!(d.remaining, 3);
    }
}
