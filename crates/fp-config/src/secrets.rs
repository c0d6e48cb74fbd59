//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (e.g. `"STRIPE_SECRET_KEY"`).
//! - At startup, callers invoke [`resolve_secrets`] once and pass the
//!   returned [`ResolvedSecrets`] into constructors; never scatter
//!   `std::env::var` calls across the codebase.
//! - `Debug` impls redact values.
//! - Error messages reference the env var NAME, never the value.
//!
//! # Environment-aware enforcement
//! | env         | required |
//! |-------------|----------|
//! | production  | auth secret; payment secret for the selected provider; Stripe webhook secret when provider is Stripe |
//! | development | nothing; a missing auth secret falls back to a fixed dev key |
//!
//! Cloudinary, Mapbox, Resend and Upstash are optional everywhere; a
//! missing value disables that integration.

use anyhow::{bail, Result};
use tracing::warn;

use crate::settings::Settings;
use crate::AppEnv;

/// Signing key used when no auth secret is configured in development.
/// Tokens signed with it are rejected by any production deployment.
pub const DEV_AUTH_SECRET: &str = "fanplace-development-only-signing-key";

#[derive(Clone)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CloudinaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // cloud_name and api_key are published to the browser; only the secret is sensitive.
        f.debug_struct("CloudinaryCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<REDACTED>")
            .finish()
    }
}

#[derive(Clone)]
pub struct UpstashCredentials {
    pub url: String,
    pub token: String,
}

impl std::fmt::Debug for UpstashCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstashCredentials")
            .field("url", &self.url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

/// All runtime-resolved secrets for one server instance.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub auth_secret: String,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub toss_secret_key: Option<String>,
    pub cloudinary: Option<CloudinaryCredentials>,
    pub mapbox_token: Option<String>,
    pub resend_api_key: Option<String>,
    pub upstash: Option<UpstashCredentials>,
}

fn redact<T>(v: &Option<T>) -> Option<&'static str> {
    v.as_ref().map(|_| "<REDACTED>")
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("auth_secret", &"<REDACTED>")
            .field("stripe_secret_key", &redact(&self.stripe_secret_key))
            .field("stripe_webhook_secret", &redact(&self.stripe_webhook_secret))
            .field("toss_secret_key", &redact(&self.toss_secret_key))
            .field("cloudinary", &self.cloudinary)
            .field("mapbox_token", &redact(&self.mapbox_token))
            .field("resend_api_key", &redact(&self.resend_api_key))
            .field("upstash", &self.upstash)
            .finish()
    }
}

impl ResolvedSecrets {
    /// Development defaults with nothing configured.
    pub fn development() -> Self {
        Self {
            auth_secret: DEV_AUTH_SECRET.to_string(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            toss_secret_key: None,
            cloudinary: None,
            mapbox_token: None,
            resend_api_key: None,
            upstash: None,
        }
    }
}

/// Resolve a named environment variable.
/// Returns `None` if the variable is unset or its value is blank.
fn resolve_env(var_name: &str) -> Option<String> {
    match std::env::var(var_name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn require(env: AppEnv, var: &str, what: &str, value: &Option<String>) -> Result<()> {
    if value.is_none() {
        bail!(
            "SECRETS_MISSING env={}: required env var '{}' ({}) is not set or empty",
            env.as_str(),
            var,
            what,
        );
    }
    Ok(())
}

/// Resolve all secrets from the environment.
///
/// # Errors
/// Returns `Err` naming the env var of the first missing required secret.
pub fn resolve_secrets(settings: &Settings, env: AppEnv) -> Result<ResolvedSecrets> {
    let auth_var = &settings.auth.secret_env;
    let stripe = &settings.payments.stripe;
    let toss = &settings.payments.toss;

    let auth_secret = resolve_env(auth_var);
    let stripe_secret_key = resolve_env(&stripe.secret_key_env);
    let stripe_webhook_secret = resolve_env(&stripe.webhook_secret_env);
    let toss_secret_key = resolve_env(&toss.secret_key_env);

    if env == AppEnv::Production {
        require(env, auth_var, "auth signing secret", &auth_secret)?;
        match settings.payments.provider.as_str() {
            "stripe" => {
                require(env, &stripe.secret_key_env, "Stripe secret key", &stripe_secret_key)?;
                require(
                    env,
                    &stripe.webhook_secret_env,
                    "Stripe webhook secret",
                    &stripe_webhook_secret,
                )?;
            }
            "toss" => {
                require(env, &toss.secret_key_env, "TossPayments secret key", &toss_secret_key)?;
            }
            other => bail!(
                "SECRETS_UNKNOWN_PROVIDER: payments.provider '{}'; expected one of: stripe | toss",
                other
            ),
        }
    }

    let auth_secret = match auth_secret {
        Some(s) => s,
        None => {
            warn!(var = %auth_var, "auth secret not set; using development signing key");
            DEV_AUTH_SECRET.to_string()
        }
    };

    let cl = &settings.uploads.cloudinary;
    let cloudinary = match (
        resolve_env(&cl.cloud_name_env),
        resolve_env(&cl.api_key_env),
        resolve_env(&cl.api_secret_env),
    ) {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryCredentials {
            cloud_name,
            api_key,
            api_secret,
        }),
        _ => None,
    };

    let rl = &settings.rate_limit;
    let upstash = match (resolve_env(&rl.url_env), resolve_env(&rl.token_env)) {
        (Some(url), Some(token)) => Some(UpstashCredentials { url, token }),
        _ => None,
    };

    Ok(ResolvedSecrets {
        auth_secret,
        stripe_secret_key,
        stripe_webhook_secret,
        toss_secret_key,
        cloudinary,
        mapbox_token: resolve_env(&settings.maps.token_env),
        resend_api_key: resolve_env(&settings.email.api_key_env),
        upstash,
    })
}
