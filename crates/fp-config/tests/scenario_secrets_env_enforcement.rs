//! Environment-aware secret enforcement.
//!
//! All tests point the settings at sentinel env var names that are never
//! set anywhere, so no test needs `std::env::set_var`.

use fp_config::secrets::{resolve_secrets, DEV_AUTH_SECRET};
use fp_config::{load_layered_yaml_from_strings, AppEnv, Settings};

fn settings(yaml: &str) -> Settings {
    let loaded = load_layered_yaml_from_strings(&[yaml]).expect("test yaml must parse");
    Settings::from_config_json(&loaded.config_json).expect("test yaml must match schema")
}

const ALL_SENTINELS: &str = r#"
auth:
  secret_env: "FP_SENTINEL_AUTH_MISSING_Q1"
payments:
  provider: "stripe"
  stripe:
    secret_key_env: "FP_SENTINEL_STRIPE_KEY_MISSING_Q1"
    webhook_secret_env: "FP_SENTINEL_STRIPE_WHSEC_MISSING_Q1"
  toss:
    secret_key_env: "FP_SENTINEL_TOSS_KEY_MISSING_Q1"
uploads:
  cloudinary:
    cloud_name_env: "FP_SENTINEL_CL_NAME_MISSING_Q1"
    api_key_env: "FP_SENTINEL_CL_KEY_MISSING_Q1"
    api_secret_env: "FP_SENTINEL_CL_SECRET_MISSING_Q1"
maps:
  token_env: "FP_SENTINEL_MAPBOX_MISSING_Q1"
email:
  api_key_env: "FP_SENTINEL_RESEND_MISSING_Q1"
rate_limit:
  url_env: "FP_SENTINEL_UPSTASH_URL_MISSING_Q1"
  token_env: "FP_SENTINEL_UPSTASH_TOKEN_MISSING_Q1"
"#;

#[test]
fn production_fails_closed_without_auth_secret() {
    let s = settings(ALL_SENTINELS);
    let msg = resolve_secrets(&s, AppEnv::Production).unwrap_err().to_string();
    assert!(msg.contains("SECRETS_MISSING"), "got: {msg}");
    assert!(msg.contains("env=production"), "got: {msg}");
    assert!(msg.contains("FP_SENTINEL_AUTH_MISSING_Q1"), "got: {msg}");
}

#[test]
fn production_with_unknown_provider_is_rejected() {
    // PATH is always set, so the auth check passes and the provider check runs.
    let mut s = settings(ALL_SENTINELS);
    s.auth.secret_env = "PATH".to_string();
    s.payments.provider = "paypal".to_string();
    let msg = resolve_secrets(&s, AppEnv::Production).unwrap_err().to_string();
    assert!(msg.contains("SECRETS_UNKNOWN_PROVIDER"), "got: {msg}");
}

#[test]
fn production_stripe_requires_secret_key() {
    let mut s = settings(ALL_SENTINELS);
    s.auth.secret_env = "PATH".to_string();
    let msg = resolve_secrets(&s, AppEnv::Production).unwrap_err().to_string();
    assert!(msg.contains("FP_SENTINEL_STRIPE_KEY_MISSING_Q1"), "got: {msg}");
}

#[test]
fn production_stripe_requires_webhook_secret() {
    let mut s = settings(ALL_SENTINELS);
    s.auth.secret_env = "PATH".to_string();
    s.payments.stripe.secret_key_env = "PATH".to_string();
    let msg = resolve_secrets(&s, AppEnv::Production).unwrap_err().to_string();
    assert!(msg.contains("FP_SENTINEL_STRIPE_WHSEC_MISSING_Q1"), "got: {msg}");
}

#[test]
fn production_toss_requires_toss_key_only() {
    let mut s = settings(ALL_SENTINELS);
    s.auth.secret_env = "PATH".to_string();
    s.payments.provider = "toss".to_string();
    let msg = resolve_secrets(&s, AppEnv::Production).unwrap_err().to_string();
    assert!(msg.contains("FP_SENTINEL_TOSS_KEY_MISSING_Q1"), "got: {msg}");

    s.payments.toss.secret_key_env = "PATH".to_string();
    let ok = resolve_secrets(&s, AppEnv::Production).expect("toss needs no webhook secret");
    assert!(ok.toss_secret_key.is_some());
    assert!(ok.stripe_webhook_secret.is_none());
}

#[test]
fn development_succeeds_with_nothing_set() {
    let s = settings(ALL_SENTINELS);
    let r = resolve_secrets(&s, AppEnv::Development).expect("development requires nothing");
    assert_eq!(r.auth_secret, DEV_AUTH_SECRET);
    assert!(r.stripe_secret_key.is_none());
    assert!(r.cloudinary.is_none());
    assert!(r.upstash.is_none());
    assert!(r.mapbox_token.is_none());
    assert!(r.resend_api_key.is_none());
}

#[test]
fn partial_cloudinary_credentials_disable_the_integration() {
    let mut s = settings(ALL_SENTINELS);
    s.uploads.cloudinary.cloud_name_env = "PATH".to_string();
    s.uploads.cloudinary.api_key_env = "PATH".to_string();
    let r = resolve_secrets(&s, AppEnv::Development).unwrap();
    assert!(r.cloudinary.is_none());
}

#[test]
fn debug_output_is_redacted() {
    let mut s = settings(ALL_SENTINELS);
    s.auth.secret_env = "PATH".to_string();
    s.maps.token_env = "PATH".to_string();
    let r = resolve_secrets(&s, AppEnv::Development).unwrap();
    let path = std::env::var("PATH").unwrap();

    let dbg = format!("{r:?}");
    assert!(dbg.contains("<REDACTED>"));
    assert!(!dbg.contains(&path), "secret value leaked into Debug output");
}
