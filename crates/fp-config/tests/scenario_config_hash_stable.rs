//! Config hash stability.
//!
//! GREEN when:
//! - the same YAML hashes identically across calls,
//! - reordering keys does not change the hash,
//! - an overlay layer overrides the base and changes the hash.

use fp_config::{load_layered_yaml, load_layered_yaml_from_strings, load_settings};

const BASE_YAML: &str = r#"
server:
  addr: "0.0.0.0:8080"
  public_url: "https://fanplace.com"
payments:
  provider: "stripe"
  stripe:
    secret_key_env: "STRIPE_SECRET_KEY"
    webhook_secret_env: "STRIPE_WEBHOOK_SECRET"
"#;

const BASE_YAML_REORDERED: &str = r#"
payments:
  stripe:
    webhook_secret_env: "STRIPE_WEBHOOK_SECRET"
    secret_key_env: "STRIPE_SECRET_KEY"
  provider: "stripe"
server:
  public_url: "https://fanplace.com"
  addr: "0.0.0.0:8080"
"#;

const OVERLAY_YAML: &str = r#"
payments:
  provider: "toss"
orders:
  pending_ttl_minutes: 30
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(
        a.config_hash, b.config_hash,
        "key order in source YAML must not affect the hash"
    );
}

#[test]
fn overlay_overrides_base_and_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(base.config_hash, merged.config_hash);
    assert_eq!(
        merged.config_json.pointer("/payments/provider").and_then(|v| v.as_str()),
        Some("toss")
    );
    // Untouched sibling keys survive the merge.
    assert_eq!(
        merged
            .config_json
            .pointer("/payments/stripe/secret_key_env")
            .and_then(|v| v.as_str()),
        Some("STRIPE_SECRET_KEY")
    );
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn blank_documents_are_skipped() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&["", BASE_YAML, "   \n"]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn files_on_disk_load_into_typed_settings() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let overlay = dir.path().join("production.yaml");
    std::fs::write(&base, BASE_YAML).unwrap();
    std::fs::write(&overlay, OVERLAY_YAML).unwrap();

    let (loaded, settings) = load_settings(&[base.clone(), overlay.clone()]).unwrap();
    assert_eq!(settings.payments.provider, "toss");
    assert_eq!(settings.orders.pending_ttl_minutes, 30);
    assert_eq!(settings.server.public_url, "https://fanplace.com");

    let again = load_layered_yaml(&[
        base.to_str().unwrap(),
        overlay.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(loaded.config_hash, again.config_hash);
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let err = load_layered_yaml(&[missing.to_str().unwrap()]).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read yaml path"));
}
