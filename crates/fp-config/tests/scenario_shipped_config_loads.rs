use std::path::{Path, PathBuf};

use fp_config::{load_settings, report_unused_keys, UnusedKeyPolicy};

/// The YAML layers checked into `config/` must parse into `Settings`
/// with no unknown keys, since production boots with `UnusedKeyPolicy::Fail`.

fn config_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config")
}

#[test]
fn production_layers_are_clean() {
    let dir = config_dir();
    let paths = vec![dir.join("base.yaml"), dir.join("production.yaml")];
    let (loaded, settings) = load_settings(&paths).expect("shipped config must load");

    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail)
        .expect("no unused keys in shipped config");
    assert!(report.is_clean());

    assert_eq!(settings.server.addr, "0.0.0.0:8080");
    assert_eq!(settings.storage.provider, "s3");
    assert_eq!(settings.payments.currency, "KRW");
    assert_eq!(settings.auth.secret_env, "FANPLACE_AUTH_SECRET");
}

#[test]
fn development_overlay_keeps_base_values() {
    let dir = config_dir();
    let paths = vec![dir.join("base.yaml"), dir.join("development.yaml")];
    let (_, settings) = load_settings(&paths).expect("shipped config must load");

    assert_eq!(settings.auth.bcrypt_cost, 10);
    assert_eq!(settings.orders.pending_ttl_minutes, 1440);
    assert_eq!(settings.maps.provider, "mock");
    assert_eq!(settings.rate_limit.signup.limit, 5);
}
