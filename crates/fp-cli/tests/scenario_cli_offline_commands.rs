//! Scenario: commands that must work, or fail cleanly, without a database.
//!
//! Every invocation runs from an empty temp dir so a developer's
//! `.env.local` cannot leak a database URL into the test.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn fanplace(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fanplace").expect("fanplace binary");
    cmd.current_dir(dir.path())
        .env_remove(fp_db::ENV_DB_URL)
        .env_remove(fp_config::ENV_CONFIG_PATHS)
        .env_remove(fp_config::ENV_APP_ENV);
    cmd
}

#[test]
fn help_lists_operator_commands() {
    let dir = tempfile::tempdir().unwrap();
    fanplace(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("config-hash"))
        .stdout(predicate::str::contains("seed"))
        .stdout(predicate::str::contains("orders"));
}

#[test]
fn config_hash_merges_overlay_over_base() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let prod = dir.path().join("production.yaml");
    std::fs::write(&base, "server:\n  addr: \"0.0.0.0:8080\"\n  public_url: \"http://localhost:3000\"\n").unwrap();
    std::fs::write(&prod, "server:\n  public_url: \"https://fanplace.kr\"\n").unwrap();

    let out = fanplace(&dir)
        .args(["config-hash"])
        .arg(&base)
        .arg(&prod)
        .output()
        .unwrap();
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    let mut lines = stdout.lines();
    let hash = lines.next().unwrap().strip_prefix("config_hash=").unwrap();
    assert_eq!(hash.len(), 64);
    let json: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
    assert_eq!(json["server"]["public_url"], "https://fanplace.kr");
    assert_eq!(json["server"]["addr"], "0.0.0.0:8080");
}

#[test]
fn config_hash_refuses_secret_literals() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    std::fs::write(&base, "payments:\n  stripe:\n    secret_key_env: \"sk_live_abc123\"\n").unwrap();

    fanplace(&dir)
        .arg("config-hash")
        .arg(&base)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("sk_live_abc123").not());
}

#[test]
fn db_status_without_url_names_the_env_var() {
    let dir = tempfile::tempdir().unwrap();
    fanplace(&dir)
        .args(["db", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FANPLACE_DATABASE_URL"));
}

#[test]
fn admin_create_validates_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    fanplace(&dir)
        .args(["admin", "create", "--email", "ops", "--name", "운영자", "--password", "hunter22"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--email"));
}

#[test]
fn expire_stale_rejects_non_positive_ttl() {
    let dir = tempfile::tempdir().unwrap();
    fanplace(&dir)
        .args(["orders", "expire-stale", "--ttl-minutes", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--ttl-minutes must be positive"));
}

#[test]
fn refund_rejects_malformed_order_id() {
    let dir = tempfile::tempdir().unwrap();
    fanplace(&dir)
        .args(["orders", "refund", "--order-id", "not-a-uuid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid order_id uuid"));
}
