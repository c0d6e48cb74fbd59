//! Layered YAML configuration for FanPlace.
//!
//! YAML documents are merged in order (base first, environment overlay
//! last), converted to JSON, checked for literal secrets, and hashed so a
//! running server can report exactly which configuration it booted with.
//! Secret VALUES never live in YAML; see [`secrets`].

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub mod secrets;
pub mod settings;

pub use settings::Settings;

pub const ENV_CONFIG_PATHS: &str = "FANPLACE_CONFIG";
pub const ENV_APP_ENV: &str = "FANPLACE_ENV";

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these we abort with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "sk_live",    // Stripe live secret
    "sk_test",    // Stripe test secret
    "rk_live",    // Stripe restricted key
    "whsec_",     // Stripe webhook signing secret
    "live_sk_",   // TossPayments live secret
    "test_sk_",   // TossPayments test secret
    "re_",        // Resend API key
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
];

/// Top-level sections the server reads. Any leaf outside these is reported
/// by [`report_unused_keys`].
const CONSUMED_PREFIXES: &[&str] = &[
    "/server",
    "/auth",
    "/payments",
    "/storage",
    "/uploads",
    "/maps",
    "/email",
    "/rate_limit",
    "/orders",
];

// ---------------------------------------------------------------------------
// Runtime environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnv::Development => "development",
            AppEnv::Production => "production",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            other => bail!(
                "invalid {ENV_APP_ENV} '{}'. expected one of: development | production",
                other
            ),
        }
    }

    /// Read `FANPLACE_ENV`; unset means development.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENV_APP_ENV) {
            Ok(v) if !v.trim().is_empty() => Self::parse(&v),
            _ => Ok(AppEnv::Development),
        }
    }
}

// ---------------------------------------------------------------------------
// Unused-key report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Minimal set of unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// Produce an unused-key report against the consumed-prefix registry.
/// With `Fail`, unused keys are an error; with `Warn`, always `Ok(report)`.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let consumed: BTreeSet<String> = CONSUMED_PREFIXES.iter().map(|p| normalize_pointer(p)).collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = leaves
        .into_iter()
        .filter(|lp| !consumed.iter().any(|cp| is_prefix_pointer(cp, lp)))
        .collect();
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. First few: {}",
            report.unused_leaf_pointers.len(),
            preview_list(&report.unused_leaf_pointers, 12)
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// "/a/b" consumes "/a/b" and "/a/b/c" but NOT "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    leaf.starts_with(prefix) && leaf.as_bytes().get(prefix.len()) == Some(&b'/')
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

fn preview_list(items: &[String], n: usize) -> String {
    let take = items.iter().take(n).cloned().collect::<Vec<_>>();
    format!("{:?}", take)
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    // Earlier docs are base, later docs override.
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        if raw.trim().is_empty() {
            continue;
        }
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    // serde_json::Map is a BTreeMap here (no preserve_order), so key order in
    // the source YAML does not affect the canonical form.
    let canonical_json = serde_json::to_string(&merged).context("canonical json serialize failed")?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Resolve which YAML files to load.
///
/// `FANPLACE_CONFIG` (comma-separated) wins. Otherwise `<dir>/base.yaml`
/// and `<dir>/<env>.yaml`, each only if it exists.
pub fn discover_config_paths(dir: &Path, env: AppEnv) -> Vec<PathBuf> {
    if let Ok(raw) = std::env::var(ENV_CONFIG_PATHS) {
        let explicit: Vec<PathBuf> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
    }

    [dir.join("base.yaml"), dir.join(format!("{}.yaml", env.as_str()))]
        .into_iter()
        .filter(|p| p.is_file())
        .collect()
}

/// Load the layered config and its typed view in one step.
pub fn load_settings(paths: &[PathBuf]) -> Result<(LoadedConfig, Settings)> {
    let path_strs: Vec<String> = paths.iter().map(|p| p.to_string_lossy().to_string()).collect();
    let path_refs: Vec<&str> = path_strs.iter().map(|s| s.as_str()).collect();
    let loaded = load_layered_yaml(&path_refs)?;
    let settings = Settings::from_config_json(&loaded.config_json)?;
    Ok((loaded, settings))
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(s) = v.pointer(&ptr).and_then(Value::as_str) {
            if looks_like_secret(s) {
                bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_pointer_respects_segment_boundary() {
        assert!(is_prefix_pointer("/server", "/server/addr"));
        assert!(is_prefix_pointer("/server", "/server"));
        assert!(!is_prefix_pointer("/server", "/serverless/x"));
    }

    #[test]
    fn short_values_are_never_secrets() {
        assert!(!looks_like_secret("re_x"));
        assert!(looks_like_secret("re_123456789"));
        assert!(!looks_like_secret("RESEND_API_KEY"));
    }

    #[test]
    fn app_env_parse() {
        assert_eq!(AppEnv::parse("PROD").unwrap(), AppEnv::Production);
        assert_eq!(AppEnv::parse("dev").unwrap(), AppEnv::Development);
        assert!(AppEnv::parse("staging").is_err());
    }
}
