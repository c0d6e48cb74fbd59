//! Command handler modules for the `fanplace` CLI.
//!
//! Shared utilities used by multiple command paths live here.
//! Command-specific logic lives in the submodules.

pub mod admin;
pub mod orders;

use std::path::Path;

use anyhow::{Context, Result};
use uuid::Uuid;

use fp_config::{
    discover_config_paths, load_settings, secrets::resolve_secrets, secrets::ResolvedSecrets,
    AppEnv, Settings,
};

/// Settings and secrets resolved the same way the server resolves them.
pub struct Runtime {
    pub env: AppEnv,
    pub settings: Settings,
    pub secrets: ResolvedSecrets,
}

pub fn load_runtime(config_dir: &Path) -> Result<Runtime> {
    let env = AppEnv::from_env()?;
    let paths = discover_config_paths(config_dir, env);
    let (_, settings) = load_settings(&paths).context("config load failed")?;
    let secrets = resolve_secrets(&settings, env)?;
    tracing::debug!(env = env.as_str(), files = paths.len(), "runtime config loaded");
    Ok(Runtime {
        env,
        settings,
        secrets,
    })
}

pub fn parse_uuid(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("invalid {what} uuid"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_uuid_trims_and_names_the_field() {
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&format!(" {id} "), "order_id").unwrap(), id);

        let err = parse_uuid("nope", "order_id").unwrap_err();
        assert_eq!(err.to_string(), "invalid order_id uuid");
    }
}
