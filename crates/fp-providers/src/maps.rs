use std::sync::Arc;

use tracing::warn;

use fp_config::secrets::ResolvedSecrets;
use fp_config::settings::MapSettings;

/// Map configuration handed to the browser.
pub trait MapProvider: Send + Sync {
    fn name(&self) -> &'static str;
    fn token(&self) -> Option<String>;
    fn is_mock(&self) -> bool;
}

#[derive(Clone)]
pub struct MapboxProvider {
    token: Option<String>,
}

impl MapboxProvider {
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        if token.is_none() {
            warn!("mapbox token is not configured; map features will be limited");
        }
        Self { token }
    }
}

impl MapProvider for MapboxProvider {
    fn name(&self) -> &'static str {
        "mapbox"
    }

    fn token(&self) -> Option<String> {
        self.token.clone()
    }

    fn is_mock(&self) -> bool {
        false
    }
}

/// No token; clients render their fallback UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockMapProvider;

impl MapProvider for MockMapProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn token(&self) -> Option<String> {
        None
    }

    fn is_mock(&self) -> bool {
        true
    }
}

/// Unknown provider names fall back to the mock.
pub fn build_map_provider(settings: &MapSettings, secrets: &ResolvedSecrets) -> Arc<dyn MapProvider> {
    match settings.provider.as_str() {
        "mapbox" => Arc::new(MapboxProvider::new(secrets.mapbox_token.clone())),
        "mock" => Arc::new(MockMapProvider),
        other => {
            warn!(provider = other, "unknown maps.provider; using mock");
            Arc::new(MockMapProvider)
        }
    }
}
