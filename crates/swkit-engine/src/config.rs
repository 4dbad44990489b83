//! Per-scope engine configuration.
//!
//! One engine, N configuration records: everything that varies between
//! deployed scopes (manifest, timeouts, cache names, notification defaults)
//! lives here.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Strategy applied to in-scope requests that are not static build assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellStrategy {
    /// Race the network against a timeout, fall back to cache then offline page.
    NetworkFirst,
    /// Serve cache immediately, refresh it in the background.
    StaleWhileRevalidate,
}

/// Defaults merged into push notifications when the payload omits fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDefaults {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    /// Path opened or focused when the notification is clicked.
    pub target_url: String,
    /// Vibration pattern in milliseconds.
    pub vibration: Vec<u32>,
    /// Action buttons rendered on the notification, as (action, label) pairs.
    pub actions: Vec<(String, String)>,
}

/// Configuration record for one worker scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Application name, the first segment of the cache namespace name.
    pub app: String,
    /// URL path prefix this worker owns ("/", "/admin", "/entregador").
    pub scope_prefix: String,
    /// Scope identifier embedded in cache names and used for stale-namespace
    /// matching ("client", "admin", "entregador", "site").
    pub scope_tag: String,
    /// Version string; a new version produces a new cache namespace.
    pub version: String,
    /// Origin the worker serves; requests to other origins are bypassed.
    pub origin: Url,
    /// Substrings identifying the backend data host (always network-only).
    pub api_host_fragments: Vec<String>,
    /// Path prefixes of backend API routes (always network-only).
    pub api_path_prefixes: Vec<String>,
    /// Path prefixes of content-hashed build assets (cache-first).
    pub static_asset_prefixes: Vec<String>,
    /// Same-origin prefixes inside the scope prefix that belong to sibling
    /// workers and must not be intercepted.
    pub excluded_prefixes: Vec<String>,
    /// Strategy for in-scope, non-static requests.
    pub shell_strategy: ShellStrategy,
    /// Maximum age of a network-first cache entry before it is expired.
    pub max_age: Duration,
    /// Network leg budget of the network-first race.
    pub network_timeout: Duration,
    /// Paths seeded into the cache at install time, all-or-nothing.
    pub essential_assets: Vec<String>,
    /// Path of the page served to navigations when nothing else is available.
    pub offline_fallback_path: String,
    /// Name prefixes of caches left behind by pre-scoped deployments,
    /// evicted during activation.
    pub legacy_cache_prefixes: Vec<String>,
    /// Push notification defaults for this scope.
    pub notification_defaults: NotificationDefaults,
}

impl ScopeConfig {
    /// The cache namespace name for this scope and version,
    /// e.g. `meu-burguer-admin-v1.0.1`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}-v{}", self.app, self.scope_tag, self.version)
    }

    /// Whether a same-origin path falls inside this worker's scope and is not
    /// delegated to a sibling worker.
    pub fn owns_path(&self, path: &str) -> bool {
        path.starts_with(&self.scope_prefix)
            && !self
                .excluded_prefixes
                .iter()
                .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Resolve a scope-relative path against the configured origin.
    pub fn url_for(&self, path: &str) -> Result<Url, url::ParseError> {
        self.origin.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;

    #[test]
    fn cache_name_embeds_scope_and_version() {
        let origin = Url::parse("https://meuburguer.example").unwrap();
        let config = presets::admin(origin);
        assert_eq!(config.cache_name(), "meu-burguer-admin-v1.0.1");
    }

    #[test]
    fn root_scope_excludes_sibling_prefixes() {
        let origin = Url::parse("https://meuburguer.example").unwrap();
        let config = presets::client(origin);

        assert!(config.owns_path("/"));
        assert!(config.owns_path("/cardapio"));
        assert!(!config.owns_path("/admin/dashboard"));
        assert!(!config.owns_path("/entregador"));
    }

    #[test]
    fn url_for_resolves_absolute_paths() {
        let origin = Url::parse("https://meuburguer.example/").unwrap();
        let config = presets::delivery(origin);
        let url = config.url_for("/offline-entregador.html").unwrap();
        assert_eq!(
            url.as_str(),
            "https://meuburguer.example/offline-entregador.html"
        );
    }
}
