//! Request classification.
//!
//! Every intercepted request is classified before a strategy runs. Rules are
//! checked in priority order; the first match wins:
//!
//! 1. different origin → `Bypass`
//! 2. backend data host or API path prefix → `NetworkOnly`
//! 3. inside the owned scope: static build asset → `CacheFirst`,
//!    anything else → the scope's shell strategy
//! 4. same origin but outside the owned scope → `Bypass`

use tracing::trace;

use crate::config::{ScopeConfig, ShellStrategy};
use swkit_net::Request;

/// How an intercepted request will be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// Not intercepted; passes straight through to the network.
    Bypass,
    /// Dynamic backend data; fetched live, never cached.
    NetworkOnly,
    /// Immutable build asset; cache wins, network fills misses.
    CacheFirst,
    /// Timeout-bounded network race with cached fallback.
    NetworkFirst,
    /// Cache wins immediately, network refreshes in the background.
    StaleWhileRevalidate,
}

/// Classify a request for the given scope.
pub fn route(config: &ScopeConfig, request: &Request) -> RouteDecision {
    let url = &request.url;

    let decision = if url.origin() != config.origin.origin() {
        RouteDecision::Bypass
    } else if is_api(config, request) {
        RouteDecision::NetworkOnly
    } else if !config.owns_path(url.path()) {
        RouteDecision::Bypass
    } else if config
        .static_asset_prefixes
        .iter()
        .any(|prefix| url.path().starts_with(prefix.as_str()))
    {
        RouteDecision::CacheFirst
    } else {
        match config.shell_strategy {
            ShellStrategy::NetworkFirst => RouteDecision::NetworkFirst,
            ShellStrategy::StaleWhileRevalidate => RouteDecision::StaleWhileRevalidate,
        }
    };

    trace!(url = %url, ?decision, scope = %config.scope_prefix, "routed request");
    decision
}

fn is_api(config: &ScopeConfig, request: &Request) -> bool {
    let host = request.url.host_str().unwrap_or_default();
    config
        .api_host_fragments
        .iter()
        .any(|fragment| host.contains(fragment.as_str()))
        || config
            .api_path_prefixes
            .iter()
            .any(|prefix| request.url.path().starts_with(prefix.as_str()))
}
