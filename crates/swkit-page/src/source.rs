//! Where new scope configurations come from.
//!
//! In a deployed app this is the worker script URL fetched with caching
//! disabled; here it is a trait so tests and embedders can publish versions
//! directly.

use hashbrown::HashMap;
use std::sync::Mutex;

use swkit_engine::ScopeConfig;

/// Source of the most recently deployed configuration per scope.
pub trait UpdateSource: Send + Sync {
    /// The latest deployed configuration for a scope, if the source knows
    /// about it.
    fn latest_config(&self, scope: &str) -> Option<ScopeConfig>;
}

/// Update source fed by explicit [`publish`](StaticUpdateSource::publish)
/// calls.
#[derive(Default)]
pub struct StaticUpdateSource {
    configs: Mutex<HashMap<String, ScopeConfig>>,
}

impl StaticUpdateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a configuration the latest deployment for its scope.
    pub fn publish(&self, config: ScopeConfig) {
        self.configs
            .lock()
            .unwrap()
            .insert(config.scope_prefix.clone(), config);
    }
}

impl UpdateSource for StaticUpdateSource {
    fn latest_config(&self, scope: &str) -> Option<ScopeConfig> {
        self.configs.lock().unwrap().get(scope).cloned()
    }
}
