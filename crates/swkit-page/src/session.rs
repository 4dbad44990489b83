//! Per-tab string storage.
//!
//! The reload guard keeps its marker here so it survives a reload of the same
//! tab but not a new tab.

use hashbrown::HashMap;
use std::sync::Mutex;

/// Key/value store scoped to one page session.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    /// Remove a key, returning its previous value.
    fn remove(&self, key: &str) -> Option<String>;
}

/// In-memory session store.
#[derive(Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", "v");
        assert_eq!(store.get("k"), Some("v".to_string()));
        assert_eq!(store.remove("k"), Some("v".to_string()));
        assert_eq!(store.remove("k"), None);
    }
}
