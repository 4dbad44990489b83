//! # swkit Store
//!
//! The cache store abstraction: named, versioned namespaces holding captured
//! response snapshots keyed by request identity (method + URL).
//!
//! ## Architecture
//!
//! ```text
//! CacheStorage
//!     └── namespace "meu-burguer-admin-v1.0.1"
//!             └── "GET https://…/admin/dashboard" → CacheEntry
//! ```
//!
//! Namespaces isolate scope/version pairs: the lifecycle manager deletes every
//! namespace that belongs to its scope but not to its version during
//! activation. Entry freshness lives in a single synthetic `sw-cache-time`
//! response header; there is no separate expiry index.

use bytes::Bytes;
use hashbrown::HashMap;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, trace};
use url::Url;

use swkit_net::{Request, Response};

/// Synthetic response header carrying the capture timestamp in epoch
/// milliseconds. Injected only by the network-first strategy.
pub const CACHE_TIME_HEADER: &str = "sw-cache-time";

/// Errors that can occur in cache storage operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Cache quota exceeded: {used} bytes used, {incoming} incoming, {limit} limit")]
    QuotaExceeded {
        used: u64,
        incoming: u64,
        limit: u64,
    },
}

/// A captured response snapshot.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// URL the response was captured from.
    pub url: Url,
    /// Response status.
    pub status: StatusCode,
    /// Response status text.
    pub status_text: String,
    /// Response headers, possibly including [`CACHE_TIME_HEADER`].
    pub headers: HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl CacheEntry {
    /// Snapshot a response.
    pub fn from_response(response: &Response) -> Self {
        Self {
            url: response.url.clone(),
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: response.body.clone(),
        }
    }

    /// Rebuild a response from this snapshot.
    pub fn into_response(self) -> Response {
        Response {
            url: self.url,
            status: self.status,
            status_text: self.status_text,
            headers: self.headers,
            body: self.body,
        }
    }

    /// Record the capture time. Overwrites any previous stamp.
    pub fn stamp(&mut self, now_ms: u64) {
        if let Ok(value) = HeaderValue::from_str(&now_ms.to_string()) {
            self.headers
                .insert(HeaderName::from_static(CACHE_TIME_HEADER), value);
        }
    }

    /// Capture timestamp, if this entry was stamped.
    pub fn cache_time(&self) -> Option<u64> {
        self.headers
            .get(CACHE_TIME_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
    }

    /// Age in milliseconds relative to `now_ms`. Unstamped entries have no
    /// age and never expire.
    pub fn age(&self, now_ms: u64) -> Option<u64> {
        self.cache_time().map(|t| now_ms.saturating_sub(t))
    }

    fn size(&self) -> u64 {
        let header_bytes: usize = self
            .headers
            .iter()
            .map(|(name, value)| name.as_str().len() + value.len())
            .sum();
        (self.url.as_str().len() + header_bytes + self.body.len()) as u64
    }
}

#[derive(Default)]
struct StorageInner {
    caches: HashMap<String, HashMap<String, CacheEntry>>,
    quota: Option<u64>,
    used: u64,
}

/// Durable cache storage: a set of named namespaces. Cheaply cloneable; all
/// clones share state.
#[derive(Clone, Default)]
pub struct CacheStorage {
    inner: Arc<RwLock<StorageInner>>,
}

impl CacheStorage {
    /// Create unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage with a total byte quota. Writes that would exceed it
    /// fail with [`StoreError::QuotaExceeded`].
    pub fn with_quota(limit: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StorageInner {
                quota: Some(limit),
                ..Default::default()
            })),
        }
    }

    /// Open a namespace, creating it if absent.
    pub async fn open(&self, name: &str) -> CacheHandle {
        let mut inner = self.inner.write().await;
        inner.caches.entry(name.to_string()).or_default();
        CacheHandle {
            inner: Arc::clone(&self.inner),
            name: name.to_string(),
        }
    }

    /// Check whether a namespace exists.
    pub async fn has(&self, name: &str) -> bool {
        self.inner.read().await.caches.contains_key(name)
    }

    /// Delete a namespace and everything in it.
    pub async fn delete(&self, name: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.caches.remove(name) {
            Some(entries) => {
                let freed: u64 = entries.values().map(CacheEntry::size).sum();
                inner.used = inner.used.saturating_sub(freed);
                debug!(cache = name, freed, "deleted cache namespace");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// All namespace names, in unspecified order.
    pub async fn names(&self) -> Vec<String> {
        self.inner.read().await.caches.keys().cloned().collect()
    }

    /// Search every namespace for an exact match. First match wins; iteration
    /// order is unspecified, so callers must not rely on it for keys that may
    /// exist in several namespaces at once.
    pub async fn match_any(&self, request: &Request) -> Option<CacheEntry> {
        let key = request.cache_key();
        let inner = self.inner.read().await;
        inner
            .caches
            .values()
            .find_map(|entries| entries.get(&key).cloned())
    }

    /// Total bytes currently stored across all namespaces.
    pub async fn usage(&self) -> u64 {
        self.inner.read().await.used
    }
}

/// Handle to one namespace. Writes through a handle whose namespace was
/// deleted recreate it, mirroring open-by-name semantics.
#[derive(Clone)]
pub struct CacheHandle {
    inner: Arc<RwLock<StorageInner>>,
    name: String,
}

impl CacheHandle {
    /// The namespace name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact-match lookup by request identity.
    pub async fn match_request(&self, request: &Request) -> Option<CacheEntry> {
        let inner = self.inner.read().await;
        inner
            .caches
            .get(&self.name)?
            .get(&request.cache_key())
            .cloned()
    }

    /// Store an entry, overwriting any previous entry for the same key.
    pub async fn put(&self, request: &Request, entry: CacheEntry) -> Result<(), StoreError> {
        let key = request.cache_key();
        let incoming = entry.size();
        let mut inner = self.inner.write().await;

        let replaced = inner
            .caches
            .get(&self.name)
            .and_then(|entries| entries.get(&key))
            .map(CacheEntry::size)
            .unwrap_or(0);

        if let Some(limit) = inner.quota {
            let projected = inner.used.saturating_sub(replaced) + incoming;
            if projected > limit {
                return Err(StoreError::QuotaExceeded {
                    used: inner.used,
                    incoming,
                    limit,
                });
            }
        }

        inner.used = inner.used.saturating_sub(replaced) + incoming;
        inner
            .caches
            .entry(self.name.clone())
            .or_default()
            .insert(key.clone(), entry);
        trace!(cache = %self.name, key = %key, bytes = incoming, "cached entry");
        Ok(())
    }

    /// Delete an entry. Returns whether one existed.
    pub async fn delete(&self, request: &Request) -> Result<bool, StoreError> {
        let key = request.cache_key();
        let mut inner = self.inner.write().await;
        let removed = inner
            .caches
            .get_mut(&self.name)
            .and_then(|entries| entries.remove(&key));
        if let Some(entry) = removed {
            inner.used = inner.used.saturating_sub(entry.size());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// All cache keys in this namespace.
    pub async fn keys(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .caches
            .get(&self.name)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of entries in this namespace.
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.caches.get(&self.name).map_or(0, HashMap::len)
    }

    /// Whether this namespace holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
