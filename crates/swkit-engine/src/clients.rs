//! Open-page client bookkeeping.
//!
//! Activation claims in-scope clients so interception starts without a
//! reload; notification clicks navigate and focus an existing client or open
//! a new one.

use hashbrown::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::error::WorkerError;

/// Unique identifier for a page client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

impl ClientId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// An open page.
#[derive(Debug, Clone)]
pub struct PageClient {
    pub id: ClientId,
    pub url: Url,
    pub focused: bool,
    /// Whether an active worker controls this page.
    pub claimed: bool,
}

impl PageClient {
    fn in_scope(&self, origin: &Url, scope_prefix: &str) -> bool {
        self.url.origin() == origin.origin() && self.url.path().starts_with(scope_prefix)
    }
}

/// Registry of open page clients, shared between host and workers.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<ClientId, PageClient>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a newly opened page.
    pub async fn add(&self, url: Url) -> ClientId {
        let id = ClientId::new();
        let client = PageClient {
            id,
            url,
            focused: false,
            claimed: false,
        };
        self.clients.write().await.insert(id, client);
        id
    }

    /// Forget a closed page.
    pub async fn remove(&self, id: ClientId) -> Option<PageClient> {
        self.clients.write().await.remove(&id)
    }

    pub async fn get(&self, id: ClientId) -> Option<PageClient> {
        self.clients.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All clients whose URL falls under the given origin and scope prefix.
    pub async fn match_scope(&self, origin: &Url, scope_prefix: &str) -> Vec<PageClient> {
        self.clients
            .read()
            .await
            .values()
            .filter(|client| client.in_scope(origin, scope_prefix))
            .cloned()
            .collect()
    }

    /// Point an existing client at a new URL.
    pub async fn navigate(&self, id: ClientId, url: Url) -> Result<(), WorkerError> {
        let mut clients = self.clients.write().await;
        let client = clients
            .get_mut(&id)
            .ok_or(WorkerError::UnknownClient(id.raw()))?;
        client.url = url;
        Ok(())
    }

    /// Bring a client to the front.
    pub async fn focus(&self, id: ClientId) -> Result<(), WorkerError> {
        let mut clients = self.clients.write().await;
        if !clients.contains_key(&id) {
            return Err(WorkerError::UnknownClient(id.raw()));
        }
        for client in clients.values_mut() {
            client.focused = client.id == id;
        }
        Ok(())
    }

    /// Open a new focused page at the given URL.
    pub async fn open_window(&self, url: Url) -> ClientId {
        let id = self.add(url).await;
        // A freshly opened window takes focus.
        let _ = self.focus(id).await;
        id
    }

    /// Take control of every in-scope client. Returns how many were claimed.
    pub async fn claim(&self, origin: &Url, scope_prefix: &str) -> usize {
        let mut clients = self.clients.write().await;
        let mut claimed = 0;
        for client in clients.values_mut() {
            if client.in_scope(origin, scope_prefix) {
                client.claimed = true;
                claimed += 1;
            }
        }
        debug!(scope = scope_prefix, claimed, "claimed page clients");
        claimed
    }
}
