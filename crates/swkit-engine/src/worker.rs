//! One versioned worker instance for one scope.

use futures::future::try_join_all;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clients::{ClientId, ClientRegistry};
use crate::config::ScopeConfig;
use crate::error::WorkerError;
use crate::lifecycle::{can_transition, WorkerPhase};
use crate::message::WorkerCommand;
use crate::push::{build_notification, Notification};
use crate::router::{route, RouteDecision};
use crate::strategy;
use swkit_common::Clock;
use swkit_net::{Fetcher, Request, Response};
use swkit_store::{CacheEntry, CacheStorage};

/// What a delivered command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// SKIP_WAITING: the host should promote this worker now.
    ActivationRequested,
    /// CLEAR_CACHE: every namespace of this scope was deleted.
    CachesCleared,
}

/// A single versioned instance of the caching engine for one scope.
///
/// Lifecycle: `Installing → Waiting → Activating → Active`, with `Redundant`
/// reachable from anywhere. Installation seeds the essential-asset manifest
/// all-or-nothing; a worker that cannot seed its offline fallback must not
/// become active.
pub struct CacheWorker {
    config: ScopeConfig,
    phase: RwLock<WorkerPhase>,
    storage: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    clients: ClientRegistry,
}

impl CacheWorker {
    pub fn new(
        config: ScopeConfig,
        storage: CacheStorage,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        clients: ClientRegistry,
    ) -> Self {
        Self {
            config,
            phase: RwLock::new(WorkerPhase::Installing),
            storage,
            fetcher,
            clock,
            clients,
        }
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    pub async fn phase(&self) -> WorkerPhase {
        *self.phase.read().await
    }

    async fn advance(&self, to: WorkerPhase) -> Result<(), WorkerError> {
        let mut phase = self.phase.write().await;
        if !can_transition(*phase, to) {
            return Err(WorkerError::PhaseTransition { from: *phase, to });
        }
        debug!(scope = %self.config.scope_prefix, from = ?*phase, ?to, "phase change");
        *phase = to;
        Ok(())
    }

    /// Mark this worker as superseded or failed.
    pub async fn make_redundant(&self) {
        let mut phase = self.phase.write().await;
        if *phase != WorkerPhase::Redundant {
            debug!(scope = %self.config.scope_prefix, from = ?*phase, "worker now redundant");
            *phase = WorkerPhase::Redundant;
        }
    }

    /// Seed the essential-asset manifest into this version's namespace.
    ///
    /// All fetches are staged first and written only when every one
    /// succeeded; any failure fails installation and the worker is discarded.
    /// Installing the same version twice is idempotent.
    pub async fn install(&self) -> Result<(), WorkerError> {
        info!(
            scope = %self.config.scope_prefix,
            version = %self.config.version,
            "installing"
        );

        let cache = self.storage.open(&self.config.cache_name()).await;

        let mut requests = Vec::with_capacity(self.config.essential_assets.len());
        for path in &self.config.essential_assets {
            let url = self.config.url_for(path).map_err(|err| {
                WorkerError::InstallFailed(format!("invalid manifest path {path}: {err}"))
            })?;
            requests.push(Request::get(url));
        }

        let staged = try_join_all(requests.into_iter().map(|request| {
            let fetcher = Arc::clone(&self.fetcher);
            async move {
                let response = fetcher.fetch(request.clone()).await.map_err(|err| {
                    WorkerError::InstallFailed(format!("{}: {err}", request.url))
                })?;
                if !response.ok() {
                    return Err(WorkerError::InstallFailed(format!(
                        "{}: status {}",
                        request.url, response.status
                    )));
                }
                Ok((request, CacheEntry::from_response(&response)))
            }
        }))
        .await;

        let staged = match staged {
            Ok(staged) => staged,
            Err(err) => {
                warn!(scope = %self.config.scope_prefix, error = %err, "install failed");
                self.make_redundant().await;
                return Err(err);
            }
        };

        for (request, entry) in staged {
            if let Err(err) = cache.put(&request, entry).await {
                self.make_redundant().await;
                return Err(WorkerError::InstallFailed(format!(
                    "{}: {err}",
                    request.url
                )));
            }
        }

        self.advance(WorkerPhase::Waiting).await
    }

    /// Evict stale namespaces of this scope and claim open page clients.
    ///
    /// Namespace deletion failures are logged and skipped; stale namespaces
    /// may persist and are retried on the next activation.
    pub async fn activate(&self) -> Result<(), WorkerError> {
        self.advance(WorkerPhase::Activating).await?;
        info!(
            scope = %self.config.scope_prefix,
            version = %self.config.version,
            "activating"
        );

        let current = self.config.cache_name();
        for name in self.storage.names().await {
            if name == current {
                continue;
            }
            let stale = name.contains(&self.config.scope_tag)
                || self
                    .config
                    .legacy_cache_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()));
            if !stale {
                continue;
            }
            match self.storage.delete(&name).await {
                Ok(true) => info!(cache = %name, "removed stale cache"),
                Ok(false) => {}
                Err(err) => warn!(cache = %name, error = %err, "failed to remove stale cache"),
            }
        }

        self.clients
            .claim(&self.config.origin, &self.config.scope_prefix)
            .await;

        self.advance(WorkerPhase::Active).await
    }

    /// Classify a request for this scope without handling it.
    pub fn route_request(&self, request: &Request) -> RouteDecision {
        route(&self.config, request)
    }

    /// Handle one intercepted request.
    pub async fn handle_fetch(&self, request: Request) -> Result<Response, WorkerError> {
        match self.route_request(&request) {
            // Bypassed requests reach the network untouched, exactly as if
            // no worker had intercepted them.
            RouteDecision::Bypass | RouteDecision::NetworkOnly => {
                strategy::network_only(&self.fetcher, request).await
            }
            RouteDecision::CacheFirst => {
                strategy::cache_first(&self.fetcher, &self.storage, &self.config, request).await
            }
            RouteDecision::NetworkFirst => {
                strategy::network_first_with_timeout(
                    &self.fetcher,
                    &self.storage,
                    &self.clock,
                    &self.config,
                    request,
                )
                .await
            }
            RouteDecision::StaleWhileRevalidate => {
                strategy::stale_while_revalidate(&self.fetcher, &self.storage, &self.config, request)
                    .await
            }
        }
    }

    /// Handle a command from the page.
    pub async fn handle_command(
        &self,
        command: WorkerCommand,
    ) -> Result<CommandOutcome, WorkerError> {
        match command {
            WorkerCommand::SkipWaiting => Ok(CommandOutcome::ActivationRequested),
            WorkerCommand::ClearCache => {
                self.clear_scope_caches().await?;
                Ok(CommandOutcome::CachesCleared)
            }
        }
    }

    /// Delete every namespace belonging to this scope, current one included.
    pub async fn clear_scope_caches(&self) -> Result<(), WorkerError> {
        for name in self.storage.names().await {
            if name.contains(&self.config.scope_tag) {
                match self.storage.delete(&name).await {
                    Ok(true) => info!(cache = %name, "cleared cache"),
                    Ok(false) => {}
                    Err(err) => warn!(cache = %name, error = %err, "failed to clear cache"),
                }
            }
        }
        Ok(())
    }

    /// Build the notification for a received push message.
    pub fn handle_push(&self, payload: Option<&str>) -> Notification {
        build_notification(&self.config.notification_defaults, payload)
    }

    /// Route a notification click: focus an existing in-scope client after
    /// navigating it to the target, or open a new one. The `close` action
    /// dismisses without navigation.
    pub async fn handle_notification_click(
        &self,
        notification: &Notification,
        action: Option<&str>,
    ) -> Result<Option<ClientId>, WorkerError> {
        debug!(tag = %notification.tag, ?action, "notification clicked");

        if action == Some("close") {
            return Ok(None);
        }

        let target = self
            .config
            .url_for(&notification.target_url)
            .map_err(|err| WorkerError::InvalidUrl(err.to_string()))?;

        let in_scope = self
            .clients
            .match_scope(&self.config.origin, &self.config.scope_prefix)
            .await;

        if let Some(client) = in_scope.first() {
            self.clients.navigate(client.id, target).await?;
            self.clients.focus(client.id).await?;
            Ok(Some(client.id))
        } else {
            Ok(Some(self.clients.open_window(target).await))
        }
    }

    /// Hook for a dismissed notification; informational only.
    pub fn handle_notification_close(&self, notification: &Notification) {
        debug!(tag = %notification.tag, "notification closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets;
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use hashbrown::HashMap;
    use http::{HeaderMap, StatusCode};
    use swkit_common::ManualClock;
    use swkit_net::NetError;
    use url::Url;

    /// Transport stub serving a fixed path → body table; everything else 404s.
    struct TableFetcher {
        responses: HashMap<String, &'static str>,
    }

    impl TableFetcher {
        fn new(entries: &[(&str, &'static str)]) -> Self {
            Self {
                responses: entries
                    .iter()
                    .map(|(path, body)| (path.to_string(), *body))
                    .collect(),
            }
        }
    }

    impl Fetcher for TableFetcher {
        fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, NetError>> {
            let body = self.responses.get(request.url.path()).copied();
            Box::pin(async move {
                let (status, body) = match body {
                    Some(body) => (StatusCode::OK, Bytes::from_static(body.as_bytes())),
                    None => (StatusCode::NOT_FOUND, Bytes::new()),
                };
                Ok(Response {
                    url: request.url,
                    status,
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                    headers: HeaderMap::new(),
                    body,
                })
            })
        }
    }

    fn origin() -> Url {
        Url::parse("https://meuburguer.example").unwrap()
    }

    fn admin_worker(storage: &CacheStorage, fetcher: Arc<dyn Fetcher>) -> CacheWorker {
        CacheWorker::new(
            presets::admin(origin()),
            storage.clone(),
            fetcher,
            Arc::new(ManualClock::starting_at(0)),
            ClientRegistry::new(),
        )
    }

    fn working_fetcher() -> Arc<dyn Fetcher> {
        Arc::new(TableFetcher::new(&[
            ("/admin/dashboard", "dashboard"),
            ("/offline.html", "offline"),
        ]))
    }

    #[tokio::test]
    async fn install_seeds_manifest_and_waits() {
        let storage = CacheStorage::new();
        let worker = admin_worker(&storage, working_fetcher());

        worker.install().await.unwrap();
        assert_eq!(worker.phase().await, WorkerPhase::Waiting);

        let cache = storage.open("meu-burguer-admin-v1.0.1").await;
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let storage = CacheStorage::new();
        // The offline page is missing from the deployment.
        let fetcher: Arc<dyn Fetcher> =
            Arc::new(TableFetcher::new(&[("/admin/dashboard", "dashboard")]));
        let worker = admin_worker(&storage, fetcher);

        let result = worker.install().await;
        assert!(matches!(result, Err(WorkerError::InstallFailed(_))));
        assert_eq!(worker.phase().await, WorkerPhase::Redundant);

        let cache = storage.open("meu-burguer-admin-v1.0.1").await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn reinstalling_same_version_is_idempotent() {
        let storage = CacheStorage::new();
        let first = admin_worker(&storage, working_fetcher());
        first.install().await.unwrap();
        let second = admin_worker(&storage, working_fetcher());
        second.install().await.unwrap();

        let scoped: Vec<String> = storage
            .names()
            .await
            .into_iter()
            .filter(|name| name.contains("admin"))
            .collect();
        assert_eq!(scoped, vec!["meu-burguer-admin-v1.0.1".to_string()]);

        let cache = storage.open("meu-burguer-admin-v1.0.1").await;
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn activation_evicts_stale_scope_namespaces_only() {
        let storage = CacheStorage::new();
        storage.open("meu-burguer-admin-v1.0.0").await;
        storage.open("meu-burguer-client-v1.0.5").await;

        let worker = admin_worker(&storage, working_fetcher());
        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        assert_eq!(worker.phase().await, WorkerPhase::Active);

        let names = storage.names().await;
        assert!(names.contains(&"meu-burguer-admin-v1.0.1".to_string()));
        assert!(!names.contains(&"meu-burguer-admin-v1.0.0".to_string()));
        // Another scope's namespace is untouched.
        assert!(names.contains(&"meu-burguer-client-v1.0.5".to_string()));
    }

    #[tokio::test]
    async fn activation_evicts_legacy_prefixes() {
        let storage = CacheStorage::new();
        storage.open("meu-burguer-v2").await;
        storage.open("meu-burguer-admin-v1.0.0").await;

        let worker = CacheWorker::new(
            presets::client(origin()),
            storage.clone(),
            Arc::new(TableFetcher::new(&[("/", "home"), ("/offline.html", "offline")])),
            Arc::new(ManualClock::starting_at(0)),
            ClientRegistry::new(),
        );
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let names = storage.names().await;
        assert!(!names.contains(&"meu-burguer-v2".to_string()));
        assert!(!names.contains(&"meu-burguer-admin-v1.0.0".to_string()));
        assert!(names.contains(&"meu-burguer-client-v1.0.5".to_string()));
    }

    #[tokio::test]
    async fn activation_claims_in_scope_clients() {
        let storage = CacheStorage::new();
        let clients = ClientRegistry::new();
        let in_scope = clients
            .add(origin().join("/admin/pedidos").unwrap())
            .await;
        let outside = clients.add(origin().join("/cardapio").unwrap()).await;

        let worker = CacheWorker::new(
            presets::admin(origin()),
            storage,
            working_fetcher(),
            Arc::new(ManualClock::starting_at(0)),
            clients.clone(),
        );
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        assert!(clients.get(in_scope).await.unwrap().claimed);
        assert!(!clients.get(outside).await.unwrap().claimed);
    }

    #[tokio::test]
    async fn phase_transitions_are_checked() {
        let storage = CacheStorage::new();
        let worker = admin_worker(&storage, working_fetcher());

        // Activating before installing is illegal.
        let result = worker.activate().await;
        assert!(matches!(result, Err(WorkerError::PhaseTransition { .. })));
    }

    #[tokio::test]
    async fn clear_cache_command_deletes_scope_namespaces() {
        let storage = CacheStorage::new();
        let worker = admin_worker(&storage, working_fetcher());
        worker.install().await.unwrap();
        worker.activate().await.unwrap();

        let outcome = worker
            .handle_command(WorkerCommand::ClearCache)
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::CachesCleared);
        assert!(!storage.has("meu-burguer-admin-v1.0.1").await);
    }

    #[tokio::test]
    async fn skip_waiting_command_requests_activation() {
        let storage = CacheStorage::new();
        let worker = admin_worker(&storage, working_fetcher());
        let outcome = worker
            .handle_command(WorkerCommand::SkipWaiting)
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::ActivationRequested);
    }

    #[tokio::test]
    async fn notification_click_opens_window_when_no_client_matches() {
        let storage = CacheStorage::new();
        let worker = admin_worker(&storage, working_fetcher());

        let notification =
            worker.handle_push(Some(r#"{"title":"Novo Pedido!","data":{"url":"/admin/pedidos/42"}}"#));
        assert_eq!(notification.title, "Novo Pedido!");

        let opened = worker
            .handle_notification_click(&notification, None)
            .await
            .unwrap()
            .unwrap();
        let client = worker.clients.get(opened).await.unwrap();
        assert_eq!(client.url.path(), "/admin/pedidos/42");
        assert!(client.focused);
    }

    #[tokio::test]
    async fn notification_click_focuses_existing_client() {
        let storage = CacheStorage::new();
        let clients = ClientRegistry::new();
        let existing = clients
            .add(origin().join("/admin/dashboard").unwrap())
            .await;

        let worker = CacheWorker::new(
            presets::admin(origin()),
            storage,
            working_fetcher(),
            Arc::new(ManualClock::starting_at(0)),
            clients.clone(),
        );

        let notification = worker.handle_push(None);
        let focused = worker
            .handle_notification_click(&notification, Some("view"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(focused, existing);
        let client = clients.get(existing).await.unwrap();
        assert_eq!(client.url.path(), "/admin/dashboard");
        assert!(client.focused);
        // No second window was opened.
        assert_eq!(clients.len().await, 1);
    }

    #[tokio::test]
    async fn close_action_does_not_navigate() {
        let storage = CacheStorage::new();
        let worker = admin_worker(&storage, working_fetcher());

        let notification = worker.handle_push(None);
        let result = worker
            .handle_notification_click(&notification, Some("close"))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(worker.clients.is_empty().await);
    }
}
