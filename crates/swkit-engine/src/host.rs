//! Registration host: one active and at most one waiting worker per scope.
//!
//! The host owns the registration table, dispatches intercepted requests to
//! the worker whose scope prefix matches longest, routes page commands, and
//! signals pages over an event channel when a new version is parked or takes
//! control.

use hashbrown::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clients::ClientRegistry;
use crate::config::ScopeConfig;
use crate::error::WorkerError;
use crate::message::{HostEvent, WorkerCommand};
use crate::strategy;
use crate::worker::{CacheWorker, CommandOutcome};
use swkit_common::Clock;
use swkit_net::{Fetcher, Request, Response};
use swkit_store::CacheStorage;

struct Registration {
    active: Option<Arc<CacheWorker>>,
    waiting: Option<Arc<CacheWorker>>,
}

/// Owns every scope registration and the page-facing event channel.
pub struct WorkerHost {
    registrations: Arc<RwLock<HashMap<String, Registration>>>,
    storage: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    clients: ClientRegistry,
    events: UnboundedSender<HostEvent>,
}

impl WorkerHost {
    /// Build a host and the receiving end of its event channel.
    pub fn new(
        storage: CacheStorage,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
    ) -> (Self, UnboundedReceiver<HostEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let host = Self {
            registrations: Arc::new(RwLock::new(HashMap::new())),
            storage,
            fetcher,
            clock,
            clients: ClientRegistry::new(),
            events,
        };
        (host, rx)
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    fn emit(&self, event: HostEvent) {
        // A page that stopped listening is not an error.
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }

    /// Register a scope configuration.
    ///
    /// The first registration for a scope installs and activates immediately.
    /// Re-registering the active version is a no-op. A new version behind an
    /// active one installs, parks as waiting, and raises
    /// [`HostEvent::UpdateReady`]; it takes over on `SKIP_WAITING`.
    /// Re-registering the version already waiting promotes it: a fresh page
    /// lifetime asking for that version means no old client holds it back.
    pub async fn register(&self, config: ScopeConfig) -> Result<(), WorkerError> {
        let scope = config.scope_prefix.clone();

        {
            let registrations = self.registrations.read().await;
            if let Some(registration) = registrations.get(&scope) {
                let same = |worker: &Option<Arc<CacheWorker>>| {
                    worker
                        .as_ref()
                        .is_some_and(|w| w.config().version == config.version)
                };
                if same(&registration.active) {
                    debug!(scope = %scope, version = %config.version, "already registered");
                    return Ok(());
                }
                if same(&registration.waiting) {
                    drop(registrations);
                    return self.promote(&scope).await;
                }
            }
        }

        let worker = Arc::new(CacheWorker::new(
            config,
            self.storage.clone(),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.clock),
            self.clients.clone(),
        ));
        worker.install().await?;

        let mut registrations = self.registrations.write().await;
        let registration = registrations.entry(scope.clone()).or_insert(Registration {
            active: None,
            waiting: None,
        });

        match &registration.active {
            None => {
                worker.activate().await?;
                info!(scope = %scope, version = %worker.config().version, "worker active");
                registration.active = Some(worker);
                self.emit(HostEvent::ControllerChange { scope });
            }
            Some(active) => {
                info!(
                    scope = %scope,
                    active = %active.config().version,
                    waiting = %worker.config().version,
                    "new version waiting"
                );
                if let Some(superseded) = registration.waiting.replace(Arc::clone(&worker)) {
                    superseded.make_redundant().await;
                }
                self.emit(HostEvent::UpdateReady {
                    scope,
                    version: worker.config().version.clone(),
                });
            }
        }
        Ok(())
    }

    /// Promote the waiting worker of a scope, if any.
    async fn promote(&self, scope: &str) -> Result<(), WorkerError> {
        let waiting = {
            let mut registrations = self.registrations.write().await;
            let registration = registrations
                .get_mut(scope)
                .ok_or_else(|| WorkerError::NoRegistration(scope.to_string()))?;
            registration.waiting.take()
        };

        let Some(waiting) = waiting else {
            debug!(scope, "no waiting worker to promote");
            return Ok(());
        };

        waiting.activate().await?;

        let mut registrations = self.registrations.write().await;
        if let Some(registration) = registrations.get_mut(scope) {
            if let Some(old) = registration.active.replace(waiting) {
                old.make_redundant().await;
            }
            info!(scope, "waiting worker took control");
            self.emit(HostEvent::ControllerChange {
                scope: scope.to_string(),
            });
        }
        Ok(())
    }

    /// Deliver a raw page message to the scope's workers. Unknown messages
    /// are dropped without a reply.
    pub async fn post_message(&self, scope: &str, raw: &str) -> Result<(), WorkerError> {
        match WorkerCommand::parse(raw) {
            Some(command) => self.post_command(scope, command).await,
            None => Ok(()),
        }
    }

    /// Deliver a parsed command: `SKIP_WAITING` goes to the waiting worker,
    /// `CLEAR_CACHE` to the active one.
    pub async fn post_command(
        &self,
        scope: &str,
        command: WorkerCommand,
    ) -> Result<(), WorkerError> {
        match command {
            WorkerCommand::SkipWaiting => self.promote(scope).await,
            WorkerCommand::ClearCache => {
                let active = {
                    let registrations = self.registrations.read().await;
                    registrations
                        .get(scope)
                        .ok_or_else(|| WorkerError::NoRegistration(scope.to_string()))?
                        .active
                        .clone()
                };
                if let Some(active) = active {
                    let outcome = active.handle_command(command).await?;
                    debug!(scope, ?outcome, "command handled");
                } else {
                    warn!(scope, "clear-cache with no active worker");
                }
                Ok(())
            }
        }
    }

    /// Intercept a request: dispatch it to the active worker whose scope
    /// prefix matches longest, or pass it straight to the network when no
    /// registration covers it.
    pub async fn handle_fetch(&self, request: Request) -> Result<Response, WorkerError> {
        let worker = {
            let registrations = self.registrations.read().await;
            registrations
                .iter()
                .filter(|(scope, registration)| {
                    registration
                        .active
                        .as_ref()
                        .is_some_and(|w| w.config().origin.origin() == request.url.origin())
                        && request.url.path().starts_with(scope.as_str())
                })
                .max_by_key(|(scope, _)| scope.len())
                .and_then(|(_, registration)| registration.active.clone())
        };

        match worker {
            Some(worker) => worker.handle_fetch(request).await,
            None => strategy::network_only(&self.fetcher, request).await,
        }
    }

    /// Drop a scope's registration entirely, marking its workers redundant.
    pub async fn unregister(&self, scope: &str) -> bool {
        let removed = self.registrations.write().await.remove(scope);
        match removed {
            Some(registration) => {
                if let Some(active) = registration.active {
                    active.make_redundant().await;
                }
                if let Some(waiting) = registration.waiting {
                    waiting.make_redundant().await;
                }
                info!(scope, "unregistered");
                true
            }
            None => false,
        }
    }

    /// The version currently active for a scope.
    pub async fn active_version(&self, scope: &str) -> Option<String> {
        let registrations = self.registrations.read().await;
        registrations
            .get(scope)?
            .active
            .as_ref()
            .map(|worker| worker.config().version.clone())
    }

    /// The version currently parked behind the active one, if any.
    pub async fn waiting_version(&self, scope: &str) -> Option<String> {
        let registrations = self.registrations.read().await;
        registrations
            .get(scope)?
            .waiting
            .as_ref()
            .map(|worker| worker.config().version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::WorkerPhase;
    use crate::presets;
    use bytes::Bytes;
    use futures::future::BoxFuture;
    use http::{HeaderMap, StatusCode};
    use swkit_common::ManualClock;
    use swkit_net::NetError;
    use url::Url;

    /// Serves every path with a body echoing the path.
    struct EchoFetcher;

    impl Fetcher for EchoFetcher {
        fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, NetError>> {
            Box::pin(async move {
                let body = Bytes::from(request.url.path().to_string());
                Ok(Response {
                    url: request.url,
                    status: StatusCode::OK,
                    status_text: "OK".to_string(),
                    headers: HeaderMap::new(),
                    body,
                })
            })
        }
    }

    fn origin() -> Url {
        Url::parse("https://meuburguer.example").unwrap()
    }

    fn host() -> (WorkerHost, UnboundedReceiver<HostEvent>) {
        WorkerHost::new(
            CacheStorage::new(),
            Arc::new(EchoFetcher),
            Arc::new(ManualClock::starting_at(0)),
        )
    }

    #[tokio::test]
    async fn first_registration_activates_and_takes_control() {
        let (host, mut events) = host();
        host.register(presets::admin(origin())).await.unwrap();

        assert_eq!(host.active_version("/admin").await.as_deref(), Some("1.0.1"));
        assert_eq!(
            events.recv().await,
            Some(HostEvent::ControllerChange {
                scope: "/admin".to_string()
            })
        );
    }

    #[tokio::test]
    async fn same_version_reregistration_is_a_noop() {
        let (host, mut events) = host();
        host.register(presets::admin(origin())).await.unwrap();
        events.recv().await;

        host.register(presets::admin(origin())).await.unwrap();
        assert!(events.try_recv().is_err());
        assert_eq!(host.waiting_version("/admin").await, None);
    }

    #[tokio::test]
    async fn new_version_parks_until_skip_waiting() {
        let (host, mut events) = host();
        host.register(presets::admin(origin())).await.unwrap();
        events.recv().await;

        let mut update = presets::admin(origin());
        update.version = "1.0.2".to_string();
        host.register(update).await.unwrap();

        assert_eq!(host.active_version("/admin").await.as_deref(), Some("1.0.1"));
        assert_eq!(
            events.recv().await,
            Some(HostEvent::UpdateReady {
                scope: "/admin".to_string(),
                version: "1.0.2".to_string()
            })
        );

        host.post_command("/admin", WorkerCommand::SkipWaiting)
            .await
            .unwrap();
        assert_eq!(host.active_version("/admin").await.as_deref(), Some("1.0.2"));
        assert_eq!(host.waiting_version("/admin").await, None);
        assert_eq!(
            events.recv().await,
            Some(HostEvent::ControllerChange {
                scope: "/admin".to_string()
            })
        );
    }

    #[tokio::test]
    async fn reregistering_the_waiting_version_promotes_it() {
        let (host, mut events) = host();
        host.register(presets::admin(origin())).await.unwrap();
        events.recv().await;

        let mut update = presets::admin(origin());
        update.version = "1.0.2".to_string();
        host.register(update.clone()).await.unwrap();
        events.recv().await;

        // A fresh page lifetime re-registers the parked version.
        host.register(update).await.unwrap();
        assert_eq!(host.active_version("/admin").await.as_deref(), Some("1.0.2"));
        assert_eq!(
            events.recv().await,
            Some(HostEvent::ControllerChange {
                scope: "/admin".to_string()
            })
        );
    }

    #[tokio::test]
    async fn promotion_evicts_old_namespace() {
        let (host, _events) = host();
        host.register(presets::admin(origin())).await.unwrap();

        let mut update = presets::admin(origin());
        update.version = "1.0.2".to_string();
        host.register(update).await.unwrap();
        host.post_command("/admin", WorkerCommand::SkipWaiting)
            .await
            .unwrap();

        let names = host.storage().names().await;
        assert!(names.contains(&"meu-burguer-admin-v1.0.2".to_string()));
        assert!(!names.contains(&"meu-burguer-admin-v1.0.1".to_string()));
    }

    #[tokio::test]
    async fn fetch_dispatches_to_longest_matching_scope() {
        let (host, _events) = host();
        host.register(presets::client(origin())).await.unwrap();
        host.register(presets::admin(origin())).await.unwrap();

        // An admin navigation is handled by the admin worker and lands in the
        // admin namespace.
        let request = Request::navigate(origin().join("/admin/dashboard").unwrap());
        host.handle_fetch(request.clone()).await.unwrap();

        let admin_cache = host.storage().open("meu-burguer-admin-v1.0.1").await;
        assert!(admin_cache.match_request(&request).await.is_some());
    }

    #[tokio::test]
    async fn unmatched_requests_pass_through() {
        let (host, _events) = host();
        host.register(presets::admin(origin())).await.unwrap();

        let request = Request::get(Url::parse("https://other.example/feed").unwrap());
        let response = host.handle_fetch(request).await.unwrap();
        assert_eq!(response.body, Bytes::from("/feed"));
        // Nothing was cached for the foreign origin.
        assert_eq!(host.storage().names().await.len(), 1);
    }

    #[tokio::test]
    async fn skip_waiting_without_waiting_worker_is_harmless() {
        let (host, _events) = host();
        host.register(presets::admin(origin())).await.unwrap();
        host.post_command("/admin", WorkerCommand::SkipWaiting)
            .await
            .unwrap();
        assert_eq!(host.active_version("/admin").await.as_deref(), Some("1.0.1"));
    }

    #[tokio::test]
    async fn commands_to_unknown_scope_error() {
        let (host, _events) = host();
        let result = host
            .post_command("/admin", WorkerCommand::ClearCache)
            .await;
        assert!(matches!(result, Err(WorkerError::NoRegistration(_))));
    }

    #[tokio::test]
    async fn unregister_marks_workers_redundant() {
        let (host, _events) = host();
        host.register(presets::admin(origin())).await.unwrap();

        let active = {
            let registrations = host.registrations.read().await;
            registrations.get("/admin").unwrap().active.clone().unwrap()
        };
        assert!(host.unregister("/admin").await);
        assert_eq!(active.phase().await, WorkerPhase::Redundant);
        assert!(!host.unregister("/admin").await);
    }

    #[tokio::test]
    async fn raw_messages_route_like_commands() {
        let (host, _events) = host();
        host.register(presets::admin(origin())).await.unwrap();

        host.post_message("/admin", r#"{"type":"CLEAR_CACHE"}"#)
            .await
            .unwrap();
        assert!(!host.storage().has("meu-burguer-admin-v1.0.1").await);

        // Unknown messages are dropped silently.
        host.post_message("/admin", r#"{"type":"NOPE"}"#)
            .await
            .unwrap();
    }
}
