//! Page-side registration and update lifecycle.
//!
//! One controller per open page: it registers the page's scope with the host,
//! polls the update source for newer versions, asks a parked version to take
//! over, and funnels controller-change signals through the reload guard so a
//! takeover reloads the page exactly once.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::guard::ReloadGuard;
use crate::session::SessionStore;
use crate::source::UpdateSource;
use swkit_engine::{ScopeConfig, WorkerCommand, WorkerError, WorkerHost};

/// Errors surfaced to the page.
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),
}

/// Default interval between update polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Drives one page's relationship with the worker host.
pub struct PageController {
    host: Arc<WorkerHost>,
    scope: String,
    current: Mutex<ScopeConfig>,
    pending: Mutex<Option<ScopeConfig>>,
    source: Arc<dyn UpdateSource>,
    guard: StdMutex<ReloadGuard>,
    reloads: AtomicU32,
    poll_interval: Duration,
}

impl PageController {
    pub fn new(
        host: Arc<WorkerHost>,
        config: ScopeConfig,
        source: Arc<dyn UpdateSource>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            host,
            scope: config.scope_prefix.clone(),
            current: Mutex::new(config),
            pending: Mutex::new(None),
            source,
            guard: StdMutex::new(ReloadGuard::new(store)),
            reloads: AtomicU32::new(0),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// How many times this page reloaded.
    pub fn reload_count(&self) -> u32 {
        self.reloads.load(Ordering::SeqCst)
    }

    /// Initial page mount: register the scope, check for updates once, and
    /// leave the guard settled so a later takeover may reload.
    pub async fn register(&self) -> Result<(), PageError> {
        self.guard.lock().unwrap().begin();
        self.adopt_pending().await;

        let config = self.current.lock().await.clone();
        self.host.register(config).await?;

        self.poll_updates_once().await?;
        self.guard.lock().unwrap().settle();
        Ok(())
    }

    /// Ask the update source for a newer version; when one exists, install it
    /// behind the active worker and remember it as pending. Returns the newly
    /// discovered version, if any.
    pub async fn poll_updates_once(&self) -> Result<Option<String>, PageError> {
        let Some(latest) = self.source.latest_config(&self.scope) else {
            return Ok(None);
        };

        let current_version = self.current.lock().await.version.clone();
        if latest.version == current_version {
            return Ok(None);
        }

        {
            let pending = self.pending.lock().await;
            if pending.as_ref().map(|p| &p.version) == Some(&latest.version) {
                return Ok(None);
            }
        }

        info!(
            scope = %self.scope,
            current = %current_version,
            latest = %latest.version,
            "update found"
        );
        self.host.register(latest.clone()).await?;
        let version = latest.version.clone();
        *self.pending.lock().await = Some(latest);
        Ok(Some(version))
    }

    /// The version installed and waiting behind the active one, if any.
    pub async fn pending_update(&self) -> Option<String> {
        self.pending
            .lock()
            .await
            .as_ref()
            .map(|config| config.version.clone())
    }

    /// Tell the waiting version to take over now. The host answers with a
    /// controller-change signal, which triggers the guarded reload.
    pub async fn apply_update(&self) -> Result<(), PageError> {
        if self.pending.lock().await.is_none() {
            debug!(scope = %self.scope, "no pending update to apply");
            return Ok(());
        }
        self.host
            .post_command(&self.scope, WorkerCommand::SkipWaiting)
            .await?;
        Ok(())
    }

    /// React to a controller takeover. Returns `true` when the page reloaded;
    /// duplicate signals within one lifetime are suppressed by the guard.
    pub async fn handle_controller_change(&self) -> Result<bool, PageError> {
        let armed = self.guard.lock().unwrap().arm();
        if !armed {
            return Ok(false);
        }
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.complete_reload().await?;
        Ok(true)
    }

    /// Wipe every cache namespace of this scope and reload.
    pub async fn clear_cache(&self) -> Result<(), PageError> {
        self.host
            .post_command(&self.scope, WorkerCommand::ClearCache)
            .await?;
        // A user-initiated cache clear always reloads; the guard still gets
        // armed so the fresh lifetime starts suppressed.
        self.guard.lock().unwrap().arm();
        self.reloads.fetch_add(1, Ordering::SeqCst);
        self.complete_reload().await
    }

    /// Declare the current page lifetime stable, re-allowing guarded reloads.
    pub fn settle(&self) {
        self.guard.lock().unwrap().settle();
    }

    /// The post-reload page lifetime: consume the marker, adopt the pending
    /// configuration, and re-register. The guard stays unsettled so takeover
    /// signals racing in during startup cannot reload again.
    async fn complete_reload(&self) -> Result<(), PageError> {
        self.guard.lock().unwrap().begin();
        self.adopt_pending().await;
        let config = self.current.lock().await.clone();
        self.host.register(config).await?;
        Ok(())
    }

    async fn adopt_pending(&self) -> bool {
        if let Some(next) = self.pending.lock().await.take() {
            info!(scope = %self.scope, version = %next.version, "running new version");
            *self.current.lock().await = next;
            true
        } else {
            false
        }
    }

    /// Poll for updates forever at the configured interval.
    pub fn spawn_update_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(controller.poll_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; registration already polled.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = controller.poll_updates_once().await {
                    warn!(scope = %controller.scope, error = %err, "update poll failed");
                }
            }
        })
    }
}
