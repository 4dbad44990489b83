//! Reload-storm prevention.
//!
//! A controller takeover must reload the page so the new worker serves it
//! from the first request, but only once: repeated takeover signals within
//! one page lifetime must not loop the page through endless reloads. The
//! guard is a three-state machine over a session-store marker:
//!
//! ```text
//! Idle ──arm──▶ ReloadPending ──begin (marker found)──▶ Reloaded
//!   ▲                                                      │
//!   └───────────────────── settle ─────────────────────────┘
//! ```
//!
//! The marker is removed the moment it is read; a crash between arming and
//! reloading leaves a stale marker that the next lifetime consumes and
//! discards, costing one suppressed reload rather than a loop.

use std::sync::Arc;
use tracing::debug;

use crate::session::SessionStore;

/// Session-store key holding the pending-reload marker.
pub const RELOAD_MARKER_KEY: &str = "swkit-reload-pending";

/// Where this page lifetime stands in the reload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    /// No reload armed; a takeover may trigger one.
    Idle,
    /// A reload was requested and the marker is set.
    ReloadPending,
    /// This lifetime started by consuming a marker; further takeover signals
    /// are ignored until the guard settles.
    Reloaded,
}

/// Reload-once state machine for a single page.
pub struct ReloadGuard {
    store: Arc<dyn SessionStore>,
    state: ReloadState,
}

impl ReloadGuard {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            state: ReloadState::Idle,
        }
    }

    pub fn state(&self) -> ReloadState {
        self.state
    }

    /// Start a page lifetime: consume the marker unconditionally. A present
    /// marker means this lifetime is the result of a guarded reload.
    pub fn begin(&mut self) -> ReloadState {
        let marker = self.store.remove(RELOAD_MARKER_KEY);
        self.state = if marker.is_some() {
            debug!("page lifetime started from a guarded reload");
            ReloadState::Reloaded
        } else {
            ReloadState::Idle
        };
        self.state
    }

    /// Arm a reload. Returns `true` when the caller should actually reload;
    /// `false` means a reload already happened this lifetime or is pending.
    pub fn arm(&mut self) -> bool {
        if self.state != ReloadState::Idle {
            debug!(state = ?self.state, "suppressing duplicate reload");
            return false;
        }
        self.store.set(RELOAD_MARKER_KEY, "1");
        self.state = ReloadState::ReloadPending;
        true
    }

    /// Mark the lifetime as stable, allowing the next takeover to reload.
    pub fn settle(&mut self) {
        if self.state == ReloadState::Reloaded {
            self.state = ReloadState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;

    fn guard() -> ReloadGuard {
        ReloadGuard::new(Arc::new(MemorySessionStore::new()))
    }

    #[test]
    fn fresh_lifetime_is_idle_and_arms_once() {
        let mut guard = guard();
        assert_eq!(guard.begin(), ReloadState::Idle);
        assert!(guard.arm());
        assert_eq!(guard.state(), ReloadState::ReloadPending);
        // A second takeover signal while the reload is in flight is ignored.
        assert!(!guard.arm());
    }

    #[test]
    fn marker_survives_into_the_next_lifetime() {
        let store = Arc::new(MemorySessionStore::new());
        let mut first = ReloadGuard::new(Arc::clone(&store) as Arc<dyn SessionStore>);
        first.begin();
        assert!(first.arm());

        // The reload happened; the next lifetime sees the marker.
        let mut second = ReloadGuard::new(store as Arc<dyn SessionStore>);
        assert_eq!(second.begin(), ReloadState::Reloaded);
        assert!(!second.arm());

        // Once settled, reloads are allowed again.
        second.settle();
        assert!(second.arm());
    }

    #[test]
    fn begin_consumes_a_stale_marker() {
        let store = Arc::new(MemorySessionStore::new());
        store.set(RELOAD_MARKER_KEY, "1");

        let mut guard = ReloadGuard::new(Arc::clone(&store) as Arc<dyn SessionStore>);
        assert_eq!(guard.begin(), ReloadState::Reloaded);
        assert_eq!(store.get(RELOAD_MARKER_KEY), None);

        // The lifetime after it starts clean.
        let mut next = ReloadGuard::new(store as Arc<dyn SessionStore>);
        assert_eq!(next.begin(), ReloadState::Idle);
    }
}
