//! # swkit Page
//!
//! The page side of the engine: registers a scope with the host, polls for
//! new versions, applies updates, and guarantees that a controller takeover
//! reloads the page exactly once per page lifetime.
//!
//! ```text
//! PageController
//!     ├── UpdateSource   where new scope configs come from
//!     ├── ReloadGuard    reload-once FSM over a session marker
//!     └── SessionStore   per-tab string storage for the marker
//! ```

pub mod controller;
pub mod guard;
pub mod session;
pub mod source;

pub use controller::{PageController, PageError};
pub use guard::{ReloadGuard, ReloadState, RELOAD_MARKER_KEY};
pub use session::{MemorySessionStore, SessionStore};
pub use source::{StaticUpdateSource, UpdateSource};
