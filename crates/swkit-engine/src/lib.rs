//! # swkit Engine
//!
//! A parameterized, scoped offline-caching worker: the engine behind the
//! public-site, `/admin`, and `/entregador` workers of a restaurant-ordering
//! PWA, reimplemented once and instantiated per scope with a [`ScopeConfig`].
//!
//! ## Architecture
//!
//! ```text
//! WorkerHost
//!     │
//!     └── registration per scope ("/", "/admin", "/entregador")
//!             ├── active  (CacheWorker)
//!             └── waiting (CacheWorker)
//!
//! CacheWorker
//!     ├── lifecycle  Installing → Waiting → Activating → Active → Redundant
//!     ├── router     Bypass | NetworkOnly | CacheFirst | NetworkFirst | SWR
//!     ├── strategy   the four fetch algorithms
//!     ├── message    SKIP_WAITING / CLEAR_CACHE commands, host events
//!     └── push       notification building and click routing
//! ```
//!
//! Each worker owns one versioned cache namespace; activation evicts every
//! stale namespace of its scope and claims open page clients so interception
//! starts without a reload.

pub mod clients;
pub mod config;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod message;
pub mod presets;
pub mod push;
pub mod router;
pub mod strategy;
pub mod worker;

pub use clients::{ClientId, ClientRegistry, PageClient};
pub use config::{NotificationDefaults, ScopeConfig, ShellStrategy};
pub use error::WorkerError;
pub use host::WorkerHost;
pub use lifecycle::{can_transition, WorkerPhase};
pub use message::{HostEvent, WorkerCommand};
pub use push::{build_notification, Notification, NotificationAction, PushPayload};
pub use router::{route, RouteDecision};
pub use worker::{CacheWorker, CommandOutcome};
