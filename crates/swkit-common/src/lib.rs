//! # swkit Common
//!
//! Shared utilities for the swkit caching-worker engine: logging setup and
//! the clock abstraction used for cache freshness decisions.

pub mod clock;
pub mod logging;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{init_logging, LogConfig, LogFormat};
