//! Engine error types.

use crate::lifecycle::WorkerPhase;
use swkit_net::NetError;
use swkit_store::StoreError;
use thiserror::Error;

/// Errors that can occur in worker operations.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Installation could not seed the essential-asset manifest. Fatal to
    /// that worker version; it never activates.
    #[error("Install failed: {0}")]
    InstallFailed(String),

    /// A network failure that no cache or offline fallback could absorb.
    #[error("Network error: {0}")]
    Network(#[from] NetError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No registration for scope: {0}")]
    NoRegistration(String),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    PhaseTransition { from: WorkerPhase, to: WorkerPhase },

    #[error("Unknown client: {0}")]
    UnknownClient(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
