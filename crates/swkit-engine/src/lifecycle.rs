//! Worker lifecycle phases.
//!
//! An explicit, checked state machine rather than implicit install/activate
//! event ordering. A worker that fails installation becomes `Redundant` and
//! never serves a fetch.

use serde::{Deserialize, Serialize};

/// Phase of one worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerPhase {
    /// Seeding the essential-asset manifest into a fresh namespace.
    Installing,
    /// Installed; an older version may still control open pages.
    Waiting,
    /// Evicting stale namespaces and claiming page clients.
    Activating,
    /// Intercepting fetches.
    Active,
    /// Superseded or failed; will never serve again.
    Redundant,
}

/// Whether a phase transition is legal.
pub fn can_transition(from: WorkerPhase, to: WorkerPhase) -> bool {
    use WorkerPhase::*;
    matches!(
        (from, to),
        (Installing, Waiting)
            | (Waiting, Activating)
            | (Activating, Active)
            | (Installing, Redundant)
            | (Waiting, Redundant)
            | (Activating, Redundant)
            | (Active, Redundant)
    )
}
