//! Cross-context control channel.
//!
//! Pages command workers with small tagged JSON messages; the host signals
//! pages back over an event channel. Unknown or malformed commands are
//! silently ignored so senders never need a reply path.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Command sent from a page to its worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerCommand {
    /// Instruct a waiting worker to activate immediately.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    /// Instruct the active worker to delete every cache namespace of its scope.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
}

impl WorkerCommand {
    /// Parse a raw message. Malformed JSON, a missing tag, or an unknown tag
    /// all yield `None`; senders get no error back.
    pub fn parse(raw: &str) -> Option<Self> {
        match serde_json::from_str(raw) {
            Ok(command) => Some(command),
            Err(err) => {
                debug!(error = %err, "ignoring unrecognized worker message");
                None
            }
        }
    }
}

/// Signal from the host to pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A new version finished installing behind an active one.
    UpdateReady { scope: String, version: String },
    /// A different worker took control of the scope's pages. Emitted exactly
    /// once per activation takeover.
    ControllerChange { scope: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            WorkerCommand::parse(r#"{"type":"SKIP_WAITING"}"#),
            Some(WorkerCommand::SkipWaiting)
        );
        assert_eq!(
            WorkerCommand::parse(r#"{"type":"CLEAR_CACHE"}"#),
            Some(WorkerCommand::ClearCache)
        );
    }

    #[test]
    fn unknown_tags_are_silently_ignored() {
        assert_eq!(WorkerCommand::parse(r#"{"type":"REFRESH"}"#), None);
        assert_eq!(WorkerCommand::parse(r#"{"kind":"SKIP_WAITING"}"#), None);
        assert_eq!(WorkerCommand::parse("not json"), None);
    }

    #[test]
    fn round_trips_through_json() {
        let raw = serde_json::to_string(&WorkerCommand::ClearCache).unwrap();
        assert_eq!(raw, r#"{"type":"CLEAR_CACHE"}"#);
        assert_eq!(WorkerCommand::parse(&raw), Some(WorkerCommand::ClearCache));
    }
}
