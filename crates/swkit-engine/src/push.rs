//! Push payload parsing and notification building.
//!
//! A push payload is optional JSON; anything that fails to parse is treated
//! as plain text and becomes the notification body, with scope defaults
//! filling every other field.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::NotificationDefaults;

/// Structured push payload. Every field is optional; absent fields fall back
/// to the scope's [`NotificationDefaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub tag: Option<String>,
    #[serde(default)]
    pub data: Option<PushData>,
}

/// Navigation target carried in the payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushData {
    pub url: Option<String>,
}

/// An action button on a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A user-visible notification ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    /// The notification stays until the user interacts with it.
    pub require_interaction: bool,
    pub vibration: Vec<u32>,
    /// Path opened or focused on click.
    pub target_url: String,
    pub actions: Vec<NotificationAction>,
}

/// Merge a raw push payload against scope defaults.
pub fn build_notification(defaults: &NotificationDefaults, raw: Option<&str>) -> Notification {
    let payload = match raw {
        Some(text) => match serde_json::from_str::<PushPayload>(text) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(error = %err, "push payload is not JSON, using raw text as body");
                PushPayload {
                    body: Some(text.to_string()),
                    ..Default::default()
                }
            }
        },
        None => PushPayload::default(),
    };

    Notification {
        title: payload.title.unwrap_or_else(|| defaults.title.clone()),
        body: payload.body.unwrap_or_else(|| defaults.body.clone()),
        icon: payload.icon.unwrap_or_else(|| defaults.icon.clone()),
        badge: payload.badge.unwrap_or_else(|| defaults.badge.clone()),
        tag: payload.tag.unwrap_or_else(|| defaults.tag.clone()),
        require_interaction: true,
        vibration: defaults.vibration.clone(),
        target_url: payload
            .data
            .and_then(|data| data.url)
            .unwrap_or_else(|| defaults.target_url.clone()),
        actions: defaults
            .actions
            .iter()
            .map(|(action, title)| NotificationAction {
                action: action.clone(),
                title: title.clone(),
            })
            .collect(),
    }
}
