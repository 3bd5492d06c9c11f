//! Page↔engine coordination protocol.
//!
//! Envelopes are JSON with a `type` discriminator. Replies that need a
//! synchronous feel (version queries, cache clearing) travel back over a
//! per-message reply port; everything else is one-directional.

use serde::{Deserialize, Serialize};

/// Messages a page context can send the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum Inbound {
    /// Promote a waiting (not-yet-active) generation to active now,
    /// pre-empting the normal wait for all pages to close.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,

    /// Ask for the current version string.
    #[serde(rename = "GET_VERSION")]
    GetVersion,

    /// Drop the current generation's store entirely.
    #[serde(rename = "CLEAR_CACHE")]
    ClearCache,
}

/// Signals and replies the engine sends to page contexts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Outbound {
    #[serde(rename = "VERSION")]
    Version { version: String },

    #[serde(rename = "CACHE_CLEARED")]
    CacheCleared { success: bool },

    /// A background-sync trigger fired; the page owns the actual data
    /// sync, the engine only delegates.
    #[serde(rename = "SYNC_REQUESTED")]
    SyncRequested { timestamp: i64 },

    /// Render a notification assembled from a push payload.
    #[serde(rename = "SHOW_NOTIFICATION")]
    ShowNotification(Notification),

    /// Open (or focus) the application window.
    #[serde(rename = "OPEN_WINDOW")]
    OpenWindow { url: String },

    /// Take control of all open page contexts without a reload.
    #[serde(rename = "CLAIM_CLIENTS")]
    ClaimClients,
}

/// Notification content: push payload fields over configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub tag: String,
    pub actions: Vec<NotificationAction>,
}

/// One button on a notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// Parse an inbound envelope.
///
/// Malformed or unrecognized messages come back as `None`: this protocol
/// is low-stakes coordination, so bad input is dropped, not reported.
pub fn parse_inbound(raw: &serde_json::Value) -> Option<Inbound> {
    match serde_json::from_value(raw.clone()) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::debug!("ignoring unrecognized message: {}", e);
            None
        }
    }
}
