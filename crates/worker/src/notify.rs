//! Push and notification-click plumbing.
//!
//! The engine renders nothing itself. It turns platform push events into
//! SHOW_NOTIFICATION signals for the page side to display, and click
//! actions into OPEN_WINDOW.

use serde::Deserialize;

use swkit_core::config::NotificationConfig;

use crate::messages::{Notification, NotificationAction, Outbound};

/// The optional JSON body of a push event.
#[derive(Debug, Default, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
}

fn default_actions() -> Vec<NotificationAction> {
    vec![
        NotificationAction { action: "open".into(), title: "Open App".into() },
        NotificationAction { action: "close".into(), title: "Dismiss".into() },
    ]
}

/// Build the outbound notification for a push event, if any.
///
/// No payload means no notification. A payload that isn't the expected
/// JSON shape is dropped like any other malformed message.
pub fn on_push(payload: Option<&serde_json::Value>, defaults: &NotificationConfig) -> Option<Outbound> {
    let raw = payload?;
    let parsed: PushPayload = match serde_json::from_value(raw.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!("ignoring malformed push payload: {}", e);
            return None;
        }
    };

    Some(Outbound::ShowNotification(Notification {
        title: parsed.title.unwrap_or_else(|| defaults.title.clone()),
        body: parsed.body.unwrap_or_else(|| defaults.body.clone()),
        icon: defaults.icon.clone(),
        badge: defaults.badge.clone(),
        tag: defaults.tag.clone(),
        actions: default_actions(),
    }))
}

/// Map a notification click to its outbound effect.
pub fn on_notification_click(action: &str, start_url: &str) -> Option<Outbound> {
    if action == "open" {
        Some(Outbound::OpenWindow { url: start_url.to_string() })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_without_payload_is_noop() {
        assert!(on_push(None, &NotificationConfig::default()).is_none());
    }

    #[test]
    fn test_push_payload_fields_override_defaults() {
        let payload = json!({"title": "Practice time", "body": "10 cards due"});
        let signal = on_push(Some(&payload), &NotificationConfig::default()).unwrap();

        match signal {
            Outbound::ShowNotification(n) => {
                assert_eq!(n.title, "Practice time");
                assert_eq!(n.body, "10 cards due");
                assert_eq!(n.actions.len(), 2);
            }
            other => panic!("expected ShowNotification, got {other:?}"),
        }
    }

    #[test]
    fn test_push_payload_missing_fields_use_defaults() {
        let defaults = NotificationConfig::default();
        let signal = on_push(Some(&json!({})), &defaults).unwrap();

        match signal {
            Outbound::ShowNotification(n) => {
                assert_eq!(n.title, defaults.title);
                assert_eq!(n.body, defaults.body);
            }
            other => panic!("expected ShowNotification, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_push_payload_is_dropped() {
        let payload = json!(["not", "an", "object"]);
        assert!(on_push(Some(&payload), &NotificationConfig::default()).is_none());
    }

    #[test]
    fn test_click_open_opens_start_url() {
        let signal = on_notification_click("open", "/index.html").unwrap();
        assert_eq!(signal, Outbound::OpenWindow { url: "/index.html".into() });
    }

    #[test]
    fn test_click_other_actions_are_noops() {
        assert!(on_notification_click("close", "/index.html").is_none());
        assert!(on_notification_click("", "/index.html").is_none());
    }
}
