//! Push, notification-click, message and sync handling.
//!
//! The relay only builds what the host should do; it never talks to the host
//! itself. [`crate::ServiceWorker`] applies the result through [`crate::Host`].

use chrono::{DateTime, Utc};
use ephone_core::NotificationConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Action id that opens the app.
pub const EXPLORE_ACTION: &str = "explore";

/// Action id that only dismisses.
pub const CLOSE_ACTION: &str = "close";

/// Message type that asks a waiting worker to activate.
pub const SKIP_WAITING_MESSAGE: &str = "SKIP_WAITING";

/// Sync tag reserved for deferred outbound work.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Arrival time in epoch milliseconds.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// A user-visible notification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Notification {
    pub title: String,
    pub options: NotificationOptions,
}

/// What the user did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// The "View" action: open the app.
    Explore,
    /// The "Close" action, the notification body, or any unknown action.
    Dismiss,
}

impl ClickAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action {
            Some(EXPLORE_ACTION) => ClickAction::Explore,
            _ => ClickAction::Dismiss,
        }
    }
}

/// Control messages the worker understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    SkipWaiting,
    /// Anything else; ignored.
    Unknown,
}

impl ControlMessage {
    /// Recognize `{"type": "SKIP_WAITING"}`. Extra fields are allowed.
    pub fn parse(message: &Value) -> Self {
        match message.get("type").and_then(Value::as_str) {
            Some(SKIP_WAITING_MESSAGE) => ControlMessage::SkipWaiting,
            _ => ControlMessage::Unknown,
        }
    }
}

/// Builds notifications and click targets.
#[derive(Debug, Clone)]
pub struct Relay {
    config: NotificationConfig,
    app_shell: Url,
}

impl Relay {
    pub fn new(config: NotificationConfig, app_shell: Url) -> Self {
        Self { config, app_shell }
    }

    /// Notification for a push carrying `payload`.
    ///
    /// A push with no payload uses the default body. A payload that is
    /// present but empty is shown as-is.
    pub fn notification_for_push(&self, payload: Option<&str>, now: DateTime<Utc>) -> Notification {
        let body = payload.map_or_else(|| self.config.default_body.clone(), str::to_string);
        let icon = self.config.icon.clone();

        Notification {
            title: self.config.title.clone(),
            options: NotificationOptions {
                body,
                icon: icon.clone(),
                badge: icon.clone(),
                vibrate: self.config.vibrate.clone(),
                data: NotificationData { date_of_arrival: now.timestamp_millis(), primary_key: 1 },
                actions: vec![
                    NotificationAction {
                        action: EXPLORE_ACTION.into(),
                        title: self.config.explore_title.clone(),
                        icon: icon.clone(),
                    },
                    NotificationAction { action: CLOSE_ACTION.into(), title: self.config.close_title.clone(), icon },
                ],
            },
        }
    }

    /// Window to open for a click, if any.
    pub fn click_target(&self, action: &ClickAction) -> Option<&Url> {
        match action {
            ClickAction::Explore => Some(&self.app_shell),
            ClickAction::Dismiss => None,
        }
    }
}
