//! Push, notification-click, message, sync and error tools.

use ephone_worker::{Event, HostEffects, Notification, Outcome, RecordingHost, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;
use super::lifecycle::ActivateOutput;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Text payload of the push. Omit for a push without data.
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Action id that was clicked ("explore" or "close"). Omit for a click on
    /// the notification body.
    #[serde(default)]
    pub action: Option<String>,

    /// Title of the clicked notification (default: the configured title).
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message posted by the page, e.g. {"type": "SKIP_WAITING"}.
    pub message: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync registration tag.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwErrorParams {
    /// Error message or rejection reason.
    pub message: String,

    /// Report as an unhandled promise rejection instead of an error.
    #[serde(default)]
    pub unhandled_rejection: bool,
}

/// Output shared by the event tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EventOutput {
    /// Event that was dispatched.
    pub event: String,
    /// Notification built for a push.
    pub notification: Option<Notification>,
    /// Activation triggered by a skip-waiting message.
    pub activation: Option<ActivateOutput>,
    /// Host effects the worker requested while handling the event.
    pub effects: HostEffects,
}

async fn dispatch(worker: &ServiceWorker, host: &RecordingHost, event: Event) -> Result<CallToolResult, McpError> {
    let name = event.name();
    let outcome = worker.dispatch(event).await?;
    let effects = host.drain().await;

    let (notification, activation) = match outcome {
        Outcome::Notified(notification) => (Some(notification), None),
        Outcome::Activated(report) => {
            let state = worker.state().await;
            (None, Some(ActivateOutput::new(state.as_str(), report, HostEffects::default())))
        }
        _ => (None, None),
    };

    json_result(&EventOutput { event: name.to_string(), notification, activation, effects })
}

pub async fn push_impl(
    worker: &ServiceWorker, host: &RecordingHost, params: SwPushParams,
) -> Result<CallToolResult, McpError> {
    dispatch(worker, host, Event::Push { data: params.text }).await
}

pub async fn notification_click_impl(
    worker: &ServiceWorker, host: &RecordingHost, default_title: &str, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let title = params.title.unwrap_or_else(|| default_title.to_string());
    dispatch(worker, host, Event::NotificationClick { title, action: params.action }).await
}

pub async fn message_impl(
    worker: &ServiceWorker, host: &RecordingHost, params: SwMessageParams,
) -> Result<CallToolResult, McpError> {
    dispatch(worker, host, Event::Message(params.message)).await
}

pub async fn sync_impl(
    worker: &ServiceWorker, host: &RecordingHost, params: SwSyncParams,
) -> Result<CallToolResult, McpError> {
    dispatch(worker, host, Event::Sync { tag: params.tag }).await
}

pub async fn error_impl(
    worker: &ServiceWorker, host: &RecordingHost, params: SwErrorParams,
) -> Result<CallToolResult, McpError> {
    let event = if params.unhandled_rejection {
        Event::UnhandledRejection { reason: params.message }
    } else {
        Event::Error { message: params.message }
    };
    dispatch(worker, host, event).await
}
