//! Events the runtime delivers and what handling them produced.

use ephone_core::Request;
use serde::Serialize;
use serde_json::Value;

use crate::relay::Notification;
use crate::strategy::Served;

#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    /// Push with its text payload, if any.
    Push { data: Option<String> },
    /// Click on a notification or one of its actions.
    NotificationClick { title: String, action: Option<String> },
    /// Structured message posted by a page.
    Message(Value),
    Sync { tag: String },
    /// Uncaught error inside the worker.
    Error { message: String },
    /// Rejected async work nobody awaited.
    UnhandledRejection { reason: String },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Install => "install",
            Event::Activate => "activate",
            Event::Fetch(_) => "fetch",
            Event::Push { .. } => "push",
            Event::NotificationClick { .. } => "notificationclick",
            Event::Message(_) => "message",
            Event::Sync { .. } => "sync",
            Event::Error { .. } => "error",
            Event::UnhandledRejection { .. } => "unhandledrejection",
        }
    }
}

/// Stores written during install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub store: String,
    pub cached: Vec<String>,
}

/// A stale store that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreFailure {
    pub name: String,
    pub error: String,
}

/// Cleanup performed during activation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub failed: Vec<StoreFailure>,
    pub clients_claimed: bool,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// Handled; nothing to hand back.
    Done,
    Installed(InstallReport),
    Activated(ActivationReport),
    /// The worker answers the fetch with this response.
    Respond(Served),
    /// The worker does not intercept; the runtime fetches normally.
    Passthrough,
    Notified(Notification),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        let fetch = Event::Fetch(Request::parse("GET", "https://app.example/").unwrap());
        assert_eq!(fetch.name(), "fetch");
        assert_eq!(Event::NotificationClick { title: "EPhone".into(), action: None }.name(), "notificationclick");
        assert_eq!(Event::Message(json!({})).name(), "message");
        assert_eq!(Event::UnhandledRejection { reason: "x".into() }.name(), "unhandledrejection");
    }
}
