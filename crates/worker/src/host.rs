//! Host capabilities the worker drives but does not own.

use async_trait::async_trait;
use ephone_core::Error;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::relay::Notification;

/// Client and notification control provided by the embedding runtime.
#[async_trait]
pub trait Host: Send + Sync {
    /// Take control of all open clients without a reload.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Dismiss the notification with this title.
    async fn close_notification(&self, title: &str) -> Result<(), Error>;
}

/// Side effects requested of a [`RecordingHost`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HostEffects {
    pub clients_claimed: u32,
    pub windows_opened: Vec<String>,
    pub notifications_shown: Vec<Notification>,
    pub notifications_closed: Vec<String>,
}

impl HostEffects {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Host that records what it was asked to do.
///
/// Used by the MCP bridge, which reports effects back to its caller instead
/// of performing them, and by tests.
#[derive(Debug, Default)]
pub struct RecordingHost {
    effects: Mutex<HostEffects>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub async fn snapshot(&self) -> HostEffects {
        self.effects.lock().await.clone()
    }

    /// Take and clear the recorded effects.
    pub async fn drain(&self) -> HostEffects {
        std::mem::take(&mut *self.effects.lock().await)
    }
}

#[async_trait]
impl Host for RecordingHost {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.effects.lock().await.clients_claimed += 1;
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.effects.lock().await.windows_opened.push(url.to_string());
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.effects.lock().await.notifications_shown.push(notification.clone());
        Ok(())
    }

    async fn close_notification(&self, title: &str) -> Result<(), Error> {
        self.effects.lock().await.notifications_closed.push(title.to_string());
        Ok(())
    }
}
