//! The offline cache proxy itself.
//!
//! [`ServiceWorker`] owns the lifecycle state and routes every [`Event`] to
//! its handler. Store access, network access and client/notification control
//! all go through injected capabilities, so the same worker runs against
//! SQLite and reqwest in the bridge binary and against in-memory doubles in
//! tests.

use std::sync::Arc;

use chrono::Utc;
use ephone_client::{Fetcher, resolve};
use ephone_core::{AppConfig, CacheStorage, Error, Request};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

use crate::event::{ActivationReport, Event, InstallReport, Outcome, StoreFailure};
use crate::host::Host;
use crate::lifecycle::{LifecycleState, WorkerState};
use crate::naming::StoreNames;
use crate::relay::{BACKGROUND_SYNC_TAG, ClickAction, ControlMessage, Notification, Relay};
use crate::router::Router;
use crate::strategy::{CacheFirst, OfflineFallback, Served};

/// Point-in-time view of the worker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: LifecycleState,
    pub skip_waiting: bool,
    pub waiting: bool,
    /// Milliseconds since the last lifecycle transition.
    pub since_ms: u64,
    #[serde(flatten)]
    pub stores: StoreNames,
}

pub struct ServiceWorker {
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    host: Arc<dyn Host>,
    names: StoreNames,
    router: Router,
    strategy: CacheFirst,
    relay: Relay,
    /// Static manifest resolved against the origin, in install order.
    manifest: Vec<Url>,
    shell: Request,
    state: RwLock<WorkerState>,
}

fn resolve_asset(origin: &Url, asset: &str) -> Result<Url, Error> {
    resolve(origin, asset).map_err(|e| Error::InvalidUrl(format!("{asset}: {e}")))
}

impl ServiceWorker {
    /// Build a worker for `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin, a manifest entry or the app
    /// shell cannot be resolved, and `Error::InvalidInput` for a bad dynamic
    /// pattern.
    pub fn new(
        config: &AppConfig, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn Fetcher>, host: Arc<dyn Host>,
    ) -> Result<Self, Error> {
        let router = Router::from_config(config)?;
        let origin = router.origin().clone();

        let manifest = config
            .static_assets
            .iter()
            .map(|asset| resolve_asset(&origin, asset))
            .collect::<Result<Vec<_>, _>>()?;
        let shell_url = resolve_asset(&origin, &config.app_shell)?;

        Ok(Self {
            storage,
            fetcher,
            host,
            names: StoreNames::from_config(config),
            router,
            strategy: CacheFirst::new(),
            relay: Relay::new(config.notification.clone(), shell_url.clone()),
            manifest,
            shell: Request::get(shell_url),
            state: RwLock::new(WorkerState::new()),
        })
    }

    /// Replace the fetch strategy (e.g. to apply an expiry policy).
    pub fn with_strategy(mut self, strategy: CacheFirst) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn names(&self) -> &StoreNames {
        &self.names
    }

    pub fn manifest(&self) -> &[Url] {
        &self.manifest
    }

    pub async fn state(&self) -> LifecycleState {
        self.state.read().await.state()
    }

    pub async fn status(&self) -> WorkerStatus {
        let state = self.state.read().await;
        WorkerStatus {
            state: state.state(),
            skip_waiting: state.skip_waiting_requested(),
            waiting: state.is_waiting(),
            since_ms: state.elapsed_ms(),
            stores: self.names.clone(),
        }
    }

    /// Route an event to its handler.
    pub async fn dispatch(&self, event: Event) -> Result<Outcome, Error> {
        tracing::debug!(event = event.name(), "dispatching event");

        match event {
            Event::Install => self.install().await.map(Outcome::Installed),
            Event::Activate => self.activate().await.map(Outcome::Activated),
            Event::Fetch(request) => Ok(self.fetch(&request).await?.map_or(Outcome::Passthrough, Outcome::Respond)),
            Event::Push { data } => self.push(data.as_deref()).await.map(Outcome::Notified),
            Event::NotificationClick { title, action } => {
                self.notification_click(&title, action.as_deref()).await?;
                Ok(Outcome::Done)
            }
            Event::Message(message) => self.message(&message).await,
            Event::Sync { tag } => {
                self.sync(&tag);
                Ok(Outcome::Done)
            }
            Event::Error { message } => {
                tracing::error!(message = %message, "worker error");
                Ok(Outcome::Done)
            }
            Event::UnhandledRejection { reason } => {
                tracing::error!(reason = %reason, "unhandled rejection in worker");
                Ok(Outcome::Done)
            }
        }
    }

    /// Pre-cache the static manifest, then signal skip-waiting.
    ///
    /// All manifest entries are fetched before any is stored, and any failure
    /// (no answer, or an answer other than `200`) fails the whole install and
    /// leaves the worker redundant.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.state.write().await.begin_install()?;
        tracing::info!(store = %self.names.static_store, assets = self.manifest.len(), "installing");

        match self.precache().await {
            Ok(report) => {
                let mut state = self.state.write().await;
                state.install_succeeded()?;
                state.skip_waiting();
                tracing::info!(store = %report.store, cached = report.cached.len(), "install complete");
                Ok(report)
            }
            Err(e) => {
                self.state.write().await.install_failed();
                tracing::error!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    /// Fetch and store the manifest. A static store created by a failed
    /// attempt is discarded; one that already existed keeps serving.
    async fn precache(&self) -> Result<InstallReport, Error> {
        let name = &self.names.static_store;
        let existed = match self.storage.has(name).await {
            Ok(existed) => existed,
            Err(e) => {
                tracing::warn!(store = %name, error = %e, "could not check for static store");
                true
            }
        };

        let result = self.precache_into(name).await;
        if result.is_err() && !existed {
            match self.storage.delete(name).await {
                Ok(_) => tracing::debug!(store = %name, "discarded partial static store"),
                Err(e) => tracing::warn!(store = %name, error = %e, "failed to discard partial static store"),
            }
        }
        result
    }

    async fn precache_into(&self, name: &str) -> Result<InstallReport, Error> {
        let store = self
            .storage
            .open(name)
            .await
            .map_err(|e| Error::InstallFailed(format!("cannot open {name}: {e}")))?;

        let mut fetched = Vec::with_capacity(self.manifest.len());
        for url in &self.manifest {
            let request = Request::get(url.clone());
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;
            if !response.is_cacheable() {
                return Err(Error::InstallFailed(format!("{url}: status {}", response.status)));
            }
            fetched.push((request, response));
        }

        let mut cached = Vec::with_capacity(fetched.len());
        for (request, response) in fetched {
            store
                .put(&request, response)
                .await
                .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
            cached.push(request.url.to_string());
        }

        Ok(InstallReport { store: name.to_string(), cached })
    }

    /// Delete every store outside the current pair, then claim clients.
    ///
    /// A store that cannot be deleted is logged and skipped; cleanup never
    /// blocks activation. Activating an already active worker is a no-op.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        {
            let mut state = self.state.write().await;
            if state.is_active() {
                tracing::debug!("already active");
                return Ok(ActivationReport::default());
            }
            state.begin_activate()?;
        }

        let mut report = ActivationReport::default();

        match self.storage.keys().await {
            Ok(keys) => {
                for name in self.names.stale(&keys) {
                    match self.storage.delete(name).await {
                        Ok(_) => {
                            tracing::info!(store = name, "deleted stale store");
                            report.deleted.push(name.to_string());
                        }
                        Err(e) => {
                            tracing::warn!(store = name, error = %e, "failed to delete stale store");
                            report.failed.push(StoreFailure { name: name.to_string(), error: e.to_string() });
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "could not list stores, skipping cleanup"),
        }

        match self.host.claim_clients().await {
            Ok(()) => report.clients_claimed = true,
            Err(e) => tracing::warn!(error = %e, "failed to claim clients"),
        }

        self.state.write().await.activated()?;
        tracing::info!(deleted = report.deleted.len(), failed = report.failed.len(), "activated");

        Ok(report)
    }

    /// Serve an intercepted request cache-first.
    ///
    /// Only an active worker intercepts. `None` means the request passes
    /// through to the runtime untouched.
    pub async fn fetch(&self, request: &Request) -> Result<Option<Served>, Error> {
        if !self.state.read().await.is_active() {
            tracing::debug!(url = %request.url, "not active, passing through");
            return Ok(None);
        }

        let Some(role) = self.router.route(request).role() else {
            return Ok(None);
        };

        let store = self.storage.open(self.names.for_role(role)).await?;
        let fallback = OfflineFallback::for_request(role, request, &self.shell);
        let served = self.strategy.respond(&*store, &*self.fetcher, request, &fallback).await?;

        tracing::debug!(url = %request.url, role = role.as_str(), source = ?served.source, status = served.response.status, "fetch served");
        Ok(Some(served))
    }

    /// Show a notification for a push message.
    pub async fn push(&self, payload: Option<&str>) -> Result<Notification, Error> {
        let notification = self.relay.notification_for_push(payload, Utc::now());
        self.host.show_notification(&notification).await?;
        tracing::info!(has_payload = payload.is_some(), "push notification shown");
        Ok(notification)
    }

    /// Dismiss the clicked notification; open the app for the explore action.
    pub async fn notification_click(&self, title: &str, action: Option<&str>) -> Result<(), Error> {
        self.host.close_notification(title).await?;

        let action = ClickAction::parse(action);
        if let Some(url) = self.relay.click_target(&action) {
            self.host.open_window(url).await?;
            tracing::info!(url = %url, "opened app from notification");
        }
        Ok(())
    }

    /// Handle a page message. `SKIP_WAITING` activates a waiting worker now.
    pub async fn message(&self, message: &Value) -> Result<Outcome, Error> {
        match ControlMessage::parse(message) {
            ControlMessage::SkipWaiting => {
                let activate_now = self.state.write().await.skip_waiting();
                if activate_now {
                    tracing::info!("skip waiting requested, activating");
                    self.activate().await.map(Outcome::Activated)
                } else {
                    tracing::debug!("skip waiting recorded");
                    Ok(Outcome::Done)
                }
            }
            ControlMessage::Unknown => {
                tracing::debug!(message = %message, "ignoring unknown message");
                Ok(Outcome::Done)
            }
        }
    }

    /// Background sync. Nothing is queued yet, so every tag completes at once.
    pub fn sync(&self, tag: &str) {
        if tag == BACKGROUND_SYNC_TAG {
            tracing::info!(tag, "background sync");
        } else {
            tracing::debug!(tag, "ignoring sync tag");
        }
    }
}
