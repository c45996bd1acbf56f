//! Offline caching proxy for the EPhone web app.
//!
//! This crate provides:
//! - Versioned store naming and stale-store cleanup
//! - The install/activate lifecycle state machine
//! - Request routing between the static and dynamic stores
//! - Cache-first fetch with write-through and offline fallbacks
//! - Push notification, click and control-message handling

pub mod event;
pub mod expiry;
pub mod host;
pub mod lifecycle;
pub mod naming;
pub mod relay;
pub mod router;
pub mod strategy;
pub mod worker;

#[cfg(test)]
mod testing;

pub use event::{ActivationReport, Event, InstallReport, Outcome, StoreFailure};
pub use expiry::{ExpiryPolicy, MaxAge, StaleForever};
pub use host::{Host, HostEffects, RecordingHost};
pub use lifecycle::{LifecycleState, WorkerState};
pub use naming::{StoreNames, StoreRole};
pub use relay::{Notification, NotificationAction, NotificationOptions, Relay};
pub use router::{Route, Router};
pub use strategy::{CacheFirst, OfflineFallback, ResponseSource, Served};
pub use worker::{ServiceWorker, WorkerStatus};
