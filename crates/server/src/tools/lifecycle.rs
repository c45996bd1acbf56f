//! sw_install, sw_activate and sw_status tools.

use ephone_worker::{HostEffects, RecordingHost, ServiceWorker};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the sw_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Lifecycle state after install.
    pub state: String,
    /// Store the manifest was written to.
    pub store: String,
    /// URLs pre-cached, in manifest order.
    pub cached: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FailedStore {
    pub name: String,
    pub error: String,
}

/// Output from the sw_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub state: String,
    /// Stale stores removed.
    pub deleted: Vec<String>,
    /// Stale stores that could not be removed.
    pub failed: Vec<FailedStore>,
    pub clients_claimed: bool,
    pub effects: HostEffects,
}

impl ActivateOutput {
    pub(crate) fn new(state: &str, report: ephone_worker::ActivationReport, effects: HostEffects) -> Self {
        Self {
            state: state.to_string(),
            deleted: report.deleted,
            failed: report
                .failed
                .into_iter()
                .map(|f| FailedStore { name: f.name, error: f.error })
                .collect(),
            clients_claimed: report.clients_claimed,
            effects,
        }
    }
}

/// Output from the sw_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StatusOutput {
    pub state: String,
    pub skip_waiting: bool,
    /// Installed and held back until activation.
    pub waiting: bool,
    pub since_ms: u64,
    pub static_store: String,
    pub dynamic_store: String,
    /// Resolved static manifest.
    pub manifest: Vec<String>,
}

pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.install().await?;
    let output =
        InstallOutput { state: worker.state().await.as_str().to_string(), store: report.store, cached: report.cached };

    json_result(&output)
}

pub async fn activate_impl(worker: &ServiceWorker, host: &RecordingHost) -> Result<CallToolResult, McpError> {
    let report = worker.activate().await?;
    let output = ActivateOutput::new(worker.state().await.as_str(), report, host.drain().await);

    json_result(&output)
}

pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let status = worker.status().await;
    let output = StatusOutput {
        state: status.state.as_str().to_string(),
        skip_waiting: status.skip_waiting,
        waiting: status.waiting,
        since_ms: status.since_ms,
        static_store: status.stores.static_store,
        dynamic_store: status.stores.dynamic_store,
        manifest: worker.manifest().iter().map(|u| u.to_string()).collect(),
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{bridge, output};
    use ephone_core::CacheStorage;

    #[tokio::test]
    async fn test_status_before_install() {
        let b = bridge().await;
        let result = status_impl(&b.worker).await.unwrap();
        let status: StatusOutput = output(&result);

        assert_eq!(status.state, "parsed");
        assert_eq!(status.static_store, "ephone-static-v1.0.0");
        assert_eq!(status.dynamic_store, "ephone-dynamic-v1.0.0");
        assert_eq!(status.manifest.len(), 4);
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let b = bridge().await;
        b.db.create_store("ephone-v0.9.0").await.unwrap();

        let installed: InstallOutput = output(&install_impl(&b.worker).await.unwrap());
        assert_eq!(installed.state, "installed");
        assert_eq!(installed.cached.len(), 4);

        let activated: ActivateOutput = output(&activate_impl(&b.worker, &b.host).await.unwrap());
        assert_eq!(activated.state, "active");
        assert_eq!(activated.deleted, vec!["ephone-v0.9.0"]);
        assert!(activated.clients_claimed);
        assert_eq!(activated.effects.clients_claimed, 1);
        assert_eq!(b.db.keys().await.unwrap(), vec!["ephone-static-v1.0.0"]);
    }

    #[tokio::test]
    async fn test_install_offline_fails() {
        let b = bridge().await;
        b.fetcher.set_offline(true);

        let err = install_impl(&b.worker).await.unwrap_err();
        assert_eq!(err.code.0, -32010);

        let status: StatusOutput = output(&status_impl(&b.worker).await.unwrap());
        assert_eq!(status.state, "redundant");
    }

    #[tokio::test]
    async fn test_activate_without_install_fails() {
        let b = bridge().await;
        let err = activate_impl(&b.worker, &b.host).await.unwrap_err();
        assert_eq!(err.code.0, -32011);
    }
}
