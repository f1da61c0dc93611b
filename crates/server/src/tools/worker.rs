//! Worker lifecycle tools: status, install and activate.

use netfirst_core::worker::{InstallOutcome, ReapReport};
use netfirst_core::{Error, Registration, WorkerState};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the worker_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerStatusOutput {
    pub state: WorkerState,
    /// Current generation name.
    pub generation: String,
    /// Whether fetches under the scope are currently intercepted.
    pub intercepting: bool,
    pub scope: String,
    pub manifest: Vec<String>,
    pub skip_waiting: bool,
    /// Entries stored in the current generation.
    pub entries: u64,
}

fn to_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Implementation of the worker_status tool.
pub async fn status_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    let worker = registration.worker();
    let config = worker.config();
    let state = registration.state().await;
    let generation = worker.generation_name();
    let entries = worker.db().generation(&generation).len().await?;

    let output = WorkerStatusOutput {
        state,
        intercepting: state == WorkerState::Activated,
        generation,
        scope: config.scope.to_string(),
        manifest: config.manifest.clone(),
        skip_waiting: config.skip_waiting,
        entries,
    };

    to_result(&output)
}

/// Implementation of the worker_install tool.
///
/// Precaches the manifest into the current generation. Fails as a whole if
/// any entry cannot be fetched.
pub async fn install_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    let outcome: InstallOutcome = registration.install().await?;
    to_result(&outcome)
}

/// Implementation of the worker_activate tool.
///
/// Deletes superseded generations and starts intercepting fetches.
pub async fn activate_impl(registration: &Registration) -> Result<CallToolResult, McpError> {
    let report: ReapReport = registration.activate().await?;
    to_result(&report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::tools::test_support::{installed, output_json};
    use netfirst_core::testing::{StubFetcher, serve_manifest, worker_config};
    use netfirst_core::{CacheDb, ServiceWorker};

    #[tokio::test]
    async fn test_status_after_install() {
        let (registration, _fetcher) = installed().await;

        let output = output_json(&status_impl(&registration).await.unwrap());

        assert_eq!(output["state"], "activated");
        assert_eq!(output["intercepting"], true);
        assert_eq!(output["generation"], "ns-v1");
        assert_eq!(output["scope"], "https://app.example.com/");
        assert_eq!(output["entries"], 3);
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_generation("ns-v1").await.unwrap();
        let fetcher = Arc::new(StubFetcher::new());
        serve_manifest(&fetcher, "a");
        let mut config = worker_config("v2");
        config.skip_waiting = false;
        let registration = Registration::new(ServiceWorker::new(db, fetcher, config));

        let installed = output_json(&install_impl(&registration).await.unwrap());
        assert_eq!(installed["install"]["generation"], "ns-v2");
        assert_eq!(installed["install"]["cached"].as_array().unwrap().len(), 3);
        assert!(installed["activation"].is_null());

        let status = output_json(&status_impl(&registration).await.unwrap());
        assert_eq!(status["state"], "installed");
        assert_eq!(status["intercepting"], false);

        let activated = output_json(&activate_impl(&registration).await.unwrap());
        assert_eq!(activated["deleted"][0], "ns-v1");
    }

    #[tokio::test]
    async fn test_install_failure_code() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let registration =
            Registration::new(ServiceWorker::new(db, Arc::new(StubFetcher::new()), worker_config("v1")));

        let err = install_impl(&registration).await.unwrap_err();
        assert_eq!(err.code.0, -32020);
    }

    #[tokio::test]
    async fn test_activate_twice_is_state_error() {
        let (registration, _fetcher) = installed().await;

        let err = activate_impl(&registration).await.unwrap_err();
        assert_eq!(err.code.0, -32021);
    }
}
