//! Shared fixtures for tool tests.

use std::sync::Arc;

use netfirst_core::Registration;
use netfirst_core::testing::{StubFetcher, serve_manifest, worker};
use rmcp::model::CallToolResult;

/// A registration whose `ns-v1` generation holds the default manifest tagged "a".
pub async fn installed() -> (Arc<Registration>, Arc<StubFetcher>) {
    let (worker, fetcher) = worker("v1").await;
    serve_manifest(&fetcher, "a");
    let registration = Arc::new(Registration::new(worker));
    registration.install().await.unwrap();
    (registration, fetcher)
}

/// Parse the JSON document in the first text block of a tool result.
pub fn output_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content.get("text").and_then(|v| v.as_str()).expect("text content");
    serde_json::from_str(text).unwrap()
}
