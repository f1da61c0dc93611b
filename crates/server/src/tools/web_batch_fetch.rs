//! web_batch_fetch tool implementation.
//!
//! Fetches multiple URLs through the worker in parallel with bounded concurrency.
//! Each fetch is an independent interception; results come back in input order.

use netfirst_core::{Error, Registration};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::tools::web_fetch::{WebFetchOutput, default_method, fetch_one};

/// Input parameters for web_batch_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WebBatchFetchParams {
    /// URLs to fetch, absolute or relative to the worker scope.
    pub urls: Vec<String>,

    /// HTTP method for every request (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Maximum number of concurrent requests (default: 4, max: 16).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: Option<u8>,
}

fn default_max_concurrency() -> Option<u8> {
    Some(4)
}

/// Individual batch result item.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchItem {
    /// The URL as given.
    pub url: String,
    /// The response (if one was produced).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<WebFetchOutput>,
    /// Error message (if no response was produced).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Batch summary statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BatchSummary {
    pub total: u32,
    /// Served live from the network.
    pub network: u32,
    /// Served from the cache after a network failure.
    pub cached: u32,
    /// Not intercepted.
    pub passthrough: u32,
    pub failed: u32,
}

/// Output structure for web_batch_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebBatchFetchOutput {
    /// Individual results for each URL (in input order).
    pub results: Vec<BatchItem>,
    pub summary: BatchSummary,
}

/// Implementation of the web_batch_fetch tool.
pub async fn batch_fetch_impl(
    registration: &Arc<Registration>, params: WebBatchFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.urls.is_empty() {
        return Err(Error::InvalidInput("urls cannot be empty".into()).into());
    }

    let max_concurrency = params.max_concurrency.unwrap_or(4).min(16) as usize;
    if max_concurrency == 0 {
        return Err(Error::InvalidInput("max_concurrency must be at least 1".into()).into());
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrency));
    let mut join_set = JoinSet::new();

    for (index, url) in params.urls.iter().cloned().enumerate() {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        let registration = Arc::clone(registration);
        let method = params.method.clone();

        join_set.spawn(async move {
            let _permit = permit;
            let result = fetch_one(&registration, &url, &method).await;
            (index, url, result)
        });
    }

    let mut results: Vec<(usize, BatchItem)> = Vec::with_capacity(params.urls.len());
    let mut summary = BatchSummary::default();

    while let Some(joined) = join_set.join_next().await {
        let (index, url, result) = joined.map_err(|e| McpError::internal_error(e.to_string(), None))?;

        let item = match result {
            Ok(output) => {
                match output.source.as_str() {
                    "network" => summary.network += 1,
                    "cache" => summary.cached += 1,
                    _ => summary.passthrough += 1,
                }
                BatchItem { url, result: Some(output), error: None }
            }
            Err(e) => {
                summary.failed += 1;
                BatchItem { url, result: None, error: Some(e.to_string()) }
            }
        };

        results.push((index, item));
    }

    results.sort_by_key(|(index, _)| *index);
    summary.total = results.len() as u32;

    let output = WebBatchFetchOutput { results: results.into_iter().map(|(_, item)| item).collect(), summary };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{installed, output_json};

    #[tokio::test]
    async fn test_batch_fetch_empty_urls() {
        let (registration, _fetcher) = installed().await;
        let params = WebBatchFetchParams { urls: vec![], ..Default::default() };

        assert!(batch_fetch_impl(&registration, params).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_fetch_invalid_concurrency() {
        let (registration, _fetcher) = installed().await;
        let params = WebBatchFetchParams {
            urls: vec!["./".to_string()],
            method: "GET".into(),
            max_concurrency: Some(0),
        };

        assert!(batch_fetch_impl(&registration, params).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_fetch_mixed_sources_in_order() {
        let (registration, fetcher) = installed().await;
        fetcher.break_url("https://app.example.com/tracker.html");
        fetcher.break_url("https://app.example.com/missing.css");
        fetcher.route("https://cdn.example.com/lib.js", 200, "lib");

        let params = WebBatchFetchParams {
            urls: vec![
                "./".into(),
                "./tracker.html".into(),
                "./missing.css".into(),
                "https://cdn.example.com/lib.js".into(),
            ],
            method: "GET".into(),
            max_concurrency: Some(2),
        };

        let result = batch_fetch_impl(&registration, params).await.unwrap();
        let output = output_json(&result);
        let results = output["results"].as_array().unwrap();

        assert_eq!(results[0]["result"]["source"], "network");
        assert_eq!(results[1]["result"]["source"], "cache");
        assert!(results[2]["error"].as_str().unwrap().contains("NO_RESPONSE"));
        assert_eq!(results[3]["result"]["source"], "passthrough");

        assert_eq!(output["summary"]["total"], 4);
        assert_eq!(output["summary"]["network"], 1);
        assert_eq!(output["summary"]["cached"], 1);
        assert_eq!(output["summary"]["passthrough"], 1);
        assert_eq!(output["summary"]["failed"], 1);
    }

    #[test]
    fn test_default_max_concurrency() {
        assert_eq!(default_max_concurrency(), Some(4));
    }
}
