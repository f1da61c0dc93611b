//! cache_list tool implementation.

use netfirst_core::cache::GenerationInfo;
use netfirst_core::{Error, Registration};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Include the URLs stored in the current generation.
    #[serde(default)]
    pub include_urls: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Name of the worker's current generation.
    pub current: String,
    /// Every generation in the store, sorted by name.
    pub generations: Vec<GenerationInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub urls: Option<Vec<String>>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(registration: &Registration, params: CacheListParams) -> Result<CallToolResult, McpError> {
    let worker = registration.worker();
    let current = worker.generation_name();
    let generations = worker.db().list_generations().await?;

    let urls = if params.include_urls { Some(worker.db().generation(&current).urls().await?) } else { None };

    let output = CacheListOutput { current, generations, urls };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize generations: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{installed, output_json};

    #[tokio::test]
    async fn test_list_impl() {
        let (registration, _fetcher) = installed().await;
        registration.worker().db().open_generation("other-cache").await.unwrap();

        let result = list_impl(&registration, CacheListParams::default()).await.unwrap();
        let output = output_json(&result);

        assert_eq!(output["current"], "ns-v1");
        let generations = output["generations"].as_array().unwrap();
        assert_eq!(generations.len(), 2);
        assert_eq!(generations[0]["name"], "ns-v1");
        assert_eq!(generations[0]["entries"], 3);
        assert_eq!(generations[1]["name"], "other-cache");
        assert_eq!(generations[1]["entries"], 0);
        assert!(output.get("urls").is_none());
    }

    #[tokio::test]
    async fn test_list_impl_with_urls() {
        let (registration, _fetcher) = installed().await;

        let result = list_impl(&registration, CacheListParams { include_urls: true }).await.unwrap();
        let output = output_json(&result);

        let urls = output["urls"].as_array().unwrap();
        assert_eq!(urls.len(), 3);
        assert!(urls.iter().any(|u| u == "https://app.example.com/tracker.html"));
    }
}
