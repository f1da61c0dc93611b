//! cache_get tool implementation.
//!
//! Looks up a stored response without touching the network.

use netfirst_core::{Error, Registration};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::web_fetch::{WebFetchOutput, build_request};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached GET request, absolute or relative to the worker scope.
    pub url: String,

    /// Generation to read from (default: the worker's current generation).
    #[serde(default)]
    pub generation: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(registration: &Registration, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let worker = registration.worker();
    let request = build_request(registration, &params.url, "GET")?;
    let name = params.generation.unwrap_or_else(|| worker.generation_name());

    let response = worker
        .db()
        .generation(&name)
        .get(&request)
        .await?
        .ok_or_else(|| Error::NoResponse(format!("{request} is not cached in {name}")))?;

    let output = WebFetchOutput::new(&request, "cache", &response);
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize entry: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
