//! web_fetch tool implementation.
//!
//! Sends a request through the worker: network first, cached copy when the
//! network is unreachable.

use netfirst_core::{Error, Registration, Request, StoredResponse};
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Input parameters for web_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebFetchParams {
    /// URL to fetch, absolute or relative to the worker scope.
    pub url: String,

    /// HTTP method (default: GET). Only GET responses are cached.
    #[serde(default = "default_method")]
    pub method: String,
}

pub(crate) fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

/// Output structure for web_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WebFetchOutput {
    /// Requested URL after resolution against the scope.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// Where the response came from: "network", "cache" or "passthrough".
    pub source: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// Response headers.
    pub headers: Vec<HeaderEntry>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// Body size in bytes.
    pub body_bytes: usize,
}

impl WebFetchOutput {
    pub fn new(request: &Request, source: &str, response: &StoredResponse) -> Self {
        Self {
            url: request.url().to_string(),
            final_url: response.url.to_string(),
            source: source.to_string(),
            status: response.status,
            content_type: response.content_type().map(str::to_string),
            headers: response
                .headers
                .iter()
                .map(|(name, value)| HeaderEntry { name: name.clone(), value: value.clone() })
                .collect(),
            body: response.text().into_owned(),
            body_bytes: response.body.len(),
        }
    }
}

/// Parse `url`/`method` into a request under the worker scope.
pub(crate) fn build_request(registration: &Registration, url: &str, method: &str) -> Result<Request, Error> {
    if url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }

    let method = method.trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidInput(format!("unsupported method: {method:?}")));
    }

    let scope = &registration.worker().config().scope;
    Request::resolve(method, scope, url).map_err(|e| Error::InvalidUrl(e.to_string()))
}

/// Fetch one URL through the worker.
pub(crate) async fn fetch_one(registration: &Registration, url: &str, method: &str) -> Result<WebFetchOutput, Error> {
    let request = build_request(registration, url, method)?;
    let outcome = registration.handle_fetch(&request).await?;
    let source = outcome.source();

    let response = outcome
        .into_response()
        .ok_or_else(|| Error::NoResponse(format!("{request}: network unavailable and not cached")))?;

    Ok(WebFetchOutput::new(&request, source, &response))
}

/// Implementation of the web_fetch tool.
pub async fn fetch_impl(registration: &Registration, params: WebFetchParams) -> Result<CallToolResult, McpError> {
    let output = fetch_one(registration, &params.url, &params.method).await?;
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{installed, output_json};

    fn params(url: &str) -> WebFetchParams {
        WebFetchParams { url: url.into(), method: default_method() }
    }

    #[tokio::test]
    async fn test_fetch_relative_url_from_network() {
        let (registration, fetcher) = installed().await;
        fetcher.route("https://app.example.com/data.json", 200, "{\"n\":1}");

        let result = fetch_impl(&registration, params("./data.json")).await.unwrap();
        let output = output_json(&result);

        assert_eq!(output["url"], "https://app.example.com/data.json");
        assert_eq!(output["source"], "network");
        assert_eq!(output["status"], 200);
        assert_eq!(output["body"], "{\"n\":1}");
    }

    #[tokio::test]
    async fn test_fetch_offline_from_cache() {
        let (registration, fetcher) = installed().await;
        fetcher.set_offline(true);

        let result = fetch_impl(&registration, params("./tracker.html")).await.unwrap();
        let output = output_json(&result);

        assert_eq!(output["source"], "cache");
        assert_eq!(output["body"], "tracker a");
    }

    #[tokio::test]
    async fn test_fetch_offline_miss_is_error() {
        let (registration, fetcher) = installed().await;
        fetcher.set_offline(true);

        let err = fetch_impl(&registration, params("./never.html")).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (registration, _fetcher) = installed().await;
        assert!(fetch_impl(&registration, params("  ")).await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_bad_method() {
        let (registration, _fetcher) = installed().await;
        let params = WebFetchParams { url: "./".into(), method: "GE T".into() };
        let err = fetch_impl(&registration, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
