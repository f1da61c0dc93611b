//! HTTP fetch pipeline backing the worker's network seam.
//!
//! - Requests are sent unmodified (method and URL from the intercepted request)
//! - Redirects are followed up to a limit; the final URL is kept on the response
//! - Bodies are buffered fully, bounded by `max_bytes`
//! - Any HTTP status is a successful fetch; only transport failures are errors

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};

use netfirst_core::config::AppConfig;
use netfirst_core::{Error, FetchError, Fetcher, Request, StoredResponse};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "netfirst/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "netfirst/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// HTTP client used as the worker's network.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_connect() {
        FetchError::Connect(err.to_string())
    } else {
        FetchError::Network(err.to_string())
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, FetchError> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method().as_bytes())
            .map_err(|e| FetchError::Network(format!("invalid method {}: {}", request.method(), e)))?;

        let mut response = self
            .http
            .request(method, request.url().clone())
            .send()
            .await
            .map_err(classify)?;

        let limit = self.config.max_bytes;
        if let Some(len) = response.content_length()
            && len as usize > limit
        {
            return Err(FetchError::TooLarge { limit });
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        // Content-Length may be absent (chunked); enforce the limit while reading.
        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > limit {
                return Err(FetchError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(
            "fetched {} -> {} ({}) in {}ms ({} bytes)",
            request,
            final_url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(StoredResponse { url: final_url, status, headers, body: body.into() })
    }
}
