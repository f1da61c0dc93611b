//! Network seam used by the worker.

use async_trait::async_trait;

use crate::{Request, StoredResponse};

/// Network-layer failures.
///
/// An HTTP error status is not a `FetchError`: a 404 or 503 that arrived over
/// the wire is a successful fetch at this layer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("network error: {0}")]
    Network(String),
}

/// Issues requests against the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Send `request` unmodified and buffer the full response.
    async fn fetch(&self, request: &Request) -> Result<StoredResponse, FetchError>;
}
