//! Fetch handler: network-first with cache fallback.

use super::ServiceWorker;
use crate::{Error, Request, StoredResponse};

/// What a fetch event resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Live network response; a copy was written to the current generation.
    Network(StoredResponse),
    /// Network failed; served from the current generation.
    Cache(StoredResponse),
    /// Request was not intercepted and went straight to the network.
    Passthrough(StoredResponse),
    /// Network failed and nothing was cached for the request.
    NoResponse,
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&StoredResponse> {
        match self {
            FetchOutcome::Network(r) | FetchOutcome::Cache(r) | FetchOutcome::Passthrough(r) => Some(r),
            FetchOutcome::NoResponse => None,
        }
    }

    pub fn into_response(self) -> Option<StoredResponse> {
        match self {
            FetchOutcome::Network(r) | FetchOutcome::Cache(r) | FetchOutcome::Passthrough(r) => Some(r),
            FetchOutcome::NoResponse => None,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            FetchOutcome::Network(_) => "network",
            FetchOutcome::Cache(_) => "cache",
            FetchOutcome::Passthrough(_) => "passthrough",
            FetchOutcome::NoResponse => "none",
        }
    }
}

impl ServiceWorker {
    /// Whether `request` falls under this worker's scope.
    pub fn controls(&self, request: &Request) -> bool {
        request.url().as_str().starts_with(self.config.scope.as_str())
    }

    /// Network-first strategy.
    ///
    /// 1. Send the request to the network unmodified.
    /// 2. On any response (HTTP error statuses included) store a copy in the
    ///    current generation and return the response.
    /// 3. On a network-layer failure return the stored response, if any.
    /// 4. Otherwise resolve to [`FetchOutcome::NoResponse`].
    ///
    /// A failed cache write is logged and never affects the returned response.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if request.is_get() {
                    if let Err(e) = self.store(request, &response).await {
                        tracing::warn!(url = %request.url(), error = %e, "failed to update cache");
                    } else {
                        tracing::debug!(url = %request.url(), status = response.status, "fetched and cached new version");
                    }
                }
                Ok(FetchOutcome::Network(response))
            }
            Err(err) => {
                tracing::debug!(url = %request.url(), error = %err, "network request failed, trying cache");
                if !request.is_get() {
                    return Ok(FetchOutcome::NoResponse);
                }

                match self.db.generation(&self.generation_name()).get(request).await? {
                    Some(cached) => {
                        tracing::debug!(url = %request.url(), "served from cache");
                        Ok(FetchOutcome::Cache(cached))
                    }
                    None => {
                        tracing::debug!(url = %request.url(), "offline and not cached");
                        Ok(FetchOutcome::NoResponse)
                    }
                }
            }
        }
    }

    /// Send a request without touching the cache.
    pub async fn passthrough(&self, request: &Request) -> Result<FetchOutcome, Error> {
        self.fetcher
            .fetch(request)
            .await
            .map(FetchOutcome::Passthrough)
            .map_err(|e| Error::Network(format!("{request}: {e}")))
    }

    async fn store(&self, request: &Request, response: &StoredResponse) -> Result<(), Error> {
        let generation = self.db.open_generation(&self.generation_name()).await?;
        generation.put(request, response).await
    }
}
