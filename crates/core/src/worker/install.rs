//! Install handler: populate the current generation with the manifest.

use futures::future::try_join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ServiceWorker;
use crate::{Error, Request, StoredResponse};

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    /// Generation that was populated.
    pub generation: String,
    /// Manifest URLs now cached, in manifest order.
    pub cached: Vec<String>,
}

impl ServiceWorker {
    /// Manifest entries resolved against the scope.
    pub fn manifest_requests(&self) -> Result<Vec<Request>, Error> {
        self.config
            .manifest
            .iter()
            .map(|entry| {
                Request::resolve("GET", &self.config.scope, entry)
                    .map_err(|e| Error::InvalidUrl(format!("manifest entry {entry:?}: {e}")))
            })
            .collect()
    }

    /// Whether the current generation already holds every manifest entry.
    pub async fn is_installed(&self) -> Result<bool, Error> {
        let name = self.generation_name();
        if !self.db.has_generation(&name).await? {
            return Ok(false);
        }
        let requests = self.manifest_requests()?;
        self.db.generation(&name).contains_all(&requests).await
    }

    /// Open the current generation and cache every manifest entry.
    ///
    /// All entries are fetched first. If any fetch fails or returns a non-2xx
    /// status the install fails and nothing is written; otherwise every entry
    /// is stored in one transaction, overwriting existing keys.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let name = self.generation_name();
        let generation = self.db.open_generation(&name).await?;
        tracing::debug!(generation = %name, "cache opened");

        let requests = self.manifest_requests()?;
        let entries = try_join_all(requests.into_iter().map(|request| self.fetch_manifest_entry(request))).await?;

        generation.put_all(&entries).await?;

        let cached: Vec<String> = entries.iter().map(|(request, _)| request.url().to_string()).collect();
        tracing::info!(generation = %name, entries = cached.len(), "all core assets cached");

        Ok(InstallReport { generation: name, cached })
    }

    async fn fetch_manifest_entry(&self, request: Request) -> Result<(Request, StoredResponse), Error> {
        match self.fetcher.fetch(&request).await {
            Ok(response) if response.is_ok() => Ok((request, response)),
            Ok(response) => Err(Error::InstallFailed {
                url: request.url().to_string(),
                reason: format!("status {}", response.status),
            }),
            Err(e) => Err(Error::InstallFailed { url: request.url().to_string(), reason: e.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{request, serve_manifest, worker};

    #[tokio::test]
    async fn test_install_caches_manifest() {
        let (worker, fetcher) = worker("v1").await;
        serve_manifest(&fetcher, "a");

        let report = worker.install().await.unwrap();

        assert_eq!(report.generation, "ns-v1");
        assert_eq!(
            report.cached,
            vec![
                "https://app.example.com/",
                "https://app.example.com/tracker.html",
                "https://app.example.com/icon-512x512.png",
            ]
        );

        let generation = worker.db().generation("ns-v1");
        assert_eq!(generation.len().await.unwrap(), 3);
        let tracker = generation
            .get(&request("https://app.example.com/tracker.html"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tracker.text(), "tracker a");
    }

    #[tokio::test]
    async fn test_install_is_idempotent() {
        let (worker, fetcher) = worker("v1").await;
        serve_manifest(&fetcher, "a");
        worker.install().await.unwrap();

        serve_manifest(&fetcher, "b");
        worker.install().await.unwrap();

        let generation = worker.db().generation("ns-v1");
        assert_eq!(generation.len().await.unwrap(), 3);
        let root = generation.get(&request("https://app.example.com/")).await.unwrap().unwrap();
        assert_eq!(root.text(), "root b");
    }

    #[tokio::test]
    async fn test_install_fails_without_partial_writes() {
        let (worker, fetcher) = worker("v1").await;
        serve_manifest(&fetcher, "a");
        fetcher.break_url("https://app.example.com/icon-512x512.png");

        let result = worker.install().await;

        assert!(
            matches!(result, Err(Error::InstallFailed { ref url, .. }) if url == "https://app.example.com/icon-512x512.png")
        );
        assert!(worker.db().generation("ns-v1").is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_reinstall_keeps_previous_entries() {
        let (worker, fetcher) = worker("v1").await;
        serve_manifest(&fetcher, "a");
        worker.install().await.unwrap();

        serve_manifest(&fetcher, "b");
        fetcher.break_url("https://app.example.com/tracker.html");
        assert!(worker.install().await.is_err());

        let root = worker
            .db()
            .generation("ns-v1")
            .get(&request("https://app.example.com/"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(root.text(), "root a");
    }

    #[tokio::test]
    async fn test_install_rejects_error_status() {
        let (worker, fetcher) = worker("v1").await;
        serve_manifest(&fetcher, "a");
        fetcher.route("https://app.example.com/tracker.html", 404, "missing");

        let result = worker.install().await;
        assert!(matches!(result, Err(Error::InstallFailed { ref reason, .. }) if reason == "status 404"));
    }

    #[tokio::test]
    async fn test_install_invalid_manifest_entry() {
        let (worker, _fetcher) = worker("v1").await;
        let mut config = worker.config().clone();
        config.manifest = vec!["ftp://files.example.com/a".into()];
        let worker = ServiceWorker::new(worker.db().clone(), worker.fetcher.clone(), config);

        assert!(matches!(worker.install().await, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_is_installed() {
        let (worker, fetcher) = worker("v1").await;
        assert!(!worker.is_installed().await.unwrap());

        serve_manifest(&fetcher, "a");
        worker.install().await.unwrap();
        assert!(worker.is_installed().await.unwrap());

        let generation = worker.db().generation("ns-v1");
        let icon = request("https://app.example.com/icon-512x512.png");
        let elsewhere = request("https://app.example.com/other.html");
        assert!(generation.contains_all(std::slice::from_ref(&icon)).await.unwrap());
        assert!(!generation.contains_all(&[icon, elsewhere]).await.unwrap());
        worker.db().delete_generation("ns-v1").await.unwrap();
        assert!(!worker.is_installed().await.unwrap());
    }
}
