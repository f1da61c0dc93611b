//! Activate handler: delete superseded generations.

use futures::future::join_all;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ServiceWorker;
use crate::Error;

/// A generation that could not be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReapFailure {
    pub generation: String,
    pub error: String,
}

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReapReport {
    pub deleted: Vec<String>,
    pub failed: Vec<ReapFailure>,
}

impl ServiceWorker {
    /// Delete every generation in this namespace except the current one.
    ///
    /// Caches outside the namespace are left alone. Each deletion is
    /// independent: a failure is recorded and the rest still run. Only a
    /// failure to enumerate generations is returned as an error.
    pub async fn activate(&self) -> Result<ReapReport, Error> {
        let current = &self.config.generation;
        let superseded: Vec<String> = self
            .db
            .generation_names()
            .await?
            .into_iter()
            .filter(|name| current.is_superseded(name))
            .collect();

        let results = join_all(superseded.into_iter().map(|name| async move {
            let result = self.db.delete_generation(&name).await;
            (name, result)
        }))
        .await;

        let mut report = ReapReport::default();
        for (name, result) in results {
            match result {
                Ok(true) => {
                    tracing::info!(generation = %name, "deleted superseded generation");
                    report.deleted.push(name);
                }
                Ok(false) => tracing::debug!(generation = %name, "generation already gone"),
                Err(e) => {
                    tracing::warn!(generation = %name, error = %e, "failed to delete generation");
                    report.failed.push(ReapFailure { generation: name, error: e.to_string() });
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{execute_sql, page, request, worker};

    #[tokio::test]
    async fn test_reaper_completeness() {
        let (worker, _fetcher) = worker("v2").await;
        let db = worker.db();
        for name in ["ns-v1", "ns-v2", "other-cache"] {
            db.open_generation(name).await.unwrap();
        }

        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["ns-v1".to_string()]);
        assert!(report.failed.is_empty());
        assert_eq!(db.generation_names().await.unwrap(), vec!["ns-v2".to_string(), "other-cache".to_string()]);
    }

    #[tokio::test]
    async fn test_reaper_keeps_current_entries() {
        let (worker, _fetcher) = worker("v3").await;
        let db = worker.db();
        let req = request("https://app.example.com/");
        for name in ["ns-v1", "ns-v2", "ns-v3"] {
            let generation = db.open_generation(name).await.unwrap();
            generation.put(&req, &page("https://app.example.com/", name)).await.unwrap();
        }

        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["ns-v1".to_string(), "ns-v2".to_string()]);
        let kept = db.generation("ns-v3").get(&req).await.unwrap().unwrap();
        assert_eq!(kept.text(), "ns-v3");
    }

    #[tokio::test]
    async fn test_reaper_with_nothing_to_do() {
        let (worker, _fetcher) = worker("v1").await;
        worker.db().open_generation("unrelated").await.unwrap();

        let report = worker.activate().await.unwrap();

        assert_eq!(report, ReapReport::default());
        assert_eq!(worker.db().generation_names().await.unwrap(), vec!["unrelated".to_string()]);
    }

    #[tokio::test]
    async fn test_reaper_ignores_lookalike_names() {
        let (worker, _fetcher) = worker("v2").await;
        worker.db().open_generation("nsv1").await.unwrap();
        worker.db().open_generation("ns-v1").await.unwrap();

        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["ns-v1".to_string()]);
        assert!(worker.db().has_generation("nsv1").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_deletion_does_not_stop_others() {
        let (worker, _fetcher) = worker("v3").await;
        let db = worker.db();
        for name in ["ns-v1", "ns-v2", "ns-v3"] {
            db.open_generation(name).await.unwrap();
        }
        execute_sql(
            db,
            "CREATE TRIGGER pin_v1 BEFORE DELETE ON generations WHEN old.name = 'ns-v1'
             BEGIN SELECT RAISE(ABORT, 'locked'); END;",
        )
        .await;

        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["ns-v2".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].generation, "ns-v1");
        assert!(report.failed[0].error.contains("locked"));
        assert_eq!(db.generation_names().await.unwrap(), vec!["ns-v1".to_string(), "ns-v3".to_string()]);
    }
}
