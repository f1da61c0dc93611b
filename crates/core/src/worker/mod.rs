//! Offline worker: install, activate and fetch handling.
//!
//! Three handlers, each an `async fn` whose future covers every suspending
//! sub-operation it starts. The host keeps the handler alive by awaiting it:
//!
//! - [`ServiceWorker::install`] caches the manifest into the current generation
//! - [`ServiceWorker::activate`] deletes superseded generations
//! - [`ServiceWorker::handle_fetch`] runs the network-first strategy
//!
//! [`Registration`] sequences them through the worker lifecycle.

mod activate;
mod install;
mod intercept;
mod lifecycle;

use std::sync::Arc;

use url::Url;

use crate::cache::{CacheDb, GenerationId};
use crate::fetcher::Fetcher;

pub use activate::{ReapFailure, ReapReport};
pub use install::InstallReport;
pub use intercept::FetchOutcome;
pub use lifecycle::{EventOutcome, InstallOutcome, LifecycleEvent, Registration, WorkerState};

/// Settings injected into a worker at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Current generation.
    pub generation: GenerationId,
    /// Base URL; manifest entries resolve against it and only requests under it are intercepted.
    pub scope: Url,
    /// Relative URLs cached on install.
    pub manifest: Vec<String>,
    /// Activate immediately after a successful install.
    pub skip_waiting: bool,
}

/// One deployed version of the worker, bound to its cache generation.
#[derive(Clone)]
pub struct ServiceWorker {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    config: WorkerConfig,
}

impl ServiceWorker {
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, config: WorkerConfig) -> Self {
        Self { db, fetcher, config }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Name of the generation this worker reads and writes.
    pub fn generation_name(&self) -> String {
        self.config.generation.name()
    }
}

impl std::fmt::Debug for ServiceWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceWorker")
            .field("generation", &self.config.generation.name())
            .field("scope", &self.config.scope.as_str())
            .finish_non_exhaustive()
    }
}
