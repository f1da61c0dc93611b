//! Worker lifecycle: install → activate → fetch.
//!
//! A [`Registration`] owns one worker and its state. Fetch events are only
//! intercepted once the worker is activated; before that, and for requests
//! outside the scope, they go straight to the network.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{FetchOutcome, InstallReport, ReapReport, ServiceWorker};
use crate::{Error, Request};

/// Lifecycle state of a registered worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    Activated,
    /// Install failed. May be installed again.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three events a worker responds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Install,
    Activate,
    Fetch(Request),
}

/// Result of a successful install, plus the activation it triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutcome {
    pub install: InstallReport,
    /// Present when skip-waiting activated the worker right away.
    pub activation: Option<ReapReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Installed(InstallOutcome),
    Activated(ReapReport),
    Fetched(FetchOutcome),
}

/// A worker plus its lifecycle state.
#[derive(Debug)]
pub struct Registration {
    worker: ServiceWorker,
    state: RwLock<WorkerState>,
}

impl Registration {
    pub fn new(worker: ServiceWorker) -> Self {
        Self { worker, state: RwLock::new(WorkerState::Parsed) }
    }

    /// Register `worker`, picking up where an earlier process left off.
    ///
    /// When the current generation already holds every manifest entry the
    /// install already happened for this version: the worker starts
    /// activated (finishing any cleanup an interrupted activation skipped)
    /// and no network is needed. Otherwise it starts `parsed`.
    pub async fn restore(worker: ServiceWorker) -> Result<Self, Error> {
        if !worker.is_installed().await? {
            return Ok(Self::new(worker));
        }

        let report = match worker.activate().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate generations, skipping cleanup");
                ReapReport::default()
            }
        };
        tracing::info!(
            generation = %worker.generation_name(),
            deleted = report.deleted.len(),
            "restored installed worker"
        );

        Ok(Self { worker, state: RwLock::new(WorkerState::Activated) })
    }

    pub fn worker(&self) -> &ServiceWorker {
        &self.worker
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn transition(&self, from: &[WorkerState], to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if !from.contains(&*state) {
            return Err(Error::WorkerState(format!("cannot move from {} to {to}", *state)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        *self.state.write().await = to;
    }

    /// Run the install handler.
    ///
    /// Allowed from `parsed` or `redundant`. On failure the worker becomes
    /// redundant and requests keep going to the network uncached. With
    /// skip-waiting the worker activates as soon as install completes.
    pub async fn install(&self) -> Result<InstallOutcome, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)
            .await?;

        let install = match self.worker.install().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(generation = %self.worker.generation_name(), error = %e, "caching failed");
                self.set_state(WorkerState::Redundant).await;
                return Err(e);
            }
        };
        self.set_state(WorkerState::Installed).await;

        let activation = if self.worker.config().skip_waiting {
            self.skip_waiting().await?
        } else {
            tracing::info!(generation = %install.generation, "installed, waiting for activation");
            None
        };

        Ok(InstallOutcome { install, activation })
    }

    /// Activate straight after install. Losing the race to a concurrent
    /// `activate` call is not an error: the worker is live either way.
    async fn skip_waiting(&self) -> Result<Option<ReapReport>, Error> {
        match self.activate().await {
            Ok(report) => Ok(Some(report)),
            Err(Error::WorkerState(_)) if self.state().await == WorkerState::Activated => {
                tracing::debug!("already activated");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Run the activate handler.
    ///
    /// Allowed from `installed`. Cleanup problems are logged and never block
    /// activation.
    pub async fn activate(&self) -> Result<ReapReport, Error> {
        self.transition(&[WorkerState::Installed], WorkerState::Activating)
            .await?;

        let report = match self.worker.activate().await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate generations, skipping cleanup");
                ReapReport::default()
            }
        };

        self.set_state(WorkerState::Activated).await;
        tracing::info!(
            generation = %self.worker.generation_name(),
            deleted = report.deleted.len(),
            "worker activated"
        );

        Ok(report)
    }

    /// Run the fetch handler, or pass the request through when it is not intercepted.
    pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome, Error> {
        let state = self.state().await;
        if state == WorkerState::Activated && self.worker.controls(request) {
            self.worker.handle_fetch(request).await
        } else {
            tracing::debug!(url = %request.url(), state = %state, "request not intercepted");
            self.worker.passthrough(request).await
        }
    }

    /// Dispatch a lifecycle event and wait for everything it started to settle.
    pub async fn dispatch(&self, event: LifecycleEvent) -> Result<EventOutcome, Error> {
        match event {
            LifecycleEvent::Install => self.install().await.map(EventOutcome::Installed),
            LifecycleEvent::Activate => self.activate().await.map(EventOutcome::Activated),
            LifecycleEvent::Fetch(request) => self.handle_fetch(&request).await.map(EventOutcome::Fetched),
        }
    }
}
