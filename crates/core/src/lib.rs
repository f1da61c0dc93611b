//! Core types and shared functionality for netfirst.
//!
//! This crate provides:
//! - Request and response value types
//! - Versioned cache generations with a SQLite backend
//! - The offline worker lifecycle (install, activate, fetch)
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod request;
pub mod response;
pub mod worker;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use cache::{CacheDb, Generation, GenerationId};
pub use error::Error;
pub use fetcher::{FetchError, Fetcher};
pub use request::Request;
pub use response::StoredResponse;
pub use worker::{FetchOutcome, Registration, ServiceWorker, WorkerConfig, WorkerState};
