//! Client code for netfirst.
//!
//! This crate provides the HTTP implementation of the worker's network seam.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
pub use netfirst_core::{FetchError, Fetcher};
