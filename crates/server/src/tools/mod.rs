//! MCP tool implementations.
//!
//! This module contains all tools exposed by the netfirst server.

pub mod cache;
pub mod web_batch_fetch;
pub mod web_fetch;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;
