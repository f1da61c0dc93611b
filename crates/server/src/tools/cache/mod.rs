//! Cache inspection tools.
//!
//! Read-only views of the generation store. Nothing here touches the network.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};
