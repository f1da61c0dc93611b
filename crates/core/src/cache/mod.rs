//! SQLite-backed store for versioned cache generations.
//!
//! Each generation is a named key/value store mapping a request identity to a
//! stored response. Generations live in one database:
//!
//! - Content-addressed entry keys using SHA-256 over method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Entries cascade away with their generation

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::Generation;
pub use generations::{GenerationId, GenerationInfo};
