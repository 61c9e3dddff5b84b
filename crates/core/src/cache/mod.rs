//! SQLite-backed storage for cache generations.
//!
//! Each generation is a named set of request → response entries. The
//! database runs in WAL mode behind tokio-rusqlite, and schema migrations
//! are applied automatically on open.

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::CacheStorage;
