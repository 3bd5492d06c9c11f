//! SQLite-backed versioned store of request→response pairs.
//!
//! The store is partitioned into *generations*: one namespace per deployed
//! version of the application. Within a generation, entries are addressed
//! by a hash of the request identity (method + canonical URL). It supports:
//!
//! - Generation-scoped match/put with UPSERT overwrite semantics
//! - Generation enumeration and idempotent deletion (the only eviction)
//! - Automatic schema migrations
//! - WAL mode, with all statements serialized on the connection thread

pub mod connection;
pub mod key;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::{CacheEntry, GenerationStore};
