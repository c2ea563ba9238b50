//! rostro-store — Persistent key-value storage for the Rostro client.
//!
//! Backends speak opaque strings through [`KeyValueStore`]; [`StoredValue`]
//! layers typed JSON values on top with optimistic writes, a loading flag
//! and a degraded status that owners can observe.

pub mod backend;
pub mod sqlite;
pub mod stored;

pub use backend::{KeyValueStore, MemoryStore, StoreError};
pub use sqlite::SqliteStore;
pub use stored::{StoreHealth, StoredValue};
