//! Durable key/value storage for the cart state manager.
//!
//! The cart only needs `get` and `set` on string values under string keys.
//! This crate defines that contract ([`KeyValueStore`]) and ships three
//! backends: an in-memory store for tests, a directory-backed file store for
//! local persistence, and a PostgreSQL store.

pub mod error;
pub mod file;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StorageError};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{KeyValueStore, KeyValueStoreExt, validate_key};
