//! Record store interfaces.
//!
//! A record store is the remote "books" collection the catalog reads from
//! and writes to. Any backend that can scan the collection, filter it by the
//! uniqueness key and insert a single record can back a catalog.

pub mod memory;
pub mod rest;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Book, BookKey, Candidate};

// Re-export the store implementations
pub use memory::MemoryStore;
pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Errors returned by a record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Create/read access to a collection of book records
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Human-readable store name
    fn name(&self) -> &str;

    /// Every record in the collection, in store order
    async fn select(&self) -> Result<Vec<Book>, StoreError>;

    /// Records whose title, author and year equal `key` exactly
    async fn select_where(&self, key: &BookKey) -> Result<Vec<Book>, StoreError>;

    /// Create a record; the store assigns its id
    async fn insert(&self, candidate: &Candidate) -> Result<Book, StoreError>;
}
