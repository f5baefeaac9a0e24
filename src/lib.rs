//! readpalm - Book catalog manager
//!
//! Keeps an in-memory list of book records loaded from a remote record
//! store, filters it locally, and adds new books through a
//! check-then-insert protocol that rejects duplicates.
//!
//! # Architecture
//!
//! - The catalog manager owns the list and is the only writer
//! - The record store is injected, so any backend (or a test double) works
//! - `refresh` overwrites the list; `add` appends the created record
//!
//! # Modules
//!
//! - `catalog`: CatalogManager and its errors
//! - `store`: RecordStore trait plus REST, SQLite and memory backends
//! - `domain`: Book, Candidate, BookKey
//! - `config`: Backend configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! export READPALM_STORE_URL=https://xyz.supabase.co
//! export READPALM_API_KEY=...
//!
//! readpalm list
//! readpalm search dune
//! readpalm add --title Dune --author "Frank Herbert" --year 1965 --link https://example.com/dune
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use catalog::{AddOutcome, CatalogError, CatalogManager, ErrorKind};
pub use domain::{Book, BookKey, Candidate, ValidationError};
pub use store::{MemoryStore, RecordStore, RestStore, SqliteStore, StoreError};
