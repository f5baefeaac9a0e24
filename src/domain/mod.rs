//! Domain types for the book catalog.
//!
//! - Book: a persisted record
//! - Candidate: a record proposed for insertion
//! - BookKey: the uniqueness triple

pub mod book;

// Re-export commonly used types
pub use book::{Book, BookKey, Candidate, ValidationError, MIN_PUBLISHED_YEAR};
