//! In-process record store.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{RecordStore, StoreError};
use crate::domain::{Book, BookKey, Candidate};

/// Record store backed by a vector, with sequential ids starting at 1
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Book>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `books`
    pub fn with_books(books: impl IntoIterator<Item = Book>) -> Self {
        Self {
            rows: Mutex::new(books.into_iter().collect()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<Book>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn select(&self) -> Result<Vec<Book>, StoreError> {
        Ok(self.rows().clone())
    }

    async fn select_where(&self, key: &BookKey) -> Result<Vec<Book>, StoreError> {
        Ok(self
            .rows()
            .iter()
            .filter(|book| key.matches(book))
            .cloned()
            .collect())
    }

    async fn insert(&self, candidate: &Candidate) -> Result<Book, StoreError> {
        let mut rows = self.rows();
        let id = rows.iter().map(|b| b.id).max().unwrap_or(0) + 1;
        let book = candidate
            .clone()
            .into_book(id)
            .ok_or_else(|| StoreError::Malformed("published_year is required".to_string()))?;
        rows.push(book.clone());
        Ok(book)
    }
}
