//! Catalog manager: the in-memory book list and the add-book protocol.
//!
//! The manager keeps two reconciliation strategies apart:
//! - `refresh` overwrites the whole list with what the store returns
//! - a successful `add` appends the single record the store created
//!
//! # Add protocol
//!
//! `add` validates the candidate, asks the store for records with the same
//! `(title, author, published_year)` and only inserts when there are none.
//! The check and the insert are two separate round-trips, so two concurrent
//! adds of the same book can both pass the check. Stores that need strict
//! uniqueness must enforce it themselves.

pub mod error;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::domain::{Book, Candidate};
use crate::store::RecordStore;

pub use error::{CatalogError, ErrorKind};

const FETCH_FAILED: &str = "Failed to fetch books. Please try again.";
const CHECK_FAILED: &str = "Error checking for existing book";
const INSERT_FAILED: &str = "Failed to add book";

/// Counts an in-flight operation for as long as it is alive
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mediates all reads and writes of book records
pub struct CatalogManager {
    /// Injected record store
    store: Arc<dyn RecordStore>,

    /// Current snapshot, in store order plus local appends
    books: RwLock<Vec<Book>>,

    /// Refreshes in flight
    loading: AtomicUsize,

    /// Adds in flight
    submitting: AtomicUsize,

    /// Most recent failure, until dismissed or the next operation starts
    last_error: Mutex<Option<CatalogError>>,
}

impl CatalogManager {
    /// Create a manager with an empty list
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            books: RwLock::new(Vec::new()),
            loading: AtomicUsize::new(0),
            submitting: AtomicUsize::new(0),
            last_error: Mutex::new(None),
        }
    }

    /// Name of the backing store
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Snapshot of the current list
    pub fn list(&self) -> Vec<Book> {
        self.read_books().clone()
    }

    pub fn len(&self) -> usize {
        self.read_books().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_books().is_empty()
    }

    /// Whether a refresh is outstanding
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst) > 0
    }

    /// Whether an add is outstanding
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst) > 0
    }

    /// The error from the most recent failed operation, if not dismissed
    pub fn last_error(&self) -> Option<CatalogError> {
        self.error_slot().clone()
    }

    /// Clear the last error
    pub fn dismiss_error(&self) {
        *self.error_slot() = None;
    }

    /// Replace the list with the store's full record set.
    ///
    /// Returns the new number of records. On failure the previous list is
    /// kept.
    #[instrument(skip(self), fields(store = self.store.name()))]
    pub async fn refresh(&self) -> Result<usize, CatalogError> {
        self.dismiss_error();
        let _loading = InFlight::enter(&self.loading);

        match self.store.select().await {
            Ok(books) => {
                let count = books.len();
                *self.write_books() = books;
                info!(count, "Catalog refreshed");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed, keeping previous list");
                Err(self.fail(CatalogError::store(FETCH_FAILED, &e)))
            }
        }
    }

    /// Validate `candidate`, reject it if its key already exists, otherwise
    /// insert it and append the created record to the list.
    #[instrument(skip(self, candidate), fields(title = %candidate.title, author = %candidate.author))]
    pub async fn add(&self, candidate: &Candidate) -> Result<Book, CatalogError> {
        self.dismiss_error();
        let _submitting = InFlight::enter(&self.submitting);

        self.add_checked(candidate)
            .await
            .map_err(|e| self.fail(e))
    }

    async fn add_checked(&self, candidate: &Candidate) -> Result<Book, CatalogError> {
        let key = candidate.validate()?;

        let existing = self.store.select_where(&key).await.map_err(|e| {
            warn!(error = %e, "Existence check failed");
            CatalogError::store(CHECK_FAILED, &e)
        })?;
        if !existing.is_empty() {
            debug!(matches = existing.len(), %key, "Duplicate rejected");
            return Err(CatalogError::Duplicate(key));
        }

        let book = self.store.insert(candidate).await.map_err(|e| {
            warn!(error = %e, "Insert failed");
            CatalogError::store(INSERT_FAILED, &e)
        })?;

        info!(id = book.id, "Book added");
        self.write_books().push(book.clone());
        Ok(book)
    }

    /// Books whose title or author contains `query`, ignoring case.
    ///
    /// An empty query returns the whole list. Order is preserved.
    pub fn filter(&self, query: &str) -> Vec<Book> {
        filter_books(&self.read_books(), query)
    }

    fn fail(&self, err: CatalogError) -> CatalogError {
        *self.error_slot() = Some(err.clone());
        err
    }

    fn read_books(&self) -> RwLockReadGuard<'_, Vec<Book>> {
        self.books.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_books(&self) -> RwLockWriteGuard<'_, Vec<Book>> {
        self.books.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn error_slot(&self) -> std::sync::MutexGuard<'_, Option<CatalogError>> {
        self.last_error.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Case-insensitive substring filter over title and author
pub fn filter_books(books: &[Book], query: &str) -> Vec<Book> {
    if query.is_empty() {
        return books.to_vec();
    }

    let query_lower = query.to_lowercase();
    books
        .iter()
        .filter(|book| book.matches(&query_lower))
        .cloned()
        .collect()
}

/// Serializable result of an add, for callers that report outcomes as data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOutcome {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<Book>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&Result<Book, CatalogError>> for AddOutcome {
    fn from(result: &Result<Book, CatalogError>) -> Self {
        match result {
            Ok(book) => Self {
                success: true,
                record: Some(book.clone()),
                error_kind: None,
                message: None,
            },
            Err(e) => Self {
                success: false,
                record: None,
                error_kind: Some(e.kind()),
                message: Some(e.to_string()),
            },
        }
    }
}
