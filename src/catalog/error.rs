//! Errors surfaced by the catalog manager.

use serde::Serialize;
use thiserror::Error;

use crate::domain::{BookKey, ValidationError};
use crate::store::StoreError;

/// Broad category of a catalog failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A candidate field was missing or invalid; the store was not contacted
    Validation,

    /// The record store failed; safe to retry
    Store,

    /// A record with the same key already exists; not retried
    Duplicate,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Store => write!(f, "store"),
            ErrorKind::Duplicate => write!(f, "duplicate"),
        }
    }
}

/// Outcome of a failed catalog operation.
///
/// The `Display` output is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("This book already exists in the database: {0}")]
    Duplicate(BookKey),

    #[error("{context}: {detail}")]
    Store { context: String, detail: String },
}

impl CatalogError {
    /// Wrap a store failure with what the catalog was trying to do
    pub(crate) fn store(context: impl Into<String>, err: &StoreError) -> Self {
        CatalogError::Store {
            context: context.into(),
            detail: err.to_string(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Validation(_) => ErrorKind::Validation,
            CatalogError::Duplicate(_) => ErrorKind::Duplicate,
            CatalogError::Store { .. } => ErrorKind::Store,
        }
    }

    /// Whether retrying the same call might succeed
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Store
    }
}
