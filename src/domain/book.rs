//! Book records and insert candidates.
//!
//! A [`Book`] is a record as the store returns it (with an assigned `id`).
//! A [`Candidate`] is the same shape before it has been persisted.

use chrono::{Datelike, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Earliest accepted publication year
pub const MIN_PUBLISHED_YEAR: i32 = 1000;

/// A persisted book record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier
    pub id: i64,

    pub title: String,

    pub author: String,

    pub published_year: i32,

    /// External resource for the book
    pub link: String,

    /// Free text, not part of the uniqueness key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Book {
    /// The uniqueness key of this record
    pub fn key(&self) -> BookKey {
        BookKey {
            title: self.title.clone(),
            author: self.author.clone(),
            published_year: self.published_year,
        }
    }

    /// Whether title or author contains `query_lower`.
    ///
    /// `query_lower` must already be lowercased.
    pub fn matches(&self, query_lower: &str) -> bool {
        self.title.to_lowercase().contains(query_lower)
            || self.author.to_lowercase().contains(query_lower)
    }
}

/// The `(title, author, published_year)` triple no two records may share.
///
/// Equality is exact: no case folding, no trimming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookKey {
    pub title: String,
    pub author: String,
    pub published_year: i32,
}

impl BookKey {
    pub fn new(title: impl Into<String>, author: impl Into<String>, published_year: i32) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            published_year,
        }
    }

    /// Whether `book` carries exactly this key
    pub fn matches(&self, book: &Book) -> bool {
        book.title == self.title
            && book.author == self.author
            && book.published_year == self.published_year
    }
}

impl std::fmt::Display for BookKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" by {} ({})",
            self.title, self.author, self.published_year
        )
    }
}

/// A book proposed for insertion
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,

    pub author: String,

    /// `None` when the year was not supplied
    pub published_year: Option<i32>,

    pub link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A candidate field failed validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: &'static str,

    /// Human-readable reason
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn missing(field: &'static str) -> Self {
        Self::new(field, format!("{} is required", field))
    }
}

impl Candidate {
    /// Create a candidate with all required fields
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        published_year: i32,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            published_year: Some(published_year),
            link: link.into(),
            description: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate against the current calendar year and return the uniqueness key
    pub fn validate(&self) -> Result<BookKey, ValidationError> {
        self.validate_at(Utc::now().year())
    }

    /// Validate with an explicit upper bound for `published_year`.
    ///
    /// Checks run in field order so the first missing field is reported.
    pub fn validate_at(&self, current_year: i32) -> Result<BookKey, ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::missing("title"));
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::missing("author"));
        }
        let year = self
            .published_year
            .ok_or_else(|| ValidationError::missing("published_year"))?;
        if !(MIN_PUBLISHED_YEAR..=current_year).contains(&year) {
            return Err(ValidationError::new(
                "published_year",
                format!(
                    "published_year must be between {} and {}, got {}",
                    MIN_PUBLISHED_YEAR, current_year, year
                ),
            ));
        }
        if self.link.trim().is_empty() {
            return Err(ValidationError::missing("link"));
        }
        if let Err(e) = Url::parse(&self.link) {
            return Err(ValidationError::new(
                "link",
                format!("link is not a valid URL ({}): {}", e, self.link),
            ));
        }

        Ok(BookKey::new(self.title.clone(), self.author.clone(), year))
    }

    /// Attach a store-assigned id.
    ///
    /// Returns `None` if the candidate has no year.
    pub fn into_book(self, id: i64) -> Option<Book> {
        Some(Book {
            id,
            title: self.title,
            author: self.author,
            published_year: self.published_year?,
            link: self.link,
            description: self.description,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Candidate {
        Candidate::new("Dune", "Herbert", 1965, "https://example.com/dune")
    }

    #[test]
    fn test_valid_candidate_yields_key() {
        let key = dune().validate_at(2024).unwrap();
        assert_eq!(key, BookKey::new("Dune", "Herbert", 1965));
    }

    #[test]
    fn test_missing_fields_are_reported_in_order() {
        let mut candidate = dune();
        candidate.author = String::new();
        assert_eq!(candidate.validate_at(2024).unwrap_err().field, "author");

        candidate.title = "   ".to_string();
        assert_eq!(candidate.validate_at(2024).unwrap_err().field, "title");

        let mut candidate = dune();
        candidate.published_year = None;
        assert_eq!(
            candidate.validate_at(2024).unwrap_err().field,
            "published_year"
        );

        let mut candidate = dune();
        candidate.link = String::new();
        let err = candidate.validate_at(2024).unwrap_err();
        assert_eq!(err.field, "link");
        assert_eq!(err.message, "link is required");
    }

    #[test]
    fn test_year_bounds() {
        let mut candidate = dune();

        candidate.published_year = Some(999);
        assert!(candidate.validate_at(2024).is_err());

        candidate.published_year = Some(1000);
        assert!(candidate.validate_at(2024).is_ok());

        candidate.published_year = Some(2024);
        assert!(candidate.validate_at(2024).is_ok());

        candidate.published_year = Some(2025);
        let err = candidate.validate_at(2024).unwrap_err();
        assert_eq!(err.field, "published_year");
        assert!(err.message.contains("2025"));
    }

    #[test]
    fn test_link_must_be_url() {
        let mut candidate = dune();
        candidate.link = "not a url".to_string();
        assert_eq!(candidate.validate_at(2024).unwrap_err().field, "link");
    }

    #[test]
    fn test_key_match_is_exact() {
        let key = BookKey::new("Dune", "Herbert", 1965);
        let book = dune().into_book(1).unwrap();
        assert!(key.matches(&book));
        assert_eq!(book.key(), key);
        assert_eq!(dune().validate_at(2024).unwrap(), book.key());

        assert!(!BookKey::new("dune", "Herbert", 1965).matches(&book));
        assert!(!BookKey::new("Dune ", "Herbert", 1965).matches(&book));
        assert!(!BookKey::new("Dune", "Herbert", 1966).matches(&book));
    }

    #[test]
    fn test_book_matches_title_or_author() {
        let book = dune().into_book(1).unwrap();
        assert!(book.matches("dun"));
        assert!(book.matches("herb"));
        assert!(book.matches(""));
        assert!(!book.matches("asimov"));
    }

    #[test]
    fn test_candidate_serialization_omits_missing_description() {
        let json = serde_json::to_value(dune()).unwrap();
        assert_eq!(json["published_year"], 1965);
        assert!(json.get("description").is_none());

        let json = serde_json::to_value(dune().with_description("Spice")).unwrap();
        assert_eq!(json["description"], "Spice");
    }

    #[test]
    fn test_book_deserializes_extra_columns() {
        let book: Book = serde_json::from_str(
            r#"{"id": 7, "title": "Dune", "author": "Herbert", "published_year": 1965,
                "link": "https://example.com", "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(book.id, 7);
        assert_eq!(book.description, None);
    }
}
