//! SQLite Store Integration Tests
//!
//! Tests the catalog against a file-backed SQLite store across sessions.

use std::sync::Arc;

use readpalm::{Candidate, CatalogManager, ErrorKind, SqliteStore};
use tempfile::TempDir;

fn open(temp_dir: &TempDir) -> CatalogManager {
    let path = temp_dir.path().join("data").join("books.db");
    let store = SqliteStore::open(&path, "books").unwrap();
    CatalogManager::new(Arc::new(store))
}

#[tokio::test]
async fn test_records_survive_new_session() {
    let temp_dir = TempDir::new().unwrap();

    let catalog = open(&temp_dir);
    catalog.refresh().await.unwrap();
    assert!(catalog.is_empty());

    catalog
        .add(&Candidate::new("Dune", "Herbert", 1965, "https://example.com/dune"))
        .await
        .unwrap();
    catalog
        .add(&Candidate::new("Foundation", "Asimov", 1951, "https://example.com/foundation"))
        .await
        .unwrap();
    drop(catalog);

    let catalog = open(&temp_dir);
    assert_eq!(catalog.refresh().await.unwrap(), 2);

    let titles: Vec<String> = catalog.list().into_iter().map(|b| b.title).collect();
    assert_eq!(titles, vec!["Dune", "Foundation"]);
}

#[tokio::test]
async fn test_duplicate_detected_without_refresh() {
    let temp_dir = TempDir::new().unwrap();

    let first = open(&temp_dir);
    first
        .add(&Candidate::new("Dune", "Herbert", 1965, "https://example.com/dune"))
        .await
        .unwrap();

    // A second session that never loaded the list still hits the store check
    let second = open(&temp_dir);
    let err = second
        .add(&Candidate::new("Dune", "Herbert", 1965, "https://example.com/other"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert!(second.is_empty());
}

#[tokio::test]
async fn test_search_after_refresh() {
    let temp_dir = TempDir::new().unwrap();

    let catalog = open(&temp_dir);
    for (title, author, year) in [
        ("Dune", "Frank Herbert", 1965),
        ("Dune Messiah", "Frank Herbert", 1969),
        ("Emma", "Jane Austen", 1815),
    ] {
        catalog
            .add(&Candidate::new(title, author, year, "https://example.com"))
            .await
            .unwrap();
    }

    let catalog = open(&temp_dir);
    catalog.refresh().await.unwrap();

    assert_eq!(catalog.filter("herbert").len(), 2);
    assert_eq!(catalog.filter("JANE").len(), 1);
    assert_eq!(catalog.filter("").len(), 3);
}
