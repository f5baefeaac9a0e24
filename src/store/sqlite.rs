//! SQLite record store for self-hosted catalogs.
//!
//! The table has no unique index on the book key; uniqueness is enforced
//! (best-effort) by the catalog's check-then-insert, as with the REST backend.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::{RecordStore, StoreError};
use crate::domain::{Book, BookKey, Candidate};

/// Record store backed by a SQLite table
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("create {}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)?;
        Self::init_with_connection(conn, table)
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_with_connection(conn, table)
    }

    fn init_with_connection(conn: Connection, table: &str) -> Result<Self, StoreError> {
        // The table name is interpolated into SQL.
        if table.is_empty() || !table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(StoreError::Unavailable(format!(
                "invalid table name: {:?}",
                table
            )));
        }

        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                published_year INTEGER NOT NULL,
                link TEXT NOT NULL,
                description TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_key ON {table}(title, author, published_year);
            "
        ))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
        })
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &str) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
            f(&conn, &table)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {}", e)))?
    }
}

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        published_year: row.get(3)?,
        link: row.get(4)?,
        description: row.get(5)?,
    })
}

const COLUMNS: &str = "id, title, author, published_year, link, description";

#[async_trait]
impl RecordStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn select(&self) -> Result<Vec<Book>, StoreError> {
        self.with_conn(|conn, table| {
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM {table} ORDER BY id ASC"))?;
            let books = stmt
                .query_map([], row_to_book)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(books)
        })
        .await
    }

    async fn select_where(&self, key: &BookKey) -> Result<Vec<Book>, StoreError> {
        let key = key.clone();
        self.with_conn(move |conn, table| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM {table}
                 WHERE title = ?1 AND author = ?2 AND published_year = ?3
                 ORDER BY id ASC"
            ))?;
            let books = stmt
                .query_map(
                    params![key.title, key.author, key.published_year],
                    row_to_book,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(books)
        })
        .await
    }

    async fn insert(&self, candidate: &Candidate) -> Result<Book, StoreError> {
        let candidate = candidate.clone();
        self.with_conn(move |conn, table| {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (title, author, published_year, link, description)
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                params![
                    candidate.title,
                    candidate.author,
                    candidate.published_year,
                    candidate.link,
                    candidate.description,
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(id, table, "Inserted row");

            let book = conn.query_row(
                &format!("SELECT {COLUMNS} FROM {table} WHERE id = ?1"),
                params![id],
                row_to_book,
            )?;
            Ok(book)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_select() {
        let store = SqliteStore::open_in_memory("books").unwrap();

        let dune = store
            .insert(
                &Candidate::new("Dune", "Herbert", 1965, "https://a").with_description("Spice"),
            )
            .await
            .unwrap();
        let emma = store
            .insert(&Candidate::new("Emma", "Austen", 1815, "https://b"))
            .await
            .unwrap();

        assert!(dune.id < emma.id);
        assert_eq!(dune.description.as_deref(), Some("Spice"));
        assert_eq!(emma.description, None);
        assert_eq!(store.select().await.unwrap(), vec![dune, emma]);
    }

    #[tokio::test]
    async fn test_select_where_is_exact() {
        let store = SqliteStore::open_in_memory("books").unwrap();
        store
            .insert(&Candidate::new("Dune", "Herbert", 1965, "https://a"))
            .await
            .unwrap();

        let key = BookKey::new("Dune", "Herbert", 1965);
        assert_eq!(store.select_where(&key).await.unwrap().len(), 1);

        let key = BookKey::new("dune", "Herbert", 1965);
        assert!(store.select_where(&key).await.unwrap().is_empty());

        let key = BookKey::new("Dune", "Herbert", 1966);
        assert!(store.select_where(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_year_violates_not_null() {
        let store = SqliteStore::open_in_memory("books").unwrap();
        let candidate = Candidate {
            title: "Dune".to_string(),
            author: "Herbert".to_string(),
            link: "https://a".to_string(),
            ..Candidate::default()
        };

        let err = store.insert(&candidate).await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        assert!(SqliteStore::open_in_memory("books; DROP TABLE x").is_err());
        assert!(SqliteStore::open_in_memory("").is_err());
    }
}
