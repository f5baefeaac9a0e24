//! PostgREST record store (the REST interface Supabase exposes).
//!
//! Tables are addressed as `{base_url}/rest/v1/{table}`. Equality filters use
//! the `column=eq.value` query syntax, and inserts ask for the created row
//! back with `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Request, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{RecordStore, StoreError};
use crate::domain::{Book, BookKey, Candidate};

/// Record store speaking the PostgREST protocol
pub struct RestStore {
    /// Project URL, without the `/rest/v1` suffix
    base_url: String,
    /// Table holding the records
    table: String,
    /// Anon or service key, sent as both `apikey` and bearer token
    api_key: Option<String>,
    /// HTTP client
    client: reqwest::Client,
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: Option<String>,
}

impl RestStore {
    /// Create a store for `table` at `base_url`
    pub fn new(
        base_url: impl Into<String>,
        table: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into(),
            table: table.into(),
            api_key,
            client,
        })
    }

    /// Build the table URL
    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }

    /// Start a request against the table with auth headers applied
    fn request(&self, method: Method) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, self.table_url());
        if let Some(key) = &self.api_key {
            builder = builder
                .header("apikey", key)
                .header("Authorization", format!("Bearer {}", key));
        }
        builder
    }

    /// `GET` request selecting all columns, optionally filtered by `key`
    fn select_request(&self, key: Option<&BookKey>) -> Result<Request, StoreError> {
        let mut query = vec![("select", "*".to_string())];
        if let Some(key) = key {
            query.push(("title", format!("eq.{}", key.title)));
            query.push(("author", format!("eq.{}", key.author)));
            query.push(("published_year", format!("eq.{}", key.published_year)));
        }

        Ok(self.request(Method::GET).query(&query).build()?)
    }

    /// `POST` request inserting one record and returning it
    fn insert_request(&self, candidate: &Candidate) -> Result<Request, StoreError> {
        Ok(self
            .request(Method::POST)
            .header("Prefer", "return=representation")
            .json(&[candidate])
            .build()?)
    }

    /// Send a request and decode the row array it returns
    async fn fetch_rows(&self, request: Request) -> Result<Vec<Book>, StoreError> {
        debug!(method = %request.method(), url = %request.url(), "PostgREST request");

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        decode_rows(status, &body)
    }
}

/// Decode a PostgREST response body into rows
fn decode_rows(status: StatusCode, body: &str) -> Result<Vec<Book>, StoreError> {
    if !status.is_success() {
        let message = serde_json::from_str::<PostgrestError>(body)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or_else(|| body.trim().to_string());

        return Err(StoreError::Backend {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(body).map_err(|e| StoreError::Malformed(e.to_string()))
}

#[async_trait]
impl RecordStore for RestStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn select(&self) -> Result<Vec<Book>, StoreError> {
        let request = self.select_request(None)?;
        self.fetch_rows(request).await
    }

    async fn select_where(&self, key: &BookKey) -> Result<Vec<Book>, StoreError> {
        let request = self.select_request(Some(key))?;
        self.fetch_rows(request).await
    }

    async fn insert(&self, candidate: &Candidate) -> Result<Book, StoreError> {
        let request = self.insert_request(candidate)?;
        self.fetch_rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no rows".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(api_key: Option<&str>) -> RestStore {
        RestStore::new(
            "https://project.supabase.co/",
            "books",
            api_key.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_table_url() {
        assert_eq!(
            store(None).table_url(),
            "https://project.supabase.co/rest/v1/books"
        );
    }

    #[test]
    fn test_select_all_request() {
        let request = store(Some("KEY")).select_request(None).unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.url().path(), "/rest/v1/books");
        assert_eq!(request.url().query(), Some("select=*"));
        assert_eq!(request.headers()["apikey"], "KEY");
        assert_eq!(request.headers()["authorization"], "Bearer KEY");
    }

    #[test]
    fn test_select_where_request_filters_every_key_field() {
        let key = BookKey::new("Dune & Co", "Frank Herbert", 1965);
        let request = store(None).select_request(Some(&key)).unwrap();

        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "*".to_string()),
                ("title".to_string(), "eq.Dune & Co".to_string()),
                ("author".to_string(), "eq.Frank Herbert".to_string()),
                ("published_year".to_string(), "eq.1965".to_string()),
            ]
        );
        assert!(request.headers().get("apikey").is_none());
    }

    #[test]
    fn test_insert_request_body() {
        let candidate = Candidate::new("Dune", "Herbert", 1965, "https://example.com/dune");
        let request = store(None).insert_request(&candidate).unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.headers()["prefer"], "return=representation");

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json[0]["title"], "Dune");
        assert_eq!(json[0]["published_year"], 1965);
        assert!(json[0].get("id").is_none());
    }

    #[test]
    fn test_decode_rows() {
        let rows = decode_rows(
            StatusCode::OK,
            r#"[{"id": 1, "title": "Dune", "author": "Herbert", "published_year": 1965, "link": "https://a"}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Dune");
    }

    #[test]
    fn test_decode_backend_error_uses_message() {
        let err = decode_rows(
            StatusCode::UNAUTHORIZED,
            r#"{"code": "PGRST301", "message": "JWT expired"}"#,
        )
        .unwrap_err();

        match err {
            StoreError::Backend { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "JWT expired");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_body() {
        let err = decode_rows(StatusCode::OK, "<html>").unwrap_err();
        assert!(matches!(err, StoreError::Malformed(_)));
    }
}
