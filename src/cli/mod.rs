//! Command-line interface for readpalm.
//!
//! Stands in for the catalog UI: every command starts a session by
//! refreshing the catalog from the configured record store, then lists,
//! searches or adds books.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::catalog::{AddOutcome, CatalogManager};
use crate::config::{BackendKind, ResolvedConfig};
use crate::domain::{Book, Candidate};
use crate::store::{MemoryStore, RecordStore, RestStore, SqliteStore};

/// readpalm - Book catalog with duplicate-checked inserts
#[derive(Parser, Debug)]
#[command(name = "readpalm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Record store backend (overrides configuration)
    #[arg(short, long, value_enum, global = true)]
    pub backend: Option<BackendArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List all books
    List,

    /// Search books by title or author
    Search {
        /// Text to look for (case-insensitive)
        query: String,
    },

    /// Add a book
    Add {
        /// Book title
        #[arg(long)]
        title: String,

        /// Author
        #[arg(long)]
        author: String,

        /// Year of publication
        #[arg(long)]
        year: i32,

        /// Link to the book (https://...)
        #[arg(long)]
        link: String,

        /// Optional description
        #[arg(long)]
        description: Option<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Backend for CLI (maps to BackendKind)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum BackendArg {
    /// PostgREST / Supabase
    Rest,

    /// Local SQLite file
    Sqlite,

    /// In-process memory
    Memory,
}

impl From<BackendArg> for BackendKind {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Rest => BackendKind::Rest,
            BackendArg::Sqlite => BackendKind::Sqlite,
            BackendArg::Memory => BackendKind::Memory,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let mut config = crate::config::config()?.clone();
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }

        match self.command {
            Commands::Config => show_config(&config),
            Commands::List => list_books(&config).await,
            Commands::Search { query } => search_books(&config, &query).await,
            Commands::Add {
                title,
                author,
                year,
                link,
                description,
                json,
            } => {
                let mut candidate = Candidate::new(title, author, year, link);
                candidate.description = description;
                add_book(&config, &candidate, json).await
            }
        }
    }
}

/// Build the record store selected by `config`
pub fn open_store(config: &ResolvedConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        BackendKind::Rest => {
            let url = config.rest_url.clone().context(
                "REST backend needs a store URL (set READPALM_STORE_URL or rest.url)",
            )?;
            Arc::new(RestStore::new(
                url,
                config.table.clone(),
                config.api_key.clone(),
                Duration::from_secs(config.timeout_seconds),
            )?)
        }
        BackendKind::Sqlite => Arc::new(
            SqliteStore::open(&config.sqlite_path, &config.table).with_context(|| {
                format!("Failed to open database: {}", config.sqlite_path.display())
            })?,
        ),
        BackendKind::Memory => Arc::new(MemoryStore::new()),
    };

    Ok(store)
}

/// Open the store and load the catalog, as a UI does on mount
async fn start_session(config: &ResolvedConfig) -> Result<CatalogManager> {
    let catalog = CatalogManager::new(open_store(config)?);
    catalog.refresh().await?;
    Ok(catalog)
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("Backend: {}", config.backend);
    println!("Table: {}", config.table);
    match config.backend {
        BackendKind::Rest => {
            println!(
                "Store URL: {}",
                config.rest_url.as_deref().unwrap_or("(not set)")
            );
            println!(
                "API key: {}",
                if config.api_key.is_some() { "set" } else { "not set" }
            );
            println!("Timeout: {}s", config.timeout_seconds);
        }
        BackendKind::Sqlite => println!("Database: {}", config.sqlite_path.display()),
        BackendKind::Memory => {}
    }
    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using env/defaults)"),
    }
    Ok(())
}

/// List all books
async fn list_books(config: &ResolvedConfig) -> Result<()> {
    let catalog = start_session(config).await?;
    let books = catalog.list();

    if books.is_empty() {
        println!("No books yet");
        return Ok(());
    }

    print_books(&books);
    println!("\n{} Books", catalog.len());
    Ok(())
}

/// Search books by title or author
async fn search_books(config: &ResolvedConfig, query: &str) -> Result<()> {
    let catalog = start_session(config).await?;
    let books = catalog.filter(query);

    if books.is_empty() {
        println!("No books found for '{}'", query);
        return Ok(());
    }

    print_books(&books);
    println!("\n{} of {} Books", books.len(), catalog.len());
    Ok(())
}

/// Add a book
async fn add_book(config: &ResolvedConfig, candidate: &Candidate, json: bool) -> Result<()> {
    let catalog = CatalogManager::new(open_store(config)?);

    // The list only feeds the count shown afterwards; a failed load does not block adding
    if let Err(e) = catalog.refresh().await {
        tracing::warn!("{}", e);
    }

    let result = catalog.add(candidate).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&AddOutcome::from(&result))?);
        if result.is_err() {
            std::process::exit(1);
        }
        return Ok(());
    }

    match result {
        Ok(book) => {
            println!(
                "Added #{}: {} by {} ({})",
                book.id, book.title, book.author, book.published_year
            );
            println!("{} Books", catalog.len());
            Ok(())
        }
        Err(e) => {
            eprintln!("[{}] {}", e.kind(), e);
            std::process::exit(1);
        }
    }
}

/// Print books as a table
fn print_books(books: &[Book]) {
    println!(
        "{:<6} {:<36} {:<24} {:<6} {}",
        "ID", "TITLE", "AUTHOR", "YEAR", "LINK"
    );
    println!("{}", "-".repeat(100));

    for book in books {
        println!(
            "{:<6} {:<36} {:<24} {:<6} {}",
            book.id,
            truncate(&book.title, 36),
            truncate(&book.author, 24),
            book.published_year,
            book.link
        );
    }
}

/// Truncate to `width` characters, marking the cut with an ellipsis
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}
