//! Configuration for the record store backend.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (READPALM_BACKEND, READPALM_STORE_URL,
//!    READPALM_API_KEY, READPALM_TABLE, READPALM_DB, READPALM_TIMEOUT_SECONDS)
//! 2. Config file (.readpalm/config.yaml)
//! 3. Defaults (SQLite at ~/.readpalm/books.db)
//!
//! Config file discovery:
//! - Searches current directory and parents for .readpalm/config.yaml
//! - A relative sqlite path is resolved against the project root (the
//!   parent of .readpalm/)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

const DEFAULT_TABLE: &str = "books";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Which record store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// PostgREST / Supabase over HTTP
    Rest,
    /// Local SQLite file
    Sqlite,
    /// Process memory (lost on exit)
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rest" => Ok(Self::Rest),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("Unknown backend '{}' (expected rest, sqlite or memory)", other),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Rest => write!(f, "rest"),
            BackendKind::Sqlite => write!(f, "sqlite"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub backend: Option<BackendKind>,
    /// Collection holding the records
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub rest: Option<RestConfig>,
    #[serde(default)]
    pub sqlite: Option<SqliteConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestConfig {
    /// Project URL (e.g. https://xyz.supabase.co)
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SqliteConfig {
    /// Database file (relative to the project root)
    pub path: Option<String>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend: BackendKind,
    pub table: String,
    /// Base URL for the REST backend
    pub rest_url: Option<String>,
    pub api_key: Option<String>,
    /// HTTP request timeout
    pub timeout_seconds: u64,
    /// Database file for the SQLite backend
    pub sqlite_path: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".readpalm").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Merge the config file, environment and defaults.
///
/// `env` looks up an environment variable; empty values count as unset.
fn resolve(
    file: Option<(&Path, &ConfigFile)>,
    env: impl Fn(&str) -> Option<String>,
    default_home: &Path,
) -> Result<ResolvedConfig> {
    let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let rest = file
        .and_then(|(_, c)| c.rest.clone())
        .unwrap_or_default();
    let sqlite = file
        .and_then(|(_, c)| c.sqlite.clone())
        .unwrap_or_default();

    let rest_url = env("READPALM_STORE_URL").or(rest.url);
    let api_key = env("READPALM_API_KEY").or(rest.api_key);

    let table = env("READPALM_TABLE")
        .or_else(|| file.and_then(|(_, c)| c.table.clone()))
        .unwrap_or_else(|| DEFAULT_TABLE.to_string());

    let timeout_seconds = match env("READPALM_TIMEOUT_SECONDS") {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid READPALM_TIMEOUT_SECONDS: {}", v))?,
        None => rest.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
    };

    let sqlite_path = if let Some(db) = env("READPALM_DB") {
        PathBuf::from(db)
    } else if let (Some((config_path, _)), Some(path)) = (file, sqlite.path.as_deref()) {
        // Base directory is the parent of .readpalm/ (i.e., grandparent of config.yaml)
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."));
        resolve_path(base_dir, path)
    } else {
        default_home.join("books.db")
    };

    // Without an explicit choice, a configured URL means the REST backend
    let backend = match env("READPALM_BACKEND") {
        Some(v) => v.parse()?,
        None => match file.and_then(|(_, c)| c.backend) {
            Some(kind) => kind,
            None if rest_url.is_some() => BackendKind::Rest,
            None => BackendKind::Sqlite,
        },
    };

    Ok(ResolvedConfig {
        backend,
        table,
        rest_url,
        api_key,
        timeout_seconds,
        sqlite_path,
        config_file: file.map(|(p, _)| p.to_path_buf()),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".readpalm");

    let config_file = find_config_file();
    let parsed = match &config_file {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };

    let file = config_file.as_deref().zip(parsed.as_ref());
    resolve(file, |name| std::env::var(name).ok(), &default_home)
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}
