//! Backend selection from the environment.
//!
//! The environment is read once at startup; [`open_storage`] is the only
//! place that decides which backend is in use.

use std::path::PathBuf;

use tracing::info;

use super::{DbStorage, FileStorage, Result, Storage, StorageError};

/// Default snapshot path of the file backend.
pub const DEFAULT_FILE_PATH: &str = "file.json";

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// In-memory index snapshotted to a JSON file.
    File {
        /// Snapshot path
        path: PathBuf,
    },
    /// Relational database.
    Database {
        /// Connection URL
        url: String,
        /// Drop every table before creating the schema
        drop_existing: bool,
    },
}

/// Resolved storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: Backend,
}

impl StorageConfig {
    /// File backend at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { backend: Backend::File { path: path.into() } }
    }

    /// Read the `HBNB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if lookup("HBNB_TYPE_STORAGE").as_deref() != Some("db") {
            let path = lookup("HBNB_FILE_PATH").unwrap_or_else(|| DEFAULT_FILE_PATH.to_string());
            return Ok(Self::file(path));
        }

        let drop_existing = lookup("HBNB_ENV").as_deref() == Some("test");
        let url = match lookup("HBNB_DATABASE_URL") {
            Some(url) => url,
            None => {
                let required = |name: &str| {
                    lookup(name).ok_or_else(|| StorageError::Config(format!("{name} is not set")))
                };
                let user = required("HBNB_MYSQL_USER")?;
                let db = required("HBNB_MYSQL_DB")?;
                let pwd = lookup("HBNB_MYSQL_PWD").unwrap_or_default();
                let host = lookup("HBNB_MYSQL_HOST").unwrap_or_else(|| "localhost".to_string());
                format!("mysql://{user}:{pwd}@{host}/{db}")
            }
        };
        Ok(Self { backend: Backend::Database { url, drop_existing } })
    }
}

/// Open and load the configured backend.
pub async fn open_storage(config: &StorageConfig) -> Result<Box<dyn Storage>> {
    match &config.backend {
        Backend::File { path } => {
            info!(path = %path.display(), "using file storage");
            Ok(Box::new(FileStorage::open(path).await?))
        }
        Backend::Database { url, drop_existing } => {
            info!(drop_existing, "using database storage");
            Ok(Box::new(DbStorage::open(url, *drop_existing).await?))
        }
    }
}
