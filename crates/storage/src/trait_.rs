//! Storage trait abstraction.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use hbnb_core::{EntityKind, ModelError, Record, RecordId};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Database or transaction error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A persisted record could not be reconstructed
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// The kind has no relational mapping
    #[error("{0} has no table in the relational backend")]
    Unmapped(EntityKind),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Index key of a record: its kind plus its id.
///
/// Rendered as `<Kind>.<id>`. Records of different kinds may share an id
/// without colliding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Entity kind
    pub kind: EntityKind,
    /// Record id
    pub id: RecordId,
}

impl RecordKey {
    /// Build a key from its parts.
    pub fn new(kind: EntityKind, id: impl Into<RecordId>) -> Self {
        Self { kind, id: id.into() }
    }

    /// Key under which a record is indexed.
    pub fn of(record: &Record) -> Self {
        Self::new(record.kind(), record.id().clone())
    }
}

impl std::fmt::Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

impl FromStr for RecordKey {
    type Err = ModelError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (kind, id) = s.split_once('.').ok_or_else(|| ModelError::MalformedInput {
            field: "key".to_string(),
            value: s.to_string(),
        })?;
        Ok(Self::new(kind.parse()?, id))
    }
}

/// Records keyed by kind and id.
pub type Index = BTreeMap<RecordKey, Record>;

/// Storage abstraction for HBNB records.
///
/// Both backends expose the same verbs so callers never need to know which
/// one is active. Writes are staged by [`Storage::register_new`] and
/// [`Storage::delete`] and made durable by [`Storage::persist`].
#[async_trait]
pub trait Storage: Send + Sync {
    /// Every record, or only those of `kind`.
    async fn all(&self, kind: Option<EntityKind>) -> Result<Index>;

    /// Stage a record (create or replace).
    async fn register_new(&mut self, record: Record) -> Result<()>;

    /// Make all staged changes durable.
    async fn persist(&mut self) -> Result<()>;

    /// Stage removal of a record. Removing an absent key is a no-op.
    async fn delete(&mut self, key: &RecordKey) -> Result<()>;

    /// Load persisted state, replacing any in-memory session.
    async fn reload(&mut self) -> Result<()>;

    /// Release the session, discarding uncommitted changes.
    async fn close(&mut self) -> Result<()>;

    /// Look up one record.
    async fn get(&self, key: &RecordKey) -> Result<Option<Record>> {
        Ok(self.all(Some(key.kind)).await?.remove(key))
    }

    /// Number of records of `kind`.
    async fn count(&self, kind: EntityKind) -> Result<usize> {
        Ok(self.all(Some(kind)).await?.len())
    }

    /// Refresh the record's `updated_at`, stage it and persist.
    async fn save_record(&mut self, record: &mut Record) -> Result<()> {
        record.touch();
        self.register_new(record.clone()).await?;
        self.persist().await
    }
}
