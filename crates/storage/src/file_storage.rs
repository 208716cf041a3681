//! JSON file storage implementation.
//!
//! Keeps every record in an in-memory index and snapshots the whole index to
//! a single JSON object on [`Storage::persist`]. The object is keyed exactly
//! like the index (`"<Kind>.<id>"`), each value being the record's serialized
//! map with its `__class__` discriminator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hbnb_core::{EntityKind, Record};
use serde_json::{Map, Value};
use tokio::fs;
use tracing::{debug, warn};

use super::{Index, RecordKey, Result, Storage};

/// File-backed storage backend.
pub struct FileStorage {
    path: PathBuf,
    objects: Index,
}

impl FileStorage {
    /// Create an empty storage bound to `path`. Nothing is read until
    /// [`Storage::reload`] is called.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            objects: Index::new(),
        }
    }

    /// Create storage and load the snapshot at `path`, if any.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut storage = Self::new(path);
        storage.reload().await?;
        Ok(storage)
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn snapshot(&self) -> Result<String> {
        let map: Map<String, Value> = self
            .objects
            .iter()
            .map(|(key, record)| (key.to_string(), record.to_dict()))
            .collect();
        Ok(serde_json::to_string(&map)?)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "file.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn all(&self, kind: Option<EntityKind>) -> Result<Index> {
        Ok(match kind {
            None => self.objects.clone(),
            Some(kind) => self
                .objects
                .iter()
                .filter(|(key, _)| key.kind == kind)
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
        })
    }

    async fn register_new(&mut self, record: Record) -> Result<()> {
        let key = RecordKey::of(&record);
        debug!(%key, "registering record");
        self.objects.insert(key, record);
        Ok(())
    }

    async fn persist(&mut self) -> Result<()> {
        let json = self.snapshot()?;
        let temp = self.temp_path();
        let written = match fs::write(&temp, json.as_bytes()).await {
            Ok(()) => fs::rename(&temp, &self.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            fs::remove_file(&temp).await.ok();
            return Err(e.into());
        }
        debug!(path = %self.path.display(), records = self.objects.len(), "snapshot written");
        Ok(())
    }

    async fn delete(&mut self, key: &RecordKey) -> Result<()> {
        if self.objects.remove(key).is_some() {
            debug!(%key, "record removed");
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no snapshot, starting empty");
                self.objects.clear();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let stored: Map<String, Value> = serde_json::from_str(&json)?;
        let mut objects = Index::new();
        for (stored_key, value) in &stored {
            let record = Record::from_dict(value)?;
            let key = RecordKey::of(&record);
            if key.to_string() != *stored_key {
                warn!(%stored_key, %key, "snapshot key does not match record, re-keying");
            }
            objects.insert(key, record);
        }
        self.objects = objects;
        debug!(path = %self.path.display(), records = self.objects.len(), "snapshot loaded");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.reload().await
    }
}
