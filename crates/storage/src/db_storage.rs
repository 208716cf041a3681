//! Relational storage backend.
//!
//! One table per entity kind, foreign keys for the 1-N relations and a
//! `place_amenity` join table for Place/Amenity. Writes are staged in a
//! session and flushed in a single transaction by [`Storage::persist`].
//!
//! Connections go through sqlx's `Any` driver so the same code serves MySQL
//! (`mysql://...`) and SQLite (`sqlite://...`).

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use hbnb_core::schema::{self, FieldSpec, FieldType};
use hbnb_core::{format_timestamp, Attributes, EntityKind, Record};
use serde_json::Value;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{Any, AnyPool, Row, Transaction};
use tracing::{debug, info};

use super::{Index, RecordKey, Result, Storage, StorageError};

/// Tables in creation order: every parent precedes its children.
const TABLE_ORDER: [EntityKind; 6] = [
    EntityKind::State,
    EntityKind::User,
    EntityKind::Amenity,
    EntityKind::City,
    EntityKind::Place,
    EntityKind::Review,
];

const JOIN_TABLE: &str = "place_amenity";

/// Uncommitted changes.
#[derive(Default)]
struct Session {
    staged: Index,
    deleted: BTreeSet<RecordKey>,
}

impl Session {
    fn is_empty(&self) -> bool {
        self.staged.is_empty() && self.deleted.is_empty()
    }
}

/// Relational storage implementation.
pub struct DbStorage {
    /// Database connection pool
    pool: AnyPool,
    session: Session,
}

impl DbStorage {
    /// Connect to the database at `url`.
    ///
    /// With `drop_existing`, every table is dropped first. The schema itself
    /// is created by [`Storage::reload`].
    pub async fn connect(url: &str, drop_existing: bool) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new().max_connections(5).connect(url).await?;

        let storage = Self { pool, session: Session::default() };
        if drop_existing {
            info!("dropping existing tables");
            storage.drop_schema().await?;
        }
        Ok(storage)
    }

    /// Connect and create the schema.
    pub async fn open(url: &str, drop_existing: bool) -> Result<Self> {
        let mut storage = Self::connect(url, drop_existing).await?;
        storage.reload().await?;
        Ok(storage)
    }

    async fn create_schema(&self) -> Result<()> {
        for kind in TABLE_ORDER {
            sqlx::query(&create_table_sql(kind)).execute(&self.pool).await?;
        }
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {JOIN_TABLE} (
                place_id VARCHAR(60) NOT NULL,
                amenity_id VARCHAR(60) NOT NULL,
                PRIMARY KEY (place_id, amenity_id),
                FOREIGN KEY (place_id) REFERENCES places(id) ON DELETE CASCADE,
                FOREIGN KEY (amenity_id) REFERENCES amenities(id) ON DELETE CASCADE
            )"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn drop_schema(&self) -> Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {JOIN_TABLE}"))
            .execute(&self.pool)
            .await?;
        for kind in TABLE_ORDER.iter().rev() {
            if let Some(table) = kind.table() {
                sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
                    .execute(&self.pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn load_table(&self, kind: EntityKind) -> Result<Vec<Record>> {
        let Some(table) = kind.table() else {
            return Ok(Vec::new());
        };
        let columns = columns(kind);
        let mut select = vec!["id", "created_at", "updated_at"];
        select.extend(columns.iter().map(|c| c.name));
        let sql = format!("SELECT {} FROM {table}", select.join(", "));
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        let mut links = if kind == EntityKind::Place {
            self.load_amenity_links().await?
        } else {
            HashMap::new()
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let mut fields = Attributes::new();
            let id: String = row.try_get("id")?;
            fields.insert("created_at".into(), Value::String(row.try_get("created_at")?));
            fields.insert("updated_at".into(), Value::String(row.try_get("updated_at")?));
            for column in &columns {
                if let Some(value) = read_column(&row, column)? {
                    fields.insert(column.name.into(), value);
                }
            }
            if kind == EntityKind::Place {
                let ids = links.remove(&id).unwrap_or_default();
                fields.insert("amenity_ids".into(), Value::from(ids));
            }
            fields.insert("id".into(), Value::String(id));
            records.push(Record::from_fields(kind, fields)?);
        }
        Ok(records)
    }

    async fn load_amenity_links(&self) -> Result<HashMap<String, Vec<String>>> {
        let rows = sqlx::query(&format!(
            "SELECT place_id, amenity_id FROM {JOIN_TABLE} ORDER BY amenity_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut links: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let place_id: String = row.try_get("place_id")?;
            let amenity_id: String = row.try_get("amenity_id")?;
            links.entry(place_id).or_default().push(amenity_id);
        }
        Ok(links)
    }
}

#[async_trait]
impl Storage for DbStorage {
    async fn all(&self, kind: Option<EntityKind>) -> Result<Index> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => TABLE_ORDER.to_vec(),
        };

        let mut index = Index::new();
        for kind in kinds {
            for record in self.load_table(kind).await? {
                index.insert(RecordKey::of(&record), record);
            }
        }

        index.retain(|key, _| !self.session.deleted.contains(key));
        for (key, record) in &self.session.staged {
            if kind.map_or(true, |k| k == key.kind) {
                index.insert(key.clone(), record.clone());
            }
        }
        Ok(index)
    }

    async fn register_new(&mut self, record: Record) -> Result<()> {
        if record.kind().table().is_none() {
            return Err(StorageError::Unmapped(record.kind()));
        }
        let key = RecordKey::of(&record);
        debug!(%key, "staging record");
        self.session.deleted.remove(&key);
        self.session.staged.insert(key, record);
        Ok(())
    }

    async fn persist(&mut self) -> Result<()> {
        let session = std::mem::take(&mut self.session);
        if session.is_empty() {
            return Ok(());
        }

        // Dropping `tx` on an early return rolls the whole flush back.
        let mut tx = self.pool.begin().await?;
        for key in &session.deleted {
            delete_cascading(&mut tx, key).await?;
        }

        let mut staged: Vec<&Record> = session.staged.values().collect();
        staged.sort_by_key(|record| table_rank(record.kind()));
        for record in staged {
            upsert(&mut tx, record).await?;
        }
        tx.commit().await?;

        debug!(
            written = session.staged.len(),
            deleted = session.deleted.len(),
            "session committed"
        );
        Ok(())
    }

    async fn delete(&mut self, key: &RecordKey) -> Result<()> {
        self.session.staged.remove(key);
        if key.kind.table().is_some() {
            self.session.deleted.insert(key.clone());
        }
        Ok(())
    }

    async fn reload(&mut self) -> Result<()> {
        self.create_schema().await?;
        self.session = Session::default();
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.session.is_empty() {
            debug!("discarding uncommitted session");
        }
        self.session = Session::default();
        Ok(())
    }
}

/// Known fields stored as columns (everything but id lists).
fn columns(kind: EntityKind) -> Vec<&'static FieldSpec> {
    schema::fields(kind)
        .iter()
        .filter(|f| f.ty != FieldType::IdList)
        .collect()
}

fn table_rank(kind: EntityKind) -> usize {
    TABLE_ORDER
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(TABLE_ORDER.len())
}

fn column_type(spec: &FieldSpec) -> String {
    let sql_type = match spec.ty {
        FieldType::Text if spec.references.is_some() => "VARCHAR(60)",
        FieldType::Text if matches!(spec.name, "description" | "text") => "VARCHAR(1024)",
        FieldType::Text | FieldType::IdList => "VARCHAR(128)",
        FieldType::Integer => "BIGINT",
        FieldType::Float => "DOUBLE",
    };
    let mut column = format!("{} {sql_type}", spec.name);
    if !spec.nullable {
        column.push_str(" NOT NULL");
    }
    if let Some(Value::Number(n)) = spec.default_value() {
        column.push_str(&format!(" DEFAULT {n}"));
    }
    column
}

fn create_table_sql(kind: EntityKind) -> String {
    let table = kind.table().unwrap_or_default();
    let mut parts = vec![
        "id VARCHAR(60) NOT NULL PRIMARY KEY".to_string(),
        "created_at VARCHAR(32) NOT NULL".to_string(),
        "updated_at VARCHAR(32) NOT NULL".to_string(),
    ];
    let columns = columns(kind);
    parts.extend(columns.iter().map(|c| column_type(c)));
    for column in &columns {
        if let Some(parent) = column.references.and_then(EntityKind::table) {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {parent}(id) ON DELETE CASCADE",
                column.name
            ));
        }
    }
    format!("CREATE TABLE IF NOT EXISTS {table} ({})", parts.join(", "))
}

fn read_column(row: &AnyRow, column: &FieldSpec) -> Result<Option<Value>> {
    Ok(match column.ty {
        FieldType::Integer => row.try_get::<Option<i64>, _>(column.name)?.map(Value::from),
        FieldType::Float => row.try_get::<Option<f64>, _>(column.name)?.map(Value::from),
        FieldType::Text | FieldType::IdList => {
            row.try_get::<Option<String>, _>(column.name)?.map(Value::String)
        }
    })
}

/// A column value ready to bind.
enum Bound {
    Text(Option<String>),
    Integer(Option<i64>),
    Float(Option<f64>),
}

fn bound_value(record: &Record, column: &FieldSpec) -> Result<Bound> {
    let value = record
        .get(column.name)
        .cloned()
        .filter(|v| !v.is_null())
        .or_else(|| column.default_value());
    let invalid = |v: &Value| {
        StorageError::Other(format!("invalid value for {}.{}: {v}", record.kind(), column.name))
    };

    Ok(match column.ty {
        FieldType::Text | FieldType::IdList => Bound::Text(value.map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })),
        FieldType::Integer => match value.map(|v| column.coerce(v)) {
            None => Bound::Integer(None),
            Some(v) => Bound::Integer(Some(v.as_i64().ok_or_else(|| invalid(&v))?)),
        },
        FieldType::Float => match value.map(|v| column.coerce(v)) {
            None => Bound::Float(None),
            Some(v) => Bound::Float(Some(v.as_f64().ok_or_else(|| invalid(&v))?)),
        },
    })
}

async fn upsert(tx: &mut Transaction<'_, Any>, record: &Record) -> Result<()> {
    let kind = record.kind();
    let table = kind.table().ok_or(StorageError::Unmapped(kind))?;
    let id = record.id().to_string();
    let columns = columns(kind);

    for name in record.attributes().keys() {
        if schema::field(kind, name).is_none() {
            debug!(key = %RecordKey::of(record), attribute = %name, "attribute has no column, not persisted");
        }
    }

    let exists: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table} WHERE id = ?"))
        .bind(id.clone())
        .fetch_one(&mut **tx)
        .await?;

    let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
    let sql = if exists > 0 {
        let mut assignments = vec!["created_at = ?".to_string(), "updated_at = ?".to_string()];
        assignments.extend(names.iter().map(|n| format!("{n} = ?")));
        format!("UPDATE {table} SET {} WHERE id = ?", assignments.join(", "))
    } else {
        let mut all = vec!["created_at", "updated_at"];
        all.extend(names.iter().copied());
        all.push("id");
        let placeholders = vec!["?"; all.len()].join(", ");
        format!("INSERT INTO {table} ({}) VALUES ({placeholders})", all.join(", "))
    };

    let mut query = sqlx::query(&sql)
        .bind(format_timestamp(record.created_at()))
        .bind(format_timestamp(record.updated_at()));
    for column in &columns {
        query = match bound_value(record, column)? {
            Bound::Text(v) => query.bind(v),
            Bound::Integer(v) => query.bind(v),
            Bound::Float(v) => query.bind(v),
        };
    }
    query.bind(id.clone()).execute(&mut **tx).await?;

    if kind == EntityKind::Place {
        sync_amenity_links(tx, &id, record.get("amenity_ids")).await?;
    }
    Ok(())
}

async fn sync_amenity_links(
    tx: &mut Transaction<'_, Any>,
    place_id: &str,
    amenity_ids: Option<&Value>,
) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {JOIN_TABLE} WHERE place_id = ?"))
        .bind(place_id.to_string())
        .execute(&mut **tx)
        .await?;

    let ids: BTreeSet<&str> = amenity_ids
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    for amenity_id in ids {
        sqlx::query(&format!(
            "INSERT INTO {JOIN_TABLE} (place_id, amenity_id) VALUES (?, ?)"
        ))
        .bind(place_id.to_string())
        .bind(amenity_id.to_string())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Delete a record and, children first, everything that depends on it.
async fn delete_cascading(tx: &mut Transaction<'_, Any>, root: &RecordKey) -> Result<()> {
    let mut pending = vec![root.clone()];
    let mut ordered = Vec::new();
    while let Some(key) = pending.pop() {
        for (child, column) in schema::dependents(key.kind) {
            let Some(table) = child.table() else { continue };
            let rows = sqlx::query(&format!("SELECT id FROM {table} WHERE {column} = ?"))
                .bind(key.id.to_string())
                .fetch_all(&mut **tx)
                .await?;
            for row in rows {
                let id: String = row.try_get("id")?;
                pending.push(RecordKey::new(child, id));
            }
        }
        ordered.push(key);
    }

    for key in ordered.iter().rev() {
        let Some(table) = key.kind.table() else { continue };
        let link_column = match key.kind {
            EntityKind::Place => Some("place_id"),
            EntityKind::Amenity => Some("amenity_id"),
            _ => None,
        };
        if let Some(link_column) = link_column {
            sqlx::query(&format!("DELETE FROM {JOIN_TABLE} WHERE {link_column} = ?"))
                .bind(key.id.to_string())
                .execute(&mut **tx)
                .await?;
        }
        sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(key.id.to_string())
            .execute(&mut **tx)
            .await?;
        debug!(%key, "row deleted");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn open_temp() -> (tempfile::TempDir, DbStorage) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("hbnb.db").display());
        let storage = DbStorage::open(&url, false).await.unwrap();
        (dir, storage)
    }

    fn record(kind: EntityKind, fields: Value) -> Record {
        let mut record = Record::new(kind);
        for (key, value) in fields.as_object().unwrap() {
            record.set(key, value.clone());
        }
        record
    }

    #[test]
    fn test_create_table_sql_has_foreign_keys() {
        let sql = create_table_sql(EntityKind::City);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS cities ("));
        assert!(sql.contains("state_id VARCHAR(60) NOT NULL"));
        assert!(sql.contains("FOREIGN KEY (state_id) REFERENCES states(id) ON DELETE CASCADE"));

        let sql = create_table_sql(EntityKind::Place);
        assert!(sql.contains("number_rooms BIGINT NOT NULL DEFAULT 0"));
        assert!(sql.contains("latitude DOUBLE"));
        assert!(!sql.contains("amenity_ids"));
    }

    #[tokio::test]
    async fn test_staged_records_visible_before_persist() {
        let (_dir, mut storage) = open_temp().await;
        let state = record(EntityKind::State, json!({"name": "California"}));
        let key = RecordKey::of(&state);
        storage.register_new(state).await.unwrap();

        assert!(storage.get(&key).await.unwrap().is_some());
        storage.close().await.unwrap();
        assert!(storage.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_round_trips_columns() {
        let (_dir, mut storage) = open_temp().await;
        let state = record(EntityKind::State, json!({"name": "California"}));
        let city = record(
            EntityKind::City,
            json!({"name": "San Francisco", "state_id": state.id().as_str()}),
        );
        let user = record(EntityKind::User, json!({"email": "a@b.c", "password": "pwd"}));
        let amenity = record(EntityKind::Amenity, json!({"name": "Wifi"}));
        let place = record(
            EntityKind::Place,
            json!({
                "city_id": city.id().as_str(),
                "user_id": user.id().as_str(),
                "name": "Loft",
                "number_rooms": 2,
                "latitude": 37.77,
                "amenity_ids": [amenity.id().as_str()],
            }),
        );
        let place_key = RecordKey::of(&place);

        for r in [place, city, state, user, amenity] {
            storage.register_new(r).await.unwrap();
        }
        storage.persist().await.unwrap();
        storage.close().await.unwrap();

        let loaded = storage.get(&place_key).await.unwrap().unwrap();
        assert_eq!(loaded.get_str("name"), Some("Loft"));
        assert_eq!(loaded.get("number_rooms"), Some(&json!(2)));
        assert_eq!(loaded.get("max_guest"), Some(&json!(0)));
        assert_eq!(loaded.get("latitude"), Some(&json!(37.77)));
        assert_eq!(loaded.get("longitude"), None);
        assert_eq!(loaded.get("amenity_ids").and_then(Value::as_array).map(Vec::len), Some(1));
        assert_eq!(storage.all(None).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_update_existing_row() {
        let (_dir, mut storage) = open_temp().await;
        let mut state = record(EntityKind::State, json!({"name": "Nevada"}));
        storage.save_record(&mut state).await.unwrap();

        state.set("name", json!("Arizona"));
        storage.save_record(&mut state).await.unwrap();

        let states = storage.all(Some(EntityKind::State)).await.unwrap();
        assert_eq!(states.len(), 1);
        let stored = states.values().next().unwrap();
        assert_eq!(stored.get_str("name"), Some("Arizona"));
        assert_eq!(stored.created_at(), state.created_at());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_dependents() {
        let (_dir, mut storage) = open_temp().await;
        let state = record(EntityKind::State, json!({"name": "Oregon"}));
        let city = record(EntityKind::City, json!({"name": "Portland", "state_id": state.id().as_str()}));
        let user = record(EntityKind::User, json!({"email": "u@x.io", "password": "p"}));
        let place = record(
            EntityKind::Place,
            json!({"city_id": city.id().as_str(), "user_id": user.id().as_str(), "name": "Cabin"}),
        );
        let review = record(
            EntityKind::Review,
            json!({"place_id": place.id().as_str(), "user_id": user.id().as_str(), "text": "Nice"}),
        );
        let state_key = RecordKey::of(&state);
        for r in [state, city, user, place, review] {
            storage.register_new(r).await.unwrap();
        }
        storage.persist().await.unwrap();

        storage.delete(&state_key).await.unwrap();
        storage.persist().await.unwrap();

        assert_eq!(storage.count(EntityKind::State).await.unwrap(), 0);
        assert_eq!(storage.count(EntityKind::City).await.unwrap(), 0);
        assert_eq!(storage.count(EntityKind::Place).await.unwrap(), 0);
        assert_eq!(storage.count(EntityKind::Review).await.unwrap(), 0);
        assert_eq!(storage.count(EntityKind::User).await.unwrap(), 1);
    }

    async fn link_count(storage: &DbStorage) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {JOIN_TABLE}"))
            .fetch_one(&storage.pool)
            .await
            .unwrap()
    }

    /// A place linked to two amenities, with one review. Returns the place
    /// and its first amenity.
    async fn seed_place(storage: &mut DbStorage) -> (Record, Record) {
        let state = record(EntityKind::State, json!({"name": "Oregon"}));
        let city = record(EntityKind::City, json!({"name": "Bend", "state_id": state.id().as_str()}));
        let user = record(EntityKind::User, json!({"email": "h@x.io", "password": "p"}));
        let wifi = record(EntityKind::Amenity, json!({"name": "Wifi"}));
        let pool = record(EntityKind::Amenity, json!({"name": "Pool"}));
        let place = record(
            EntityKind::Place,
            json!({
                "city_id": city.id().as_str(),
                "user_id": user.id().as_str(),
                "name": "Cabin",
                "amenity_ids": [wifi.id().as_str(), pool.id().as_str()],
            }),
        );
        let review = record(
            EntityKind::Review,
            json!({"place_id": place.id().as_str(), "user_id": user.id().as_str(), "text": "Cozy"}),
        );
        for r in [state, city, user, wifi.clone(), pool, place.clone(), review] {
            storage.register_new(r).await.unwrap();
        }
        storage.persist().await.unwrap();
        (place, wifi)
    }

    #[tokio::test]
    async fn test_delete_place_removes_reviews_and_links() {
        let (_dir, mut storage) = open_temp().await;
        let (place, _) = seed_place(&mut storage).await;
        assert_eq!(link_count(&storage).await, 2);

        storage.delete(&RecordKey::of(&place)).await.unwrap();
        storage.persist().await.unwrap();

        assert_eq!(storage.count(EntityKind::Place).await.unwrap(), 0);
        assert_eq!(storage.count(EntityKind::Review).await.unwrap(), 0);
        assert_eq!(link_count(&storage).await, 0);
        assert_eq!(storage.count(EntityKind::Amenity).await.unwrap(), 2);
        assert_eq!(storage.count(EntityKind::User).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_amenity_unlinks_it_from_places() {
        let (_dir, mut storage) = open_temp().await;
        let (place, wifi) = seed_place(&mut storage).await;

        storage.delete(&RecordKey::of(&wifi)).await.unwrap();
        storage.persist().await.unwrap();

        assert_eq!(link_count(&storage).await, 1);
        let loaded = storage.get(&RecordKey::of(&place)).await.unwrap().unwrap();
        let ids = loaded.get("amenity_ids").and_then(Value::as_array).cloned().unwrap();
        assert_eq!(ids.len(), 1);
        assert_ne!(ids[0], json!(wifi.id().as_str()));
    }

    #[tokio::test]
    async fn test_staged_deletion_hides_row_before_persist() {
        let (_dir, mut storage) = open_temp().await;
        let mut state = record(EntityKind::State, json!({"name": "Idaho"}));
        storage.save_record(&mut state).await.unwrap();
        let key = RecordKey::of(&state);

        storage.delete(&key).await.unwrap();
        assert!(storage.get(&key).await.unwrap().is_none());
        assert!(storage.all(None).await.unwrap().is_empty());

        storage.close().await.unwrap();
        assert!(storage.get(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_absent_key_is_noop() {
        let (_dir, mut storage) = open_temp().await;
        storage.delete(&RecordKey::new(EntityKind::Review, "missing")).await.unwrap();
        storage.persist().await.unwrap();
        assert!(storage.all(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_base_model_is_unmapped() {
        let (_dir, mut storage) = open_temp().await;
        let err = storage.register_new(Record::new(EntityKind::BaseModel)).await.unwrap_err();
        assert!(matches!(err, StorageError::Unmapped(EntityKind::BaseModel)));
        assert!(storage.all(Some(EntityKind::BaseModel)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_clears_session() {
        let (_dir, mut storage) = open_temp().await;
        // `name` is NOT NULL
        storage.register_new(Record::new(EntityKind::State)).await.unwrap();
        let err = storage.persist().await.unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
        assert!(storage.all(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drop_existing_resets_tables() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("hbnb.db").display());
        {
            let mut storage = DbStorage::open(&url, false).await.unwrap();
            let mut amenity = record(EntityKind::Amenity, json!({"name": "Pool"}));
            storage.save_record(&mut amenity).await.unwrap();
        }
        let kept = DbStorage::open(&url, false).await.unwrap();
        assert_eq!(kept.count(EntityKind::Amenity).await.unwrap(), 1);
        drop(kept);

        let reset = DbStorage::open(&url, true).await.unwrap();
        assert_eq!(reset.count(EntityKind::Amenity).await.unwrap(), 0);
    }
}
