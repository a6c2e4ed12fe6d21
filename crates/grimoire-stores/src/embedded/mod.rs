//! Embedded canonical store backed by SQLite.

pub mod schema;

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};

use grimoire_core::config::CanonicalStoreConfig;
use grimoire_core::error::{GrimoireError, GrimoireResult};
use grimoire_core::traits::CanonicalStore;
use grimoire_core::types::{CanonicalRecord, EntityKind, Metadata};

const SELECT_COLUMNS: &str = "id, name, entity_kind, aliases, properties";

/// SQLite canonical store.
///
/// Thread-safe via Mutex on the connection.
pub struct EmbeddedCanonicalStore {
    conn: Mutex<Connection>,
}

impl EmbeddedCanonicalStore {
    /// Open (or create) a store at `db_path`.
    pub fn new(db_path: impl AsRef<Path>) -> GrimoireResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new in-memory store.
    pub fn in_memory() -> GrimoireResult<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from a CanonicalStoreConfig. No path means in-memory.
    pub fn from_config(config: &CanonicalStoreConfig) -> GrimoireResult<Self> {
        match &config.path {
            Some(path) if path.as_os_str() != ":memory:" => Self::new(path),
            _ => Self::in_memory(),
        }
    }

    fn lock(&self) -> GrimoireResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GrimoireError::internal(e.to_string()))
    }

    /// Insert or replace a record by id, e.g. when seeding from a gazetteer.
    pub fn upsert(&self, record: &CanonicalRecord) -> GrimoireResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO canonical_entities (id, name, entity_kind, aliases, properties, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                entity_kind = excluded.entity_kind,
                aliases = excluded.aliases,
                properties = excluded.properties",
            params![
                record.id,
                record.name,
                record.kind.as_str(),
                serde_json::to_string(&record.aliases)?,
                serde_json::to_string(&record.properties)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &str) -> GrimoireResult<Option<CanonicalRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM canonical_entities WHERE id = ?1"),
                params![id],
                RawRecord::from_row,
            )
            .optional()?;
        Ok(row.and_then(RawRecord::into_record))
    }

    /// Number of stored records.
    pub fn count(&self) -> GrimoireResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM canonical_entities", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[async_trait]
impl CanonicalStore for EmbeddedCanonicalStore {
    async fn list_by_kind(&self, kind: EntityKind) -> GrimoireResult<Vec<CanonicalRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM canonical_entities WHERE entity_kind = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map(params![kind.as_str()], RawRecord::from_row)?;

        let mut records = Vec::new();
        for row in rows {
            if let Some(record) = row?.into_record() {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn create(
        &self,
        name: &str,
        kind: EntityKind,
        metadata: Metadata,
    ) -> GrimoireResult<CanonicalRecord> {
        let conn = self.lock()?;
        let id = uuid::Uuid::new_v4().to_string();

        let inserted = conn.execute(
            "INSERT INTO canonical_entities (id, name, entity_kind, aliases, properties, created_at)
             VALUES (?1, ?2, ?3, '[]', ?4, ?5)
             ON CONFLICT(name, entity_kind) DO NOTHING",
            params![
                id,
                name,
                kind.as_str(),
                serde_json::to_string(&metadata)?,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            tracing::debug!(name, kind = %kind, "Canonical record already exists");
        }

        let raw = conn.query_row(
            &format!(
                "SELECT {SELECT_COLUMNS} FROM canonical_entities WHERE name = ?1 AND entity_kind = ?2"
            ),
            params![name, kind.as_str()],
            RawRecord::from_row,
        )?;
        raw.into_record()
            .ok_or_else(|| GrimoireError::canonical_store(format!("unreadable record for {name}")))
    }
}

/// Row as stored, before kind and JSON columns are decoded.
struct RawRecord {
    id: String,
    name: String,
    kind: String,
    aliases: String,
    properties: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            aliases: row.get(3)?,
            properties: row.get(4)?,
        })
    }

    fn into_record(self) -> Option<CanonicalRecord> {
        let Some(kind) = EntityKind::from_str_flexible(&self.kind) else {
            tracing::warn!(id = %self.id, kind = %self.kind, "Skipping canonical record with unknown kind");
            return None;
        };
        let aliases: Vec<String> = serde_json::from_str(&self.aliases).unwrap_or_default();
        let properties: Metadata = serde_json::from_str(&self.properties).unwrap_or_default();

        let mut record = CanonicalRecord::new(self.id, self.name, kind).with_aliases(aliases);
        record.properties = properties;
        Some(record)
    }
}
