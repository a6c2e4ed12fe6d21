//! SQLite schema for the embedded canonical store.
//!
//! One table, `canonical_entities`, keyed by a text id and unique per
//! case-insensitive name and kind.

use rusqlite::Connection;

use grimoire_core::error::GrimoireResult;

/// SQL for the canonical entities table.
pub const CREATE_CANONICAL_ENTITIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS canonical_entities (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL COLLATE NOCASE,
    entity_kind TEXT NOT NULL,
    aliases TEXT NOT NULL DEFAULT '[]',
    properties TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    UNIQUE(name, entity_kind)
)
"#;

/// Index for listing by kind.
pub const CREATE_CANONICAL_KIND_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_canonical_entities_kind ON canonical_entities(entity_kind)
"#;

/// Initialize the schema. Safe to call multiple times.
pub fn init_schema(conn: &Connection) -> GrimoireResult<()> {
    conn.execute(CREATE_CANONICAL_ENTITIES_TABLE, [])?;
    conn.execute(CREATE_CANONICAL_KIND_INDEX, [])?;
    Ok(())
}
