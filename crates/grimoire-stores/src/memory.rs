//! In-memory canonical store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use grimoire_core::error::GrimoireResult;
use grimoire_core::traits::CanonicalStore;
use grimoire_core::types::{CanonicalRecord, EntityKind, Metadata};

/// Canonical store held entirely in process memory.
///
/// `create` is idempotent per case-insensitive name and kind.
#[derive(Debug, Default)]
pub struct InMemoryCanonicalStore {
    records: RwLock<Vec<CanonicalRecord>>,
}

impl InMemoryCanonicalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `records`.
    pub fn with_records(records: impl IntoIterator<Item = CanonicalRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Insert or replace a record by id.
    pub async fn upsert(&self, record: CanonicalRecord) {
        let mut records = self.records.write().await;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CanonicalStore for InMemoryCanonicalStore {
    async fn list_by_kind(&self, kind: EntityKind) -> GrimoireResult<Vec<CanonicalRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    async fn create(
        &self,
        name: &str,
        kind: EntityKind,
        metadata: Metadata,
    ) -> GrimoireResult<CanonicalRecord> {
        let mut records = self.records.write().await;
        let lower = name.to_lowercase();
        if let Some(existing) = records
            .iter()
            .find(|r| r.kind == kind && r.name.to_lowercase() == lower)
        {
            return Ok(existing.clone());
        }

        let mut record = CanonicalRecord::new(uuid::Uuid::new_v4().to_string(), name, kind);
        record.properties = metadata;
        records.push(record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_list() {
        let store = InMemoryCanonicalStore::with_records([CanonicalRecord::new(
            "c1",
            "Fireball",
            EntityKind::Spell,
        )]);

        let created = store
            .create("Goblin", EntityKind::Monster, Metadata::new())
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        assert_eq!(store.list_by_kind(EntityKind::Spell).await.unwrap().len(), 1);
        assert_eq!(store.list_by_kind(EntityKind::Monster).await.unwrap()[0].name, "Goblin");
        assert!(store.list_by_kind(EntityKind::Npc).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store = InMemoryCanonicalStore::new();
        let first = store.create("Strahd", EntityKind::Npc, Metadata::new()).await.unwrap();
        let second = store.create("strahd", EntityKind::Npc, Metadata::new()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.len().await, 1);

        store.create("Strahd", EntityKind::Location, Metadata::new()).await.unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = InMemoryCanonicalStore::new();
        store.upsert(CanonicalRecord::new("c1", "Fireball", EntityKind::Spell)).await;
        store
            .upsert(CanonicalRecord::new("c1", "Fireball", EntityKind::Spell).with_aliases(["Fire Ball"]))
            .await;

        let spells = store.list_by_kind(EntityKind::Spell).await.unwrap();
        assert_eq!(spells.len(), 1);
        assert_eq!(spells[0].aliases, vec!["Fire Ball"]);
    }
}
