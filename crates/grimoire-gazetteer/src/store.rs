//! Id-keyed gazetteer entry table.

use std::collections::HashMap;

use grimoire_core::{EntityKind, GazetteerEntry};

/// An immutable-after-load set of gazetteer entries.
///
/// Entries keep their first-seen order. Inserting an entry whose id already
/// exists replaces the earlier entry in place, which is how campaign
/// gazetteers override canonical ones.
#[derive(Debug, Clone, Default)]
pub struct GazetteerStore {
    entries: Vec<GazetteerEntry>,
    index: HashMap<String, usize>,
}

impl GazetteerStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from entries in load order.
    pub fn from_entries(entries: impl IntoIterator<Item = GazetteerEntry>) -> Self {
        let mut store = Self::new();
        for entry in entries {
            store.insert(entry);
        }
        store
    }

    /// Insert an entry, replacing any entry with the same id.
    pub fn insert(&mut self, entry: GazetteerEntry) {
        match self.index.get(&entry.id) {
            Some(&pos) => {
                tracing::debug!(id = %entry.id, "Overriding gazetteer entry");
                self.entries[pos] = entry;
            }
            None => {
                self.index.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<&GazetteerEntry> {
        self.index.get(id).map(|&pos| &self.entries[pos])
    }

    /// All entries of one kind.
    pub fn entries_of_kind(&self, kind: EntityKind) -> Vec<&GazetteerEntry> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }

    /// All entries in load order.
    pub fn entries(&self) -> &[GazetteerEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &GazetteerEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_entry_replaces_earlier() {
        let store = GazetteerStore::from_entries([
            GazetteerEntry::new("npc_grom", "Grom", EntityKind::Npc),
            GazetteerEntry::new("spell_fireball", "Fireball", EntityKind::Spell),
            GazetteerEntry::new("npc_grom", "Grom the Bold", EntityKind::Npc),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("npc_grom").unwrap().name, "Grom the Bold");
        assert_eq!(store.entries()[0].id, "npc_grom");
    }

    #[test]
    fn test_entries_of_kind() {
        let store = GazetteerStore::from_entries([
            GazetteerEntry::new("a", "Fireball", EntityKind::Spell),
            GazetteerEntry::new("b", "Goblin", EntityKind::Monster),
            GazetteerEntry::new("c", "Shield", EntityKind::Spell),
        ]);

        assert_eq!(store.entries_of_kind(EntityKind::Spell).len(), 2);
        assert!(store.entries_of_kind(EntityKind::Race).is_empty());
        assert!(!store.is_empty());
    }
}
