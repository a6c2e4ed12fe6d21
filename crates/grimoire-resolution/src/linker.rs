//! Canonical linking.
//!
//! Resolved mentions are scored against canonical records of their kind and
//! attached to the best record above the similarity threshold. Unmatched
//! mentions may create a record instead. Records are read through a
//! [`CanonicalCache`] that callers refresh when outside writes may have
//! happened.

use std::collections::HashMap;
use std::sync::Arc;

use grimoire_core::similarity::ratio;
use grimoire_core::{
    CanonicalRecord, CanonicalStore, EntityKind, Metadata, NerConfig, ResolvedMention,
};
use serde_json::json;
use tokio::sync::RwLock;

/// Linker configuration.
#[derive(Debug, Clone)]
pub struct LinkerConfig {
    /// Minimum record score (0.0 - 1.0) to link.
    pub similarity_threshold: f32,
    /// Create a record when nothing matches.
    pub auto_create_missing: bool,
    /// Confidence added to a linked mention.
    pub link_boost: f32,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            auto_create_missing: false,
            link_boost: 0.1,
        }
    }
}

impl From<&NerConfig> for LinkerConfig {
    fn from(config: &NerConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            auto_create_missing: config.auto_create_missing,
            ..Default::default()
        }
    }
}

/// Per-kind snapshot of canonical records.
///
/// Only successful listings are cached. Readers get an `Arc` snapshot that
/// later refreshes never mutate.
#[derive(Debug, Default)]
pub struct CanonicalCache {
    records: RwLock<HashMap<EntityKind, Arc<Vec<CanonicalRecord>>>>,
}

impl CanonicalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot for `kind`, if loaded.
    pub async fn get(&self, kind: EntityKind) -> Option<Arc<Vec<CanonicalRecord>>> {
        self.records.read().await.get(&kind).cloned()
    }

    /// Replace the snapshot for `kind`.
    pub async fn insert(&self, kind: EntityKind, records: Vec<CanonicalRecord>) -> Arc<Vec<CanonicalRecord>> {
        let records = Arc::new(records);
        self.records.write().await.insert(kind, Arc::clone(&records));
        records
    }

    /// Append a freshly created record to a loaded snapshot.
    ///
    /// No-op when `kind` is not loaded; the next listing will include it.
    pub async fn push(&self, record: CanonicalRecord) {
        let mut records = self.records.write().await;
        if let Some(snapshot) = records.get_mut(&record.kind) {
            Arc::make_mut(snapshot).push(record);
        }
    }

    /// Drop every snapshot so the next use of each kind re-reads the store.
    pub async fn invalidate(&self) {
        self.records.write().await.clear();
    }

    /// Drop the snapshot of one kind.
    pub async fn invalidate_kind(&self, kind: EntityKind) {
        self.records.write().await.remove(&kind);
    }

    /// Number of kinds currently cached.
    pub async fn loaded_kinds(&self) -> usize {
        self.records.read().await.len()
    }
}

/// Links mentions to canonical records.
pub struct CanonicalLinker {
    store: Arc<dyn CanonicalStore>,
    cache: Arc<CanonicalCache>,
    config: LinkerConfig,
}

impl CanonicalLinker {
    /// Create a linker with its own cache.
    pub fn new(store: Arc<dyn CanonicalStore>, config: LinkerConfig) -> Self {
        Self::with_cache(store, Arc::new(CanonicalCache::new()), config)
    }

    /// Create a linker sharing an existing cache.
    pub fn with_cache(
        store: Arc<dyn CanonicalStore>,
        cache: Arc<CanonicalCache>,
        config: LinkerConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &LinkerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CanonicalCache> {
        &self.cache
    }

    /// Forget cached records so creations made elsewhere become visible.
    pub async fn refresh_cache(&self) {
        self.cache.invalidate().await;
        tracing::debug!("Canonical cache invalidated");
    }

    /// Link every mention, preserving order.
    ///
    /// Store failures never abort: affected mentions pass through unlinked.
    pub async fn link_all(&self, mentions: Vec<ResolvedMention>) -> Vec<ResolvedMention> {
        let mut views: HashMap<EntityKind, Option<Arc<Vec<CanonicalRecord>>>> = HashMap::new();
        let mut linked = Vec::with_capacity(mentions.len());

        for mention in mentions {
            if !views.contains_key(&mention.kind) {
                let snapshot = self.snapshot(mention.kind).await;
                views.insert(mention.kind, snapshot);
            }
            let view = views.get_mut(&mention.kind).and_then(Option::as_mut);
            linked.push(self.link_with_view(mention, view).await);
        }

        linked
    }

    /// Link a single mention.
    pub async fn link(&self, mention: ResolvedMention) -> ResolvedMention {
        let mut snapshot = self.snapshot(mention.kind).await;
        self.link_with_view(mention, snapshot.as_mut()).await
    }

    /// Exact case-insensitive name or alias lookup.
    pub async fn find_existing(&self, name: &str, kind: EntityKind) -> Option<CanonicalRecord> {
        let snapshot = self.snapshot(kind).await?;
        snapshot.iter().find(|r| r.answers_to(name)).cloned()
    }

    async fn snapshot(&self, kind: EntityKind) -> Option<Arc<Vec<CanonicalRecord>>> {
        if let Some(records) = self.cache.get(kind).await {
            return Some(records);
        }

        match self.store.list_by_kind(kind).await {
            Ok(records) => {
                tracing::debug!(kind = %kind, count = records.len(), "Loaded canonical records");
                Some(self.cache.insert(kind, records).await)
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Canonical store unavailable, skipping linking");
                None
            }
        }
    }

    async fn link_with_view(
        &self,
        mut mention: ResolvedMention,
        view: Option<&mut Arc<Vec<CanonicalRecord>>>,
    ) -> ResolvedMention {
        let Some(view) = view else {
            return mention;
        };

        if let Some(id) = &mention.canonical_id {
            if view.iter().any(|r| &r.id == id) {
                return mention;
            }
        }

        let pre_linked = mention
            .gazetteer_id
            .as_ref()
            .and_then(|gid| view.iter().find(|r| &r.id == gid));
        if let Some(record) = pre_linked {
            self.apply_link(&mut mention, record, 1.0);
            return mention;
        }

        let mut best: Option<(&CanonicalRecord, f32)> = None;
        for record in view.iter() {
            let score = score_record(&mention.normalized_name, record);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((record, score));
            }
        }

        if let Some((record, score)) = best {
            if score >= self.config.similarity_threshold {
                let record = record.clone();
                self.apply_link(&mut mention, &record, score);
                return mention;
            }
        }

        if self.config.auto_create_missing {
            if let Some(record) = self.create_for(&mention).await {
                mention.canonical_id = Some(record.id.clone());
                mention
                    .metadata
                    .insert("canonical_created".to_string(), json!(true));
                Arc::make_mut(view).push(record.clone());
                self.cache.push(record).await;
            }
        }

        mention
    }

    async fn create_for(&self, mention: &ResolvedMention) -> Option<CanonicalRecord> {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), json!("ner_extraction"));
        metadata.insert("confidence".to_string(), json!(mention.confidence));
        if let Some(gid) = &mention.gazetteer_id {
            metadata.insert("gazetteer_id".to_string(), json!(gid));
        }

        match self
            .store
            .create(&mention.normalized_name, mention.kind, metadata)
            .await
        {
            Ok(record) => {
                tracing::info!(
                    id = %record.id,
                    name = %record.name,
                    kind = %record.kind,
                    "Created canonical record"
                );
                Some(record)
            }
            Err(e) => {
                tracing::warn!(
                    name = %mention.normalized_name,
                    error = %e,
                    "Failed to create canonical record"
                );
                None
            }
        }
    }

    fn apply_link(&self, mention: &mut ResolvedMention, record: &CanonicalRecord, score: f32) {
        mention.canonical_id = Some(record.id.clone());
        mention.normalized_name = record.name.clone();
        mention.confidence = (mention.confidence + self.config.link_boost).min(1.0);
        mention
            .metadata
            .insert("canonical_match_score".to_string(), json!(score));
    }
}

/// Score a name against a record: 1.0 for the name, 0.95 for an exact alias,
/// otherwise the best fuzzy ratio over name and aliases.
pub fn score_record(name: &str, record: &CanonicalRecord) -> f32 {
    let lower = name.to_lowercase();
    if record.name.to_lowercase() == lower {
        return 1.0;
    }

    let name_score = ratio(name, &record.name);
    let mut alias_score: f32 = 0.0;
    for alias in &record.aliases {
        if alias.to_lowercase() == lower {
            alias_score = 0.95;
            break;
        }
        alias_score = alias_score.max(ratio(name, alias));
    }

    name_score.max(alias_score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use grimoire_core::{
        CandidateMention, GrimoireError, GrimoireResult, MentionSource,
    };
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Store {}

        #[async_trait]
        impl CanonicalStore for Store {
            async fn list_by_kind(&self, kind: EntityKind) -> GrimoireResult<Vec<CanonicalRecord>>;
            async fn create(
                &self,
                name: &str,
                kind: EntityKind,
                metadata: Metadata,
            ) -> GrimoireResult<CanonicalRecord>;
        }
    }

    fn spells() -> Vec<CanonicalRecord> {
        vec![
            CanonicalRecord::new("c-fireball", "Fireball", EntityKind::Spell)
                .with_aliases(["Fire Ball"]),
            CanonicalRecord::new("c-mm", "Magic Missile", EntityKind::Spell).with_aliases(["MM"]),
        ]
    }

    fn spell(name: &str, confidence: f32) -> ResolvedMention {
        CandidateMention::new(name, EntityKind::Spell, confidence, MentionSource::Statistical)
    }

    fn config(auto_create: bool) -> LinkerConfig {
        LinkerConfig {
            auto_create_missing: auto_create,
            ..Default::default()
        }
    }

    #[test]
    fn test_score_record() {
        let record = &spells()[1];
        assert_eq!(score_record("magic missile", record), 1.0);
        assert_eq!(score_record("mm", record), 0.95);
        assert!(score_record("Magic Misile", record) > 0.9);
        assert!(score_record("Shield", record) < 0.5);
    }

    #[tokio::test]
    async fn test_typo_links_and_canonicalizes() {
        let mut store = MockStore::new();
        store
            .expect_list_by_kind()
            .with(eq(EntityKind::Spell))
            .times(1)
            .returning(|_| Ok(spells()));
        store.expect_create().never();

        let linker = CanonicalLinker::new(Arc::new(store), config(false));
        let linked = linker.link_all(vec![spell("Firebal", 0.6), spell("mm", 0.6)]).await;

        assert_eq!(linked[0].canonical_id.as_deref(), Some("c-fireball"));
        assert_eq!(linked[0].normalized_name, "Fireball");
        assert_eq!(linked[0].text, "Firebal");
        assert!((linked[0].confidence - 0.7).abs() < 1e-6);
        assert!(linked[0].metadata["canonical_match_score"].as_f64().unwrap() >= 0.85);

        assert_eq!(linked[1].canonical_id.as_deref(), Some("c-mm"));
        assert_eq!(linked[1].normalized_name, "Magic Missile");
    }

    #[tokio::test]
    async fn test_plural_links_to_singular_record() {
        let mut store = MockStore::new();
        store
            .expect_list_by_kind()
            .with(eq(EntityKind::Monster))
            .returning(|_| Ok(vec![CanonicalRecord::new("c-orc", "Orc", EntityKind::Monster)]));
        store.expect_create().never();

        let linker = CanonicalLinker::new(Arc::new(store), config(false));
        let mention =
            CandidateMention::new("Orcs", EntityKind::Monster, 0.6, MentionSource::Statistical);
        let linked = linker.link(mention).await;

        assert_eq!(linked.canonical_id.as_deref(), Some("c-orc"));
        assert_eq!(linked.normalized_name, "Orc");
        assert!(linked.metadata["canonical_match_score"].as_f64().unwrap() >= 0.85);
    }

    #[tokio::test]
    async fn test_linking_is_idempotent() {
        let mut store = MockStore::new();
        store.expect_list_by_kind().returning(|_| Ok(spells()));

        let linker = CanonicalLinker::new(Arc::new(store), config(false));
        let once = linker.link(spell("Fireball", 0.8)).await;
        let twice = linker.link(once.clone()).await;

        assert_eq!(once, twice);
        assert_eq!(twice.canonical_id.as_deref(), Some("c-fireball"));
    }

    #[tokio::test]
    async fn test_gazetteer_id_links_directly() {
        let mut store = MockStore::new();
        store.expect_list_by_kind().returning(|_| Ok(spells()));

        let linker = CanonicalLinker::new(Arc::new(store), config(false));
        let mention = spell("the missile thing", 0.7).with_gazetteer_id("c-mm");
        let linked = linker.link(mention).await;

        assert_eq!(linked.canonical_id.as_deref(), Some("c-mm"));
        assert_eq!(linked.metadata["canonical_match_score"], json!(1.0));
    }

    #[tokio::test]
    async fn test_unmatched_stays_unlinked_without_auto_create() {
        let mut store = MockStore::new();
        store.expect_list_by_kind().returning(|_| Ok(spells()));
        store.expect_create().never();

        let linker = CanonicalLinker::new(Arc::new(store), config(false));
        let linked = linker.link(spell("Eldritch Blast", 0.7)).await;

        assert!(linked.canonical_id.is_none());
        assert_eq!(linked.normalized_name, "Eldritch Blast");
        assert_eq!(linked.confidence, 0.7);
    }

    #[tokio::test]
    async fn test_auto_create_reuses_created_record() {
        let mut store = MockStore::new();
        store
            .expect_list_by_kind()
            .times(1)
            .returning(|_| Ok(Vec::new()));
        store
            .expect_create()
            .times(1)
            .returning(|name, kind, metadata| {
                assert_eq!(metadata["source"], json!("ner_extraction"));
                Ok(CanonicalRecord::new("new-1", name, kind))
            });

        let linker = CanonicalLinker::new(Arc::new(store), config(true));
        let linked = linker
            .link_all(vec![spell("Eldritch Blast", 0.7), spell("Eldritch Blast", 0.6)])
            .await;

        assert_eq!(linked[0].canonical_id.as_deref(), Some("new-1"));
        assert_eq!(linked[0].metadata["canonical_created"], json!(true));
        assert_eq!(linked[1].canonical_id.as_deref(), Some("new-1"));
        assert!(linked[1].metadata.get("canonical_created").is_none());

        // Later runs see the created record through the cache.
        let again = linker.link(spell("Eldritch Blast", 0.7)).await;
        assert_eq!(again.canonical_id.as_deref(), Some("new-1"));
    }

    #[tokio::test]
    async fn test_store_failure_passes_through_and_is_not_cached() {
        let mut store = MockStore::new();
        store
            .expect_list_by_kind()
            .times(2)
            .returning(|_| Err(GrimoireError::canonical_store("connection refused")));
        store.expect_create().never();

        let linker = CanonicalLinker::new(Arc::new(store), config(true));
        let mention = spell("Fireball", 0.6);
        let linked = linker.link_all(vec![mention.clone(), spell("Shield", 0.6)]).await;
        assert_eq!(linked[0], mention);
        assert!(linked[1].canonical_id.is_none());
        assert_eq!(linker.cache().loaded_kinds().await, 0);

        linker.link(spell("Fireball", 0.6)).await;
    }

    #[tokio::test]
    async fn test_create_failure_leaves_mention_unlinked() {
        let mut store = MockStore::new();
        store.expect_list_by_kind().returning(|_| Ok(Vec::new()));
        store
            .expect_create()
            .returning(|_, _, _| Err(GrimoireError::canonical_store("read only")));

        let linker = CanonicalLinker::new(Arc::new(store), config(true));
        let linked = linker.link(spell("Shield", 0.6)).await;
        assert!(linked.canonical_id.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rereads_store() {
        let mut store = MockStore::new();
        store
            .expect_list_by_kind()
            .times(2)
            .returning(|_| Ok(spells()));

        let linker = CanonicalLinker::new(Arc::new(store), config(false));
        linker.link(spell("Fireball", 0.6)).await;
        linker.link(spell("Fireball", 0.6)).await;
        linker.refresh_cache().await;
        assert_eq!(linker.cache().loaded_kinds().await, 0);
        linker.link(spell("Fireball", 0.6)).await;
    }

    #[tokio::test]
    async fn test_find_existing() {
        let mut store = MockStore::new();
        store.expect_list_by_kind().returning(|_| Ok(spells()));

        let linker = CanonicalLinker::new(Arc::new(store), config(false));
        let found = linker.find_existing("fire ball", EntityKind::Spell).await.unwrap();
        assert_eq!(found.id, "c-fireball");
        assert!(linker.find_existing("Firebal", EntityKind::Spell).await.is_none());
    }
}
