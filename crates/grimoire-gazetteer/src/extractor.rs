//! Gazetteer-sourced mention extraction.

use std::collections::HashSet;
use std::sync::Arc;

use grimoire_core::{
    CandidateMention, GazetteerEntry, GrimoireResult, MatchSpan, MentionSource,
};
use serde_json::json;

use crate::matcher::{MatcherConfig, MatchingEngine};
use crate::store::GazetteerStore;

/// Turns matching engine hits into [`CandidateMention`]s.
#[derive(Debug, Clone)]
pub struct GazetteerExtractor {
    engine: Arc<MatchingEngine>,
}

impl GazetteerExtractor {
    pub fn new(engine: Arc<MatchingEngine>) -> Self {
        Self { engine }
    }

    /// Build the engine over `store` and wrap it.
    pub fn from_store(store: GazetteerStore, config: MatcherConfig) -> GrimoireResult<Self> {
        Ok(Self::new(Arc::new(MatchingEngine::new(store, config)?)))
    }

    pub fn engine(&self) -> &Arc<MatchingEngine> {
        &self.engine
    }

    pub fn get_entry(&self, id: &str) -> Option<&GazetteerEntry> {
        self.engine.get_entry(id)
    }

    /// Exact and pattern mentions in `text`.
    pub fn extract(&self, text: &str) -> GrimoireResult<Vec<CandidateMention>> {
        self.engine.ensure_ready()?;

        Ok(self
            .engine
            .find_all(text)
            .into_iter()
            .filter_map(|span| {
                let start = span.start;
                let end = span.end;
                self.to_mention(span, Some((start, end)))
            })
            .collect())
    }

    /// Fuzzy mentions for candidate strings such as tagger noun chunks.
    ///
    /// Every candidate is compared against the whole gazetteer. At most one
    /// mention is produced per gazetteer entry.
    pub fn extract_with_fuzzy(
        &self,
        text: &str,
        candidates: &[String],
    ) -> GrimoireResult<Vec<CandidateMention>> {
        self.engine.ensure_ready()?;

        let mut seen = HashSet::new();
        let mut mentions = Vec::new();

        for candidate in candidates {
            let Some(span) = self.engine.find_fuzzy(candidate, None) else {
                continue;
            };
            if !seen.insert(span.entry_id.clone()) {
                continue;
            }
            let located = text
                .find(candidate.as_str())
                .map(|pos| (pos, pos + candidate.len()));
            mentions.extend(self.to_mention(span, located));
        }

        Ok(mentions)
    }

    fn to_mention(
        &self,
        span: MatchSpan,
        located: Option<(usize, usize)>,
    ) -> Option<CandidateMention> {
        let entry = self.engine.get_entry(&span.entry_id)?;

        let mut mention = CandidateMention::new(
            span.matched_text,
            entry.kind,
            span.confidence,
            MentionSource::Gazetteer,
        )
        .with_normalized_name(&entry.name)
        .with_gazetteer_id(&entry.id)
        .with_metadata("match_kind", json!(span.match_kind.to_string()))
        .with_metadata("gazetteer_metadata", json!(entry.metadata));

        if let Some((start, end)) = located {
            mention = mention.with_span(start, end);
        }
        Some(mention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grimoire_core::{EntityKind, Span};

    fn extractor() -> GazetteerExtractor {
        let mut fireball = GazetteerEntry::new("sp1", "Fireball", EntityKind::Spell);
        fireball.metadata.insert("level".to_string(), json!(3));
        let store = GazetteerStore::from_entries([
            fireball,
            GazetteerEntry::new("m1", "Goblin", EntityKind::Monster).with_aliases(["Goblins"]),
        ]);
        GazetteerExtractor::from_store(store, MatcherConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_builds_gazetteer_mentions() {
        let mentions = extractor().extract("The wizard cast fireball at the goblins.").unwrap();
        assert_eq!(mentions.len(), 2);

        let spell = &mentions[0];
        assert_eq!(spell.text, "fireball");
        assert_eq!(spell.normalized_name, "Fireball");
        assert_eq!(spell.kind, EntityKind::Spell);
        assert_eq!(spell.source, MentionSource::Gazetteer);
        assert_eq!(spell.gazetteer_id.as_deref(), Some("sp1"));
        assert_eq!(spell.span, Some(Span::new(16, 24)));
        assert_eq!(spell.metadata["match_kind"], json!("exact"));
        assert_eq!(spell.metadata["gazetteer_metadata"]["level"], json!(3));

        assert_eq!(mentions[1].normalized_name, "Goblin");
    }

    #[test]
    fn test_extract_with_fuzzy_one_mention_per_entry() {
        let candidates = vec![
            "the Firebal".to_string(),
            "Firebal".to_string(),
            "Fireballl".to_string(),
            "dark cave".to_string(),
        ];
        let mentions = extractor()
            .extract_with_fuzzy("He cast Firebal into the dark cave", &candidates)
            .unwrap();

        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, "Firebal");
        assert_eq!(mentions[0].normalized_name, "Fireball");
        assert_eq!(mentions[0].span, Some(Span::new(8, 15)));
        assert_eq!(mentions[0].metadata["match_kind"], json!("fuzzy"));
    }

    #[test]
    fn test_fuzzy_candidate_not_in_text_has_no_span() {
        let mentions = extractor()
            .extract_with_fuzzy("nothing here", &["Goblinn".to_string()])
            .unwrap();
        assert_eq!(mentions.len(), 1);
        assert!(mentions[0].span.is_none());
    }
}
